use image::RgbImage;

/// Similarity between two equal-shaped normalized images.
///
/// Implementations are pure: no state is carried between calls and the
/// result depends only on the two inputs.
pub trait SimilarityScorer {
    /// Bounded similarity score; the reference metric yields values in
    /// `[-1, 1]` with 1 meaning identical.
    ///
    /// Equal dimensions are a caller contract: both images must come from
    /// the same normalizer. Violations panic rather than silently comparing
    /// incompatible data.
    fn score(&self, a: &RgbImage, b: &RgbImage) -> f64;

    /// Human-readable name for logging.
    fn name(&self) -> &str {
        "unnamed"
    }
}

const CHANNELS: usize = 3;

/// Windowed structural similarity (Wang et al.), computed per channel and
/// averaged.
///
/// Formulation matches scikit-image's `structural_similarity` defaults for
/// multichannel u8 input: a 7x7 uniform window slid over every valid
/// position, K1 = 0.01, K2 = 0.03, dynamic range 255, unbiased variance
/// normalization, mean of the per-window SSIM map, arithmetic mean across
/// the three channels. The window shrinks to the largest odd size that fits
/// when an image is smaller than 7 pixels on a side.
#[derive(Debug, Clone, Copy)]
pub struct Ssim {
    window: usize,
    k1: f64,
    k2: f64,
    dynamic_range: f64,
}

impl Default for Ssim {
    fn default() -> Self {
        Self {
            window: 7,
            k1: 0.01,
            k2: 0.03,
            dynamic_range: 255.0,
        }
    }
}

impl Ssim {
    fn effective_window(&self, width: usize, height: usize) -> usize {
        let mut win = self.window.min(width).min(height);
        if win % 2 == 0 {
            win -= 1;
        }
        win.max(1)
    }
}

impl SimilarityScorer for Ssim {
    fn score(&self, a: &RgbImage, b: &RgbImage) -> f64 {
        assert_eq!(
            a.dimensions(),
            b.dimensions(),
            "scorer contract violated: images must be normalized to the same shape"
        );

        let (width, height) = a.dimensions();
        let (width, height) = (width as usize, height as usize);
        let win = self.effective_window(width, height);

        let c1 = (self.k1 * self.dynamic_range).powi(2);
        let c2 = (self.k2 * self.dynamic_range).powi(2);

        let mut channel_sum = 0.0;
        for channel in 0..CHANNELS {
            let x = channel_plane(a, channel);
            let y = channel_plane(b, channel);
            channel_sum += ssim_plane(&x, &y, width, height, win, c1, c2);
        }
        channel_sum / CHANNELS as f64
    }

    fn name(&self) -> &str {
        "ssim"
    }
}

/// One color channel as a row-major f64 plane.
fn channel_plane(image: &RgbImage, channel: usize) -> Vec<f64> {
    image
        .as_raw()
        .iter()
        .skip(channel)
        .step_by(CHANNELS)
        .map(|&v| f64::from(v))
        .collect()
}

/// Mean SSIM over every valid `win x win` window position of one plane.
fn ssim_plane(x: &[f64], y: &[f64], width: usize, height: usize, win: usize, c1: f64, c2: f64) -> f64 {
    let n = (win * win) as f64;
    // Unbiased normalization, degenerate 1x1 windows carry zero variance.
    let norm = if win > 1 { n - 1.0 } else { 1.0 };

    let mut total = 0.0;
    let mut windows = 0u64;

    for top in 0..=(height - win) {
        for left in 0..=(width - win) {
            let mut sum_x = 0.0;
            let mut sum_y = 0.0;
            let mut sum_xx = 0.0;
            let mut sum_yy = 0.0;
            let mut sum_xy = 0.0;

            for row in top..top + win {
                let offset = row * width + left;
                for i in offset..offset + win {
                    let (xv, yv) = (x[i], y[i]);
                    sum_x += xv;
                    sum_y += yv;
                    sum_xx += xv * xv;
                    sum_yy += yv * yv;
                    sum_xy += xv * yv;
                }
            }

            let mean_x = sum_x / n;
            let mean_y = sum_y / n;
            let var_x = (sum_xx - sum_x * mean_x) / norm;
            let var_y = (sum_yy - sum_y * mean_y) / norm;
            let cov = (sum_xy - sum_x * mean_y) / norm;

            let numerator = (2.0 * mean_x * mean_y + c1) * (2.0 * cov + c2);
            let denominator = (mean_x * mean_x + mean_y * mean_y + c1) * (var_x + var_y + c2);
            total += numerator / denominator;
            windows += 1;
        }
    }

    total / windows as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn gradient(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x * 7 % 256) as u8, (y * 11 % 256) as u8, ((x + y) % 256) as u8])
        })
    }

    fn solid(width: u32, height: u32, value: u8) -> RgbImage {
        RgbImage::from_pixel(width, height, Rgb([value, value, value]))
    }

    fn checkerboard(width: u32, height: u32, inverted: bool) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            let on = (x + y) % 2 == 0;
            if on != inverted {
                Rgb([255, 255, 255])
            } else {
                Rgb([0, 0, 0])
            }
        })
    }

    #[test]
    fn self_similarity_is_maximal() {
        let image = gradient(32, 24);
        assert_eq!(Ssim::default().score(&image, &image), 1.0);
    }

    #[test]
    fn symmetric() {
        let a = gradient(32, 24);
        let b = checkerboard(32, 24, false);
        let scorer = Ssim::default();
        assert_eq!(scorer.score(&a, &b), scorer.score(&b, &a));
    }

    #[test]
    fn bounded_for_dissimilar_images() {
        let black = solid(32, 32, 0);
        let white = solid(32, 32, 255);
        let score = Ssim::default().score(&black, &white);
        assert!(score < 1.0);
        assert!((-1.0..=1.0).contains(&score));
    }

    #[test]
    fn opposite_structure_scores_low() {
        let a = checkerboard(32, 32, false);
        let b = checkerboard(32, 32, true);
        let score = Ssim::default().score(&a, &b);
        // Anti-correlated local structure drives the covariance term negative.
        assert!(score < 0.0, "got {score}");
    }

    #[test]
    fn structure_outranks_brightness_shift() {
        let a = gradient(32, 24);
        let shifted = RgbImage::from_fn(32, 24, |x, y| {
            let p = a.get_pixel(x, y).0;
            Rgb([
                p[0].saturating_add(10),
                p[1].saturating_add(10),
                p[2].saturating_add(10),
            ])
        });
        let scorer = Ssim::default();
        let similar = scorer.score(&a, &shifted);
        let dissimilar = scorer.score(&a, &checkerboard(32, 24, false));
        assert!(similar > dissimilar);
    }

    #[test]
    fn images_smaller_than_window_still_score() {
        let image = gradient(3, 3);
        assert_eq!(Ssim::default().score(&image, &image), 1.0);
    }

    #[test]
    #[should_panic(expected = "scorer contract violated")]
    fn shape_mismatch_is_a_contract_violation() {
        let a = gradient(32, 24);
        let b = gradient(24, 32);
        Ssim::default().score(&a, &b);
    }
}
