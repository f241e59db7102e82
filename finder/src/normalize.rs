use image::imageops::FilterType;
use image::RgbImage;

/// Shrinks images to a fixed fraction of their original size so the query
/// and every scored frame share one cheap-to-compare shape.
///
/// The output dimensions are a pure function of the input dimensions and
/// the factor: two inputs with equal dimensions always normalize to equal
/// dimensions.
#[derive(Debug, Clone, Copy)]
pub struct Normalizer {
    factor: u32,
}

impl Normalizer {
    pub fn new(factor: u32) -> Self {
        debug_assert!(factor >= 1, "downsample factor must be at least 1");
        Self { factor }
    }

    /// Dimensions an input of `width x height` normalizes to.
    pub fn normalized_dimensions(&self, width: u32, height: u32) -> (u32, u32) {
        ((width / self.factor).max(1), (height / self.factor).max(1))
    }

    /// Resize to `(width / factor, height / factor)`, preserving the
    /// channel count. Nearest-neighbor keeps this deterministic and makes a
    /// factor of 1 an exact identity.
    pub fn normalize(&self, image: &RgbImage) -> RgbImage {
        let (width, height) = self.normalized_dimensions(image.width(), image.height());
        image::imageops::resize(image, width, height, FilterType::Nearest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn gradient(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        })
    }

    #[test]
    fn output_shape_follows_factor() {
        let normalizer = Normalizer::new(10);
        assert_eq!(normalizer.normalized_dimensions(1920, 1080), (192, 108));
        assert_eq!(normalizer.normalized_dimensions(1919, 1079), (191, 107));
    }

    #[test]
    fn tiny_inputs_never_collapse_to_zero() {
        let normalizer = Normalizer::new(10);
        assert_eq!(normalizer.normalized_dimensions(5, 3), (1, 1));
    }

    #[test]
    fn normalize_produces_declared_shape() {
        let normalizer = Normalizer::new(10);
        let out = normalizer.normalize(&gradient(1920, 1080));
        assert_eq!(out.dimensions(), (192, 108));
    }

    #[test]
    fn equal_inputs_normalize_identically() {
        let normalizer = Normalizer::new(4);
        let image = gradient(64, 48);
        assert_eq!(normalizer.normalize(&image), normalizer.normalize(&image));
    }

    #[test]
    fn factor_one_is_identity() {
        let normalizer = Normalizer::new(1);
        let image = gradient(32, 24);
        assert_eq!(normalizer.normalize(&image), image);
    }
}
