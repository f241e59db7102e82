use image::RgbImage;
use tracing::{debug, info};

use crate::normalize::Normalizer;
use crate::score::SimilarityScorer;
use crate::source::FrameSource;

/// Skip-distance controller parameters. Defaults are the reference values.
#[derive(Debug, Clone, Copy)]
pub struct ScanParams {
    /// Skip distance at the start of a scan.
    pub start: u32,
    /// Lower clamp on the skip distance.
    pub floor: u32,
    /// Upper clamp on the skip distance.
    pub ceil: u32,
    /// Score-delta amplification factor.
    pub step: u32,
}

impl Default for ScanParams {
    fn default() -> Self {
        Self {
            start: 40,
            floor: 1,
            ceil: 200,
            step: 1000,
        }
    }
}

/// One scored frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub score: f64,
    pub frame_index: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error(
        "frame {frame_index} normalized to {frame_width}x{frame_height} but the query \
         normalized to {needle_width}x{needle_height}; query and video resolutions are \
         incompatible"
    )]
    ShapeMismatch {
        frame_index: u64,
        frame_width: u32,
        frame_height: u32,
        needle_width: u32,
        needle_height: u32,
    },
}

/// A frame is scored only once the skip counter has caught up with the
/// current skip distance; every other frame is passed by unscored.
pub fn is_eligible(skipped: u32, skip_distance: u32) -> bool {
    skipped == skip_distance
}

/// Feed the latest score movement back into the skip distance.
///
/// A rising score (negative delta) shrinks the skip to sample more densely
/// near a candidate match; a falling score widens it to hurry over
/// uninteresting stretches. The adjustment is `floor(delta * step)`,
/// clamped to `[floor, ceil]`.
pub fn next_skip_distance(
    current: u32,
    previous_score: f64,
    current_score: f64,
    params: &ScanParams,
) -> u32 {
    let score_delta = previous_score - current_score;
    let skip_delta = (score_delta * f64::from(params.step)).floor() as i64;
    (i64::from(current) + skip_delta).clamp(i64::from(params.floor), i64::from(params.ceil)) as u32
}

/// Walk the frame sequence, scoring a subset of frames against the
/// normalized query and steering the sampling density from the score trend.
///
/// Exactly one frame is pulled from the source per iteration whether or not
/// it is scored; the decoder can only move forward. A `None` from the
/// source is the expected end-of-stream path and terminates the scan
/// cleanly with the samples collected so far.
///
/// The first scored frame measures against a `0.0` baseline, so its delta
/// is the negated score; the sharp initial adjustment that follows is part
/// of the reference behavior.
pub fn scan<S, M>(
    needle: &RgbImage,
    source: &mut S,
    normalizer: &Normalizer,
    scorer: &M,
    params: &ScanParams,
) -> Result<Vec<Sample>, ScanError>
where
    S: FrameSource + ?Sized,
    M: SimilarityScorer + ?Sized,
{
    let total_frames = source.total_frames();
    let mut index: u64 = 0;
    let mut skipped: u32 = 0;
    let mut skip_distance = params.start;
    let mut previous_score = 0.0_f64;
    let mut samples = Vec::new();

    while index < total_frames {
        let frame = match source.next_frame() {
            Some(frame) => frame,
            None => {
                debug!(index, total_frames, "frame source exhausted, ending scan");
                break;
            }
        };

        if !is_eligible(skipped, skip_distance) {
            skipped += 1;
        } else {
            skipped = 0;

            let normalized = normalizer.normalize(&frame);
            if normalized.dimensions() != needle.dimensions() {
                return Err(ScanError::ShapeMismatch {
                    frame_index: index,
                    frame_width: normalized.width(),
                    frame_height: normalized.height(),
                    needle_width: needle.width(),
                    needle_height: needle.height(),
                });
            }

            let current_score = scorer.score(needle, &normalized);
            samples.push(Sample {
                score: current_score,
                frame_index: index,
            });
            info!(
                frame = index,
                total_frames,
                score = format!("{current_score:.4}"),
                "scored frame"
            );

            skip_distance = next_skip_distance(skip_distance, previous_score, current_score, params);
            previous_score = current_score;
            debug!(skip_distance, "skip distance adjusted");
        }

        index += 1;
    }

    Ok(samples)
}
