use crate::scan::Sample;

/// Top `n` samples by score, best first.
///
/// The sort is stable, so samples with equal scores keep their scan order.
/// Asking for more samples than exist returns them all.
pub fn select_top(samples: &[Sample], n: usize) -> Vec<Sample> {
    let mut ranked = samples.to_vec();
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
    ranked.truncate(n);
    ranked
}
