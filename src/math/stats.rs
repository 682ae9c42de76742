//! Small statistics helpers shared by the estimators.

/// Arithmetic mean; 0 for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation with the `N - 1` denominator.
///
/// Returns 0 for fewer than two observations (the spread of a single point
/// is taken as zero rather than undefined).
pub fn sample_std(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let m = mean(values);
    let ss: f64 = values.iter().map(|v| (v - m) * (v - m)).sum();
    (ss / (n - 1) as f64).sqrt()
}

/// Value at `floor(n * frac)` (0-indexed) in an ascending-sorted slice.
///
/// The index is clamped to the last element so `frac = 1.0` is safe.
pub fn percentile_floor(sorted: &[f64], frac: f64) -> f64 {
    debug_assert!(!sorted.is_empty());
    let idx = ((sorted.len() as f64 * frac).floor() as usize).min(sorted.len() - 1);
    sorted[idx]
}
