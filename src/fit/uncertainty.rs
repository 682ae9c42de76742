//! Resampling-based parameter uncertainty.
//!
//! Instead of deriving an analytic covariance for the nonlinear estimator, we
//! perturb the observed series with Gaussian noise scaled to its own sample
//! standard deviation, refit each perturbed path independently, and report the
//! per-parameter spread across paths. This trades compute for implementation
//! simplicity and leans on the fitter being stateless: paths share nothing
//! and run on the rayon pool.
//!
//! Determinism: path `p` seeds its own `StdRng` with `seed + p`, so results
//! are reproducible regardless of worker scheduling.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};
use rayon::prelude::*;

use crate::domain::{DAYS_PER_WEEK, ParamsStd, UncertaintySettings, UsageHistory};
use crate::error::AppError;
use crate::fit::fitter::fit;
use crate::math::sample_std;

/// Quantities recorded per path: seven daily weights (Sunday materialized),
/// phi, alpha.
const N_RECORDED: usize = DAYS_PER_WEEK + 2;

/// Estimate per-parameter standard deviations for a calibration.
///
/// Every path records the fitted parameters whether or not that path
/// converged; a path that stops at its budget still carries information about
/// how far the noise pushed the estimate.
pub fn estimate_uncertainty(
    history: &UsageHistory,
    overage: f64,
    settings: &UncertaintySettings,
) -> Result<ParamsStd, AppError> {
    if settings.paths < 2 {
        return Err(AppError::new(
            2,
            format!("At least 2 resampling paths are required (got {}).", settings.paths),
        ));
    }

    let dates = history.dates();
    let observed = history.usages();
    let usage_std = sample_std(&observed);

    let noise = Normal::new(0.0, usage_std)
        .map_err(|e| AppError::new(2, format!("Invalid perturbation distribution (std {usage_std}): {e}")))?;

    let records: Vec<[f64; N_RECORDED]> = (0..settings.paths)
        .into_par_iter()
        .map(|path| -> Result<[f64; N_RECORDED], AppError> {
            let mut rng = StdRng::seed_from_u64(settings.seed.wrapping_add(path as u64));
            let perturbed: Vec<f64> = observed
                .iter()
                .map(|&gb| (gb + noise.sample(&mut rng)).max(0.0))
                .collect();

            let path_history = UsageHistory::from_parts(&dates, &perturbed)?;
            let result = fit(&path_history, overage, &settings.fit)?;

            let mut record = [0.0; N_RECORDED];
            record[..DAYS_PER_WEEK].copy_from_slice(&result.params.weights7());
            record[DAYS_PER_WEEK] = result.params.phi;
            record[DAYS_PER_WEEK + 1] = result.params.alpha;
            Ok(record)
        })
        .collect::<Result<Vec<_>, AppError>>()?;

    let column_std = |idx: usize| {
        let column: Vec<f64> = records.iter().map(|r| r[idx]).collect();
        sample_std(&column)
    };

    let mut weights = [0.0; DAYS_PER_WEEK];
    for (day, slot) in weights.iter_mut().enumerate() {
        *slot = column_std(day);
    }

    Ok(ParamsStd {
        weights,
        phi: column_std(DAYS_PER_WEEK),
        alpha: column_std(DAYS_PER_WEEK + 1),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FitSettings, WEIGHT_BUDGET};
    use chrono::NaiveDate;

    fn settings(paths: usize) -> UncertaintySettings {
        UncertaintySettings {
            paths,
            seed: 42,
            fit: FitSettings::default(),
        }
    }

    fn dates(n: usize) -> Vec<NaiveDate> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        (0..n)
            .map(|i| start + chrono::Duration::days(i as i64))
            .collect()
    }

    /// Flat-profile series (uniform weights) plus seeded Gaussian noise.
    ///
    /// With a uniform weight profile the noiseless series is constant, so the
    /// series' own standard deviation equals the injected noise scale and the
    /// estimator's perturbation shrinks with it.
    fn noisy_flat_history(n: usize, noise_std: f64, seed: u64) -> UsageHistory {
        let ds = dates(n);
        let w = WEIGHT_BUDGET / 7.0;
        let base = (w / 0.01f64).powf(1.0 / 0.38);
        let noise = Normal::new(0.0, noise_std).unwrap();
        let mut rng = StdRng::seed_from_u64(seed);
        let usages: Vec<f64> = (0..n).map(|_| (base + noise.sample(&mut rng)).max(0.0)).collect();
        UsageHistory::from_parts(&ds, &usages).unwrap()
    }

    #[test]
    fn zero_spread_series_yields_zero_uncertainty() {
        let history = noisy_flat_history(14, 0.0, 7);
        let std = estimate_uncertainty(&history, 0.0, &settings(8)).unwrap();

        // Every path sees the unperturbed series, so the spread collapses
        // (up to rounding in the column means).
        for w in std.weights {
            assert!(w < 1e-12);
        }
        assert!(std.phi < 1e-12);
        assert!(std.alpha < 1e-12);
    }

    #[test]
    fn uncertainty_shrinks_with_the_injected_noise() {
        let wide = estimate_uncertainty(&noisy_flat_history(14, 1.0, 7), 0.0, &settings(32)).unwrap();
        let narrow = estimate_uncertainty(&noisy_flat_history(14, 0.01, 7), 0.0, &settings(32)).unwrap();

        let total = |s: &ParamsStd| s.weights.iter().sum::<f64>() + s.phi + s.alpha;
        assert!(total(&narrow) < total(&wide));
        assert!(total(&narrow) > 0.0);
    }

    #[test]
    fn too_few_paths_is_invalid_input() {
        let history = noisy_flat_history(14, 0.5, 7);
        assert!(estimate_uncertainty(&history, 0.0, &settings(1)).is_err());
    }

    #[test]
    fn resampling_is_deterministic_for_a_fixed_seed() {
        let history = noisy_flat_history(14, 0.5, 7);
        let a = estimate_uncertainty(&history, 0.0, &settings(16)).unwrap();
        let b = estimate_uncertainty(&history, 0.0, &settings(16)).unwrap();
        assert_eq!(a.weights, b.weights);
        assert_eq!(a.phi, b.phi);
        assert_eq!(a.alpha, b.alpha);
    }
}
