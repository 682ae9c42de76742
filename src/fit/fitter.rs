//! Behavioral parameter calibration.
//!
//! Given an observed usage history we solve, over the 8 free parameters
//! `[w1..w6, phi, alpha]`:
//!
//! ```text
//! minimize Σ_i (u(day_i; θ) - observed_i)²
//! ```
//!
//! with Levenberg–Marquardt and the model's analytic Jacobian. The Sunday
//! weight is never a free variable; it is derived from the weekly budget at
//! every evaluation, and its derivative distributes (negatively) across the
//! six free weights.

use nalgebra::{DMatrix, DVector};

use crate::domain::{
    BehaviorParams, DAYS_PER_WEEK, FREE_WEIGHTS, FitResult, FitSettings, UsageHistory, WEIGHT_BUDGET,
};
use crate::error::AppError;
use crate::math::{LmOptions, levenberg_marquardt};
use crate::model::{ALPHA_IDX, FitRegime, N_PARAMS, PHI_IDX, fill_jacobian_row, predict, weight_for_day};

/// Initial guess for the baseline marginal-utility price.
pub const PHI_INIT: f64 = 0.01;

/// Initial guess for the elasticity exponent.
///
/// Must sit strictly inside `(0, 1)`; at `alpha = 1` the weight gradient
/// degenerates and the optimizer cannot leave the starting point.
pub const ALPHA_INIT: f64 = 0.38;

/// Calibrate behavioral parameters from a usage history.
///
/// `overage` selects the price branch for the whole series before
/// optimization begins (`> 0` means every marginal unit is assumed billed at
/// `phi + overage`). A fit that exhausts its budgets comes back with
/// `converged = false`; the caller decides whether to retry or report
/// "could not calibrate".
pub fn fit(history: &UsageHistory, overage: f64, settings: &FitSettings) -> Result<FitResult, AppError> {
    if !(overage.is_finite() && overage >= 0.0) {
        return Err(AppError::new(
            2,
            format!("Overage rate must be nonnegative (got {overage})."),
        ));
    }

    let days = history.day_indices();
    let observed = history.usages();
    let regime = FitRegime::from_overage(overage);

    let residuals = |p: &[f64]| -> Option<DVector<f64>> {
        let price = regime.effective_price(p[PHI_IDX], overage);
        let alpha = p[ALPHA_IDX];
        let mut out = DVector::zeros(observed.len());
        for (i, (&day, &obs)) in days.iter().zip(observed.iter()).enumerate() {
            let w = weight_for_day(&p[..FREE_WEIGHTS], day);
            out[i] = predict(w, price, alpha)? - obs;
        }
        Some(out)
    };

    let jacobian = |p: &[f64]| -> DMatrix<f64> {
        let price = regime.effective_price(p[PHI_IDX], overage);
        let alpha = p[ALPHA_IDX];
        let mut j = DMatrix::zeros(days.len(), N_PARAMS);
        let mut row = [0.0; N_PARAMS];
        for (i, &day) in days.iter().enumerate() {
            let w = weight_for_day(&p[..FREE_WEIGHTS], day);
            fill_jacobian_row(day, w, price, alpha, &mut row);
            for (k, v) in row.iter().enumerate() {
                j[(i, k)] = *v;
            }
        }
        j
    };

    let mut initial = [WEIGHT_BUDGET / DAYS_PER_WEEK as f64; N_PARAMS];
    initial[PHI_IDX] = PHI_INIT;
    initial[ALPHA_IDX] = ALPHA_INIT;

    let outcome = levenberg_marquardt(&initial, residuals, jacobian, &lm_options(settings)).ok_or_else(|| {
        AppError::new(
            4,
            "Calibration started outside the model domain (nonpositive weight or price under a fractional exponent).",
        )
    })?;

    let mut weights = [0.0; FREE_WEIGHTS];
    weights.copy_from_slice(&outcome.params[..FREE_WEIGHTS]);

    Ok(FitResult {
        params: BehaviorParams {
            weights,
            phi: outcome.params[PHI_IDX],
            alpha: outcome.params[ALPHA_IDX],
        },
        converged: outcome.converged,
        residual_norm: outcome.sse.sqrt(),
        iterations: outcome.iterations,
        evaluations: outcome.evaluations,
    })
}

fn lm_options(settings: &FitSettings) -> LmOptions {
    LmOptions {
        max_iterations: settings.max_iterations,
        max_evaluations: settings.max_evaluations,
        cost_tol: settings.cost_tol,
        step_tol: settings.step_tol,
        grad_tol: settings.grad_tol,
        lambda_init: settings.lambda_init,
        lambda_scale: settings.lambda_scale,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const TRUE_WEIGHTS: [f64; FREE_WEIGHTS] = [0.030, 0.034, 0.040, 0.028, 0.046, 0.050];

    /// Dates starting Monday 2024-01-01, so day indices cycle 0..=6.
    fn dates(n: usize) -> Vec<NaiveDate> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        (0..n)
            .map(|i| start + chrono::Duration::days(i as i64))
            .collect()
    }

    /// Series generated from the model at effective unit price `price`.
    fn noiseless_history(weights: &[f64; FREE_WEIGHTS], alpha: f64, price: f64, n: usize) -> UsageHistory {
        let ds = dates(n);
        let usages: Vec<f64> = ds
            .iter()
            .map(|d| {
                let day = crate::domain::day_index(*d);
                let w = weight_for_day(weights, day);
                (w / price).powf(1.0 / alpha)
            })
            .collect();
        UsageHistory::from_parts(&ds, &usages).unwrap()
    }

    #[test]
    fn noiseless_fit_reproduces_the_observed_series() {
        let (phi, alpha) = (0.009, 0.42);
        let history = noiseless_history(&TRUE_WEIGHTS, alpha, phi, 28);
        let result = fit(&history, 0.0, &FitSettings::default()).unwrap();

        assert!(result.converged);
        assert!(result.residual_norm < 1e-6, "residual norm {}", result.residual_norm);

        // Weekday aggregation leaves one flat direction in parameter space,
        // so we check the identified quantities: the per-day predictions and
        // the weight/price/usage consistency identity.
        let fitted = result.params;
        let w7 = fitted.weights7();
        for (sample, day) in history.samples().iter().zip(history.day_indices()) {
            let u = (w7[day] / fitted.phi).powf(1.0 / fitted.alpha);
            assert!((u - sample.gb).abs() < 1e-6, "day {day}: {u} vs {}", sample.gb);
            assert!((w7[day] - fitted.phi * sample.gb.powf(fitted.alpha)).abs() < 1e-8);
        }
        let total: f64 = w7.iter().sum();
        assert!((total - WEIGHT_BUDGET).abs() < 1e-12);
    }

    #[test]
    fn noiseless_fit_recovers_parameters_when_truth_sits_at_the_initial_guess() {
        // With phi/alpha generated at the initial-guess values, the flat
        // direction passes through the truth and the raw vector is recovered.
        let history = noiseless_history(&TRUE_WEIGHTS, ALPHA_INIT, PHI_INIT, 28);
        let result = fit(&history, 0.0, &FitSettings::default()).unwrap();

        assert!(result.converged);
        for (fitted, truth) in result.params.weights.iter().zip(TRUE_WEIGHTS.iter()) {
            assert!((fitted - truth).abs() < 1e-3, "{fitted} vs {truth}");
        }
        assert!((result.params.phi - PHI_INIT).abs() < 1e-3);
        assert!((result.params.alpha - ALPHA_INIT).abs() < 1e-2);
    }

    #[test]
    fn over_quota_series_fits_under_the_overage_branch() {
        let (phi, alpha, overage) = (0.009, 0.42, 0.005);
        let history = noiseless_history(&TRUE_WEIGHTS, alpha, phi + overage, 28);
        let result = fit(&history, overage, &FitSettings::default()).unwrap();

        assert!(result.converged);
        assert!(result.residual_norm < 1e-6);
    }

    #[test]
    fn negative_overage_is_invalid_input() {
        let history = noiseless_history(&TRUE_WEIGHTS, 0.42, 0.009, 7);
        assert!(fit(&history, -0.01, &FitSettings::default()).is_err());
    }

    #[test]
    fn exhausted_iteration_budget_reports_non_convergence() {
        let history = noiseless_history(&TRUE_WEIGHTS, 0.42, 0.009, 28);
        let settings = FitSettings {
            max_iterations: 1,
            ..FitSettings::default()
        };
        let result = fit(&history, 0.0, &settings).unwrap();
        assert!(!result.converged);
    }
}
