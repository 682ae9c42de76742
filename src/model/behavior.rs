//! Usage prediction and its analytic derivatives.
//!
//! A day with weight `w` under effective unit price `p` yields predicted usage
//!
//! ```text
//! u = (w / p)^(1/alpha)
//! ```
//!
//! where `p = phi` while the subscriber stays inside the quota and
//! `p = phi + overage` once every marginal unit is billed at the overage rate.
//! Which branch applies during calibration is fixed for the whole series
//! before optimization starts, from the caller-supplied overage rate; the fit
//! does not re-classify per iteration.

use crate::domain::{DERIVED_DAY, FREE_WEIGHTS, derived_weight};

/// Free parameter vector layout: `[w1..w6, phi, alpha]`.
pub const N_PARAMS: usize = FREE_WEIGHTS + 2;
pub const PHI_IDX: usize = 6;
pub const ALPHA_IDX: usize = 7;

/// Which price branch the whole calibration runs under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitRegime {
    /// Marginal price is `phi` (no overage billing assumed).
    SubQuota,
    /// Marginal price is `phi + overage`.
    OverQuota,
}

impl FitRegime {
    /// Decided once from the caller-supplied overage indicator.
    pub fn from_overage(overage: f64) -> Self {
        if overage > 0.0 {
            FitRegime::OverQuota
        } else {
            FitRegime::SubQuota
        }
    }

    /// Effective unit price seen by the subscriber under this regime.
    pub fn effective_price(self, phi: f64, overage: f64) -> f64 {
        match self {
            FitRegime::SubQuota => phi,
            FitRegime::OverQuota => phi + overage,
        }
    }
}

/// Weight for a Monday-anchored day index, deriving Sunday from the budget.
pub fn weight_for_day(free: &[f64], day: usize) -> f64 {
    if day == DERIVED_DAY {
        derived_weight(free)
    } else {
        free[day]
    }
}

/// Predicted usage for one day.
///
/// Returns `None` when the point is outside the model domain (`w <= 0`,
/// `p <= 0`, or `alpha` outside `(0, 1)`): a nonpositive base under a
/// fractional exponent must never silently become NaN.
pub fn predict(w: f64, price: f64, alpha: f64) -> Option<f64> {
    if !(w > 0.0 && price > 0.0 && alpha > 0.0 && alpha < 1.0) {
        return None;
    }
    let u = (w / price).powf(1.0 / alpha);
    u.is_finite().then_some(u)
}

/// Fill one Jacobian row `∂u/∂[w1..w6, phi, alpha]` for a sample on `day`.
///
/// `w` and `price` must come from the same point the residual was evaluated
/// at (the optimizer only calls this where [`predict`] succeeded).
///
/// For the derived Sunday weight the chain rule through
/// `w7 = C - Σ w_k` distributes the weight derivative with a negative sign
/// across all six free weights. The `phi` column uses the effective price
/// directly: under the over-quota branch `p = phi + overage`, so
/// `∂u/∂phi = ∂u/∂p`.
pub fn fill_jacobian_row(day: usize, w: f64, price: f64, alpha: f64, out: &mut [f64; N_PARAMS]) {
    out.fill(0.0);

    let u = (w / price).powf(1.0 / alpha);
    let dw = (w / price).powf(1.0 / alpha - 1.0) / (alpha * price);

    if day == DERIVED_DAY {
        for k in 0..FREE_WEIGHTS {
            out[k] -= dw;
        }
    } else {
        out[day] += dw;
    }

    out[PHI_IDX] = -(w / price).powf(1.0 / alpha - 1.0) * w / (alpha * price * price);
    out[ALPHA_IDX] = -u / (alpha * alpha) * (w / price).ln();
}
