//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during calibration and ranking
//! - exported to JSON/CSV
//! - reloaded later for comparisons
//!
//! All of them are value types: produced by pure functions, owned by the caller,
//! and never shared mutably between invocations.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Total weekly weight budget `C`: the seven daily weights always sum to this.
///
/// The calibration treats Monday..Saturday as free parameters and derives
/// Sunday as `C - sum(free)`. The value is a fixed model constant, not a
/// fitted quantity.
pub const WEIGHT_BUDGET: f64 = 0.25;

/// Number of independently fitted daily weights (Monday..Saturday).
pub const FREE_WEIGHTS: usize = 6;

/// Number of days in the weekly cycle.
pub const DAYS_PER_WEEK: usize = 7;

/// Day index (Monday-anchored) of the derived weight: Sunday.
pub const DERIVED_DAY: usize = 6;

/// Monday-anchored day index in `0..7` for a calendar date.
pub fn day_index(date: NaiveDate) -> usize {
    date.weekday().num_days_from_monday() as usize
}

/// The single source of truth for the derived Sunday weight.
///
/// Every place that needs all seven weights (the fitter, the utility
/// evaluator, the reports) goes through this derivation so the 6-vs-7
/// distinction cannot drift between components.
pub fn derived_weight(free: &[f64]) -> f64 {
    debug_assert_eq!(free.len(), FREE_WEIGHTS);
    WEIGHT_BUDGET - free.iter().sum::<f64>()
}

/// A single observed day of usage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UsageSample {
    pub date: NaiveDate,
    /// Observed usage for the day (GB, nonnegative).
    pub gb: f64,
}

/// An ordered, validated series of daily usage observations.
///
/// Construction is the input-validation boundary: an empty series, a
/// date/usage length mismatch, or a negative/non-finite usage is rejected
/// here, before any numeric work happens.
#[derive(Debug, Clone)]
pub struct UsageHistory {
    samples: Vec<UsageSample>,
}

impl UsageHistory {
    pub fn new(samples: Vec<UsageSample>) -> Result<Self, AppError> {
        if samples.is_empty() {
            return Err(AppError::new(2, "Usage history is empty."));
        }
        for (i, s) in samples.iter().enumerate() {
            if !s.gb.is_finite() || s.gb < 0.0 {
                return Err(AppError::new(
                    2,
                    format!("Usage sample {} ({}) has invalid usage {}.", i + 1, s.date, s.gb),
                ));
            }
        }
        Ok(Self { samples })
    }

    /// Build a history from parallel date/usage slices.
    pub fn from_parts(dates: &[NaiveDate], usages: &[f64]) -> Result<Self, AppError> {
        if dates.len() != usages.len() {
            return Err(AppError::new(
                2,
                format!(
                    "Dates and usages must have the same length (got {} and {}).",
                    dates.len(),
                    usages.len()
                ),
            ));
        }
        let samples = dates
            .iter()
            .zip(usages.iter())
            .map(|(&date, &gb)| UsageSample { date, gb })
            .collect();
        Self::new(samples)
    }

    pub fn samples(&self) -> &[UsageSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.samples.iter().map(|s| s.date).collect()
    }

    pub fn usages(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.gb).collect()
    }

    /// Monday-anchored day index per sample.
    pub fn day_indices(&self) -> Vec<usize> {
        self.samples.iter().map(|s| day_index(s.date)).collect()
    }

    pub fn stats(&self) -> UsageStats {
        let usages = self.usages();
        UsageStats {
            n: self.samples.len(),
            first_date: self.samples[0].date,
            last_date: self.samples[self.samples.len() - 1].date,
            mean_gb: crate::math::mean(&usages),
            std_gb: crate::math::sample_std(&usages),
        }
    }
}

/// Summary stats about the usage series actually used for calibration.
#[derive(Debug, Clone)]
pub struct UsageStats {
    pub n: usize,
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
    pub mean_gb: f64,
    pub std_gb: f64,
}

/// Calibrated behavioral parameters.
///
/// `weights` holds the six free daily weights (Monday..Saturday); the Sunday
/// weight is always derived via [`derived_weight`]. `phi` is the baseline
/// marginal-utility price (shadow price of data absent overage charges) and
/// `alpha` the elasticity exponent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BehaviorParams {
    pub weights: [f64; FREE_WEIGHTS],
    pub phi: f64,
    pub alpha: f64,
}

impl BehaviorParams {
    /// Sunday weight, derived from the free weights.
    pub fn derived_weight(&self) -> f64 {
        derived_weight(&self.weights)
    }

    /// All seven daily weights, Monday first.
    pub fn weights7(&self) -> [f64; DAYS_PER_WEEK] {
        let mut all = [0.0; DAYS_PER_WEEK];
        all[..FREE_WEIGHTS].copy_from_slice(&self.weights);
        all[DERIVED_DAY] = self.derived_weight();
        all
    }

    /// Reject parameter vectors outside the model's domain.
    pub fn validate(&self) -> Result<(), AppError> {
        if !(self.phi.is_finite() && self.phi > 0.0) {
            return Err(AppError::new(2, format!("phi must be positive (got {}).", self.phi)));
        }
        if !(self.alpha.is_finite() && self.alpha > 0.0 && self.alpha < 1.0) {
            return Err(AppError::new(
                2,
                format!("alpha must lie in (0, 1) (got {}).", self.alpha),
            ));
        }
        for (i, w) in self.weights7().iter().enumerate() {
            if !w.is_finite() || *w < 0.0 {
                return Err(AppError::new(
                    2,
                    format!("Daily weight {} must be nonnegative (got {w}).", i + 1),
                ));
            }
        }
        Ok(())
    }
}

/// Per-parameter standard deviations from the resampling estimator.
///
/// Same shape as [`BehaviorParams`] but with all seven weights materialized:
/// the derived Sunday weight gets its own spread across resampling paths.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParamsStd {
    pub weights: [f64; DAYS_PER_WEEK],
    pub phi: f64,
    pub alpha: f64,
}

impl ParamsStd {
    /// Standard deviations must be finite and nonnegative.
    pub fn validate(&self) -> Result<(), AppError> {
        let fields = self
            .weights
            .iter()
            .copied()
            .chain([self.phi, self.alpha]);
        for (i, v) in fields.enumerate() {
            if !v.is_finite() || v < 0.0 {
                return Err(AppError::new(
                    2,
                    format!("Parameter standard deviation {} is invalid ({v}).", i + 1),
                ));
            }
        }
        Ok(())
    }
}

/// Economic terms of a candidate data plan.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlanTerms {
    /// Monthly quota in GB; `f64::INFINITY` means unlimited.
    pub quota: f64,
    /// Price per GB beyond the quota.
    pub overage: f64,
    /// Flat monthly price.
    pub price: f64,
}

impl PlanTerms {
    pub fn is_unlimited(&self) -> bool {
        self.quota.is_infinite()
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.quota.is_nan() || self.quota < 0.0 {
            return Err(AppError::new(2, format!("Plan quota must be nonnegative (got {}).", self.quota)));
        }
        if !self.overage.is_finite() || self.overage < 0.0 {
            return Err(AppError::new(
                2,
                format!("Plan overage rate must be nonnegative (got {}).", self.overage),
            ));
        }
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(AppError::new(2, format!("Plan price must be nonnegative (got {}).", self.price)));
        }
        Ok(())
    }
}

/// A catalog entry: plan terms plus presentation metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogPlan {
    pub name: String,
    pub description: String,
    pub terms: PlanTerms,
}

/// How a user's unconstrained demand relates to a plan's quota.
///
/// Recomputed on every evaluation, never cached across plans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRegime {
    /// Unconstrained demand at price `phi` fits within the quota.
    Light,
    /// The user consumes exactly the quota.
    Moderate,
    /// Demand exceeds the quota even at marginal price `phi + overage`.
    Heavy,
}

impl UserRegime {
    pub fn display_name(self) -> &'static str {
        match self {
            UserRegime::Light => "light",
            UserRegime::Moderate => "moderate",
            UserRegime::Heavy => "heavy",
        }
    }
}

/// Calibration output.
///
/// `converged = false` is a reportable outcome, not an error: the optimizer
/// ran out of budget and the caller decides whether to retry or give up.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitResult {
    pub params: BehaviorParams,
    pub converged: bool,
    /// L2 norm of the residual vector at the returned point.
    pub residual_norm: f64,
    pub iterations: usize,
    pub evaluations: usize,
}

/// A candidate plan with its nominal utility and simulated confidence band.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedPlan {
    /// Position of this plan in the caller-supplied candidate list.
    pub index: usize,
    pub plan: PlanTerms,
    pub utility: f64,
    /// 5th percentile of the simulated utility distribution.
    pub utility_lo: f64,
    /// 95th percentile of the simulated utility distribution.
    pub utility_hi: f64,
}

/// A saved calibration file (JSON).
///
/// The portable representation of a fit: parameters, their uncertainty, and
/// the convergence diagnostics needed to judge whether to trust them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamsFile {
    pub tool: String,
    pub result: FitResult,
    /// All seven daily weights (Sunday materialized), Monday first.
    pub weights7: [f64; DAYS_PER_WEEK],
    pub std: ParamsStd,
}

/// Optimizer budgets and tolerances for a single calibration.
#[derive(Debug, Clone, Copy)]
pub struct FitSettings {
    pub max_iterations: usize,
    pub max_evaluations: usize,
    /// Stop when an accepted step reduces the cost by less than
    /// `cost_tol * (1 + cost)`.
    pub cost_tol: f64,
    /// Stop when a step (accepted, or shrunk to nothing by damping) moves
    /// the parameters by less than this.
    pub step_tol: f64,
    /// Stop when the gradient infinity-norm falls below this.
    pub grad_tol: f64,
    pub lambda_init: f64,
    pub lambda_scale: f64,
}

impl Default for FitSettings {
    fn default() -> Self {
        Self {
            max_iterations: 200,
            max_evaluations: 2000,
            cost_tol: 1e-12,
            step_tol: 1e-12,
            grad_tol: 1e-12,
            lambda_init: 1e-3,
            lambda_scale: 10.0,
        }
    }
}

/// Settings for the resampling uncertainty estimator.
#[derive(Debug, Clone, Copy)]
pub struct UncertaintySettings {
    /// Number of independent resampling paths.
    pub paths: usize,
    /// Base seed; path `p` uses `seed.wrapping_add(p)`.
    pub seed: u64,
    pub fit: FitSettings,
}

impl Default for UncertaintySettings {
    fn default() -> Self {
        Self {
            paths: 1000,
            seed: 42,
            fit: FitSettings::default(),
        }
    }
}

/// Settings for the Monte-Carlo plan ranker.
#[derive(Debug, Clone, Copy)]
pub struct RankSettings {
    /// Number of simulated parameter draws.
    pub paths: usize,
    /// Base seed; path `p` uses `seed.wrapping_add(p)`.
    pub seed: u64,
    /// Return only the first `k` plans by nominal utility.
    pub top_k: Option<usize>,
}

impl Default for RankSettings {
    fn default() -> Self {
        Self {
            paths: 1000,
            seed: 42,
            top_k: None,
        }
    }
}
