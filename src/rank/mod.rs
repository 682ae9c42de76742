//! Monte-Carlo plan ranking with percentile confidence bands.
//!
//! For each candidate plan we compute the nominal utility at the point
//! estimate, then simulate N parameter draws (each parameter perturbed by an
//! independent Gaussian scaled to its estimated standard deviation) and take
//! the 5th/95th percentiles of the simulated utilities as the band.
//!
//! Ordering is a stable sort on nominal utility, descending: plans with equal
//! utilities keep their catalog order and none is ever dropped. Paths use
//! per-path seeded generators and run on the rayon pool.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};
use rayon::prelude::*;

use crate::domain::{
    BehaviorParams, FREE_WEIGHTS, ParamsStd, PlanTerms, RankSettings, RankedPlan, WEIGHT_BUDGET,
};
use crate::error::AppError;
use crate::math::percentile_floor;
use crate::utility::utility;

/// Lower clamp for a perturbed phi draw.
const PHI_FLOOR: f64 = 1e-9;

/// Perturbed alpha draws are clamped into `[MARGIN, 1 - MARGIN]`.
const ALPHA_MARGIN: f64 = 1e-3;

/// Per-path Gaussian perturbations: six free weights, phi, alpha.
///
/// The Sunday weight is never drawn independently; it stays derived from the
/// weekly budget so a perturbed parameter set is still a valid one.
struct Perturbation {
    weights: [Normal<f64>; FREE_WEIGHTS],
    phi: Normal<f64>,
    alpha: Normal<f64>,
}

impl Perturbation {
    fn new(std: &ParamsStd) -> Result<Self, AppError> {
        let make = |s: f64| {
            Normal::new(0.0, s)
                .map_err(|e| AppError::new(2, format!("Invalid perturbation std {s}: {e}")))
        };
        let mut weights = [make(0.0)?; FREE_WEIGHTS];
        for (k, slot) in weights.iter_mut().enumerate() {
            *slot = make(std.weights[k])?;
        }
        Ok(Self {
            weights,
            phi: make(std.phi)?,
            alpha: make(std.alpha)?,
        })
    }

    /// Draw a parameter set, clamped back into the model domain.
    fn draw(&self, params: &BehaviorParams, rng: &mut StdRng) -> BehaviorParams {
        let mut weights = [0.0; FREE_WEIGHTS];
        for (k, slot) in weights.iter_mut().enumerate() {
            *slot = (params.weights[k] + self.weights[k].sample(rng)).max(0.0);
        }
        // If the free weights ate the whole budget, rescale so the derived
        // Sunday weight stays nonnegative.
        let sum: f64 = weights.iter().sum();
        if sum > WEIGHT_BUDGET {
            for w in &mut weights {
                *w *= WEIGHT_BUDGET / sum;
            }
        }

        let phi = (params.phi + self.phi.sample(rng)).max(PHI_FLOOR);
        let alpha = (params.alpha + self.alpha.sample(rng)).clamp(ALPHA_MARGIN, 1.0 - ALPHA_MARGIN);

        BehaviorParams { weights, phi, alpha }
    }
}

/// Rank candidate plans by nominal utility with simulated confidence bands.
pub fn rank_plans(
    params: &BehaviorParams,
    std: &ParamsStd,
    plans: &[PlanTerms],
    settings: &RankSettings,
) -> Result<Vec<RankedPlan>, AppError> {
    params.validate()?;
    std.validate()?;
    for plan in plans {
        plan.validate()?;
    }
    if settings.paths == 0 {
        return Err(AppError::new(2, "At least one simulation path is required."));
    }
    if plans.is_empty() {
        return Ok(Vec::new());
    }

    let nominal: Vec<f64> = plans.iter().map(|plan| utility(params, plan)).collect();

    let perturbation = Perturbation::new(std)?;
    let simulated: Vec<Vec<f64>> = (0..settings.paths)
        .into_par_iter()
        .map(|path| {
            let mut rng = StdRng::seed_from_u64(settings.seed.wrapping_add(path as u64));
            let drawn = perturbation.draw(params, &mut rng);
            plans.iter().map(|plan| utility(&drawn, plan)).collect()
        })
        .collect();

    let mut ranked: Vec<RankedPlan> = plans
        .iter()
        .enumerate()
        .map(|(index, plan)| {
            let mut path_utils: Vec<f64> = simulated.iter().map(|row| row[index]).collect();
            path_utils.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            RankedPlan {
                index,
                plan: *plan,
                utility: nominal[index],
                utility_lo: percentile_floor(&path_utils, 0.05),
                utility_hi: percentile_floor(&path_utils, 0.95),
            }
        })
        .collect();

    // Stable sort: equal nominal utilities keep their catalog order.
    ranked.sort_by(|a, b| b.utility.partial_cmp(&a.utility).unwrap_or(std::cmp::Ordering::Equal));

    if let Some(k) = settings.top_k {
        ranked.truncate(k);
    }
    Ok(ranked)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> BehaviorParams {
        BehaviorParams {
            weights: [0.03, 0.035, 0.04, 0.03, 0.045, 0.05],
            phi: 0.008,
            alpha: 0.4,
        }
    }

    fn zero_std() -> ParamsStd {
        ParamsStd {
            weights: [0.0; 7],
            phi: 0.0,
            alpha: 0.0,
        }
    }

    fn some_std() -> ParamsStd {
        ParamsStd {
            weights: [0.002; 7],
            phi: 0.0005,
            alpha: 0.01,
        }
    }

    fn settings(paths: usize) -> RankSettings {
        RankSettings {
            paths,
            seed: 42,
            top_k: None,
        }
    }

    fn plan(quota: f64, overage: f64, price: f64) -> PlanTerms {
        PlanTerms { quota, overage, price }
    }

    #[test]
    fn plans_sort_by_nominal_utility_descending() {
        // Same terms except price: cheaper is strictly better.
        let plans = vec![
            plan(f64::INFINITY, 0.0, 30.0),
            plan(f64::INFINITY, 0.0, 10.0),
            plan(f64::INFINITY, 0.0, 20.0),
        ];
        let ranked = rank_plans(&params(), &zero_std(), &plans, &settings(16)).unwrap();

        let order: Vec<usize> = ranked.iter().map(|r| r.index).collect();
        assert_eq!(order, vec![1, 2, 0]);
        assert!(ranked[0].utility > ranked[1].utility);
        assert!(ranked[1].utility > ranked[2].utility);
    }

    #[test]
    fn equal_utilities_keep_catalog_order_and_none_is_dropped() {
        let same = plan(100.0, 0.005, 25.0);
        let plans = vec![same, plan(f64::INFINITY, 0.0, 0.0), same];
        let ranked = rank_plans(&params(), &zero_std(), &plans, &settings(16)).unwrap();

        assert_eq!(ranked.len(), 3);
        // The free unlimited plan wins; the two identical plans tie and keep
        // their input order.
        assert_eq!(ranked[0].index, 1);
        assert_eq!(ranked[1].index, 0);
        assert_eq!(ranked[2].index, 2);
        assert_eq!(ranked[1].utility, ranked[2].utility);
    }

    #[test]
    fn zero_uncertainty_collapses_the_band_onto_the_nominal_value() {
        let plans = vec![plan(100.0, 0.005, 25.0), plan(f64::INFINITY, 0.0, 40.0)];
        let ranked = rank_plans(&params(), &zero_std(), &plans, &settings(32)).unwrap();

        for r in &ranked {
            assert!((r.utility_lo - r.utility).abs() < 1e-12);
            assert!((r.utility_hi - r.utility).abs() < 1e-12);
        }
    }

    #[test]
    fn bands_bracket_the_nominal_value_and_widen_with_uncertainty() {
        let plans = vec![plan(120.0, 0.005, 25.0)];
        let narrow = rank_plans(&params(), &some_std(), &plans, &settings(64)).unwrap();

        let mut wider_std = some_std();
        wider_std.alpha *= 4.0;
        for w in &mut wider_std.weights {
            *w *= 4.0;
        }
        let wide = rank_plans(&params(), &wider_std, &plans, &settings(64)).unwrap();

        assert!(narrow[0].utility_lo <= narrow[0].utility_hi);
        let narrow_width = narrow[0].utility_hi - narrow[0].utility_lo;
        let wide_width = wide[0].utility_hi - wide[0].utility_lo;
        assert!(wide_width > narrow_width);
    }

    #[test]
    fn top_k_truncates_after_the_stable_sort() {
        let plans = vec![
            plan(f64::INFINITY, 0.0, 30.0),
            plan(f64::INFINITY, 0.0, 10.0),
            plan(f64::INFINITY, 0.0, 20.0),
        ];
        let mut s = settings(16);
        s.top_k = Some(2);
        let ranked = rank_plans(&params(), &zero_std(), &plans, &s).unwrap();

        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].index, 1);
        assert_eq!(ranked[1].index, 2);
    }

    #[test]
    fn invalid_inputs_are_rejected() {
        let plans = vec![plan(100.0, 0.005, 25.0)];

        assert!(rank_plans(&params(), &zero_std(), &plans, &settings(0)).is_err());

        let mut bad_std = zero_std();
        bad_std.phi = -1.0;
        assert!(rank_plans(&params(), &bad_std, &plans, &settings(8)).is_err());

        let bad_plan = vec![plan(-5.0, 0.0, 10.0)];
        assert!(rank_plans(&params(), &zero_std(), &bad_plan, &settings(8)).is_err());

        let empty: Vec<PlanTerms> = Vec::new();
        assert!(rank_plans(&params(), &zero_std(), &empty, &settings(8)).unwrap().is_empty());
    }
}
