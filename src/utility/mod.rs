//! Closed-form evaluation of a calibrated user against a plan's terms.
//!
//! Everything here is a pure function of `(BehaviorParams, PlanTerms)`:
//!
//! - `classify` — which consumption regime the plan puts the user in
//! - `utility` — monthly net utility of subscribing to the plan
//! - `optimal_usage` — the per-day consumption a rational user would choose
//! - `isp_profit` — the operator-side view over a user population
//!
//! `classify` is the single source of truth for the regime; `utility` and
//! `optimal_usage` classify once and dispatch to regime-taking internals, so
//! the classification logic cannot drift between call sites.

use crate::domain::{BehaviorParams, DAYS_PER_WEEK, PlanTerms, UserRegime};

/// Total weekly demand when every unit costs `price`:
/// `Σ_d (w_d / price)^(1/alpha)`.
fn unconstrained_demand(params: &BehaviorParams, price: f64) -> f64 {
    let inv = 1.0 / params.alpha;
    params.weights7().iter().map(|w| (w / price).powf(inv)).sum()
}

/// Sum of `w_d^(1/alpha)` over all seven daily weights.
///
/// Always positive: the weights are nonnegative and sum to the fixed budget,
/// so at least one is strictly positive.
fn weight_power_sum(params: &BehaviorParams) -> f64 {
    let inv = 1.0 / params.alpha;
    params.weights7().iter().map(|w| w.powf(inv)).sum()
}

/// Classify how the user's unconstrained demand relates to the plan's quota.
///
/// Demand at marginal price `phi` bounds demand at `phi + overage` from
/// above, so the three cases are mutually exclusive and exhaustive. An
/// unlimited quota always classifies Light.
pub fn classify(params: &BehaviorParams, plan: &PlanTerms) -> UserRegime {
    let light_demand = unconstrained_demand(params, params.phi);
    let heavy_demand = unconstrained_demand(params, params.phi + plan.overage);

    if plan.quota > light_demand {
        UserRegime::Light
    } else if plan.quota < heavy_demand {
        UserRegime::Heavy
    } else {
        UserRegime::Moderate
    }
}

/// Monthly net utility of the plan for this user.
pub fn utility(params: &BehaviorParams, plan: &PlanTerms) -> f64 {
    utility_for_regime(params, plan, classify(params, plan))
}

/// Monthly net utility under an already-computed regime.
///
/// Derived from gross daily utility `w·x^(1-alpha)/(1-alpha)` net of the
/// shadow cost `phi` per unit and whatever the plan bills:
///
/// - Light: consumes `(w/phi)^(1/alpha)` per day, pays the flat price only.
/// - Moderate: consumes exactly the quota, split optimally across days.
/// - Heavy: consumes `(w/(phi+overage))^(1/alpha)` per day; the overage
///   charge on the excess collapses to `+overage·quota` after netting the
///   marginal price against the whole consumption.
///
/// The three branches agree exactly at the regime boundaries
/// (`quota == light demand` and `quota == heavy demand`); the boundary tests
/// below pin that down.
pub fn utility_for_regime(params: &BehaviorParams, plan: &PlanTerms, regime: UserRegime) -> f64 {
    let alpha = params.alpha;
    let inv = 1.0 / alpha;
    let lever = alpha / (1.0 - alpha);

    match regime {
        UserRegime::Light => {
            let phi_term = params.phi.powf(1.0 - inv);
            lever * weight_power_sum(params) * phi_term - plan.price
        }
        UserRegime::Moderate => {
            let s = weight_power_sum(params);
            s.powf(alpha) * plan.quota.powf(1.0 - alpha) / (1.0 - alpha)
                - params.phi * plan.quota
                - plan.price
        }
        UserRegime::Heavy => {
            let price_term = (params.phi + plan.overage).powf(1.0 - inv);
            lever * weight_power_sum(params) * price_term + plan.overage * plan.quota - plan.price
        }
    }
}

/// Optimal per-day usage (Monday first) the user would choose under the plan.
pub fn optimal_usage(params: &BehaviorParams, plan: &PlanTerms) -> [f64; DAYS_PER_WEEK] {
    optimal_usage_for_regime(params, plan, classify(params, plan))
}

/// Optimal per-day usage under an already-computed regime.
///
/// In the Moderate regime the fixed quota is split proportionally to
/// `w_d^(1/alpha)`, so the allocations sum to the quota exactly.
pub fn optimal_usage_for_regime(
    params: &BehaviorParams,
    plan: &PlanTerms,
    regime: UserRegime,
) -> [f64; DAYS_PER_WEEK] {
    let inv = 1.0 / params.alpha;
    let weights = params.weights7();
    let mut usage = [0.0; DAYS_PER_WEEK];

    match regime {
        UserRegime::Light => {
            for (slot, w) in usage.iter_mut().zip(weights.iter()) {
                *slot = (w / params.phi).powf(inv);
            }
        }
        UserRegime::Heavy => {
            let price = params.phi + plan.overage;
            for (slot, w) in usage.iter_mut().zip(weights.iter()) {
                *slot = (w / price).powf(inv);
            }
        }
        UserRegime::Moderate => {
            let s = weight_power_sum(params);
            for (slot, w) in usage.iter_mut().zip(weights.iter()) {
                *slot = plan.quota * w.powf(inv) / s;
            }
        }
    }

    usage
}

/// Operator profit for a plan over a user population, at carrying cost
/// `sigma` per GB delivered.
pub fn isp_profit(plan: &PlanTerms, sigma: f64, users: &[BehaviorParams]) -> f64 {
    users
        .iter()
        .map(|user| match classify(user, plan) {
            UserRegime::Light => {
                let demand = unconstrained_demand(user, user.phi);
                plan.price - sigma * demand
            }
            UserRegime::Heavy => {
                let demand = unconstrained_demand(user, user.phi + plan.overage);
                plan.price + plan.overage * (demand - plan.quota) - sigma * demand
            }
            UserRegime::Moderate => plan.price - sigma * plan.quota,
        })
        .sum()
}
