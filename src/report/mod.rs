//! Formatted terminal output.
//!
//! Formatting is kept in one place so:
//! - the math/calibration code stays clean and testable
//! - output changes are localized

use crate::domain::{BehaviorParams, CatalogPlan, FitResult, ParamsStd, PlanTerms, RankedPlan, UsageStats};
use crate::io::catalog::RowError;
use crate::utility::{classify, optimal_usage};

const DAY_NAMES: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

/// Format the calibration summary: dataset stats, convergence diagnostics,
/// and the fitted parameters with their estimated spread.
pub fn format_fit_summary(stats: &UsageStats, result: &FitResult, std: &ParamsStd) -> String {
    let mut out = String::new();

    out.push_str("=== dpa - usage calibration ===\n");
    out.push_str(&format!(
        "Samples: n={} | {} .. {}\n",
        stats.n, stats.first_date, stats.last_date
    ));
    out.push_str(&format!(
        "Usage: mean={:.3} GB/day | std={:.3}\n",
        stats.mean_gb, stats.std_gb
    ));
    out.push_str(&format!(
        "Fit: converged={} | residual norm={:.3e} | iterations={} | evaluations={}\n",
        result.converged, result.residual_norm, result.iterations, result.evaluations
    ));
    if !result.converged {
        out.push_str("Warning: optimizer budget exhausted; parameters may be unreliable.\n");
    }

    out.push_str("\nDaily weights:\n");
    let weights = result.params.weights7();
    for (day, (w, s)) in weights.iter().zip(std.weights.iter()).enumerate() {
        let derived = if day == crate::domain::DERIVED_DAY { " (derived)" } else { "" };
        out.push_str(&format!("  {} {:>9.6} ± {:.6}{derived}\n", DAY_NAMES[day], w, s));
    }
    out.push_str(&format!("\nphi:   {:>9.6} ± {:.6}\n", result.params.phi, std.phi));
    out.push_str(&format!("alpha: {:>9.6} ± {:.6}\n", result.params.alpha, std.alpha));

    out
}

/// Format the ranked-plan table, best plan first (marked with `*`).
pub fn format_plan_table(
    ranked: &[RankedPlan],
    catalog: &[CatalogPlan],
    params: &BehaviorParams,
) -> String {
    let mut out = String::new();

    out.push_str("=== dpa - plan ranking ===\n");
    out.push_str(&format!(
        "{:<4} {:<16} {:>10} {:>9} {:>8}  {:<8} {:>12} {:>25}\n",
        "rank", "name", "quota", "overage", "price", "regime", "utility", "[p5, p95]"
    ));

    for (rank, r) in ranked.iter().enumerate() {
        let name = catalog.get(r.index).map(|p| p.name.as_str()).unwrap_or("?");
        let marker = if rank == 0 { "*" } else { " " };
        out.push_str(&format!(
            "{marker}{:<3} {:<16} {:>10} {:>9.4} {:>8.2}  {:<8} {:>12.4} [{:>10.4}, {:>10.4}]\n",
            rank + 1,
            name,
            fmt_quota(&r.plan),
            r.plan.overage,
            r.plan.price,
            classify(params, &r.plan).display_name(),
            r.utility,
            r.utility_lo,
            r.utility_hi,
        ));
    }

    out
}

/// Format the optimal per-day usage profile under a plan.
pub fn format_usage_profile(params: &BehaviorParams, plan: &PlanTerms, name: &str) -> String {
    let mut out = String::new();
    let usage = optimal_usage(params, plan);
    let regime = classify(params, plan);

    out.push_str(&format!("\nOptimal daily usage under '{name}' ({}):\n", regime.display_name()));
    for (day, gb) in usage.iter().enumerate() {
        out.push_str(&format!("  {} {:>8.3} GB\n", DAY_NAMES[day], gb));
    }
    out.push_str(&format!("  total {:>8.3} GB/week\n", usage.iter().sum::<f64>()));

    out
}

/// One line per skipped catalog row (empty string if none).
pub fn format_catalog_warnings(row_errors: &[RowError]) -> String {
    let mut out = String::new();
    for e in row_errors {
        let name = e.name.as_deref().unwrap_or("?");
        out.push_str(&format!("  (skipped line {}: {name}) {}\n", e.line, e.message));
    }
    out
}

fn fmt_quota(plan: &PlanTerms) -> String {
    if plan.is_unlimited() {
        "unlimited".to_string()
    } else {
        format!("{:.1} GB", plan.quota)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn result() -> FitResult {
        FitResult {
            params: BehaviorParams {
                weights: [0.03, 0.035, 0.04, 0.03, 0.045, 0.05],
                phi: 0.008,
                alpha: 0.4,
            },
            converged: true,
            residual_norm: 2.1e-8,
            iterations: 9,
            evaluations: 24,
        }
    }

    fn stats() -> UsageStats {
        UsageStats {
            n: 30,
            first_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            last_date: NaiveDate::from_ymd_opt(2024, 1, 30).unwrap(),
            mean_gb: 12.5,
            std_gb: 3.1,
        }
    }

    #[test]
    fn fit_summary_mentions_every_weekday_and_the_derived_marker() {
        let std = ParamsStd { weights: [0.001; 7], phi: 0.0002, alpha: 0.01 };
        let text = format_fit_summary(&stats(), &result(), &std);

        for day in DAY_NAMES {
            assert!(text.contains(day), "missing {day} in summary");
        }
        assert!(text.contains("(derived)"));
        assert!(text.contains("converged=true"));
    }

    #[test]
    fn non_convergence_gets_a_warning_line() {
        let mut r = result();
        r.converged = false;
        let std = ParamsStd { weights: [0.0; 7], phi: 0.0, alpha: 0.0 };
        let text = format_fit_summary(&stats(), &r, &std);
        assert!(text.contains("Warning"));
    }

    #[test]
    fn plan_table_marks_the_top_plan() {
        let catalog = vec![CatalogPlan {
            name: "Max".to_string(),
            description: "unlimited".to_string(),
            terms: PlanTerms { quota: f64::INFINITY, overage: 0.0, price: 40.0 },
        }];
        let ranked = vec![RankedPlan {
            index: 0,
            plan: catalog[0].terms,
            utility: -12.3,
            utility_lo: -14.0,
            utility_hi: -11.0,
        }];
        let text = format_plan_table(&ranked, &catalog, &result().params);

        assert!(text.contains("*1"));
        assert!(text.contains("Max"));
        assert!(text.contains("unlimited"));
        assert!(text.contains("light"));
    }

    #[test]
    fn usage_profile_totals_the_week() {
        let plan = PlanTerms { quota: f64::INFINITY, overage: 0.0, price: 0.0 };
        let text = format_usage_profile(&result().params, &plan, "Max");
        assert!(text.contains("GB/week"));
        assert!(text.contains("Sun"));
    }
}
