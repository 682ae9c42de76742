//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - loads (or generates) the usage history
//! - runs calibration + uncertainty estimation
//! - ranks the plan catalog when asked
//! - prints reports and writes optional exports

use clap::Parser;

use crate::cli::{Command, FitArgs, RankArgs, SimulateArgs};
use crate::data::{SyntheticSpec, generate_history};
use crate::domain::{BehaviorParams, FitSettings, PlanTerms, RankSettings};
use crate::error::AppError;
use crate::io::catalog::CatalogData;
use crate::rank::rank_plans;
use crate::utility::isp_profit;

pub mod pipeline;

use pipeline::{Calibration, CalibrationConfig};

/// Entry point for the `dpa` binary.
pub fn run() -> Result<(), AppError> {
    let cli = crate::cli::Cli::parse();

    match cli.command {
        Command::Fit(args) => handle_fit(args),
        Command::Rank(args) => handle_rank(args),
        Command::Simulate(args) => handle_simulate(args),
    }
}

fn handle_fit(args: FitArgs) -> Result<(), AppError> {
    let history = crate::io::load_usage_csv(&args.usage)?;
    let calibration = pipeline::calibrate(&history, &calibration_config(&args))?;

    println!(
        "{}",
        crate::report::format_fit_summary(&calibration.stats, &calibration.result, &calibration.std)
    );

    if let Some(path) = &args.export_params {
        crate::io::write_params_json(path, &calibration.result, &calibration.std)?;
    }

    Ok(())
}

fn handle_rank(args: RankArgs) -> Result<(), AppError> {
    let history = crate::io::load_usage_csv(&args.fit.usage)?;
    let calibration = pipeline::calibrate(&history, &calibration_config(&args.fit))?;

    println!(
        "{}",
        crate::report::format_fit_summary(&calibration.stats, &calibration.result, &calibration.std)
    );

    if let Some(path) = &args.fit.export_params {
        crate::io::write_params_json(path, &calibration.result, &calibration.std)?;
    }

    let catalog = crate::io::load_catalog_csv(&args.catalog)?;
    rank_and_report(
        &calibration,
        &catalog,
        args.fit.paths,
        args.fit.seed,
        args.top,
        args.profit_sigma,
        args.export.as_deref(),
    )
}

fn handle_simulate(args: SimulateArgs) -> Result<(), AppError> {
    // A deliberately uneven weekly profile: quiet midweek, heavy weekend.
    let params = BehaviorParams {
        weights: [0.030, 0.034, 0.040, 0.028, 0.046, 0.050],
        phi: 0.009,
        alpha: 0.42,
    };
    let spec = SyntheticSpec {
        params,
        overage: args.overage,
        start: args.start,
        days: args.days,
        noise_std: args.noise,
        seed: args.seed,
    };
    let history = generate_history(&spec)?;

    println!(
        "Generated {} synthetic days from {} (noise std {}, seed {}).\n",
        args.days, args.start, args.noise, args.seed
    );

    let config = CalibrationConfig {
        overage: args.overage,
        fit: FitSettings::default(),
        paths: args.paths,
        seed: args.seed,
    };
    let calibration = pipeline::calibrate(&history, &config)?;

    println!(
        "{}",
        crate::report::format_fit_summary(&calibration.stats, &calibration.result, &calibration.std)
    );

    if let Some(path) = &args.catalog {
        let catalog = crate::io::load_catalog_csv(path)?;
        rank_and_report(&calibration, &catalog, args.paths, args.seed, 0, None, None)?;
    }

    Ok(())
}

fn rank_and_report(
    calibration: &Calibration,
    catalog: &CatalogData,
    paths: usize,
    seed: u64,
    top: usize,
    profit_sigma: Option<f64>,
    export: Option<&std::path::Path>,
) -> Result<(), AppError> {
    if !calibration.result.converged {
        return Err(AppError::new(
            3,
            "Could not calibrate from the provided usage history; refusing to rank plans on unreliable parameters.",
        ));
    }
    if catalog.plans.is_empty() {
        return Err(AppError::new(3, "No usable plans in the catalog."));
    }
    if !catalog.row_errors.is_empty() {
        eprint!("{}", crate::report::format_catalog_warnings(&catalog.row_errors));
    }

    let params = calibration.result.params;
    let terms: Vec<PlanTerms> = catalog.plans.iter().map(|p| p.terms).collect();
    let settings = RankSettings {
        paths,
        seed,
        top_k: (top > 0).then_some(top),
    };
    let ranked = rank_plans(&params, &calibration.std, &terms, &settings)?;

    println!("{}", crate::report::format_plan_table(&ranked, &catalog.plans, &params));

    if let Some(best) = ranked.first() {
        let name = catalog
            .plans
            .get(best.index)
            .map(|p| p.name.as_str())
            .unwrap_or("?");
        println!("{}", crate::report::format_usage_profile(&params, &best.plan, name));
    }

    if let Some(sigma) = profit_sigma {
        if !(sigma.is_finite() && sigma >= 0.0) {
            return Err(AppError::new(2, format!("Carrying cost must be nonnegative (got {sigma}).")));
        }
        println!("Operator profit at sigma={sigma}/GB:");
        for plan in &catalog.plans {
            let profit = isp_profit(&plan.terms, sigma, &[params]);
            println!("  {:<16} {:>10.4}", plan.name, profit);
        }
    }

    if let Some(path) = export {
        crate::io::write_rankings_csv(path, &ranked, &catalog.plans, &params)?;
    }

    Ok(())
}

fn calibration_config(args: &FitArgs) -> CalibrationConfig {
    CalibrationConfig {
        overage: args.overage,
        fit: FitSettings {
            max_iterations: args.max_iterations,
            max_evaluations: args.max_evaluations,
            ..FitSettings::default()
        },
        paths: args.paths,
        seed: args.seed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn simulated_pipeline_calibrates_and_ranks_end_to_end() {
        let spec = SyntheticSpec {
            params: BehaviorParams {
                weights: [0.030, 0.034, 0.040, 0.028, 0.046, 0.050],
                phi: 0.009,
                alpha: 0.42,
            },
            overage: 0.0,
            start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            days: 28,
            noise_std: 0.2,
            seed: 7,
        };
        let history = generate_history(&spec).unwrap();

        let config = CalibrationConfig {
            overage: 0.0,
            fit: FitSettings::default(),
            paths: 16,
            seed: 7,
        };
        let calibration = pipeline::calibrate(&history, &config).unwrap();
        assert!(calibration.result.converged);

        let terms = vec![
            PlanTerms { quota: f64::INFINITY, overage: 0.0, price: 60.0 },
            PlanTerms { quota: 150.0, overage: 0.01, price: 25.0 },
            PlanTerms { quota: 40.0, overage: 0.02, price: 10.0 },
        ];
        let ranked = rank_plans(
            &calibration.result.params,
            &calibration.std,
            &terms,
            &RankSettings { paths: 32, seed: 7, top_k: None },
        )
        .unwrap();

        assert_eq!(ranked.len(), 3);
        for pair in ranked.windows(2) {
            assert!(pair[0].utility >= pair[1].utility);
        }
        for r in &ranked {
            assert!(r.utility_lo <= r.utility_hi);
        }
    }
}
