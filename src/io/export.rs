//! Calibration JSON and ranked-plan CSV writers.
//!
//! The JSON file is the "portable" representation of a calibration
//! (parameters + uncertainty + convergence diagnostics); the CSV export is
//! meant to be easy to consume in spreadsheets or downstream scripts.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::domain::{BehaviorParams, CatalogPlan, FitResult, ParamsFile, ParamsStd, RankedPlan};
use crate::error::AppError;
use crate::utility::classify;

/// Write a calibration JSON file.
pub fn write_params_json(path: &Path, result: &FitResult, std: &ParamsStd) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create params JSON '{}': {e}", path.display())))?;

    let out = ParamsFile {
        tool: "dpa".to_string(),
        result: result.clone(),
        weights7: result.params.weights7(),
        std: *std,
    };

    serde_json::to_writer_pretty(file, &out)
        .map_err(|e| AppError::new(2, format!("Failed to write params JSON: {e}")))?;
    Ok(())
}

/// Read a calibration JSON file.
pub fn read_params_json(path: &Path) -> Result<ParamsFile, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open params JSON '{}': {e}", path.display())))?;
    let out: ParamsFile =
        serde_json::from_reader(file).map_err(|e| AppError::new(2, format!("Invalid params JSON: {e}")))?;
    Ok(out)
}

/// Write ranked plans to a CSV file, best plan first.
pub fn write_rankings_csv(
    path: &Path,
    ranked: &[RankedPlan],
    catalog: &[CatalogPlan],
    params: &BehaviorParams,
) -> Result<(), AppError> {
    let mut file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create rankings CSV '{}': {e}", path.display())))?;

    writeln!(
        file,
        "rank,name,quota_gb,overage_per_gb,price,regime,utility,utility_p5,utility_p95"
    )
    .map_err(|e| AppError::new(2, format!("Failed to write rankings CSV header: {e}")))?;

    for (rank, r) in ranked.iter().enumerate() {
        let name = catalog
            .get(r.index)
            .map(|p| p.name.as_str())
            .unwrap_or("");
        let quota = if r.plan.is_unlimited() {
            "unlimited".to_string()
        } else {
            format!("{}", r.plan.quota)
        };
        writeln!(
            file,
            "{},{},{},{},{},{},{:.6},{:.6},{:.6}",
            rank + 1,
            name,
            quota,
            r.plan.overage,
            r.plan.price,
            classify(params, &r.plan).display_name(),
            r.utility,
            r.utility_lo,
            r.utility_hi,
        )
        .map_err(|e| AppError::new(2, format!("Failed to write rankings CSV row: {e}")))?;
    }

    Ok(())
}
