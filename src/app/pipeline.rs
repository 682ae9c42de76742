//! Shared calibration pipeline used by the `fit`, `rank`, and `simulate`
//! commands.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! usage history -> parameter fit -> uncertainty estimate
//!
//! The commands then focus on presentation and on what they do with the
//! calibrated user (report, rank a catalog, or both).

use crate::domain::{FitResult, FitSettings, ParamsStd, UncertaintySettings, UsageHistory, UsageStats};
use crate::error::AppError;
use crate::fit::{estimate_uncertainty, fit};

/// All computed outputs of a single calibration.
#[derive(Debug, Clone)]
pub struct Calibration {
    pub stats: UsageStats,
    pub result: FitResult,
    pub std: ParamsStd,
}

/// Settings for one calibration run.
#[derive(Debug, Clone, Copy)]
pub struct CalibrationConfig {
    pub overage: f64,
    pub fit: FitSettings,
    pub paths: usize,
    pub seed: u64,
}

/// Fit the history and estimate parameter uncertainty.
pub fn calibrate(history: &UsageHistory, config: &CalibrationConfig) -> Result<Calibration, AppError> {
    let result = fit(history, config.overage, &config.fit)?;
    let std = estimate_uncertainty(
        history,
        config.overage,
        &UncertaintySettings {
            paths: config.paths,
            seed: config.seed,
            fit: config.fit,
        },
    )?;

    Ok(Calibration {
        stats: history.stats(),
        result,
        std,
    })
}
