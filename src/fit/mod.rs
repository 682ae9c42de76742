//! Calibration orchestration.
//!
//! Responsibilities:
//!
//! - wire the usage model and its Jacobian into the damped least-squares solver
//! - resample the observed series to quantify parameter uncertainty (parallel)

pub mod fitter;
pub mod uncertainty;

pub use fitter::*;
pub use uncertainty::*;
