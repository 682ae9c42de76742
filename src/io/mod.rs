//! File ingest and export.
//!
//! - `usage`: usage-history CSV ingest (strict: row order matters)
//! - `catalog`: plan-catalog CSV ingest (row-level validation, bad rows skipped)
//! - `export`: calibrated-parameter JSON and ranked-plan CSV writers

pub mod catalog;
pub mod export;
pub mod usage;

pub use catalog::*;
pub use export::*;
pub use usage::*;
