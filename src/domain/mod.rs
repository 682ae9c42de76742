//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - observed usage inputs (`UsageSample`, `UsageHistory`)
//! - behavioral parameters and their uncertainty (`BehaviorParams`, `ParamsStd`)
//! - plan terms and catalog entries (`PlanTerms`, `CatalogPlan`)
//! - calibration and ranking outputs (`FitResult`, `RankedPlan`)
//! - run settings (`FitSettings`, `UncertaintySettings`, `RankSettings`)

pub mod types;

pub use types::*;
