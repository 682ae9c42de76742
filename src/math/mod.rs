//! Numerical utilities: the damped least-squares optimizer and small statistics.

pub mod lm;
pub mod stats;

pub use lm::*;
pub use stats::*;
