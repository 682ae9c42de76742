//! The parametric daily-usage model.
//!
//! The calibration relies on two primitive operations:
//! - predict one day's usage given that day's weight and the `(phi, alpha)` pair
//! - fill one Jacobian row of the prediction with respect to the 8 free parameters
//!
//! Both are implemented here; the fitter only wires them to the optimizer.

pub mod behavior;

pub use behavior::*;
