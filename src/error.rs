//! Process-level error type.
//!
//! Exit-code conventions used across the crate:
//!
//! - `2` — invalid input (bad CLI value, malformed CSV, empty/mismatched history)
//! - `3` — insufficient data (a calibration that cannot be used downstream)
//! - `4` — numeric domain error (nonpositive base under a fractional exponent,
//!   non-finite intermediate)
//!
//! A fit that merely exhausts its iteration budget is *not* an error; it is
//! reported as `converged = false` in [`crate::domain::FitResult`] and the
//! caller decides what to do with it.

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
