//! Error types for tracking-control operations.

use pv_core::PvError;
use thiserror::Error;

/// Result type for tracking-control operations.
pub type ControlResult<T> = Result<T, ControlError>;

/// Errors that can occur in tracking-control operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ControlError {
    /// Invalid argument provided at construction time.
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    /// A measurement was NaN or infinite and was rejected before it could
    /// corrupt the tracking state.
    #[error("Non-finite measurement for {what}: {value}")]
    NonFiniteMeasurement { what: &'static str, value: f64 },
}

impl From<PvError> for ControlError {
    fn from(e: PvError) -> Self {
        match e {
            PvError::NonFinite { what, value } => {
                ControlError::NonFiniteMeasurement { what, value }
            }
            PvError::InvalidArg { what } => ControlError::InvalidArg { what },
        }
    }
}
