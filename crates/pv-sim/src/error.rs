//! Error types for simulation operations.

use thiserror::Error;

/// Errors encountered while driving a tracking simulation.
#[derive(Error, Debug)]
pub enum SimError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Controller error: {message}")]
    Control { message: String },
}

pub type SimResult<T> = Result<T, SimError>;

impl From<pv_controls::ControlError> for SimError {
    fn from(e: pv_controls::ControlError) -> Self {
        SimError::Control {
            message: e.to_string(),
        }
    }
}

impl From<pv_core::PvError> for SimError {
    fn from(e: pv_core::PvError) -> Self {
        SimError::Control {
            message: e.to_string(),
        }
    }
}
