//! DC-DC converter response model.
//!
//! The controller assumes an external actuator that tracks its voltage
//! reference. This module models that actuator as a first-order lag with
//! slew limiting:
//! - **First-order lag**: time constant `tau` models the converter control
//!   loop's settling behavior
//! - **Slew limiting**: maximum voltage ramp rate in V/s
//!
//! The simulation's default is the ideal assumption (reference reached within
//! one sample period); this model is the non-ideal alternative.

use crate::error::{SimError, SimResult};
use serde::{Deserialize, Serialize};

/// State of the converter output.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConverterState {
    /// Present operating voltage at the source terminals (volts).
    pub voltage: f64,
}

/// First-order converter response with slew limiting.
///
/// Dynamics: `dv/dt = (command - voltage) / tau`, clamped to
/// `[-slew_limit, slew_limit]`, integrated by explicit Euler. Commands come
/// from the controller and are already within the reference bounds, so the
/// lagged response stays within them too.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FirstOrderConverter {
    /// Time constant (seconds), must be positive.
    pub tau: f64,
    /// Maximum voltage ramp rate (V/s), must be positive.
    pub slew_limit: f64,
}

impl FirstOrderConverter {
    /// Create a converter response model.
    ///
    /// # Errors
    ///
    /// Returns an error if `tau` or `slew_limit` is not positive.
    pub fn new(tau: f64, slew_limit: f64) -> SimResult<Self> {
        if !tau.is_finite() || tau <= 0.0 {
            return Err(SimError::InvalidArg {
                what: "tau must be positive and finite",
            });
        }
        if !slew_limit.is_finite() || slew_limit <= 0.0 {
            return Err(SimError::InvalidArg {
                what: "slew_limit must be positive and finite",
            });
        }
        Ok(Self { tau, slew_limit })
    }

    /// Voltage derivative toward the commanded reference, slew-limited.
    pub fn dvdt(&self, voltage: f64, command: f64) -> f64 {
        let raw = (command - voltage) / self.tau;
        raw.clamp(-self.slew_limit, self.slew_limit)
    }

    /// Advance the converter state by `dt` toward the commanded reference.
    pub fn step(&self, state: &ConverterState, dt: f64, command: f64) -> ConverterState {
        let dvdt = self.dvdt(state.voltage, command);
        let next = state.voltage + dvdt * dt;
        // Euler can overshoot the command for dt > tau; the command is the
        // attractor, so pin at it rather than oscillate.
        let voltage = if (next - command).signum() != (state.voltage - command).signum() {
            command
        } else {
            next
        };
        ConverterState { voltage }
    }
}
