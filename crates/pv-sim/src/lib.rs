//! Tracking-simulation harness for pvtrack.
//!
//! Provides:
//! - Virtual PV panel model (bell-curve characteristic, single power peak)
//! - DC-DC converter response model (first-order lag with slew limiting)
//! - Deterministic measurement noise
//! - Fixed-step simulation runner with progress callbacks and optional
//!   real-time pacing
//!
//! The controller under test comes from `pv-controls`; this crate only
//! fabricates its environment.

pub mod converter;
pub mod error;
pub mod noise;
pub mod panel;
pub mod sim;

// Re-exports for public API
pub use converter::{ConverterState, FirstOrderConverter};
pub use error::{SimError, SimResult};
pub use noise::MeasurementNoise;
pub use panel::{CurvePoint, PvPanel};
pub use sim::{OperatingPoint, SimOptions, SimProgress, SimRecord, run_sim, run_sim_with_progress};
