//! Maximum-power-point tracking control for pvtrack.
//!
//! This crate is the controller core: a Perturb-and-Observe decision machine
//! that drives a photovoltaic source toward its maximum-power voltage by
//! nudging a reference and observing the resulting power change.
//!
//! # Architecture
//!
//! - The decision rule is a pure `(state, measurements) -> (state, action)`
//!   step on plain `f64` signals
//! - [`MpptController`] wraps it with owned state and a diagnostic history,
//!   exposing one `update` call per sampling period
//! - The reference output always saturates at the configured voltage bounds
//! - Sampling primitives pace the external loop; the controller itself never
//!   measures time
//!
//! # Design Principles
//!
//! - **Separation of Concerns**: the controller has no dependency on the
//!   source simulator, pacing, or visualization
//! - **Fail Fast**: invalid configurations are rejected at construction
//! - **Explicit State**: a two-phase tag distinguishes "no sample yet" from
//!   tracking, instead of overloading a sentinel value

pub mod controller;
pub mod error;
pub mod history;
pub mod sampled;

pub use controller::{MpptController, PerturbObserve, PoState, TrackingPhase};
pub use error::{ControlError, ControlResult};
pub use history::{History, HistoryRecord, HistorySeries, PoAction};
pub use sampled::{SampleClock, SampleConfig};
