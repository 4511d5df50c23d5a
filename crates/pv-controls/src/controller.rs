//! Perturb-and-Observe tracking controller.
//!
//! The P&O rule nudges the voltage reference by a fixed step each sample and
//! watches the resulting power change: while power keeps improving the
//! perturbation keeps its direction, as soon as power stops improving the
//! direction reverses. The reference saturates at the configured voltage
//! bounds.
//!
//! The decision rule itself is a pure function of (state, measurements); the
//! [`MpptController`] facade owns the state plus a diagnostic [`History`] and
//! is the surface a sampling loop calls once per period.

use crate::error::{ControlError, ControlResult};
use crate::history::{History, PoAction};
use pv_core::ensure_finite;
use serde::{Deserialize, Serialize};

/// P&O controller configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerturbObserve {
    /// Perturbation step applied to the reference per sample (volts).
    pub step_size: f64,
    /// Lower reference bound (volts).
    pub v_min: f64,
    /// Upper reference bound (volts).
    pub v_max: f64,
    /// Nominal period between updates (seconds). Advisory: consumed by the
    /// caller's pacing loop, never measured or enforced here.
    pub sample_time: f64,
}

impl PerturbObserve {
    /// Create a new P&O configuration.
    ///
    /// # Arguments
    ///
    /// * `step_size` - Perturbation step in volts (must be positive)
    /// * `v_max` - Upper reference bound in volts
    /// * `v_min` - Lower reference bound in volts (must be below `v_max`)
    /// * `sample_time` - Nominal update period in seconds (must be positive)
    ///
    /// # Errors
    ///
    /// Returns an error for non-positive or non-finite `step_size` or
    /// `sample_time`, non-finite bounds, or `v_min >= v_max`.
    pub fn new(step_size: f64, v_max: f64, v_min: f64, sample_time: f64) -> ControlResult<Self> {
        if !step_size.is_finite() || step_size <= 0.0 {
            return Err(ControlError::InvalidArg {
                what: "step_size must be positive and finite",
            });
        }
        if !sample_time.is_finite() || sample_time <= 0.0 {
            return Err(ControlError::InvalidArg {
                what: "sample_time must be positive and finite",
            });
        }
        if !v_min.is_finite() || !v_max.is_finite() {
            return Err(ControlError::InvalidArg {
                what: "voltage bounds must be finite",
            });
        }
        if v_min >= v_max {
            return Err(ControlError::InvalidArg {
                what: "v_min must be less than v_max",
            });
        }
        Ok(Self {
            step_size,
            v_min,
            v_max,
            sample_time,
        })
    }

    /// Advance the decision machine by one sample.
    ///
    /// Pure function of (state, measurements): returns the successor state and
    /// the action taken, mutating nothing. Inputs are assumed finite; the
    /// stateful [`MpptController::update`] gates them.
    ///
    /// The first sample only seeds the state memory and leaves the reference
    /// unchanged. Every later sample applies the decision table:
    ///
    /// | dP   | dV   | action   |
    /// |------|------|----------|
    /// | > 0  | > 0  | increase |
    /// | > 0  | <= 0 | decrease |
    /// | <= 0 | > 0  | decrease |
    /// | <= 0 | <= 0 | increase |
    ///
    /// and clamps the result into `[v_min, v_max]`.
    pub fn step(&self, state: &PoState, voltage: f64, current: f64) -> (PoState, PoAction) {
        let power = voltage * current;

        match state.phase {
            TrackingPhase::Uninitialized => {
                let next = PoState {
                    v_ref: state.v_ref,
                    phase: TrackingPhase::Tracking {
                        prev_voltage: voltage,
                        prev_power: power,
                    },
                };
                (next, PoAction::Init)
            }
            TrackingPhase::Tracking {
                prev_voltage,
                prev_power,
            } => {
                let dv = voltage - prev_voltage;
                let dp = power - prev_power;

                // Power improved: keep perturbing in the direction the voltage
                // just moved. Power flat or worse: reverse it.
                let increase = if dp > 0.0 { dv > 0.0 } else { dv <= 0.0 };

                let (delta, action) = if increase {
                    (self.step_size, PoAction::Increase)
                } else {
                    (-self.step_size, PoAction::Decrease)
                };

                let next = PoState {
                    v_ref: (state.v_ref + delta).clamp(self.v_min, self.v_max),
                    phase: TrackingPhase::Tracking {
                        prev_voltage: voltage,
                        prev_power: power,
                    },
                };
                (next, action)
            }
        }
    }
}

/// Tracking phase: explicit tag instead of a zero-power sentinel, so a
/// legitimately-zero power sample after startup is an ordinary sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "phase")]
pub enum TrackingPhase {
    /// No sample observed yet.
    Uninitialized,
    /// At least one sample observed; memory of the last one.
    Tracking { prev_voltage: f64, prev_power: f64 },
}

/// P&O controller state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PoState {
    /// Current reference output (volts), always within the configured bounds.
    pub v_ref: f64,
    /// Tracking phase and last-sample memory.
    pub phase: TrackingPhase,
}

impl PoState {
    /// Initial state for a configuration: reference seeded at the lower
    /// bound, no sample memory.
    pub fn initial(config: &PerturbObserve) -> Self {
        Self {
            v_ref: config.v_min,
            phase: TrackingPhase::Uninitialized,
        }
    }
}

/// Stateful MPPT controller: configuration, decision state, and diagnostic
/// history behind a single `update`-per-period surface.
///
/// Designed for one owning control task; no internal locking.
#[derive(Debug, Clone)]
pub struct MpptController {
    config: PerturbObserve,
    state: PoState,
    history: History,
}

impl MpptController {
    /// Create a controller with an unbounded history.
    pub fn new(config: PerturbObserve) -> Self {
        let state = PoState::initial(&config);
        Self {
            config,
            state,
            history: History::new(),
        }
    }

    /// Create a controller whose history retains at most `capacity` records.
    pub fn with_history_capacity(config: PerturbObserve, capacity: usize) -> Self {
        let state = PoState::initial(&config);
        Self {
            config,
            state,
            history: History::with_capacity_limit(capacity),
        }
    }

    /// Feed one measurement pair and return the next voltage reference.
    ///
    /// The sole mutating entry point, called once per sampling period. A
    /// non-finite voltage or current is rejected with a recoverable error
    /// before any state or history mutation; the previous bounded reference
    /// stays available via [`reference`](Self::reference). Any finite input
    /// (including negative current) is accepted.
    pub fn update(&mut self, voltage: f64, current: f64) -> ControlResult<f64> {
        let voltage = ensure_finite(voltage, "measured voltage")?;
        let current = ensure_finite(current, "measured current")?;

        let (next, action) = self.config.step(&self.state, voltage, current);
        self.history.push(voltage, current, voltage * current, action);
        self.state = next;
        Ok(self.state.v_ref)
    }

    /// Current reference output (volts).
    pub fn reference(&self) -> f64 {
        self.state.v_ref
    }

    pub fn config(&self) -> &PerturbObserve {
        &self.config
    }

    pub fn state(&self) -> &PoState {
        &self.state
    }

    /// Read-only diagnostics log.
    pub fn history(&self) -> &History {
        &self.history
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn demo_config() -> PerturbObserve {
        PerturbObserve::new(0.5, 45.0, 10.0, 0.2).unwrap()
    }

    #[test]
    fn config_creation() {
        let po = demo_config();
        assert_eq!(po.step_size, 0.5);
        assert_eq!(po.v_min, 10.0);
        assert_eq!(po.v_max, 45.0);
    }

    #[test]
    fn invalid_config_params() {
        // Non-positive step
        assert!(PerturbObserve::new(0.0, 45.0, 10.0, 0.2).is_err());
        assert!(PerturbObserve::new(-0.5, 45.0, 10.0, 0.2).is_err());
        // Bounds inverted or equal
        assert!(PerturbObserve::new(0.5, 10.0, 45.0, 0.2).is_err());
        assert!(PerturbObserve::new(0.5, 10.0, 10.0, 0.2).is_err());
        // Non-positive sample time
        assert!(PerturbObserve::new(0.5, 45.0, 10.0, 0.0).is_err());
        // Non-finite anything
        assert!(PerturbObserve::new(f64::NAN, 45.0, 10.0, 0.2).is_err());
        assert!(PerturbObserve::new(0.5, f64::INFINITY, 10.0, 0.2).is_err());
    }

    #[test]
    fn first_update_returns_v_min_and_records_init() {
        let mut ctrl = MpptController::new(demo_config());
        let v_ref = ctrl.update(10.0, 0.0).unwrap();
        assert_eq!(v_ref, 10.0);
        assert_eq!(ctrl.history().last().unwrap().action, PoAction::Init);
        assert!(matches!(
            ctrl.state().phase,
            TrackingPhase::Tracking { .. }
        ));
    }

    #[test]
    fn textbook_scenario() {
        let mut ctrl = MpptController::new(demo_config());

        // init: p = 0
        assert_eq!(ctrl.update(10.0, 0.0).unwrap(), 10.0);
        // dp = 4.4 > 0, dv = 1 > 0 -> increase
        assert_eq!(ctrl.update(11.0, 0.4).unwrap(), 10.5);
        assert_eq!(ctrl.history().last().unwrap().action, PoAction::Increase);
        // dp = 0.85 > 0, dv = -0.5 <= 0 -> decrease
        assert_eq!(ctrl.update(10.5, 0.5).unwrap(), 10.0);
        assert_eq!(ctrl.history().last().unwrap().action, PoAction::Decrease);
    }

    #[test]
    fn decision_table_all_rows() {
        let po = demo_config();
        let tracking = |prev_voltage: f64, prev_power: f64| PoState {
            v_ref: 20.0,
            phase: TrackingPhase::Tracking {
                prev_voltage,
                prev_power,
            },
        };

        // dp > 0, dv > 0 -> increase
        let (s, a) = po.step(&tracking(19.0, 10.0), 20.0, 1.0);
        assert_eq!(a, PoAction::Increase);
        assert_eq!(s.v_ref, 20.5);

        // dp > 0, dv <= 0 -> decrease
        let (s, a) = po.step(&tracking(21.0, 10.0), 20.0, 1.0);
        assert_eq!(a, PoAction::Decrease);
        assert_eq!(s.v_ref, 19.5);

        // dp <= 0, dv > 0 -> decrease
        let (s, a) = po.step(&tracking(19.0, 30.0), 20.0, 1.0);
        assert_eq!(a, PoAction::Decrease);
        assert_eq!(s.v_ref, 19.5);

        // dp <= 0, dv <= 0 -> increase
        let (s, a) = po.step(&tracking(21.0, 30.0), 20.0, 1.0);
        assert_eq!(a, PoAction::Increase);
        assert_eq!(s.v_ref, 20.5);

        // dp == 0 counts as "no improvement" (reverse)
        let (_, a) = po.step(&tracking(19.0, 20.0), 20.0, 1.0);
        assert_eq!(a, PoAction::Decrease);
    }

    #[test]
    fn reference_saturates_at_bounds() {
        let po = demo_config();

        // Pinned at v_max: rule keeps asking for more, reference stays put.
        let mut state = PoState {
            v_ref: 45.0,
            phase: TrackingPhase::Tracking {
                prev_voltage: 44.0,
                prev_power: 10.0,
            },
        };
        for _ in 0..5 {
            let (next, action) = po.step(&state, 45.0, 1.0);
            assert_eq!(action, PoAction::Increase);
            assert_eq!(next.v_ref, 45.0);
            state = PoState {
                v_ref: next.v_ref,
                phase: TrackingPhase::Tracking {
                    prev_voltage: 44.0,
                    prev_power: 10.0,
                },
            };
        }

        // Pinned at v_min symmetrically.
        let state = PoState {
            v_ref: 10.0,
            phase: TrackingPhase::Tracking {
                prev_voltage: 11.0,
                prev_power: 10.0,
            },
        };
        let (next, action) = po.step(&state, 10.0, 2.0);
        assert_eq!(action, PoAction::Decrease);
        assert_eq!(next.v_ref, 10.0);
    }

    #[test]
    fn zero_power_after_init_is_a_normal_sample() {
        let mut ctrl = MpptController::new(demo_config());
        ctrl.update(12.0, 0.5).unwrap();
        // Zero power again must not re-initialize: dp = -6 <= 0, dv = 1 > 0
        // -> decrease, not init.
        let v_ref = ctrl.update(13.0, 0.0).unwrap();
        assert_eq!(v_ref, 10.0); // 10.0 - 0.5 clamped to v_min
        assert_eq!(ctrl.history().last().unwrap().action, PoAction::Decrease);
    }

    #[test]
    fn non_finite_measurement_rejected_without_state_change() {
        let mut ctrl = MpptController::new(demo_config());
        ctrl.update(11.0, 0.4).unwrap();
        let state_before = *ctrl.state();
        let len_before = ctrl.history().len();

        assert!(matches!(
            ctrl.update(f64::NAN, 0.4),
            Err(ControlError::NonFiniteMeasurement { .. })
        ));
        assert!(ctrl.update(11.0, f64::INFINITY).is_err());

        assert_eq!(*ctrl.state(), state_before);
        assert_eq!(ctrl.history().len(), len_before);
        assert_eq!(ctrl.reference(), state_before.v_ref);
    }

    #[test]
    fn negative_current_accepted() {
        let mut ctrl = MpptController::new(demo_config());
        ctrl.update(11.0, 0.4).unwrap();
        let v_ref = ctrl.update(12.0, -0.1).unwrap();
        assert!((10.0..=45.0).contains(&v_ref));
    }

    #[test]
    fn history_grows_once_per_accepted_update() {
        let mut ctrl = MpptController::new(demo_config());
        for k in 0..7 {
            ctrl.update(10.0 + k as f64 * 0.3, 0.4).unwrap();
        }
        assert_eq!(ctrl.history().len(), 7);
        let s = ctrl.history().series();
        assert_eq!(s.v.len(), 7);
        assert_eq!(s.action.len(), 7);
    }
}
