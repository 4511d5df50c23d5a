//! Simulation runner and result recording.
//!
//! Per controller sample the driver measures `(v, i)` at the converter's
//! operating voltage, calls `update`, and holds the returned reference; per
//! fine step the converter tracks the held reference and the operating point
//! is recorded. The controller itself never paces, sleeps, or reads the
//! panel; this loop is the environment it expects around it.

use crate::converter::{ConverterState, FirstOrderConverter};
use crate::error::{SimError, SimResult};
use crate::noise::MeasurementNoise;
use crate::panel::PvPanel;
use pv_controls::{MpptController, SampleClock, SampleConfig};
use serde::Serialize;
use tracing::{debug, info};

/// Options for a tracking simulation run.
#[derive(Clone, Debug)]
pub struct SimOptions {
    /// Final simulation time (seconds).
    pub t_end: f64,
    /// Fine integration step (seconds); must not exceed the controller's
    /// sample time.
    pub dt: f64,
    /// Maximum number of steps (safety limit).
    pub max_steps: usize,
    /// Record every N-th step (decimation).
    pub record_every: usize,
    /// Amplitude of the additive current-measurement noise (amperes).
    pub noise_amplitude: f64,
    /// Seed for the deterministic noise source.
    pub noise_seed: u64,
    /// Converter response model. `None` means ideal tracking: the operating
    /// voltage reaches the reference within one step.
    pub converter: Option<FirstOrderConverter>,
    /// Pace the loop in real time by sleeping `dt` per step.
    pub realtime: bool,
}

impl Default for SimOptions {
    fn default() -> Self {
        Self {
            t_end: 20.0,
            dt: 0.02,
            max_steps: 1_000_000,
            record_every: 1,
            noise_amplitude: 0.05,
            noise_seed: 42,
            converter: None,
            realtime: false,
        }
    }
}

/// Operating point of the source at one recorded instant.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct OperatingPoint {
    /// Voltage at the source terminals (volts).
    pub voltage: f64,
    /// Panel current at that voltage (amperes, noiseless).
    pub current: f64,
    /// Instantaneous power (watts).
    pub power: f64,
    /// Reference the controller is commanding (volts).
    pub v_ref: f64,
}

/// Record of simulation results.
#[derive(Clone, Debug, Serialize)]
pub struct SimRecord {
    /// Time points (seconds).
    pub t: Vec<f64>,
    /// Operating-point snapshots.
    pub x: Vec<OperatingPoint>,
}

/// Progress snapshot passed to the caller's callback once per step.
#[derive(Clone, Debug)]
pub struct SimProgress {
    pub step: usize,
    pub t: f64,
    pub t_end: f64,
    pub fraction_complete: f64,
    pub voltage: f64,
    pub power: f64,
}

/// Run a tracking simulation.
pub fn run_sim(
    panel: &PvPanel,
    controller: &mut MpptController,
    opts: &SimOptions,
) -> SimResult<SimRecord> {
    run_sim_with_progress(panel, controller, opts, None)
}

/// Run a tracking simulation, reporting progress after every step.
///
/// Throttling the rendering is the callback's concern.
pub fn run_sim_with_progress(
    panel: &PvPanel,
    controller: &mut MpptController,
    opts: &SimOptions,
    mut progress: Option<&mut dyn FnMut(&SimProgress)>,
) -> SimResult<SimRecord> {
    let sample_time = controller.config().sample_time;

    if opts.dt <= 0.0 {
        return Err(SimError::InvalidArg {
            what: "dt must be positive",
        });
    }
    if opts.dt > sample_time {
        return Err(SimError::InvalidArg {
            what: "dt must not exceed the controller sample time",
        });
    }
    if opts.t_end < 0.0 {
        return Err(SimError::InvalidArg {
            what: "t_end must be non-negative",
        });
    }
    if opts.max_steps == 0 {
        return Err(SimError::InvalidArg {
            what: "max_steps must be positive",
        });
    }
    if opts.record_every == 0 {
        return Err(SimError::InvalidArg {
            what: "record_every must be positive",
        });
    }
    if !opts.noise_amplitude.is_finite() || opts.noise_amplitude < 0.0 {
        return Err(SimError::InvalidArg {
            what: "noise_amplitude must be non-negative and finite",
        });
    }

    let mut noise = MeasurementNoise::new(opts.noise_amplitude, opts.noise_seed);
    let mut clock = SampleClock::new(SampleConfig::new(sample_time), 0.0);
    let mut state = ConverterState {
        voltage: controller.reference(),
    };

    // Initialization sample at t = 0.
    let i0 = panel.current(state.voltage) + noise.sample();
    let mut v_ref = controller.update(state.voltage, i0)?;

    let mut t = 0.0;
    let mut t_record = vec![t];
    let mut x_record = vec![operating_point(panel, &state, v_ref)];

    let mut step = 0;
    while t < opts.t_end && step < opts.max_steps {
        // Controller fires on sample-period boundaries; the reference is
        // held constant in between.
        if clock.should_sample(t) {
            let i = panel.current(state.voltage) + noise.sample();
            v_ref = controller.update(state.voltage, i)?;
            clock.advance();
            debug!(t, voltage = state.voltage, v_ref, "controller sample");
        }

        // Converter tracks the held reference.
        state = match &opts.converter {
            Some(conv) => conv.step(&state, opts.dt, v_ref),
            None => ConverterState { voltage: v_ref },
        };

        t += opts.dt;
        step += 1;

        // Record if decimation matches
        if step % opts.record_every == 0 {
            t_record.push(t);
            x_record.push(operating_point(panel, &state, v_ref));
        }

        if let Some(cb) = progress.as_deref_mut() {
            cb(&SimProgress {
                step,
                t,
                t_end: opts.t_end,
                fraction_complete: (t / opts.t_end).min(1.0),
                voltage: state.voltage,
                power: panel.power(state.voltage),
            });
        }

        if opts.realtime {
            std::thread::sleep(std::time::Duration::from_secs_f64(opts.dt));
        }
    }

    // Always record final state
    if step % opts.record_every != 0 {
        t_record.push(t);
        x_record.push(operating_point(panel, &state, v_ref));
    }

    info!(
        steps = step,
        samples = controller.history().len(),
        voltage = state.voltage,
        "tracking run finished"
    );

    Ok(SimRecord {
        t: t_record,
        x: x_record,
    })
}

fn operating_point(panel: &PvPanel, state: &ConverterState, v_ref: f64) -> OperatingPoint {
    let current = panel.current(state.voltage);
    OperatingPoint {
        voltage: state.voltage,
        current,
        power: state.voltage * current,
        v_ref,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pv_controls::PerturbObserve;

    fn bench_controller() -> MpptController {
        MpptController::new(PerturbObserve::new(0.5, 45.0, 10.0, 0.2).unwrap())
    }

    #[test]
    fn sim_options_defaults() {
        let opts = SimOptions::default();
        assert_eq!(opts.t_end, 20.0);
        assert_eq!(opts.dt, 0.02);
        assert_eq!(opts.record_every, 1);
        assert!(opts.converter.is_none());
        assert!(!opts.realtime);
    }

    #[test]
    fn invalid_options_rejected() {
        let panel = PvPanel::bench();

        let mut ctrl = bench_controller();
        let opts = SimOptions {
            dt: 0.0,
            ..Default::default()
        };
        assert!(run_sim(&panel, &mut ctrl, &opts).is_err());

        let mut ctrl = bench_controller();
        let opts = SimOptions {
            dt: 0.5, // exceeds the 0.2 s sample time
            ..Default::default()
        };
        assert!(run_sim(&panel, &mut ctrl, &opts).is_err());

        let mut ctrl = bench_controller();
        let opts = SimOptions {
            record_every: 0,
            ..Default::default()
        };
        assert!(run_sim(&panel, &mut ctrl, &opts).is_err());

        let mut ctrl = bench_controller();
        let opts = SimOptions {
            noise_amplitude: -0.1,
            ..Default::default()
        };
        assert!(run_sim(&panel, &mut ctrl, &opts).is_err());
    }

    #[test]
    fn record_columns_match_and_cover_the_run() {
        let panel = PvPanel::bench();
        let mut ctrl = bench_controller();
        let opts = SimOptions {
            t_end: 2.0,
            noise_amplitude: 0.0,
            record_every: 7,
            ..Default::default()
        };
        let record = run_sim(&panel, &mut ctrl, &opts).unwrap();

        assert_eq!(record.t.len(), record.x.len());
        assert!(record.t.len() > 2);
        assert_eq!(record.t[0], 0.0);
        // Final state always recorded.
        assert!((record.t.last().unwrap() - 2.0).abs() < 0.05);
    }

    #[test]
    fn controller_samples_at_the_sample_period() {
        let panel = PvPanel::bench();
        let mut ctrl = bench_controller();
        let opts = SimOptions {
            t_end: 2.0,
            noise_amplitude: 0.0,
            ..Default::default()
        };
        run_sim(&panel, &mut ctrl, &opts).unwrap();

        // One init sample at t = 0 plus one per 0.2 s period over 2 s.
        let n = ctrl.history().len();
        assert!((9..=11).contains(&n), "expected ~10 samples, got {n}");
    }
}
