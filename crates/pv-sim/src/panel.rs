//! Virtual photovoltaic source model.
//!
//! A bell-shaped current/voltage characteristic with a single maximum-power
//! point: `i(v) = i_peak * exp(-curvature * (v - v_mpp)^2)`. Crude compared
//! to a diode-equation panel, but it has the one property the tracking loop
//! cares about (a single hump in the power curve) and it is cheap to
//! evaluate every period.

use crate::error::{SimError, SimResult};
use pv_core::units::{Current, Voltage, amp, volt};
use serde::Serialize;

/// Virtual PV panel parameters.
#[derive(Debug, Clone)]
pub struct PvPanel {
    /// Voltage of the current-curve peak (the knee of the power hump).
    pub v_mpp: Voltage,
    /// Current delivered at the curve peak.
    pub i_peak: Current,
    /// Width parameter of the bell curve (1/V^2). Larger is narrower.
    pub curvature: f64,
}

impl PvPanel {
    /// Create a panel model.
    ///
    /// # Errors
    ///
    /// Returns an error for non-positive or non-finite parameters.
    pub fn new(v_mpp: Voltage, i_peak: Current, curvature: f64) -> SimResult<Self> {
        if !v_mpp.value.is_finite() || v_mpp.value <= 0.0 {
            return Err(SimError::InvalidArg {
                what: "v_mpp must be positive and finite",
            });
        }
        if !i_peak.value.is_finite() || i_peak.value <= 0.0 {
            return Err(SimError::InvalidArg {
                what: "i_peak must be positive and finite",
            });
        }
        if !curvature.is_finite() || curvature <= 0.0 {
            return Err(SimError::InvalidArg {
                what: "curvature must be positive and finite",
            });
        }
        Ok(Self {
            v_mpp,
            i_peak,
            curvature,
        })
    }

    /// Bench panel: 5 A peak around 17 V, gentle curve.
    pub fn bench() -> Self {
        Self {
            v_mpp: volt(17.0),
            i_peak: amp(5.0),
            curvature: 0.05,
        }
    }

    /// Instantaneous current at an operating voltage (amperes).
    pub fn current(&self, voltage: f64) -> f64 {
        let dv = voltage - self.v_mpp.value;
        self.i_peak.value * (-self.curvature * dv * dv).exp()
    }

    /// Instantaneous power at an operating voltage (watts).
    pub fn power(&self, voltage: f64) -> f64 {
        voltage * self.current(voltage)
    }

    /// Sample the theoretical characteristic across a voltage range, for
    /// export to an external visualizer.
    pub fn curve(&self, v_min: f64, v_max: f64, points: usize) -> Vec<CurvePoint> {
        if points < 2 || v_min >= v_max {
            return Vec::new();
        }
        let dv = (v_max - v_min) / (points - 1) as f64;
        (0..points)
            .map(|k| {
                let voltage = v_min + k as f64 * dv;
                CurvePoint {
                    voltage,
                    current: self.current(voltage),
                    power: self.power(voltage),
                }
            })
            .collect()
    }

    /// Maximum power over a voltage range, by dense sweep.
    pub fn max_power(&self, v_min: f64, v_max: f64) -> f64 {
        self.curve(v_min, v_max, 2001)
            .iter()
            .map(|p| p.power)
            .fold(f64::MIN, f64::max)
    }
}

/// One point of the theoretical panel characteristic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CurvePoint {
    pub voltage: f64,
    pub current: f64,
    pub power: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peak_current_at_v_mpp() {
        let panel = PvPanel::bench();
        assert!((panel.current(17.0) - 5.0).abs() < 1e-12);
        assert!(panel.current(10.0) < 5.0);
        assert!(panel.current(25.0) < 5.0);
    }

    #[test]
    fn power_hump_has_a_single_interior_maximum() {
        let panel = PvPanel::bench();
        let curve = panel.curve(10.0, 45.0, 701);
        let (k_max, _) = curve
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.power.total_cmp(&b.power))
            .unwrap();
        // Interior, and near (slightly above) the current-curve peak.
        assert!(k_max > 0 && k_max < curve.len() - 1);
        assert!((curve[k_max].voltage - 17.5).abs() < 1.0);
    }

    #[test]
    fn curve_is_evenly_spaced_and_inclusive() {
        let panel = PvPanel::bench();
        let curve = panel.curve(10.0, 45.0, 100);
        assert_eq!(curve.len(), 100);
        assert!((curve[0].voltage - 10.0).abs() < 1e-12);
        assert!((curve[99].voltage - 45.0).abs() < 1e-9);
    }

    #[test]
    fn invalid_parameters() {
        assert!(PvPanel::new(volt(0.0), amp(5.0), 0.05).is_err());
        assert!(PvPanel::new(volt(17.0), amp(-1.0), 0.05).is_err());
        assert!(PvPanel::new(volt(17.0), amp(5.0), 0.0).is_err());
        assert!(PvPanel::new(volt(f64::NAN), amp(5.0), 0.05).is_err());
    }
}
