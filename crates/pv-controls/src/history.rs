//! Diagnostic history of observed samples and tracking decisions.
//!
//! The controller appends one record per `update` call: the measured voltage,
//! current, the power computed from them, and the action the decision rule
//! chose. The log is diagnostics-only; the tracking algorithm never reads it
//! back. External consumers (plotting, export) take the parallel-series
//! snapshot via [`History::series`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Action taken by the tracking decision rule for one sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoAction {
    /// First sample: state memory seeded, reference left unchanged.
    Init,
    /// Reference perturbed upward by one step.
    Increase,
    /// Reference perturbed downward by one step.
    Decrease,
}

impl PoAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            PoAction::Init => "init",
            PoAction::Increase => "increase",
            PoAction::Decrease => "decrease",
        }
    }
}

impl fmt::Display for PoAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One observed sample plus the decision it produced.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub voltage: f64,
    pub current: f64,
    pub power: f64,
    pub action: PoAction,
}

/// Parallel-series view of the history, one column per quantity.
///
/// Columns always have equal length. This is the shape external visualizers
/// consume and the shape the JSON export serializes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistorySeries {
    pub v: Vec<f64>,
    pub i: Vec<f64>,
    pub p: Vec<f64>,
    pub action: Vec<PoAction>,
}

/// Append-only sample log, optionally bounded.
///
/// Unbounded by default, so `len()` equals the number of accepted `update`
/// calls. With a capacity limit the log keeps the most recent records and
/// drops the oldest on overflow, bounding memory for long-running loops.
#[derive(Debug, Clone, Default)]
pub struct History {
    records: Vec<HistoryRecord>,
    capacity: Option<usize>,
}

impl History {
    /// Create an unbounded history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a history that retains at most `capacity` records,
    /// evicting oldest-first. A capacity of zero records nothing.
    pub fn with_capacity_limit(capacity: usize) -> Self {
        Self {
            records: Vec::with_capacity(capacity),
            capacity: Some(capacity),
        }
    }

    /// Append one record.
    pub fn push(&mut self, voltage: f64, current: f64, power: f64, action: PoAction) {
        if let Some(cap) = self.capacity {
            if cap == 0 {
                return;
            }
            if self.records.len() >= cap {
                self.records.remove(0);
            }
        }
        self.records.push(HistoryRecord {
            voltage,
            current,
            power,
            action,
        });
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Retention limit, if one was configured.
    pub fn capacity_limit(&self) -> Option<usize> {
        self.capacity
    }

    pub fn records(&self) -> &[HistoryRecord] {
        &self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &HistoryRecord> {
        self.records.iter()
    }

    pub fn last(&self) -> Option<&HistoryRecord> {
        self.records.last()
    }

    /// Snapshot the log as parallel series.
    pub fn series(&self) -> HistorySeries {
        HistorySeries {
            v: self.records.iter().map(|r| r.voltage).collect(),
            i: self.records.iter().map(|r| r.current).collect(),
            p: self.records.iter().map(|r| r.power).collect(),
            action: self.records.iter().map(|r| r.action).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_labels() {
        assert_eq!(PoAction::Init.as_str(), "init");
        assert_eq!(PoAction::Increase.to_string(), "increase");
        assert_eq!(PoAction::Decrease.to_string(), "decrease");
    }

    #[test]
    fn series_columns_have_equal_length() {
        let mut h = History::new();
        h.push(10.0, 0.5, 5.0, PoAction::Init);
        h.push(10.5, 0.6, 6.3, PoAction::Increase);
        h.push(11.0, 0.55, 6.05, PoAction::Decrease);

        let s = h.series();
        assert_eq!(s.v.len(), 3);
        assert_eq!(s.i.len(), 3);
        assert_eq!(s.p.len(), 3);
        assert_eq!(s.action.len(), 3);
        assert_eq!(h.len(), 3);
    }

    #[test]
    fn bounded_history_evicts_oldest_first() {
        let mut h = History::with_capacity_limit(2);
        h.push(1.0, 1.0, 1.0, PoAction::Init);
        h.push(2.0, 1.0, 2.0, PoAction::Increase);
        h.push(3.0, 1.0, 3.0, PoAction::Increase);

        assert_eq!(h.len(), 2);
        assert_eq!(h.records()[0].voltage, 2.0);
        assert_eq!(h.last().unwrap().voltage, 3.0);
    }

    #[test]
    fn zero_capacity_records_nothing() {
        let mut h = History::with_capacity_limit(0);
        h.push(1.0, 1.0, 1.0, PoAction::Init);
        assert!(h.is_empty());
    }
}
