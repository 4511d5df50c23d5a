//! Sampled execution primitives for the tracking loop.
//!
//! The controller performs no timing of its own: its `sample_time` is
//! advisory. The driving loop paces `update` calls with a [`SampleClock`] and
//! holds the returned reference constant between samples (zero-order hold),
//! while faster dynamics (the converter) integrate in between.

use serde::{Deserialize, Serialize};

/// Sample configuration for the tracking loop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SampleConfig {
    /// Sample period in seconds.
    pub dt: f64,
}

impl SampleConfig {
    /// Create a new sample configuration.
    ///
    /// # Panics
    ///
    /// Panics if `dt` is not positive.
    pub fn new(dt: f64) -> Self {
        assert!(dt > 0.0, "Sample period must be positive");
        Self { dt }
    }

    /// Create a sample configuration from frequency in Hz.
    pub fn from_frequency(freq_hz: f64) -> Self {
        assert!(freq_hz > 0.0, "Frequency must be positive");
        Self { dt: 1.0 / freq_hz }
    }

    /// Get the sample frequency in Hz.
    pub fn frequency(&self) -> f64 {
        1.0 / self.dt
    }
}

/// Tracks when the next controller sample is due.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleClock {
    /// Sample configuration.
    pub config: SampleConfig,
    /// Time of next scheduled sample.
    pub next_sample_time: f64,
}

impl SampleClock {
    /// Create a new sample clock; the first sample is due one period after
    /// `initial_time`.
    pub fn new(config: SampleConfig, initial_time: f64) -> Self {
        Self {
            config,
            next_sample_time: initial_time + config.dt,
        }
    }

    /// Check if a sample should occur at the given time.
    pub fn should_sample(&self, current_time: f64) -> bool {
        current_time >= self.next_sample_time
    }

    /// Advance to the next sample time. Call after a sample executed.
    pub fn advance(&mut self) {
        self.next_sample_time += self.config.dt;
    }

    /// Reset the clock relative to a new time.
    pub fn reset(&mut self, current_time: f64) {
        self.next_sample_time = current_time + self.config.dt;
    }

    /// Time remaining until the next sample.
    pub fn time_until_sample(&self, current_time: f64) -> f64 {
        (self.next_sample_time - current_time).max(0.0)
    }
}
