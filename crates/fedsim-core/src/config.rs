//! Simulation configuration.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::calendar::default_start_date;
use crate::ValidationError;

/// Tunables for the tick engine, loadable from YAML. Missing keys fall back to
/// the defaults below.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Real-time period between clock firings.
    pub tick_period_ms: u64,
    /// Ticks per calendar quarter (3 monthly ticks).
    pub ticks_per_quarter: u64,
    /// Seed for the engine RNG. `None` draws from OS entropy.
    pub rng_seed: Option<u64>,
    /// Chance per eligible tick of requesting a new event.
    pub event_fetch_probability: f64,
    /// Inclusive bounds for the duration assigned to enqueued events.
    pub event_duration_min: u32,
    pub event_duration_max: u32,
    /// Pause automatically after every quarter-start tick.
    pub pause_each_quarter: bool,
    /// Keep at most this many history records. `None` keeps everything.
    pub history_capacity: Option<usize>,
    /// Budget for one event-source call before the fallback event is used.
    pub event_timeout_ms: u64,
    /// Width of the uniform per-tick noise on each derivative.
    pub noise_amplitude: f64,
    pub start_date: NaiveDate,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            tick_period_ms: 1000,
            ticks_per_quarter: 3,
            rng_seed: None,
            event_fetch_probability: 0.3,
            event_duration_min: 6,
            event_duration_max: 12,
            pause_each_quarter: true,
            history_capacity: None,
            event_timeout_ms: 5000,
            noise_amplitude: 0.02,
            start_date: default_start_date(),
        }
    }
}

impl SimConfig {
    /// Same config with a fixed RNG seed.
    pub fn seeded(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }
}

/// Validate config fields that would otherwise stall or panic the engine.
pub fn validate_config(cfg: &SimConfig) -> Result<(), ValidationError> {
    if cfg.tick_period_ms == 0 {
        return Err(ValidationError::OutOfRange {
            field: "tick_period_ms",
            value: 0.0,
        });
    }
    if cfg.ticks_per_quarter == 0 {
        return Err(ValidationError::OutOfRange {
            field: "ticks_per_quarter",
            value: 0.0,
        });
    }
    if !cfg.event_fetch_probability.is_finite() {
        return Err(ValidationError::NonFinite("event_fetch_probability"));
    }
    if !(0.0..=1.0).contains(&cfg.event_fetch_probability) {
        return Err(ValidationError::OutOfRange {
            field: "event_fetch_probability",
            value: cfg.event_fetch_probability,
        });
    }
    if cfg.event_duration_min == 0 || cfg.event_duration_min > cfg.event_duration_max {
        return Err(ValidationError::InvalidDurationRange {
            min: cfg.event_duration_min,
            max: cfg.event_duration_max,
        });
    }
    if cfg.history_capacity == Some(0) {
        return Err(ValidationError::OutOfRange {
            field: "history_capacity",
            value: 0.0,
        });
    }
    if cfg.event_timeout_ms == 0 {
        return Err(ValidationError::OutOfRange {
            field: "event_timeout_ms",
            value: 0.0,
        });
    }
    if !cfg.noise_amplitude.is_finite() {
        return Err(ValidationError::NonFinite("noise_amplitude"));
    }
    if cfg.noise_amplitude < 0.0 {
        return Err(ValidationError::OutOfRange {
            field: "noise_amplitude",
            value: cfg.noise_amplitude,
        });
    }
    Ok(())
}
