//! Runtime configuration for pour detection.
//!
//! These are the structs the core runs on. They are separate from the
//! TOML-deserialized config in `flow_config`; see `conversions`.

use std::time::Duration;

use crate::error::BuildError;

/// Pour-detection constants for one channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeterCfg {
    /// Sensor output frequency (Hz) per L/min of flow. 7.5 for YF-S201-style meters.
    pub frequency_constant: f64,
    /// A pour completes only once its volume exceeds this many liters.
    pub min_pour_volume: f64,
    /// A pour completes only after this much silence since the last pulse.
    pub idle_timeout_ms: u64,
}

impl Default for MeterCfg {
    fn default() -> Self {
        Self {
            frequency_constant: 7.5,
            min_pour_volume: 0.1,
            idle_timeout_ms: 2000,
        }
    }
}

impl MeterCfg {
    /// All three constants must be strictly positive and finite.
    pub fn validate(&self) -> Result<(), BuildError> {
        if !(self.frequency_constant.is_finite() && self.frequency_constant > 0.0) {
            return Err(BuildError::InvalidConfig("frequency_constant must be > 0"));
        }
        if !(self.min_pour_volume.is_finite() && self.min_pour_volume > 0.0) {
            return Err(BuildError::InvalidConfig("min_pour_volume must be > 0"));
        }
        if self.idle_timeout_ms == 0 {
            return Err(BuildError::InvalidConfig("idle_timeout_ms must be > 0"));
        }
        Ok(())
    }
}

/// Idle poller cadence.
#[derive(Debug, Clone, Copy)]
pub struct PollerCfg {
    pub interval: Duration,
}

impl Default for PollerCfg {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(100),
        }
    }
}
