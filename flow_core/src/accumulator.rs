//! Pulse count → volume conversion.
//!
//! Hall-effect flow meters emit `frequency_constant` Hz per L/min of flow:
//!
//!   Q (L/min)  = f (Hz) / k
//!   liters     = Q * seconds / 60
//!              = pulses / (k * 60)
//!
//! With k = 7.5 that is 450 pulses per liter.

use crate::util::{MILLIS_PER_SEC, SECONDS_PER_MINUTE};

/// Liters represented by `pulses` for a sensor with frequency constant `k`.
#[inline]
pub fn pulses_to_volume(pulses: u64, frequency_constant: f64) -> f64 {
    pulses as f64 / (frequency_constant * SECONDS_PER_MINUTE)
}

/// Pulses emitted per liter of flow.
#[inline]
pub fn pulses_per_liter(frequency_constant: f64) -> f64 {
    frequency_constant * SECONDS_PER_MINUTE
}

/// Average flow rate in L/min for `pulses` spread over `elapsed_ms`.
/// Returns 0.0 when no time has elapsed.
pub fn flow_rate_lpm(pulses: u64, elapsed_ms: u64, frequency_constant: f64) -> f64 {
    if elapsed_ms == 0 {
        return 0.0;
    }
    let hz = pulses as f64 * MILLIS_PER_SEC as f64 / elapsed_ms as f64;
    hz / frequency_constant
}

/// Pulse counter for the current pour. Volume is always derived from the count.
#[derive(Debug, Clone)]
pub struct PulseAccumulator {
    pulses: u64,
    frequency_constant: f64,
}

impl PulseAccumulator {
    pub fn new(frequency_constant: f64) -> Self {
        Self {
            pulses: 0,
            frequency_constant,
        }
    }

    /// Count one pulse and return the new volume.
    #[inline]
    pub fn increment(&mut self) -> f64 {
        self.pulses = self.pulses.saturating_add(1);
        self.volume()
    }

    #[inline]
    pub fn pulses(&self) -> u64 {
        self.pulses
    }

    #[inline]
    pub fn volume(&self) -> f64 {
        pulses_to_volume(self.pulses, self.frequency_constant)
    }

    pub fn frequency_constant(&self) -> f64 {
        self.frequency_constant
    }

    pub fn reset(&mut self) {
        self.pulses = 0;
    }
}
