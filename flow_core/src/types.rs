use std::fmt;

use crate::status::PourPhase;

/// Opaque identifier of one sensor input (the BCM pin number on a Pi).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelId(pub u32);

impl From<u32> for ChannelId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Point-in-time copy of a channel's measurement.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelSnapshot {
    pub id: ChannelId,
    pub name: String,
    pub phase: PourPhase,
    /// Pulses in the current pour
    pub pulses: u64,
    /// Liters in the current pour
    pub volume: f64,
    /// Liters across all completed pours
    pub total_volume: f64,
    pub last_pulse_ms: u64,
    pub pour_count: u64,
    pub lifetime_pulses: u64,
}

impl fmt::Display for ChannelSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.name)?;
        writeln!(f, "Current flow: {:.4} L", self.volume)?;
        writeln!(f, "Total flow: {:.4} L", self.total_volume)?;
        write!(f, "Pours: {}", self.pour_count)
    }
}
