//! Pour phase of a channel.

/// Where a channel is in its pour lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PourPhase {
    /// No pulse since the last reset.
    Idle,
    /// Pulses received; waiting for the idle timeout.
    Active,
}

impl PourPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            PourPhase::Idle => "idle",
            PourPhase::Active => "active",
        }
    }
}
