//! Pour state machine for one channel.
//!
//! `Idle --first pulse--> Active --(volume > min AND idle > timeout)--> Idle`
//!
//! The machine is plain data: it reports what happened through return
//! values and leaves notification and locking to `SensorChannel`.

use crate::accumulator::{PulseAccumulator, flow_rate_lpm};
use crate::config::MeterCfg;
use crate::error::BuildError;
use crate::status::PourPhase;

/// What a single pulse did to the machine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PulseOutcome {
    /// This pulse opened a new pour.
    pub started: bool,
    /// Pulses in the pour, including this one.
    pub pulses: u64,
    /// Running volume in liters.
    pub volume: f64,
}

/// A pour that has just been declared complete.
#[derive(Debug, Clone, PartialEq)]
pub struct PourSummary {
    pub pulses: u64,
    /// Liters in this pour.
    pub volume: f64,
    /// Liters across all completed pours, including this one.
    pub total_volume: f64,
    /// Timestamp of the first pulse.
    pub started_ms: u64,
    /// Timestamp of the last pulse.
    pub last_pulse_ms: u64,
    /// Timestamp at which completion was detected.
    pub completed_ms: u64,
    /// Mean flow rate between first and last pulse, L/min.
    pub avg_flow_lpm: f64,
}

impl PourSummary {
    /// Time from first to last pulse.
    pub fn duration_ms(&self) -> u64 {
        self.last_pulse_ms.saturating_sub(self.started_ms)
    }
}

#[derive(Debug, Clone)]
pub struct PourState {
    cfg: MeterCfg,
    acc: PulseAccumulator,
    total_volume: f64,
    last_pulse_ms: u64,
    started_ms: u64,
    active: bool,
    pour_count: u64,
    lifetime_pulses: u64,
}

impl PourState {
    /// Fails when any constant in `cfg` is non-positive.
    pub fn new(cfg: MeterCfg) -> Result<Self, BuildError> {
        cfg.validate()?;
        Ok(Self {
            acc: PulseAccumulator::new(cfg.frequency_constant),
            cfg,
            total_volume: 0.0,
            last_pulse_ms: 0,
            started_ms: 0,
            active: false,
            pour_count: 0,
            lifetime_pulses: 0,
        })
    }

    /// Register one pulse observed at `timestamp_ms`.
    ///
    /// Timestamps older than the last accepted pulse are clamped to it so
    /// `last_pulse_ms` never moves backwards.
    pub fn on_pulse(&mut self, timestamp_ms: u64) -> PulseOutcome {
        let ts = timestamp_ms.max(self.last_pulse_ms);
        let started = !self.active;
        if started {
            self.active = true;
            self.started_ms = ts;
        }
        let volume = self.acc.increment();
        self.lifetime_pulses = self.lifetime_pulses.saturating_add(1);
        self.last_pulse_ms = ts;
        PulseOutcome {
            started,
            pulses: self.acc.pulses(),
            volume,
        }
    }

    /// Both completion conditions hold at `now_ms`.
    pub fn is_idle_complete(&self, now_ms: u64) -> bool {
        let min_volume_met = self.acc.volume() > self.cfg.min_pour_volume;
        let idle_met = now_ms.saturating_sub(self.last_pulse_ms) > self.cfg.idle_timeout_ms;
        min_volume_met && idle_met
    }

    /// Complete the pour if it is finished at `now_ms`, folding its volume
    /// into the total and resetting to idle.
    pub fn check_completion(&mut self, now_ms: u64) -> Option<PourSummary> {
        if !self.is_idle_complete(now_ms) {
            return None;
        }
        let pulses = self.acc.pulses();
        let volume = self.acc.volume();
        self.total_volume += volume;
        self.pour_count = self.pour_count.saturating_add(1);
        let summary = PourSummary {
            pulses,
            volume,
            total_volume: self.total_volume,
            started_ms: self.started_ms,
            last_pulse_ms: self.last_pulse_ms,
            completed_ms: now_ms,
            avg_flow_lpm: flow_rate_lpm(
                pulses,
                self.last_pulse_ms.saturating_sub(self.started_ms),
                self.cfg.frequency_constant,
            ),
        };
        self.reset();
        Some(summary)
    }

    fn reset(&mut self) {
        self.acc.reset();
        self.active = false;
    }

    pub fn cfg(&self) -> &MeterCfg {
        &self.cfg
    }
    pub fn pulses(&self) -> u64 {
        self.acc.pulses()
    }
    pub fn volume(&self) -> f64 {
        self.acc.volume()
    }
    pub fn total_volume(&self) -> f64 {
        self.total_volume
    }
    pub fn last_pulse_ms(&self) -> u64 {
        self.last_pulse_ms
    }
    pub fn is_active(&self) -> bool {
        self.active
    }
    pub fn phase(&self) -> PourPhase {
        if self.active {
            PourPhase::Active
        } else {
            PourPhase::Idle
        }
    }
    pub fn pour_count(&self) -> u64 {
        self.pour_count
    }
    pub fn lifetime_pulses(&self) -> u64 {
        self.lifetime_pulses
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> PourState {
        PourState::new(MeterCfg::default()).unwrap()
    }

    #[test]
    fn first_pulse_starts_pour_once() {
        let mut s = state();
        assert_eq!(s.phase(), PourPhase::Idle);
        assert!(s.on_pulse(10).started);
        assert!(!s.on_pulse(20).started);
        assert!(!s.on_pulse(30).started);
        assert!(s.is_active());
        assert_eq!(s.pulses(), 3);
    }

    #[test]
    fn stale_timestamp_does_not_rewind() {
        let mut s = state();
        s.on_pulse(500);
        s.on_pulse(100);
        assert_eq!(s.last_pulse_ms(), 500);
    }

    #[test]
    fn idle_timeout_is_strictly_greater_than() {
        let mut s = state();
        for t in 0..50 {
            s.on_pulse(t * 2);
        }
        // last pulse at 98; exactly 2000 ms of silence is not enough
        assert!(!s.is_idle_complete(98 + 2000));
        assert!(s.is_idle_complete(98 + 2001));
    }

    #[test]
    fn completion_reports_summary_and_resets() {
        let mut s = state();
        for t in 0..=50 {
            s.on_pulse(t * 2);
        }
        let summary = s.check_completion(2_200).expect("pour should complete");
        assert_eq!(summary.pulses, 51);
        assert_eq!(summary.started_ms, 0);
        assert_eq!(summary.last_pulse_ms, 100);
        assert_eq!(summary.duration_ms(), 100);
        assert!((summary.volume - 51.0 / 450.0).abs() < 1e-12);
        assert_eq!(summary.total_volume, summary.volume);
        assert!(summary.avg_flow_lpm > 0.0);

        assert_eq!(s.pulses(), 0);
        assert_eq!(s.volume(), 0.0);
        assert!(!s.is_active());
        assert_eq!(s.pour_count(), 1);
        assert_eq!(s.lifetime_pulses(), 51);
    }

    #[test]
    fn rejects_invalid_constants() {
        let cfg = MeterCfg {
            idle_timeout_ms: 0,
            ..MeterCfg::default()
        };
        assert!(PourState::new(cfg).is_err());
    }
}
