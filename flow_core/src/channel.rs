//! One sensor input bound to one pour state machine.
//!
//! Both producers (pulse delivery and the idle poller) go through the same
//! per-channel mutex, so `on_pulse` and `check_completion` are linearizable.
//! Listener calls happen inside that critical section.

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info};

use crate::builder::{ChannelBuilder, Missing};
use crate::config::MeterCfg;
use crate::events::PourEvents;
use crate::pour::{PourState, PourSummary, PulseOutcome};
use crate::types::{ChannelId, ChannelSnapshot};
use crate::util::Timebase;

pub struct SensorChannel {
    pub(crate) id: ChannelId,
    pub(crate) name: String,
    pub(crate) state: Mutex<PourState>,
    pub(crate) events: Arc<dyn PourEvents>,
    pub(crate) timebase: Timebase,
}

impl core::fmt::Debug for SensorChannel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let st = self.lock();
        f.debug_struct("SensorChannel")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("pulses", &st.pulses())
            .field("total_volume", &st.total_volume())
            .finish()
    }
}

impl SensorChannel {
    /// Start building a channel. `build()` needs an input and a listener.
    pub fn builder() -> ChannelBuilder<Missing, Missing> {
        ChannelBuilder::default()
    }

    pub fn id(&self) -> ChannelId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cfg(&self) -> MeterCfg {
        *self.lock().cfg()
    }

    /// Current time on this channel's timebase.
    pub fn now_ms(&self) -> u64 {
        self.timebase.now_ms()
    }

    fn lock(&self) -> MutexGuard<'_, PourState> {
        // A panicking listener poisons the lock; the state itself is still consistent.
        match self.state.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Handle one pulse. Without a timestamp the channel stamps it itself.
    pub fn on_pulse(&self, timestamp_ms: Option<u64>) -> PulseOutcome {
        let ts = timestamp_ms.unwrap_or_else(|| self.timebase.now_ms());
        let mut st = self.lock();
        let outcome = st.on_pulse(ts);
        if outcome.started {
            info!(channel = %self.id, name = %self.name, at_ms = ts, "pour started");
            self.events.pour_started(self.id);
        }
        debug!(
            channel = %self.id,
            pulses = outcome.pulses,
            volume_l = outcome.volume,
            "pulse"
        );
        self.events.pulse(self.id, outcome.volume);
        outcome
    }

    /// Complete the current pour if it has gone quiet, notifying the listener.
    pub fn poll(&self, now_ms: u64) -> Option<PourSummary> {
        let mut st = self.lock();
        let summary = st.check_completion(now_ms)?;
        info!(
            channel = %self.id,
            name = %self.name,
            volume_l = summary.volume,
            total_l = summary.total_volume,
            pulses = summary.pulses,
            duration_ms = summary.duration_ms(),
            "pour complete"
        );
        self.events.pour_complete(
            self.id,
            &self.name,
            summary.volume,
            summary.total_volume,
        );
        Some(summary)
    }

    /// Returns whether a pour completed at `now_ms`.
    pub fn check_completion(&self, now_ms: u64) -> bool {
        self.poll(now_ms).is_some()
    }

    /// [`SensorChannel::check_completion`] at the current time.
    pub fn check_completion_now(&self) -> bool {
        self.check_completion(self.timebase.now_ms())
    }

    /// Whether both completion conditions hold, without changing anything.
    pub fn is_idle_complete(&self, now_ms: u64) -> bool {
        self.lock().is_idle_complete(now_ms)
    }

    pub fn snapshot(&self) -> ChannelSnapshot {
        let st = self.lock();
        ChannelSnapshot {
            id: self.id,
            name: self.name.clone(),
            phase: st.phase(),
            pulses: st.pulses(),
            volume: st.volume(),
            total_volume: st.total_volume(),
            last_pulse_ms: st.last_pulse_ms(),
            pour_count: st.pour_count(),
            lifetime_pulses: st.lifetime_pulses(),
        }
    }
}
