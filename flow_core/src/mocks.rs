//! Test and helper listeners for flow_core

use std::sync::Mutex;

use crate::events::{PourEvent, PourEvents};
use crate::types::ChannelId;

/// A listener that ignores everything; useful when only channel state matters.
pub struct NoopEvents;

impl PourEvents for NoopEvents {
    fn pour_started(&self, _channel: ChannelId) {}
    fn pulse(&self, _channel: ChannelId, _volume: f64) {}
    fn pour_complete(&self, _channel: ChannelId, _name: &str, _volume: f64, _total: f64) {}
}

/// A listener that keeps every event it receives, in order.
#[derive(Default)]
pub struct RecordingEvents {
    events: Mutex<Vec<PourEvent>>,
}

impl RecordingEvents {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, ev: PourEvent) {
        match self.events.lock() {
            Ok(mut g) => g.push(ev),
            Err(poisoned) => poisoned.into_inner().push(ev),
        }
    }

    /// Copy of everything recorded so far.
    pub fn events(&self) -> Vec<PourEvent> {
        match self.events.lock() {
            Ok(g) => g.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn count(&self, pred: impl Fn(&PourEvent) -> bool) -> usize {
        self.events().iter().filter(|e| pred(e)).count()
    }

    pub fn count_started(&self, channel: ChannelId) -> usize {
        self.count(|e| matches!(e, PourEvent::Started { channel: c } if *c == channel))
    }

    pub fn count_pulses(&self, channel: ChannelId) -> usize {
        self.count(|e| matches!(e, PourEvent::Pulse { channel: c, .. } if *c == channel))
    }

    pub fn completions(&self, channel: ChannelId) -> Vec<(f64, f64)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                PourEvent::Complete {
                    channel: c,
                    volume,
                    total_volume,
                    ..
                } if c == channel => Some((volume, total_volume)),
                _ => None,
            })
            .collect()
    }
}

impl PourEvents for RecordingEvents {
    fn pour_started(&self, channel: ChannelId) {
        self.push(PourEvent::Started { channel });
    }
    fn pulse(&self, channel: ChannelId, volume: f64) {
        self.push(PourEvent::Pulse { channel, volume });
    }
    fn pour_complete(&self, channel: ChannelId, name: &str, volume: f64, total_volume: f64) {
        self.push(PourEvent::Complete {
            channel,
            name: name.to_owned(),
            volume,
            total_volume,
        });
    }
}
