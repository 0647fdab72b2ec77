//! The set of channels in one process.
//!
//! A `Meter` routes pulses by channel id, binds every channel to a pulse
//! source, and is the unit the idle poller sweeps.

use std::collections::HashMap;
use std::sync::Arc;

use flow_traits::PulseSource;

use crate::channel::SensorChannel;
use crate::config::MeterCfg;
use crate::error::{FlowError, Result};
use crate::events::PourEvents;
use crate::hw_error::map_source_error;
use crate::pour::{PourSummary, PulseOutcome};
use crate::types::{ChannelId, ChannelSnapshot};
use crate::util::Timebase;

#[derive(Debug)]
pub struct Meter {
    channels: Vec<Arc<SensorChannel>>,
    index: HashMap<ChannelId, usize>,
}

impl Meter {
    /// Group already-built channels. Ids must be unique.
    pub fn new(channels: Vec<SensorChannel>) -> Result<Self> {
        let mut index = HashMap::with_capacity(channels.len());
        for (i, ch) in channels.iter().enumerate() {
            if index.insert(ch.id(), i).is_some() {
                return Err(eyre::Report::new(FlowError::DuplicateChannel(ch.id())));
            }
        }
        Ok(Self {
            channels: channels.into_iter().map(Arc::new).collect(),
            index,
        })
    }

    /// Build one channel per `[[channels]]` entry, all sharing `events` and `timebase`.
    pub fn from_config(
        cfg: &flow_config::Config,
        events: Arc<dyn PourEvents>,
        timebase: Timebase,
    ) -> Result<Self> {
        let channels = cfg
            .channels
            .iter()
            .map(|ch| {
                SensorChannel::builder()
                    .with_input(ch.id, ch.name.clone())
                    .with_shared_events(events.clone())
                    .with_meter(MeterCfg::from(&ch.effective(&cfg.meter)))
                    .with_timebase(timebase.clone())
                    .build()
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(channels)
    }

    pub fn channel(&self, id: ChannelId) -> Option<&Arc<SensorChannel>> {
        self.index.get(&id).map(|&i| &self.channels[i])
    }

    pub fn channels(&self) -> impl Iterator<Item = &Arc<SensorChannel>> {
        self.channels.iter()
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Route one pulse to channel `id`.
    pub fn on_pulse(&self, id: ChannelId, timestamp_ms: Option<u64>) -> Result<PulseOutcome> {
        let ch = self
            .channel(id)
            .ok_or_else(|| eyre::Report::new(FlowError::UnknownChannel(id)))?;
        Ok(ch.on_pulse(timestamp_ms))
    }

    /// Register every channel with `source` so its pulses reach `on_pulse`.
    pub fn bind<P: PulseSource + ?Sized>(&self, source: &mut P) -> Result<()> {
        for ch in &self.channels {
            let target = Arc::clone(ch);
            source
                .register(
                    ch.id().0,
                    Box::new(move |ts| {
                        target.on_pulse(ts);
                    }),
                )
                .map_err(|e| eyre::Report::new(map_source_error(e.as_ref())))?;
            tracing::info!(channel = %ch.id(), name = %ch.name(), "channel bound to pulse source");
        }
        Ok(())
    }

    /// Check every channel for completion at `now_ms`.
    pub fn poll(&self, now_ms: u64) -> Vec<(ChannelId, PourSummary)> {
        self.channels
            .iter()
            .filter_map(|ch| ch.poll(now_ms).map(|s| (ch.id(), s)))
            .collect()
    }

    /// Check every channel at its own current time.
    pub fn poll_now(&self) -> Vec<(ChannelId, PourSummary)> {
        self.channels
            .iter()
            .filter_map(|ch| ch.poll(ch.now_ms()).map(|s| (ch.id(), s)))
            .collect()
    }

    pub fn snapshots(&self) -> Vec<ChannelSnapshot> {
        self.channels.iter().map(|ch| ch.snapshot()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::NoopEvents;

    fn cfg() -> flow_config::Config {
        flow_config::load_toml(
            r#"
[meter]
idle_timeout_ms = 500

[[channels]]
id = 22
name = "Beer"

[[channels]]
id = 23
name = "Cider"
min_pour_volume_l = 0.5
"#,
        )
        .unwrap()
    }

    #[test]
    fn from_config_applies_overrides() {
        let meter = Meter::from_config(&cfg(), Arc::new(NoopEvents), Timebase::default()).unwrap();
        assert_eq!(meter.len(), 2);
        let beer = meter.channel(ChannelId(22)).unwrap();
        let cider = meter.channel(ChannelId(23)).unwrap();
        assert_eq!(beer.cfg().min_pour_volume, 0.1);
        assert_eq!(cider.cfg().min_pour_volume, 0.5);
        assert_eq!(cider.cfg().idle_timeout_ms, 500);
    }

    #[test]
    fn unknown_channel_is_reported() {
        let meter = Meter::from_config(&cfg(), Arc::new(NoopEvents), Timebase::default()).unwrap();
        let err = meter.on_pulse(ChannelId(99), Some(0)).expect_err("unknown");
        assert!(matches!(
            err.downcast_ref::<FlowError>(),
            Some(FlowError::UnknownChannel(ChannelId(99)))
        ));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let mk = || {
            SensorChannel::builder()
                .with_input(5u32, "Dup")
                .with_events(NoopEvents)
                .build()
                .unwrap()
        };
        let err = Meter::new(vec![mk(), mk()]).expect_err("duplicate");
        assert!(matches!(
            err.downcast_ref::<FlowError>(),
            Some(FlowError::DuplicateChannel(ChannelId(5)))
        ));
    }
}
