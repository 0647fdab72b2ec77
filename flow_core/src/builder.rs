//! Type-state builder for `SensorChannel`.
//!
//! The builder enforces at compile time that an input (id + name) and a
//! listener are provided before `build()` is available, so a channel can never
//! see a pulse without someone to notify. `try_build()` is always available
//! for dynamic checks.

use std::marker::PhantomData;
use std::sync::{Arc, Mutex};

use flow_traits::clock::Clock;

use crate::channel::SensorChannel;
use crate::config::MeterCfg;
use crate::error::{BuildError, Result};
use crate::events::PourEvents;
use crate::pour::PourState;
use crate::types::ChannelId;
use crate::util::Timebase;

// ── Type-state markers ───────────────────────────────────────────────────────

pub struct Missing;
pub struct Set;

/// Builder for `SensorChannel`. All fields are validated on `build()`.
pub struct ChannelBuilder<I, E> {
    id: Option<ChannelId>,
    name: Option<String>,
    events: Option<Arc<dyn PourEvents>>,
    meter: MeterCfg,
    timebase: Option<Timebase>,
    _i: PhantomData<I>,
    _e: PhantomData<E>,
}

impl Default for ChannelBuilder<Missing, Missing> {
    fn default() -> Self {
        Self {
            id: None,
            name: None,
            events: None,
            meter: MeterCfg::default(),
            timebase: None,
            _i: PhantomData,
            _e: PhantomData,
        }
    }
}

/// Validate configuration and construct a `SensorChannel`.
///
/// Single source of truth for validation, used by both `build()` and
/// `try_build()`.
fn validate_and_build(
    id: ChannelId,
    name: String,
    events: Arc<dyn PourEvents>,
    meter: MeterCfg,
    timebase: Timebase,
) -> Result<SensorChannel> {
    if name.trim().is_empty() {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "channel name must not be empty",
        )));
    }
    let state = PourState::new(meter).map_err(eyre::Report::new)?;
    tracing::debug!(
        channel = %id,
        name = %name,
        frequency_constant = meter.frequency_constant,
        min_pour_volume_l = meter.min_pour_volume,
        idle_timeout_ms = meter.idle_timeout_ms,
        "channel built"
    );
    Ok(SensorChannel {
        id,
        name,
        state: Mutex::new(state),
        events,
        timebase,
    })
}

impl<I, E> ChannelBuilder<I, E> {
    fn retag<I2, E2>(self) -> ChannelBuilder<I2, E2> {
        ChannelBuilder {
            id: self.id,
            name: self.name,
            events: self.events,
            meter: self.meter,
            timebase: self.timebase,
            _i: PhantomData,
            _e: PhantomData,
        }
    }

    /// Pour-detection constants (defaults: 7.5 / 0.1 L / 2000 ms).
    pub fn with_meter(mut self, meter: MeterCfg) -> Self {
        self.meter = meter;
        self
    }

    /// Share a timebase with other channels (recommended for a meter).
    pub fn with_timebase(mut self, timebase: Timebase) -> Self {
        self.timebase = Some(timebase);
        self
    }

    /// Use a private timebase over `clock`.
    pub fn with_clock<C: Clock + Send + Sync + 'static>(mut self, clock: C) -> Self {
        self.timebase = Some(Timebase::new(clock));
        self
    }

    /// Build, reporting missing pieces as typed `BuildError`s.
    pub fn try_build(self) -> Result<SensorChannel> {
        let id = self
            .id
            .ok_or_else(|| eyre::Report::new(BuildError::MissingInput))?;
        let name = self
            .name
            .ok_or_else(|| eyre::Report::new(BuildError::MissingInput))?;
        let events = self
            .events
            .ok_or_else(|| eyre::Report::new(BuildError::MissingEvents))?;
        validate_and_build(
            id,
            name,
            events,
            self.meter,
            self.timebase.unwrap_or_default(),
        )
    }
}

impl<E> ChannelBuilder<Missing, E> {
    pub fn with_input(
        mut self,
        id: impl Into<ChannelId>,
        name: impl Into<String>,
    ) -> ChannelBuilder<Set, E> {
        self.id = Some(id.into());
        self.name = Some(name.into());
        self.retag()
    }
}

impl<I> ChannelBuilder<I, Missing> {
    pub fn with_events<L: PourEvents + 'static>(mut self, listener: L) -> ChannelBuilder<I, Set> {
        self.events = Some(Arc::new(listener));
        self.retag()
    }

    /// Share one listener between several channels.
    pub fn with_shared_events(mut self, listener: Arc<dyn PourEvents>) -> ChannelBuilder<I, Set> {
        self.events = Some(listener);
        self.retag()
    }
}

impl ChannelBuilder<Set, Set> {
    pub fn build(self) -> Result<SensorChannel> {
        self.try_build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::NoopEvents;

    #[test]
    fn missing_listener_is_typed() {
        let err = ChannelBuilder::default()
            .with_input(1u32, "x")
            .try_build()
            .expect_err("no listener");
        assert!(matches!(
            err.downcast_ref::<BuildError>(),
            Some(BuildError::MissingEvents)
        ));
    }

    #[test]
    fn blank_name_is_rejected() {
        let err = SensorChannel::builder()
            .with_input(1u32, " ")
            .with_events(NoopEvents)
            .build()
            .expect_err("blank name");
        assert!(format!("{err}").contains("name must not be empty"));
    }
}
