#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation
)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Pour detection for pulse-output flow meters (hardware-agnostic).
//!
//! A flow sensor emits one pulse per fixed volume of liquid. This crate turns
//! those pulses into pour events: a pour starts on the first pulse after idle,
//! grows with every pulse, and completes once it is both large enough and has
//! been quiet for long enough. Hardware is reached only through the
//! `flow_traits::PulseSource` and `flow_traits::Indicator` traits.
//!
//! ## Architecture
//!
//! - **Accumulation**: pulse count to liters (`accumulator` module)
//! - **State machine**: `Idle`/`Active` transitions per channel (`pour` module)
//! - **Channels**: one sensor input, one state machine, one lock (`channel` module)
//! - **Meter**: all channels of a process, routing and binding (`meter` module)
//! - **Idle poller**: background completion sweep (`poller` module)
//! - **Events**: listener capability set and delivery helpers (`events` module)
//!
//! ## Time
//!
//! Timestamps are milliseconds on a `Timebase`, which wraps any
//! `flow_traits::Clock`. Tests substitute `TestClock` to drive completion
//! deterministically.

pub mod accumulator;
pub mod builder;
pub mod channel;
pub mod config;
pub mod conversions;
pub mod error;
pub mod events;
pub mod hw_error;
pub mod meter;
pub mod mocks;
pub mod poller;
pub mod pour;
pub mod runner;
pub mod status;
pub mod types;
pub mod util;

pub use accumulator::{PulseAccumulator, flow_rate_lpm, pulses_per_liter, pulses_to_volume};
pub use builder::{ChannelBuilder, Missing, Set};
pub use channel::SensorChannel;
pub use config::{MeterCfg, PollerCfg};
pub use error::{BuildError, FlowError, Report, Result};
pub use events::{
    DEFAULT_INDICATOR_HOLD, EventDispatcher, EventQueue, Fanout, IndicatorEvents, PourEvent,
    PourEvents,
};
pub use meter::Meter;
pub use poller::{IdlePoller, PollHook};
pub use pour::{PourState, PourSummary, PulseOutcome};
pub use runner::{run, wait_for_completion};
pub use status::PourPhase;
pub use types::{ChannelId, ChannelSnapshot};
pub use util::Timebase;
