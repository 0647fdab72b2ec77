//! Pour notifications and their delivery.
//!
//! Channels call a [`PourEvents`] listener while holding their own lock, so
//! per-channel event order always matches the state transitions. Listeners
//! must be quick and must not call back into the channel that notified them.
//! Slow consumers go behind an [`EventDispatcher`], which moves delivery onto
//! its own thread through an unbounded queue.
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crossbeam_channel as xch;
use flow_traits::Indicator;

use crate::hw_error::map_source_error;
use crate::poller::PollHook;
use crate::types::ChannelId;
use crate::util::Timebase;

/// Capability set a channel notifies. Injected at construction time.
pub trait PourEvents: Send + Sync {
    /// First pulse of a new pour.
    fn pour_started(&self, channel: ChannelId);
    /// Every pulse, with the running volume in liters.
    fn pulse(&self, channel: ChannelId, volume: f64);
    /// A pour finished; `volume` is this pour, `total_volume` all pours so far.
    fn pour_complete(&self, channel: ChannelId, name: &str, volume: f64, total_volume: f64);
}

impl<T: PourEvents + ?Sized> PourEvents for Arc<T> {
    fn pour_started(&self, channel: ChannelId) {
        (**self).pour_started(channel)
    }
    fn pulse(&self, channel: ChannelId, volume: f64) {
        (**self).pulse(channel, volume)
    }
    fn pour_complete(&self, channel: ChannelId, name: &str, volume: f64, total_volume: f64) {
        (**self).pour_complete(channel, name, volume, total_volume)
    }
}

/// Owned form of a notification.
#[derive(Debug, Clone, PartialEq)]
pub enum PourEvent {
    Started {
        channel: ChannelId,
    },
    Pulse {
        channel: ChannelId,
        volume: f64,
    },
    Complete {
        channel: ChannelId,
        name: String,
        volume: f64,
        total_volume: f64,
    },
}

impl PourEvent {
    pub fn channel(&self) -> ChannelId {
        match self {
            PourEvent::Started { channel }
            | PourEvent::Pulse { channel, .. }
            | PourEvent::Complete { channel, .. } => *channel,
        }
    }

    /// Replay this event onto a listener.
    pub fn deliver_to(&self, listener: &dyn PourEvents) {
        match self {
            PourEvent::Started { channel } => listener.pour_started(*channel),
            PourEvent::Pulse { channel, volume } => listener.pulse(*channel, *volume),
            PourEvent::Complete {
                channel,
                name,
                volume,
                total_volume,
            } => listener.pour_complete(*channel, name, *volume, *total_volume),
        }
    }
}

/// Listener that pushes every event into an unbounded queue.
#[derive(Clone)]
pub struct EventQueue {
    tx: xch::Sender<PourEvent>,
}

impl EventQueue {
    /// A queue plus the receiving end.
    pub fn unbounded() -> (Self, xch::Receiver<PourEvent>) {
        let (tx, rx) = xch::unbounded();
        (Self { tx }, rx)
    }

    fn push(&self, ev: PourEvent) {
        // Receiver gone means nobody is listening any more; drop the event.
        if self.tx.send(ev).is_err() {
            tracing::trace!("pour event dropped, receiver disconnected");
        }
    }
}

impl PourEvents for EventQueue {
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

/// Background thread that drains an [`EventQueue`] into a downstream listener.
///
/// Dropping the dispatcher delivers whatever is already queued, then joins
/// the thread.
pub struct EventDispatcher {
    stop: Option<xch::Sender<()>>,
    join_handle: Option<std::thread::JoinHandle<()>>,
}

impl EventDispatcher {
    pub fn spawn<L: PourEvents + 'static>(listener: L) -> (EventQueue, Self) {
        let (queue, rx) = EventQueue::unbounded();
        let (stop_tx, stop_rx) = xch::bounded::<()>(0);

        let join_handle = std::thread::spawn(move || {
            loop {
                crossbeam_channel::select! {
                    recv(rx) -> msg => match msg {
                        Ok(ev) => ev.deliver_to(&listener),
                        Err(_) => break,
                    },
                    recv(stop_rx) -> _ => {
                        for ev in rx.try_iter() {
                            ev.deliver_to(&listener);
                        }
                        break;
                    }
                }
            }
            tracing::trace!("event dispatcher exiting cleanly");
        });

        (
            queue,
            Self {
                stop: Some(stop_tx),
                join_handle: Some(join_handle),
            },
        )
    }
}

impl Drop for EventDispatcher {
    fn drop(&mut self) {
        // Disconnecting the stop channel wakes the select.
        drop(self.stop.take());
        if let Some(handle) = self.join_handle.take()
            && let Err(e) = handle.join()
        {
            tracing::warn!(?e, "event dispatcher panicked during shutdown");
        }
    }
}

/// Forwards every event to each listener in order.
#[derive(Default)]
pub struct Fanout {
    listeners: Vec<Arc<dyn PourEvents>>,
}

impl Fanout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, listener: Arc<dyn PourEvents>) -> Self {
        self.listeners.push(listener);
        self
    }
}

impl PourEvents for Fanout {
    fn pour_started(&self, channel: ChannelId) {
        for l in &self.listeners {
            l.pour_started(channel);
        }
    }
    fn pulse(&self, channel: ChannelId, volume: f64) {
        for l in &self.listeners {
            l.pulse(channel, volume);
        }
    }
    fn pour_complete(&self, channel: ChannelId, name: &str, volume: f64, total_volume: f64) {
        for l in &self.listeners {
            l.pour_complete(channel, name, volume, total_volume);
        }
    }
}

/// How long the indicator stays lit after the last pulse, by default.
pub const DEFAULT_INDICATOR_HOLD: Duration = Duration::from_millis(200);

struct IndicatorState<I> {
    led: I,
    lit: bool,
    last_pulse_ms: u64,
}

/// Lights an indicator while pulses are arriving on any channel.
///
/// Pulses switch it on; the idle poller switches it off (through
/// [`PollHook::after_poll`]) once no pulse has been seen for the hold time.
/// The LED follows flow, not pour state, so a stray pulse that never grows
/// into a reportable pour does not leave it lit.
pub struct IndicatorEvents<I: Indicator + Send> {
    inner: Mutex<IndicatorState<I>>,
    timebase: Timebase,
    hold_ms: u64,
}

impl<I: Indicator + Send> IndicatorEvents<I> {
    pub fn new(indicator: I) -> Self {
        Self {
            inner: Mutex::new(IndicatorState {
                led: indicator,
                lit: false,
                last_pulse_ms: 0,
            }),
            timebase: Timebase::monotonic(),
            hold_ms: DEFAULT_INDICATOR_HOLD.as_millis() as u64,
        }
    }

    /// Use the meter's timebase so pulse and poll times agree.
    pub fn with_timebase(mut self, timebase: Timebase) -> Self {
        self.timebase = timebase;
        self
    }

    pub fn with_hold(mut self, hold: Duration) -> Self {
        self.hold_ms = (hold.as_millis() as u64).max(1);
        self
    }

    fn state(&self) -> MutexGuard<'_, IndicatorState<I>> {
        match self.inner.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn switch(state: &mut IndicatorState<I>, on: bool) {
        let res = if on { state.led.on() } else { state.led.off() };
        match res {
            Ok(()) => state.lit = on,
            Err(e) => {
                let err = map_source_error(e.as_ref());
                tracing::warn!(error = %err, on, "indicator update failed");
            }
        }
    }
}

impl<I: Indicator + Send> PourEvents for IndicatorEvents<I> {
    fn pour_started(&self, _channel: ChannelId) {}
    fn pulse(&self, _channel: ChannelId, _volume: f64) {
        let now = self.timebase.now_ms();
        let mut state = self.state();
        state.last_pulse_ms = state.last_pulse_ms.max(now);
        if !state.lit {
            Self::switch(&mut state, true);
        }
    }
    fn pour_complete(&self, _channel: ChannelId, _name: &str, _volume: f64, _total_volume: f64) {}
}

impl<I: Indicator + Send> PollHook for IndicatorEvents<I> {
    fn after_poll(&self) {
        let now = self.timebase.now_ms();
        let mut state = self.state();
        if state.lit && now.saturating_sub(state.last_pulse_ms) >= self.hold_ms {
            Self::switch(&mut state, false);
        }
    }
}
