//! Common time helpers for flow_core.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use flow_traits::clock::{Clock, MonotonicClock};

/// Number of milliseconds in one second.
pub const MILLIS_PER_SEC: u64 = 1_000;
/// Number of seconds in one minute.
pub const SECONDS_PER_MINUTE: f64 = 60.0;

/// Millisecond time source shared by every channel of a meter.
///
/// Timestamps are milliseconds since the timebase was created, so they start
/// near zero and only move forward.
#[derive(Clone)]
pub struct Timebase {
    clock: Arc<dyn Clock + Send + Sync>,
    epoch: Instant,
}

impl Timebase {
    pub fn new<C: Clock + Send + Sync + 'static>(clock: C) -> Self {
        let epoch = clock.now();
        Self {
            clock: Arc::new(clock),
            epoch,
        }
    }

    /// Timebase over the real monotonic clock.
    pub fn monotonic() -> Self {
        Self::new(MonotonicClock::new())
    }

    #[inline]
    pub fn now_ms(&self) -> u64 {
        self.clock.ms_since(self.epoch)
    }
}

impl Default for Timebase {
    fn default() -> Self {
        Self::monotonic()
    }
}

impl fmt::Debug for Timebase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timebase")
            .field("now_ms", &self.now_ms())
            .finish()
    }
}
