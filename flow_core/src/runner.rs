use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crossbeam_channel as xch;
use flow_traits::PulseSource;

use crate::config::PollerCfg;
use crate::error::{FlowError, Result as CoreResult};
use crate::events::PourEvent;
use crate::meter::Meter;
use crate::poller::{IdlePoller, PollHook};
use crate::types::{ChannelId, ChannelSnapshot};

/// How long the run loop sleeps between shutdown checks, at most.
const SHUTDOWN_CHECK: Duration = Duration::from_millis(50);

/// Bind `meter` to `source`, run the idle poller (with `hooks`), and block
/// until `shutdown` is set. Returns the final state of every channel.
pub fn run<P>(
    meter: Arc<Meter>,
    source: &mut P,
    poller: PollerCfg,
    hooks: Vec<Arc<dyn PollHook>>,
    shutdown: &AtomicBool,
) -> CoreResult<Vec<ChannelSnapshot>>
where
    P: PulseSource + ?Sized,
{
    meter.bind(source)?;
    let idle = IdlePoller::spawn_with_hooks(meter.clone(), poller, hooks);
    tracing::info!(
        channels = meter.len(),
        poll_ms = poller.interval.as_millis() as u64,
        "flow meter running"
    );

    let nap = poller.interval.min(SHUTDOWN_CHECK);
    while !shutdown.load(Ordering::Relaxed) {
        std::thread::sleep(nap);
    }

    let ticks = idle.ticks();
    let completed = idle.completions();
    drop(idle);
    tracing::info!(ticks, completed, "flow meter stopped");
    Ok(meter.snapshots())
}

/// Block until `channel` reports a completed pour on `rx`, or fail with
/// `FlowError::Timeout` once `timeout` has passed. Other events are skipped.
pub fn wait_for_completion(
    rx: &xch::Receiver<PourEvent>,
    channel: ChannelId,
    timeout: Duration,
) -> CoreResult<PourEvent> {
    let deadline = Instant::now() + timeout;
    loop {
        let left = deadline.saturating_duration_since(Instant::now());
        match rx.recv_timeout(left) {
            Ok(ev @ PourEvent::Complete { .. }) if ev.channel() == channel => return Ok(ev),
            Ok(_) => continue,
            Err(xch::RecvTimeoutError::Timeout) => {
                return Err(eyre::Report::new(FlowError::Timeout));
            }
            Err(xch::RecvTimeoutError::Disconnected) => {
                return Err(eyre::Report::new(FlowError::Source(
                    "event queue disconnected".into(),
                )));
            }
        }
    }
}
