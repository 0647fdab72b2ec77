//! Background idle poller.
//!
//! Spawns a thread that wakes on a fixed tick and asks every channel of a
//! [`Meter`] whether its pour has finished. Pours complete purely from elapsed
//! time, so this cannot be driven by pulses.
//!
//! Each `IdlePoller` owns exactly one thread, which is shut down and joined
//! when the poller is dropped.
use crossbeam_channel as xch;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::config::PollerCfg;
use crate::meter::Meter;

/// Work to run on the poller thread after every tick's completion check.
pub trait PollHook: Send + Sync {
    fn after_poll(&self);
}

pub struct IdlePoller {
    ticks: Arc<AtomicU64>,
    completions: Arc<AtomicU64>,
    /// Dropping this sender is the shutdown signal.
    shutdown: Option<xch::Sender<()>>,
    join_handle: Option<std::thread::JoinHandle<()>>,
}

impl IdlePoller {
    pub fn spawn(meter: Arc<Meter>, cfg: PollerCfg) -> Self {
        Self::spawn_with_hooks(meter, cfg, Vec::new())
    }

    /// Like [`IdlePoller::spawn`], also running each hook after every poll.
    pub fn spawn_with_hooks(
        meter: Arc<Meter>,
        cfg: PollerCfg,
        hooks: Vec<Arc<dyn PollHook>>,
    ) -> Self {
        let interval = if cfg.interval.is_zero() {
            Duration::from_millis(1)
        } else {
            cfg.interval
        };
        let (shutdown_tx, shutdown_rx) = xch::bounded::<()>(0);
        let ticks = Arc::new(AtomicU64::new(0));
        let ticks_clone = ticks.clone();
        let completions = Arc::new(AtomicU64::new(0));
        let completions_clone = completions.clone();

        let join_handle = std::thread::spawn(move || {
            let ticker = xch::tick(interval);
            tracing::debug!(
                interval_ms = interval.as_millis() as u64,
                channels = meter.len(),
                hooks = hooks.len(),
                "idle poller started"
            );
            loop {
                crossbeam_channel::select! {
                    recv(shutdown_rx) -> _ => {
                        tracing::debug!("idle poller received shutdown signal");
                        break;
                    }
                    recv(ticker) -> _ => {
                        let done = meter.poll_now();
                        for hook in &hooks {
                            hook.after_poll();
                        }
                        ticks_clone.fetch_add(1, Ordering::Relaxed);
                        if !done.is_empty() {
                            completions_clone.fetch_add(done.len() as u64, Ordering::Relaxed);
                        }
                        tracing::trace!(completed = done.len(), "idle poll tick");
                    }
                }
            }
            tracing::trace!("idle poller thread exiting cleanly");
        });

        Self {
            ticks,
            completions,
            shutdown: Some(shutdown_tx),
            join_handle: Some(join_handle),
        }
    }

    /// Number of ticks handled so far.
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    /// Number of pours this poller has completed.
    pub fn completions(&self) -> u64 {
        self.completions.load(Ordering::Relaxed)
    }
}

impl Drop for IdlePoller {
    fn drop(&mut self) {
        drop(self.shutdown.take());
        if let Some(handle) = self.join_handle.take() {
            match handle.join() {
                Ok(()) => {
                    tracing::trace!("idle poller thread joined successfully");
                }
                Err(e) => {
                    // Thread panicked; log but don't propagate (we're in Drop)
                    tracing::warn!(?e, "idle poller thread panicked during shutdown");
                }
            }
        }
    }
}
