//! Pulse sources and indicators for the flow meter.
//!
//! The simulated backends are always available and are what the CLI uses on
//! machines without GPIO. Real Raspberry Pi pins live behind the `hardware`
//! feature in [`gpio`].
pub mod error;
#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod gpio;

use flow_traits::{Indicator, PulseCallback, PulseSource};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::error::HwError;

/// One callback per input. Each entry has its own lock so pulses on
/// different inputs never wait on each other.
type Callbacks = Arc<Mutex<HashMap<u32, Arc<Mutex<PulseCallback>>>>>;

fn relock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    match m.lock() {
        Ok(g) => g,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// In-process pulse source. Pulses are injected through a [`SimHandle`].
#[derive(Default)]
pub struct SimulatedPulseSource {
    callbacks: Callbacks,
}

impl SimulatedPulseSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// A cloneable handle used to fire pulses from any thread.
    pub fn handle(&self) -> SimHandle {
        SimHandle {
            callbacks: self.callbacks.clone(),
        }
    }
}

impl PulseSource for SimulatedPulseSource {
    fn register(
        &mut self,
        input: u32,
        on_pulse: PulseCallback,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        tracing::debug!(input, "simulated input registered");
        relock(&*self.callbacks).insert(input, Arc::new(Mutex::new(on_pulse)));
        Ok(())
    }
}

#[derive(Clone)]
pub struct SimHandle {
    callbacks: Callbacks,
}

impl SimHandle {
    /// Fire one pulse on `input`.
    pub fn pulse(&self, input: u32, timestamp_ms: Option<u64>) -> Result<(), HwError> {
        let cb = relock(&*self.callbacks)
            .get(&input)
            .cloned()
            .ok_or(HwError::UnknownInput(input))?;
        let mut on_pulse = relock(&*cb);
        (*on_pulse)(timestamp_ms);
        Ok(())
    }

    /// Fire `count` pulses on `input`, sleeping `spacing` between them.
    pub fn burst(&self, input: u32, count: u32, spacing: Duration) -> Result<(), HwError> {
        for i in 0..count {
            self.pulse(input, None)?;
            if i + 1 < count && !spacing.is_zero() {
                std::thread::sleep(spacing);
            }
        }
        Ok(())
    }

    /// Run [`SimHandle::burst`] on a background thread.
    pub fn spawn_burst(
        &self,
        input: u32,
        count: u32,
        spacing: Duration,
    ) -> std::thread::JoinHandle<Result<(), HwError>> {
        let handle = self.clone();
        std::thread::spawn(move || handle.burst(input, count, spacing))
    }
}

/// Indicator that only records its state. Clones observe the same state.
#[derive(Debug, Clone, Default)]
pub struct SimulatedIndicator {
    lit: Arc<AtomicBool>,
    switched_on: Arc<AtomicU32>,
}

impl SimulatedIndicator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_on(&self) -> bool {
        self.lit.load(Ordering::Relaxed)
    }

    /// How many times the indicator went from off to on.
    pub fn times_switched_on(&self) -> u32 {
        self.switched_on.load(Ordering::Relaxed)
    }
}

impl Indicator for SimulatedIndicator {
    fn on(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if !self.lit.swap(true, Ordering::Relaxed) {
            self.switched_on.fetch_add(1, Ordering::Relaxed);
            tracing::trace!("indicator on (simulated)");
        }
        Ok(())
    }

    fn off(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if self.lit.swap(false, Ordering::Relaxed) {
            tracing::trace!("indicator off (simulated)");
        }
        Ok(())
    }
}
