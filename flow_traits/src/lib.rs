pub mod clock;

pub use clock::{Clock, MonotonicClock};

/// Callback fired by a pulse source on every detected pulse.
///
/// The argument is an optional timestamp in milliseconds; `None` asks the
/// receiver to stamp the pulse with its own clock.
pub type PulseCallback = Box<dyn FnMut(Option<u64>) + Send + 'static>;

/// Something that detects pulses on numbered inputs (GPIO pins, a simulator, ...).
pub trait PulseSource {
    /// Bind `input` to `on_pulse`. Registering the same input twice replaces
    /// the previous callback.
    fn register(
        &mut self,
        input: u32,
        on_pulse: PulseCallback,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Binary visual indicator (status LED).
pub trait Indicator {
    fn on(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
    fn off(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}
