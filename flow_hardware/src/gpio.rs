//! Raspberry Pi GPIO backends (rppal).
use std::collections::HashMap;
use std::time::{Duration, Instant};

use flow_traits::{Indicator, PulseCallback, PulseSource};
use rppal::gpio::{Gpio, InputPin, Level, OutputPin, Trigger};
use tracing::{debug, trace};

use crate::error::{HwError, Result};

fn gpio_err(e: rppal::gpio::Error) -> HwError {
    HwError::Gpio(e.to_string())
}

fn bcm_pin(input: u32) -> Result<u8> {
    u8::try_from(input).map_err(|_| HwError::InvalidPin(input))
}

/// Rising-edge pulse detection on BCM-numbered input pins.
///
/// Each registered pin keeps its `InputPin` alive for as long as the source
/// lives; dropping the source clears the interrupts.
pub struct GpioPulseSource {
    gpio: Gpio,
    pins: HashMap<u32, InputPin>,
    debounce: Duration,
    pull_up: bool,
}

impl GpioPulseSource {
    pub fn new(debounce_ms: u64, pull_up: bool) -> Result<Self> {
        let gpio = Gpio::new().map_err(gpio_err)?;
        Ok(Self {
            gpio,
            pins: HashMap::new(),
            debounce: Duration::from_millis(debounce_ms),
            pull_up,
        })
    }

    fn open_input(&self, pin: u8) -> Result<InputPin> {
        let p = self.gpio.get(pin).map_err(gpio_err)?;
        Ok(if self.pull_up {
            p.into_input_pullup()
        } else {
            p.into_input()
        })
    }
}

impl PulseSource for GpioPulseSource {
    fn register(
        &mut self,
        input: u32,
        mut on_pulse: PulseCallback,
    ) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut pin = self.open_input(bcm_pin(input)?)?;
        let debounce = self.debounce;
        let mut last_edge: Option<Instant> = None;
        pin.set_async_interrupt(Trigger::RisingEdge, move |_level: Level| {
            let now = Instant::now();
            if let Some(prev) = last_edge
                && now.saturating_duration_since(prev) < debounce
            {
                trace!(input, "edge ignored (bounce)");
                return;
            }
            last_edge = Some(now);
            on_pulse(None);
        })
        .map_err(gpio_err)?;
        debug!(input, debounce_ms = debounce.as_millis() as u64, "gpio input armed");
        self.pins.insert(input, pin);
        Ok(())
    }
}

/// Status LED on a BCM output pin.
pub struct GpioIndicator {
    pin: OutputPin,
}

impl GpioIndicator {
    pub fn new(pin: u8) -> Result<Self> {
        let gpio = Gpio::new().map_err(gpio_err)?;
        let mut out = gpio.get(pin).map_err(gpio_err)?.into_output();
        out.set_low();
        Ok(Self { pin: out })
    }
}

impl Indicator for GpioIndicator {
    fn on(&mut self) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.pin.set_high();
        Ok(())
    }

    fn off(&mut self) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.pin.set_low();
        Ok(())
    }
}
