//! Subcommand implementations.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use eyre::WrapErr;
use flow_core::hw_error::map_source_error;
use flow_core::mocks::NoopEvents;
use flow_core::{
    ChannelId, EventDispatcher, EventQueue, Fanout, FlowError, IdlePoller, IndicatorEvents, Meter,
    PollHook, PollerCfg, PourEvents, Timebase, wait_for_completion,
};
use flow_hardware::SimulatedPulseSource;
use flow_traits::{Indicator, PulseSource};
use serde_json::json;

use crate::printer::{ConsolePrinter, print_snapshots};

fn hw<E: std::error::Error + 'static>(e: E) -> eyre::Report {
    eyre::Report::new(map_source_error(&e))
}

/// Pulse inputs for `run` and `self-check`: GPIO when built with the
/// `hardware` feature, otherwise an idle simulator.
#[cfg(all(feature = "hardware", target_os = "linux"))]
fn open_pulse_source(cfg: &flow_config::Config) -> eyre::Result<Box<dyn PulseSource>> {
    let src = flow_hardware::gpio::GpioPulseSource::new(cfg.input.debounce_ms, cfg.input.pull_up)
        .map_err(hw)
        .wrap_err("open gpio inputs")?;
    Ok(Box::new(src))
}

#[cfg(not(all(feature = "hardware", target_os = "linux")))]
fn open_pulse_source(cfg: &flow_config::Config) -> eyre::Result<Box<dyn PulseSource>> {
    tracing::info!(
        debounce_ms = cfg.input.debounce_ms,
        "no GPIO backend in this build; using the pulse simulator"
    );
    Ok(Box::new(SimulatedPulseSource::new()))
}

type IndicatorParts = (Arc<dyn PourEvents>, Arc<dyn PollHook>);

/// The LED listener lights on pulses; its poll hook turns it off once flow stops.
fn indicator_parts<I: Indicator + Send + 'static>(led: I, hold_ms: u64) -> IndicatorParts {
    let events = Arc::new(IndicatorEvents::new(led).with_hold(Duration::from_millis(hold_ms)));
    (events.clone(), events)
}

/// Status LED wiring, if `[indicator] pin` is set.
fn indicator_events(cfg: &flow_config::Config) -> eyre::Result<Option<IndicatorParts>> {
    let Some(pin) = cfg.indicator.pin else {
        return Ok(None);
    };
    let hold_ms = cfg.indicator.hold_ms;
    #[cfg(all(feature = "hardware", target_os = "linux"))]
    {
        let led = flow_hardware::gpio::GpioIndicator::new(pin)
            .map_err(hw)
            .wrap_err_with(|| format!("open indicator pin {pin}"))?;
        Ok(Some(indicator_parts(led, hold_ms)))
    }
    #[cfg(not(all(feature = "hardware", target_os = "linux")))]
    {
        tracing::debug!(pin, hold_ms, "indicator is simulated");
        Ok(Some(indicator_parts(
            flow_hardware::SimulatedIndicator::new(),
            hold_ms,
        )))
    }
}

/// Everything listening to a meter from the CLI.
struct Listeners {
    fan: Fanout,
    dispatcher: EventDispatcher,
    hooks: Vec<Arc<dyn PollHook>>,
}

/// Console printer on its own thread, plus the LED when configured.
fn console_listeners(cfg: &flow_config::Config, json: bool) -> eyre::Result<Listeners> {
    let (printer, dispatcher) = EventDispatcher::spawn(ConsolePrinter::new(cfg, json));
    let mut fan = Fanout::new().with(Arc::new(printer));
    let mut hooks = Vec::new();
    if let Some((led, hook)) = indicator_events(cfg)? {
        fan = fan.with(led);
        hooks.push(hook);
    }
    Ok(Listeners {
        fan,
        dispatcher,
        hooks,
    })
}

pub fn run_meter(
    cfg: &flow_config::Config,
    duration_ms: Option<u64>,
    json: bool,
) -> eyre::Result<()> {
    let Listeners {
        fan,
        dispatcher,
        hooks,
    } = console_listeners(cfg, json)?;
    let meter = Arc::new(Meter::from_config(
        cfg,
        Arc::new(fan),
        Timebase::monotonic(),
    )?);

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let flag = shutdown.clone();
        ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed))
            .wrap_err("install Ctrl-C handler")?;
    }
    if let Some(ms) = duration_ms {
        let flag = shutdown.clone();
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(ms));
            flag.store(true, Ordering::Relaxed);
        });
    }

    let mut source = open_pulse_source(cfg)?;
    let snaps = flow_core::run(
        meter,
        source.as_mut(),
        PollerCfg::from(&cfg.poller),
        hooks,
        &shutdown,
    )?;
    // flush pending event lines before the summary
    drop(dispatcher);
    print_snapshots(&snaps, json);
    Ok(())
}

pub fn simulate(
    cfg: &flow_config::Config,
    channel: u32,
    pulses: u32,
    spacing_ms: u64,
    timeout_ms: u64,
    json: bool,
) -> eyre::Result<()> {
    let id = ChannelId(channel);
    let (waiter, rx) = EventQueue::unbounded();
    let Listeners {
        fan,
        dispatcher,
        hooks,
    } = console_listeners(cfg, json)?;
    let fan = fan.with(Arc::new(waiter));
    let meter = Arc::new(Meter::from_config(
        cfg,
        Arc::new(fan),
        Timebase::monotonic(),
    )?);
    if meter.channel(id).is_none() {
        return Err(eyre::Report::new(FlowError::UnknownChannel(id)));
    }

    let mut source = SimulatedPulseSource::new();
    meter.bind(&mut source)?;
    let poller =
        IdlePoller::spawn_with_hooks(meter.clone(), PollerCfg::from(&cfg.poller), hooks);

    tracing::info!(channel = %id, pulses, spacing_ms, "injecting simulated pulses");
    source
        .handle()
        .burst(channel, pulses, Duration::from_millis(spacing_ms))
        .map_err(hw)?;
    let waited = wait_for_completion(&rx, id, Duration::from_millis(timeout_ms));

    drop(poller);
    drop(dispatcher);
    waited?;
    if let Some(ch) = meter.channel(id) {
        print_snapshots(&[ch.snapshot()], json);
    }
    Ok(())
}

pub fn self_check(cfg: &flow_config::Config, json: bool) -> eyre::Result<()> {
    let meter = Meter::from_config(cfg, Arc::new(NoopEvents), Timebase::monotonic())?;
    let mut source = open_pulse_source(cfg)?;
    meter.bind(source.as_mut())?;
    let _led = indicator_events(cfg)?;

    if json {
        let channels: Vec<_> = meter
            .channels()
            .map(|ch| {
                let m = ch.cfg();
                json!({
                    "channel": ch.id().0,
                    "name": ch.name(),
                    "frequency_constant": m.frequency_constant,
                    "min_pour_volume_l": m.min_pour_volume,
                    "idle_timeout_ms": m.idle_timeout_ms,
                })
            })
            .collect();
        println!("{}", json!({ "status": "ok", "channels": channels }));
    } else {
        println!("ok");
        for ch in meter.channels() {
            let m = ch.cfg();
            println!(
                "channel {} ({}): k={} min={} L idle={} ms",
                ch.id(),
                ch.name(),
                m.frequency_constant,
                m.min_pour_volume,
                m.idle_timeout_ms
            );
        }
    }
    Ok(())
}
