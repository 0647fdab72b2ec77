//! Pulses and idle checks racing on the same channels.
//!
//! Whatever the interleaving, no pulse may be lost or counted twice: the
//! pulses of every completed pour plus the pulses of the pour still open
//! must add up to the number fired.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use flow_core::mocks::RecordingEvents;
use flow_core::{ChannelId, Meter, MeterCfg, PourEvent, SensorChannel};

const THREADS: u64 = 8;
const PULSES_PER_THREAD: u64 = 2_000;

fn channel(id: u32, rec: Arc<RecordingEvents>) -> SensorChannel {
    SensorChannel::builder()
        .with_input(id, format!("tap-{id}"))
        .with_events(rec)
        .with_meter(MeterCfg {
            idle_timeout_ms: 1,
            min_pour_volume: 0.01,
            ..MeterCfg::default()
        })
        .build()
        .unwrap()
}

#[test]
fn no_pulse_is_lost_under_contention() {
    let rec = Arc::new(RecordingEvents::new());
    let meter = Arc::new(Meter::new(vec![channel(1, rec.clone()), channel(2, rec.clone())]).unwrap());
    let stop = Arc::new(AtomicBool::new(false));

    // Checker hammers completion with a "now" far ahead so pours close often.
    let checker = {
        let meter = meter.clone();
        let stop = stop.clone();
        thread::spawn(move || {
            let mut completed = Vec::new();
            let mut now = 10u64;
            while !stop.load(Ordering::Relaxed) {
                now += 10;
                completed.extend(meter.poll(now));
            }
            completed
        })
    };

    let producers: Vec<_> = (0..THREADS)
        .map(|i| {
            let meter = meter.clone();
            thread::spawn(move || {
                let id = ChannelId(1 + (i % 2) as u32);
                for t in 0..PULSES_PER_THREAD {
                    meter.on_pulse(id, Some(t)).unwrap();
                }
            })
        })
        .collect();
    for p in producers {
        p.join().unwrap();
    }
    stop.store(true, Ordering::Relaxed);
    let completed = checker.join().unwrap();

    for id in [ChannelId(1), ChannelId(2)] {
        let snap = meter.channel(id).unwrap().snapshot();
        let in_pours: u64 = completed
            .iter()
            .filter(|(c, _)| *c == id)
            .map(|(_, s)| s.pulses)
            .sum();
        let fired = PULSES_PER_THREAD * THREADS / 2;
        assert_eq!(in_pours + snap.pulses, fired, "channel {id}");
        assert_eq!(snap.lifetime_pulses, fired);
        assert_eq!(rec.count_pulses(id) as u64, fired);
        assert_eq!(rec.completions(id).len() as u64, snap.pour_count);
    }
}

#[test]
fn per_channel_events_stay_well_formed() {
    let rec = Arc::new(RecordingEvents::new());
    let meter = Arc::new(Meter::new(vec![channel(7, rec.clone())]).unwrap());

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let meter = meter.clone();
            thread::spawn(move || {
                for t in 0..1_000u64 {
                    meter.on_pulse(ChannelId(7), Some(t)).unwrap();
                    if t % 50 == 0 {
                        meter.poll(t + 5_000);
                    }
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    // Started and Complete must alternate, starting with Started.
    let mut open = false;
    for ev in rec.events() {
        match ev {
            PourEvent::Started { .. } => {
                assert!(!open, "started twice without completing");
                open = true;
            }
            PourEvent::Pulse { .. } => assert!(open, "pulse outside a pour"),
            PourEvent::Complete { .. } => {
                assert!(open, "completed a pour that never started");
                open = false;
            }
        }
    }
}
