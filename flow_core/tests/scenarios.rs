//! End-to-end pour scenarios on a virtual clock.
//!
//! Every test drives time explicitly, so completion happens exactly when the
//! idle timeout has elapsed and never because the machine running the test
//! was slow.

use std::sync::Arc;

use flow_core::mocks::RecordingEvents;
use flow_core::{ChannelId, MeterCfg, PourEvent, PourPhase, SensorChannel, Timebase};
use flow_traits::clock::test_clock::TestClock;

const BEER: ChannelId = ChannelId(22);

fn beer(rec: Arc<RecordingEvents>, clock: &TestClock) -> SensorChannel {
    SensorChannel::builder()
        .with_input(BEER, "Beer")
        .with_events(rec)
        .with_timebase(Timebase::new(clock.clone()))
        .build()
        .expect("valid channel")
}

#[test]
fn fifty_pulses_make_one_pour() {
    let clock = TestClock::new();
    let rec = Arc::new(RecordingEvents::new());
    let ch = beer(rec.clone(), &clock);

    for _ in 0..50 {
        ch.on_pulse(None);
        clock.advance_ms(2);
    }
    // last pulse landed at 98 ms
    clock.set_offset(std::time::Duration::from_millis(2_098));
    assert!(!ch.check_completion_now(), "exactly the timeout is not enough");

    clock.set_offset(std::time::Duration::from_millis(2_200));
    assert!(ch.check_completion_now());

    assert_eq!(rec.count_started(BEER), 1);
    assert_eq!(rec.count_pulses(BEER), 50);
    let done = rec.completions(BEER);
    assert_eq!(done.len(), 1);
    let (volume, total) = done[0];
    assert!((volume - 0.1111).abs() < 1e-4, "volume {volume}");
    assert!((total - volume).abs() < 1e-12);

    let snap = ch.snapshot();
    assert_eq!(snap.phase, PourPhase::Idle);
    assert_eq!(snap.pulses, 0);
    assert_eq!(snap.volume, 0.0);
}

#[test]
fn single_pulse_never_completes() {
    let clock = TestClock::new();
    let rec = Arc::new(RecordingEvents::new());
    let ch = beer(rec.clone(), &clock);

    ch.on_pulse(None);
    for _ in 0..10 {
        clock.advance_ms(60_000);
        assert!(!ch.check_completion_now());
    }
    assert!(rec.completions(BEER).is_empty());
    assert_eq!(ch.snapshot().phase, PourPhase::Active);
    assert_eq!(ch.snapshot().pulses, 1);
}

#[test]
fn below_minimum_pour_keeps_accumulating_into_next_burst() {
    let clock = TestClock::new();
    let rec = Arc::new(RecordingEvents::new());
    let ch = beer(rec.clone(), &clock);

    // 40 pulses is ~0.0889 L, under the 0.1 L minimum
    for t in 0..40 {
        ch.on_pulse(Some(t));
    }
    assert!(!ch.check_completion(10_000));

    // a later burst continues the same pour; no second "started"
    for t in 0..10 {
        ch.on_pulse(Some(20_000 + t));
    }
    assert_eq!(rec.count_started(BEER), 1);
    assert!(ch.check_completion(22_100));
    let (volume, _) = rec.completions(BEER)[0];
    assert!((volume - 50.0 / 450.0).abs() < 1e-9);
}

#[test]
fn consecutive_pours_accumulate_total() {
    let clock = TestClock::new();
    let rec = Arc::new(RecordingEvents::new());
    let ch = beer(rec.clone(), &clock);

    for t in 0..90 {
        ch.on_pulse(Some(t));
    }
    assert!(ch.check_completion(5_000));
    // 45 pulses would be exactly 0.1 L, which does not exceed the minimum
    for t in 0..46 {
        ch.on_pulse(Some(10_000 + t));
    }
    assert!(ch.check_completion(15_000));

    let done = rec.completions(BEER);
    assert_eq!(done.len(), 2);
    assert!((done[0].0 - 0.2).abs() < 1e-9);
    assert!((done[1].0 - 46.0 / 450.0).abs() < 1e-9);
    assert!((done[1].1 - 136.0 / 450.0).abs() < 1e-9);
    assert_eq!(rec.count_started(BEER), 2);
    assert_eq!(ch.snapshot().pour_count, 2);
}

#[test]
fn second_check_is_a_no_op() {
    let rec = Arc::new(RecordingEvents::new());
    let ch = beer(rec.clone(), &TestClock::new());
    for t in 0..60 {
        ch.on_pulse(Some(t));
    }
    assert!(ch.check_completion(3_000));
    assert!(!ch.check_completion(3_000));
    assert!(!ch.check_completion(9_000));
    assert_eq!(rec.completions(BEER).len(), 1);
}

#[test]
fn events_are_ordered_started_pulses_complete() {
    let rec = Arc::new(RecordingEvents::new());
    let ch = beer(rec.clone(), &TestClock::new());
    for t in 0..50 {
        ch.on_pulse(Some(t * 10));
    }
    ch.check_completion(10_000);

    let evs = rec.events();
    assert!(matches!(evs.first(), Some(PourEvent::Started { .. })));
    assert!(matches!(evs.last(), Some(PourEvent::Complete { .. })));
    let mut last = 0.0;
    for ev in &evs[1..evs.len() - 1] {
        match ev {
            PourEvent::Pulse { volume, .. } => {
                assert!(*volume > last, "pulse volume must grow");
                last = *volume;
            }
            other => panic!("unexpected event {other:?}"),
        }
    }
}

#[test]
fn custom_constants_change_the_boundary() {
    let rec = Arc::new(RecordingEvents::new());
    let ch = SensorChannel::builder()
        .with_input(1u32, "Water")
        .with_events(rec.clone())
        .with_meter(MeterCfg {
            frequency_constant: 1.0,
            min_pour_volume: 0.5,
            idle_timeout_ms: 100,
        })
        .build()
        .unwrap();
    // 1 pulse = 1/60 L; 30 pulses = exactly 0.5, which is not > 0.5
    for t in 0..30 {
        ch.on_pulse(Some(t));
    }
    assert!(!ch.check_completion(1_000));
    ch.on_pulse(Some(1_000));
    assert!(!ch.check_completion(1_100));
    assert!(ch.check_completion(1_101));
}

#[test]
fn stale_timestamps_do_not_rewind_idle_time() {
    let rec = Arc::new(RecordingEvents::new());
    let ch = beer(rec.clone(), &TestClock::new());
    for t in 0..50 {
        ch.on_pulse(Some(5_000 + t));
    }
    // an out-of-order pulse from the past
    ch.on_pulse(Some(10));
    assert_eq!(ch.snapshot().last_pulse_ms, 5_049);
    assert!(!ch.check_completion(7_049));
    assert!(ch.check_completion(7_050));
}
