//! End-to-end cadence loop tests against the in-memory store

mod common;

use common::{channels, datetime, fast_config, init_logging, pulse};
use leaktrack_connectors::memory::WriteOp;
use leaktrack_connectors::{
    ChannelOutcome, MemoryStore, PublishError, Station, StorePaths, StoreConnector, TickOutcome,
};
use leaktrack_core::time::{FixedClock, FixedTime};
use leaktrack_core::{FlowError, SamplerConfig};
use serde_json::{json, Value};

#[test]
fn steady_flow_reaches_both_paths() {
    init_logging();
    let channels = channels();
    let time = FixedTime::new(10_000);
    let clock = FixedClock::at(datetime(2024, 3, 14, 9, 26, 53));
    let mut station = Station::new(&channels, &time, &clock, MemoryStore::new(), fast_config());

    pulse(&channels[0], 600);
    time.advance(1_000);
    station.tick();

    let store = station.connector();
    let expected = json!({
        "NomeDoSensor": "Sensor1",
        "date": "Thursday, March 14 2024 09:26:53",
        "PosicaoDoSensor": "1 andar",
        "litrosPorMin": 10.0,
        "qtdAguaTotal": 600.0,
    });
    assert_eq!(store.latest("/lastData/Sensor1/"), Some(&expected));
    assert_eq!(store.history("/sensorData/Sensor1/")[0].1, expected);

    // Raw body keeps the field order
    let body = &store.calls()[0].body;
    let order: Vec<_> = ["NomeDoSensor", "date", "PosicaoDoSensor", "litrosPorMin", "qtdAguaTotal"]
        .iter()
        .map(|k| body.find(k).unwrap())
        .collect();
    assert!(order.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn idle_sensor_still_publishes_zero() {
    let channels = channels();
    let time = FixedTime::new(0);
    let clock = FixedClock::at(datetime(2024, 3, 14, 9, 26, 53));
    let mut station = Station::new(&channels, &time, &clock, MemoryStore::new(), fast_config());

    time.advance(100);
    station.tick();

    let latest = station.connector().latest("/lastData/Sensor2/").unwrap();
    assert_eq!(latest["litrosPorMin"], json!(0.0));
    assert_eq!(latest["qtdAguaTotal"], json!(0.0));
    assert_eq!(latest["PosicaoDoSensor"], json!("2 andar"));
}

#[test]
fn history_failure_does_not_stop_the_loop() {
    init_logging();
    let channels = channels();
    let time = FixedTime::new(0);
    let clock = FixedClock::at(datetime(2024, 3, 14, 9, 26, 53));
    let mut store = MemoryStore::new();
    store.fail_appends("Permission denied");
    let mut station = Station::new(&channels, &time, &clock, &mut store, fast_config());

    pulse(&channels[0], 60);
    time.advance(100);
    let outcome = station.tick();

    for report in outcome.reports() {
        let publish = report.publish_report().unwrap();
        assert!(publish.latest.is_ok());
        assert_eq!(
            publish.history,
            Err(PublishError::Store("Write rejected: Permission denied".into()))
        );
    }

    // Both channels still got their latest value
    assert!(station.connector().latest("/lastData/Sensor1/").is_some());
    assert!(station.connector().latest("/lastData/Sensor2/").is_some());

    station.connector_mut().heal();
    pulse(&channels[0], 30);
    time.advance(100);
    clock.advance_secs(1);
    let outcome = station.tick();
    assert!(outcome.reports().iter().all(|r| r.publish_report().unwrap().is_complete()));

    drop(station);
    assert_eq!(store.history("/sensorData/Sensor1/").len(), 1);
    let latest = store.latest("/lastData/Sensor1/").unwrap();
    assert_eq!(latest["date"], json!("Thursday, March 14 2024 09:26:54"));
    assert_eq!(latest["qtdAguaTotal"], json!(300.0));
}

#[test]
fn unsynchronized_clock_publishes_nothing() {
    let channels = channels();
    let time = FixedTime::new(0);
    let clock = FixedClock::unsynchronized();
    let mut station = Station::new(&channels, &time, &clock, MemoryStore::new(), fast_config());

    pulse(&channels[0], 50);
    for _ in 0..5 {
        time.advance(100);
        assert_eq!(station.tick(), TickOutcome::Skipped(FlowError::ClockUnavailable));
    }

    assert!(station.connector().calls().is_empty());
    assert_eq!(channels[0].counter().pending(), 50);
    assert_eq!(station.skipped_ticks(), 5);

    // NTP lands: one window covering all five skipped ticks
    clock.set(datetime(2024, 3, 14, 9, 26, 53));
    time.advance(100);
    let outcome = station.tick();
    let reading = outcome.reports()[0].reading;
    assert_eq!((reading.pulses, reading.elapsed_ms), (50, 600));
}

#[test]
fn clock_before_sync_threshold_is_unavailable() {
    let channels = channels();
    let clock = FixedClock::at(datetime(1970, 1, 1, 0, 0, 12));
    let mut station =
        Station::new(&channels, FixedTime::new(0), &clock, MemoryStore::new(), fast_config());

    assert!(station.tick().is_skipped());
}

#[test]
fn latest_is_idempotent_history_grows() {
    let channels = channels();
    let time = FixedTime::new(0);
    let clock = FixedClock::at(datetime(2024, 3, 14, 9, 26, 53));
    let mut station = Station::new(&channels, &time, &clock, MemoryStore::new(), fast_config());

    for _ in 0..4 {
        pulse(&channels[1], 120);
        time.advance(1_000);
        station.tick();
    }

    let store = station.connector();
    let history = store.history("/sensorData/Sensor2/");
    assert_eq!(history.len(), 4);
    assert_eq!(store.latest("/lastData/Sensor2/"), Some(&history[3].1));

    let keys: Vec<&String> = history.iter().map(|(k, _)| k).collect();
    let mut sorted = keys.clone();
    sorted.sort();
    sorted.dedup();
    assert_eq!(keys, sorted);

    let overwrites = store.calls().iter().filter(|c| c.op == WriteOp::Overwrite).count();
    assert_eq!(overwrites, 8);
}

#[test]
fn disconnected_store_reports_every_write() {
    let channels = channels();
    let time = FixedTime::new(0);
    let clock = FixedClock::at(datetime(2024, 3, 14, 9, 26, 53));
    let mut store = MemoryStore::new();
    store.set_connected(false);
    let mut station = Station::new(&channels, &time, &clock, &mut store, fast_config());

    assert!(!station.wait_until_ready(Some(2)));
    time.advance(100);
    let outcome = station.tick();

    assert_eq!(outcome.reports().len(), 2);
    for report in outcome.reports() {
        assert!(matches!(report.outcome, ChannelOutcome::Published { .. }));
        assert_eq!(report.publish_report().unwrap().failures(), 2);
    }
    assert_eq!(station.connector().stats().messages_failed, 4);
}

#[test]
fn custom_paths_and_calibration() {
    let channels = channels();
    let time = FixedTime::new(0);
    let clock = FixedClock::at(datetime(2024, 3, 14, 9, 26, 53));
    let config = fast_config()
        .with_paths(StorePaths::new("/site-7/latest", "/site-7/history"))
        .with_sampler(SamplerConfig::default().with_liters_per_pulse(0.5));
    let mut station = Station::new(&channels, &time, &clock, MemoryStore::new(), config);

    pulse(&channels[0], 600);
    time.advance(1_000);
    station.tick();

    let store = station.connector();
    let latest: &Value = store.latest("/site-7/latest/Sensor1/").unwrap();
    assert_eq!(latest["litrosPorMin"], json!(5.0));
    assert_eq!(latest["qtdAguaTotal"], json!(300.0));
    assert_eq!(store.history("/site-7/history/Sensor1/").len(), 1);
}

#[test]
fn edges_during_ticks_are_never_lost() {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;

    const EDGES: u32 = 50_000;

    let channels = channels();
    let time = FixedTime::new(0);
    let clock = FixedClock::at(datetime(2024, 3, 14, 9, 26, 53));
    let done = AtomicBool::new(false);
    let mut published = 0u64;

    // Time stays on this thread; the spawned one only fires edges
    let mut station = Station::new(&channels, &time, &clock, MemoryStore::new(), fast_config());

    thread::scope(|s| {
        s.spawn(|| {
            for _ in 0..EDGES {
                channels[0].on_edge();
            }
            done.store(true, Ordering::Release);
        });

        loop {
            let finished = done.load(Ordering::Acquire);
            time.advance(100);
            published += station.tick().reports()[0].reading.pulses as u64;
            if finished {
                break;
            }
        }
    });

    assert_eq!(published, EDGES as u64);
}
