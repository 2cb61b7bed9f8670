//! Simulated two-sensor station publishing into an in-memory store
//!
//! A background thread stands in for the GPIO interrupts and fires pulses at
//! a steady rate on both channels. Run with `RUST_LOG=debug` to see every
//! record as it is written.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use leaktrack_connectors::{MemoryStore, Station, StationConfig, StoreConnector};
use leaktrack_core::constants::{CHANNEL_COUNT, PRIMARY_CHANNEL, SECONDARY_CHANNEL};
use leaktrack_core::time::{MonotonicTime, SystemClock};
use leaktrack_core::Channel;

static CHANNELS: [Channel; CHANNEL_COUNT] = [PRIMARY_CHANNEL.channel(), SECONDARY_CHANNEL.channel()];

static RUNNING: AtomicBool = AtomicBool::new(true);

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // ~200 Hz on the first floor, ~50 Hz on the second
    let pulses = thread::spawn(|| {
        let mut step = 0u32;
        while RUNNING.load(Ordering::Relaxed) {
            CHANNELS[0].on_edge();
            if step % 4 == 0 {
                CHANNELS[1].on_edge();
            }
            step = step.wrapping_add(1);
            thread::sleep(Duration::from_millis(5));
        }
    });

    let mut station = Station::new(
        &CHANNELS,
        MonotonicTime::new(),
        SystemClock::new(),
        MemoryStore::new(),
        StationConfig::default(),
    );

    station.wait_until_ready(Some(10));
    let outcomes = station.run_for(20);

    RUNNING.store(false, Ordering::Relaxed);
    let _ = pulses.join();

    let skipped = outcomes.iter().filter(|o| o.is_skipped()).count();
    println!("{} ticks, {} skipped", outcomes.len(), skipped);

    let store = station.connector();
    for channel in &CHANNELS {
        let latest = format!("/lastData/{}/", channel.sensor_name());
        let history = format!("/sensorData/{}/", channel.sensor_name());
        println!("{} latest: {:?}", channel.sensor_name(), store.latest(&latest));
        println!("{} history entries: {}", channel.sensor_name(), store.history(&history).len());
    }
    println!("{:?}", store.stats());
}
