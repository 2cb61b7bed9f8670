//! Station publishing to a Firebase Realtime Database
//!
//! ```text
//! FIREBASE_HOST=https://<project>.firebaseio.com \
//! FIREBASE_AUTH=<database secret> \
//! cargo run -p leaktrack-connectors --example 02_rtdb_station
//! ```
//!
//! There are no real sensors on a host machine: pulses are simulated the
//! same way as in `01_simulated_station`. The loop runs until interrupted.

use std::env;
use std::process;
use std::thread;
use std::time::Duration;

use leaktrack_connectors::{RtdbConfig, RtdbConnector, Station, StationConfig};
use leaktrack_core::constants::{CHANNEL_COUNT, PRIMARY_CHANNEL, SECONDARY_CHANNEL};
use leaktrack_core::time::{MonotonicTime, SystemClock};
use leaktrack_core::Channel;
use log::error;

static CHANNELS: [Channel; CHANNEL_COUNT] = [PRIMARY_CHANNEL.channel(), SECONDARY_CHANNEL.channel()];

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let Ok(host) = env::var("FIREBASE_HOST") else {
        error!("FIREBASE_HOST is not set");
        process::exit(2);
    };

    let mut config = RtdbConfig::new(host);
    if let Ok(token) = env::var("FIREBASE_AUTH") {
        config = config.legacy_token(token);
    }

    let rtdb = match RtdbConnector::new(config) {
        Ok(rtdb) => rtdb,
        Err(e) => {
            error!("{}", e);
            process::exit(2);
        }
    };

    thread::spawn(|| loop {
        CHANNELS[0].on_edge();
        thread::sleep(Duration::from_millis(10));
    });

    let mut station = Station::new(
        &CHANNELS,
        MonotonicTime::new(),
        SystemClock::new(),
        rtdb,
        StationConfig::default(),
    );

    station.wait_until_ready(None);
    station.run()
}
