//! Shared fixtures for station tests

#![allow(dead_code)]

use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime};
use leaktrack_connectors::StationConfig;
use leaktrack_core::constants::{CHANNEL_COUNT, PRIMARY_CHANNEL, SECONDARY_CHANNEL};
use leaktrack_core::Channel;

pub fn channels() -> [Channel; CHANNEL_COUNT] {
    [PRIMARY_CHANNEL.channel(), SECONDARY_CHANNEL.channel()]
}

pub fn datetime(year: i32, month: u32, day: u32, h: u32, m: u32, s: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_opt(h, m, s))
        .unwrap()
}

/// No sleeping between ticks or readiness polls
pub fn fast_config() -> StationConfig {
    StationConfig::default()
        .with_cadence(Duration::ZERO)
        .with_ready_poll(Duration::ZERO)
}

pub fn pulse(channel: &Channel, edges: u32) {
    for _ in 0..edges {
        channel.on_edge();
    }
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
