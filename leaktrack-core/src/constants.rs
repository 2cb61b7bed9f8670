//! Constants for LeakTrack
//!
//! Reference board wiring, cadence and unit conversions in one place.
//! Values follow the deployed two-floor installation (ESP32 DevKit, two
//! hall-effect flow sensors on GPIO 4 and 5).

use crate::channel::Channel;

// ===== CHANNELS =====

/// Number of flow sensor channels the station drives.
pub const CHANNEL_COUNT: usize = 2;

/// Static description of a channel, usable to build the `static` channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelSpec {
    /// GPIO number wired to the sensor output
    pub pin: u8,
    /// Sensor identifier
    pub sensor_name: &'static str,
    /// Mounting position label
    pub position: &'static str,
}

impl ChannelSpec {
    /// Build a fresh channel from this description
    pub const fn channel(&self) -> Channel {
        Channel::new(self.pin, self.sensor_name, self.position)
    }
}

/// First-floor sensor on GPIO 4.
pub const PRIMARY_CHANNEL: ChannelSpec = ChannelSpec {
    pin: 4,
    sensor_name: "Sensor1",
    position: "1 andar",
};

/// Second-floor sensor on GPIO 5.
pub const SECONDARY_CHANNEL: ChannelSpec = ChannelSpec {
    pin: 5,
    sensor_name: "Sensor2",
    position: "2 andar",
};

// ===== TIMING =====

/// Delay between cadence ticks (ms).
///
/// The loop is paced by a plain delay, not a timer: a slow publish stretches
/// the next window, and the rate formula absorbs that through elapsed time.
pub const CADENCE_MS: u64 = 100;

/// Milliseconds per second.
pub const MS_PER_SECOND: f64 = 1000.0;

/// Seconds per minute.
pub const SECONDS_PER_MINUTE: f64 = 60.0;

// ===== CLOCK =====

/// Local time offset east of UTC (s). UTC-3, Brasília.
pub const UTC_OFFSET_SECS: i32 = -10_800;

/// Daylight saving offset (s). Not observed at the deployment site.
pub const DAYLIGHT_OFFSET_SECS: i32 = 0;

/// Wall clock readings before this year mean NTP has not synced yet.
///
/// An unsynced RTC starts at the 1970 epoch; anything before 2016 is
/// rejected the same way the ESP-IDF `getLocalTime` helper does.
pub const SYNCHRONIZED_AFTER_YEAR: i32 = 2016;

/// Capacity of the inline formatted timestamp (bytes).
///
/// Longest output is ~37 bytes ("Wednesday, September 30 2026 23:59:59").
pub const TIMESTAMP_CAPACITY: usize = 64;

// ===== CALIBRATION =====

/// Liters represented by one pulse-per-second unit of flow.
///
/// 1.0 keeps the raw pulse frequency as the reported flow.
pub const LITERS_PER_PULSE: f64 = 1.0;
