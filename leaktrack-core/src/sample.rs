//! Flow samples and the builder that stamps them
//!
//! A [`FlowSample`] is one channel's measurement for one window. It is
//! constructed in one go with every field supplied and never modified
//! afterwards; the publisher serializes it and drops it.
//!
//! With the `serde` feature the sample serializes to the record shape the
//! remote store expects, fields in this order:
//!
//! ```json
//! {
//!   "NomeDoSensor": "Sensor1",
//!   "date": "Thursday, March 14 2024 09:26:53",
//!   "PosicaoDoSensor": "1 andar",
//!   "litrosPorMin": 10.0,
//!   "qtdAguaTotal": 600.0
//! }
//! ```

use core::fmt::{self, Write};

use chrono::NaiveDateTime;
use heapless::String;

use crate::channel::Channel;
use crate::constants::TIMESTAMP_CAPACITY;
use crate::errors::{FlowError, FlowResult};
use crate::sampler::{FlowMeasurement, SamplerConfig, WindowReading};
use crate::time::WallClock;

/// strftime pattern for sample timestamps: weekday, month, day, year, 24h time
pub const TIMESTAMP_FORMAT: &str = "%A, %B %d %Y %H:%M:%S";

/// Inline formatted timestamp
pub type TimestampString = String<TIMESTAMP_CAPACITY>;

/// One channel's measurement for one cadence window
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct FlowSample {
    #[cfg_attr(feature = "serde", serde(rename = "NomeDoSensor"))]
    sensor_name: &'static str,
    #[cfg_attr(feature = "serde", serde(rename = "date"))]
    timestamp: TimestampString,
    #[cfg_attr(feature = "serde", serde(rename = "PosicaoDoSensor"))]
    position: &'static str,
    #[cfg_attr(feature = "serde", serde(rename = "litrosPorMin"))]
    rate_per_minute: f32,
    #[cfg_attr(feature = "serde", serde(rename = "qtdAguaTotal"))]
    cumulative_volume: f32,
}

impl FlowSample {
    /// Assemble a sample from already-computed parts
    pub fn new(
        sensor_name: &'static str,
        position: &'static str,
        timestamp: TimestampString,
        rate_per_minute: f32,
        cumulative_volume: f32,
    ) -> Self {
        Self {
            sensor_name,
            timestamp,
            position,
            rate_per_minute,
            cumulative_volume,
        }
    }

    /// Sensor identifier, `NomeDoSensor` on the wire
    pub fn sensor_name(&self) -> &'static str {
        self.sensor_name
    }

    /// Mounting position label, `PosicaoDoSensor` on the wire
    pub fn position(&self) -> &'static str {
        self.position
    }

    /// Formatted wall-clock time of the tick that produced this sample
    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    /// Flow rate in liters per minute
    pub fn rate_per_minute(&self) -> f32 {
        self.rate_per_minute
    }

    /// Volume figure for the window
    ///
    /// This is the same per-window quantity the rate is derived from, not a
    /// running total across windows.
    pub fn cumulative_volume(&self) -> f32 {
        self.cumulative_volume
    }
}

/// Write a local time with [`TIMESTAMP_FORMAT`] straight into `out`
///
/// Formatting items are streamed to the writer one by one, with no
/// intermediate buffer.
pub fn write_timestamp<W: Write>(now: &NaiveDateTime, out: &mut W) -> fmt::Result {
    now.format(TIMESTAMP_FORMAT).write_to(out)
}

/// Format a local time with [`TIMESTAMP_FORMAT`]
pub fn format_timestamp(now: &NaiveDateTime) -> FlowResult<TimestampString> {
    let mut out = TimestampString::new();
    write_timestamp(now, &mut out)
        .map_err(|_| FlowError::TimestampOverflow { capacity: TIMESTAMP_CAPACITY })?;
    Ok(out)
}

/// Builds samples from drained windows
///
/// Pure: no I/O, no shared state. The only failure besides an overlong
/// timestamp is a clock that has no time yet, which callers must treat as
/// "skip this tick for every channel".
#[derive(Debug, Clone, Copy, Default)]
pub struct SampleBuilder {
    config: SamplerConfig,
}

impl SampleBuilder {
    /// Builder applying `config`'s calibration
    pub fn new(config: SamplerConfig) -> Self {
        Self { config }
    }

    /// Build a sample for `channel` stamped with `now`
    pub fn build(
        &self,
        channel: &Channel,
        reading: WindowReading,
        now: &NaiveDateTime,
    ) -> FlowResult<FlowSample> {
        let FlowMeasurement { volume_liters, rate_per_minute } = reading.measure(&self.config);

        Ok(FlowSample::new(
            channel.sensor_name(),
            channel.position(),
            format_timestamp(now)?,
            rate_per_minute,
            volume_liters,
        ))
    }

    /// Build a sample stamped with the clock's current time
    pub fn build_now<C: WallClock>(
        &self,
        channel: &Channel,
        reading: WindowReading,
        clock: &C,
    ) -> FlowResult<FlowSample> {
        let now = clock.local_time()?;
        self.build(channel, reading, &now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{PRIMARY_CHANNEL, SECONDARY_CHANNEL};
    use crate::time::FixedClock;
    use chrono::NaiveDate;

    fn pi_day() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 14)
            .and_then(|d| d.and_hms_opt(9, 26, 53))
            .unwrap()
    }

    #[test]
    fn timestamp_pattern() {
        let formatted = format_timestamp(&pi_day()).unwrap();
        assert_eq!(formatted.as_str(), "Thursday, March 14 2024 09:26:53");
    }

    #[test]
    fn longest_timestamp_fits_inline() {
        let longest = NaiveDate::from_ymd_opt(2026, 9, 30)
            .and_then(|d| d.and_hms_opt(23, 59, 59))
            .unwrap();
        let formatted = format_timestamp(&longest).unwrap();
        assert_eq!(formatted.as_str(), "Wednesday, September 30 2026 23:59:59");
    }

    #[test]
    fn short_buffer_reports_overflow() {
        let mut out = String::<16>::new();
        assert!(write_timestamp(&pi_day(), &mut out).is_err());
        assert!(out.len() <= 16);
    }

    #[test]
    fn builds_from_reading() {
        let builder = SampleBuilder::default();
        let channel = PRIMARY_CHANNEL.channel();
        let reading = WindowReading { pulses: 600, elapsed_ms: 1_000 };

        let sample = builder.build(&channel, reading, &pi_day()).unwrap();
        assert_eq!(sample.sensor_name(), "Sensor1");
        assert_eq!(sample.position(), "1 andar");
        assert_eq!(sample.timestamp(), "Thursday, March 14 2024 09:26:53");
        assert!((sample.rate_per_minute() - 10.0).abs() < 1e-4);
        assert_eq!(sample.cumulative_volume(), 600.0);
    }

    #[test]
    fn zero_flow_is_a_sample() {
        let builder = SampleBuilder::default();
        let channel = SECONDARY_CHANNEL.channel();
        let reading = WindowReading { pulses: 0, elapsed_ms: 100 };

        let sample = builder.build(&channel, reading, &pi_day()).unwrap();
        assert_eq!(sample.rate_per_minute(), 0.0);
        assert_eq!(sample.cumulative_volume(), 0.0);
        assert_eq!(sample.sensor_name(), "Sensor2");
    }

    #[test]
    fn missing_clock_propagates() {
        let builder = SampleBuilder::default();
        let channel = PRIMARY_CHANNEL.channel();
        let reading = WindowReading { pulses: 5, elapsed_ms: 100 };

        let clock = FixedClock::unsynchronized();
        assert_eq!(
            builder.build_now(&channel, reading, &clock),
            Err(FlowError::ClockUnavailable)
        );

        clock.set(pi_day());
        assert!(builder.build_now(&channel, reading, &clock).is_ok());
    }
}
