//! Cadence loop: measure both channels, publish, wait, repeat
//!
//! ## Tick
//!
//! ```text
//! local_time ──Err──▶ Skipped (nothing drained, epoch kept)
//!     │Ok
//!     ▼
//! close_window ──▶ drain Sensor1, drain Sensor2 ──▶ log flows
//!     ──▶ build + publish Sensor1 ──▶ build + publish Sensor2
//! ```
//!
//! The clock is checked before the window closes, so a tick skipped for an
//! unsynchronized clock leaves every pulse in its counter and the next tick
//! covers the whole longer window.
//!
//! Publishing blocks. There is no attempt to keep a fixed period: the delay
//! between ticks is added after however long the tick took, and whatever
//! the stall was shows up as a longer elapsed time in the next window.

use std::thread;
use std::time::Duration;

use leaktrack_core::constants::{CADENCE_MS, CHANNEL_COUNT};
use leaktrack_core::time::{TimeSource, WallClock};
use leaktrack_core::{
    Channel, FlowError, FlowSample, RateSampler, SampleBuilder, SamplerConfig, WindowReading,
};
use log::{debug, info, warn};

use crate::publisher::{PublishReport, Publisher, StorePaths};
use crate::StoreConnector;

/// Delay between readiness checks while waiting for the store
pub const READY_POLL_MS: u64 = 500;

/// Station configuration
#[derive(Debug, Clone, PartialEq)]
pub struct StationConfig {
    /// Delay added after every tick
    pub cadence: Duration,
    /// Delay between connection checks in [`Station::wait_until_ready`]
    pub ready_poll: Duration,
    /// Store layout
    pub paths: StorePaths,
    /// Flow calibration
    pub sampler: SamplerConfig,
}

impl StationConfig {
    pub fn with_cadence(mut self, cadence: Duration) -> Self {
        self.cadence = cadence;
        self
    }

    pub fn with_ready_poll(mut self, ready_poll: Duration) -> Self {
        self.ready_poll = ready_poll;
        self
    }

    pub fn with_paths(mut self, paths: StorePaths) -> Self {
        self.paths = paths;
        self
    }

    pub fn with_sampler(mut self, sampler: SamplerConfig) -> Self {
        self.sampler = sampler;
        self
    }
}

impl Default for StationConfig {
    fn default() -> Self {
        Self {
            cadence: Duration::from_millis(CADENCE_MS),
            ready_poll: Duration::from_millis(READY_POLL_MS),
            paths: StorePaths::default(),
            sampler: SamplerConfig::default(),
        }
    }
}

/// What happened to one channel during a tick
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelOutcome {
    /// Sample built and both writes attempted
    Published {
        sample: FlowSample,
        report: PublishReport,
    },
    /// Sample could not be built; nothing was written for this channel
    BuildFailed(FlowError),
}

/// Per-channel result of a completed tick
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelReport {
    pub sensor_name: &'static str,
    pub reading: WindowReading,
    pub outcome: ChannelOutcome,
}

impl ChannelReport {
    /// Sample built for this channel, if any
    pub fn sample(&self) -> Option<&FlowSample> {
        match &self.outcome {
            ChannelOutcome::Published { sample, .. } => Some(sample),
            ChannelOutcome::BuildFailed(_) => None,
        }
    }

    /// Publish outcome for this channel, if a sample was built
    pub fn publish_report(&self) -> Option<&PublishReport> {
        match &self.outcome {
            ChannelOutcome::Published { report, .. } => Some(report),
            ChannelOutcome::BuildFailed(_) => None,
        }
    }
}

/// Result of one tick
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// Nothing drained or published
    Skipped(FlowError),
    /// Every channel was drained, one report per channel in channel order
    Completed(Vec<ChannelReport>),
}

impl TickOutcome {
    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped(_))
    }

    /// Channel reports; empty for a skipped tick
    pub fn reports(&self) -> &[ChannelReport] {
        match self {
            Self::Skipped(_) => &[],
            Self::Completed(reports) => reports,
        }
    }
}

/// Drives sampling and publishing for a fixed set of channels
///
/// Type parameters: `T` measures window lengths, `K` stamps samples, `C`
/// carries records to the store.
pub struct Station<'a, T: TimeSource, K: WallClock, C: StoreConnector> {
    channels: &'a [Channel; CHANNEL_COUNT],
    sampler: RateSampler<T>,
    builder: SampleBuilder,
    clock: K,
    publisher: Publisher<C>,
    config: StationConfig,
    ticks: u64,
    skipped: u64,
}

impl<'a, T: TimeSource, K: WallClock, C: StoreConnector> Station<'a, T, K, C> {
    /// Create a station; the first window starts now
    pub fn new(
        channels: &'a [Channel; CHANNEL_COUNT],
        time: T,
        clock: K,
        connector: C,
        config: StationConfig,
    ) -> Self {
        Self {
            channels,
            sampler: RateSampler::new(time, config.sampler),
            builder: SampleBuilder::new(config.sampler),
            clock,
            publisher: Publisher::with_paths(connector, config.paths.clone()),
            config,
            ticks: 0,
            skipped: 0,
        }
    }

    /// Block until the connector reports a connection
    ///
    /// Gives up after `max_polls` checks when a limit is given. Returns
    /// whether the store is reachable.
    pub fn wait_until_ready(&mut self, max_polls: Option<u32>) -> bool {
        let mut polls = 0u32;

        loop {
            if self.publisher.connector_mut().check_connection() {
                info!("Store connection ready after {} checks", polls + 1);
                return true;
            }

            polls += 1;
            if max_polls.is_some_and(|max| polls >= max) {
                warn!("Store still unreachable after {} checks", polls);
                return false;
            }

            info!("Waiting for store connection...");
            thread::sleep(self.config.ready_poll);
        }
    }

    /// Run one measure-and-publish cycle
    pub fn tick(&mut self) -> TickOutcome {
        self.ticks += 1;

        let now = match self.clock.local_time() {
            Ok(now) => now,
            Err(e) => {
                self.skipped += 1;
                warn!("Skipping tick {}: {}", self.ticks, e);
                return TickOutcome::Skipped(e);
            }
        };

        let channels = self.channels;
        self.sampler.close_window();
        let readings: [WindowReading; CHANNEL_COUNT] =
            core::array::from_fn(|i| self.sampler.drain_and_reset(&channels[i]));

        for (channel, reading) in channels.iter().zip(&readings) {
            let flow = self.sampler.measure(reading);
            info!(
                "{}: {:.3} L/min, {:.3} L ({} pulses in {}ms)",
                channel.sensor_name(),
                flow.rate_per_minute,
                flow.volume_liters,
                reading.pulses,
                reading.elapsed_ms
            );
        }

        let reports = channels
            .iter()
            .zip(readings)
            .map(|(channel, reading)| {
                let outcome = match self.builder.build(channel, reading, &now) {
                    Ok(sample) => {
                        let report = self.publisher.publish(&sample);
                        debug!(
                            "{} published with {} failed writes",
                            channel.sensor_name(),
                            report.failures()
                        );
                        ChannelOutcome::Published { sample, report }
                    }
                    Err(e) => {
                        warn!("No sample for {}: {}", channel.sensor_name(), e);
                        ChannelOutcome::BuildFailed(e)
                    }
                };

                ChannelReport {
                    sensor_name: channel.sensor_name(),
                    reading,
                    outcome,
                }
            })
            .collect();

        TickOutcome::Completed(reports)
    }

    /// Run `ticks` cycles with the cadence delay after each
    pub fn run_for(&mut self, ticks: usize) -> Vec<TickOutcome> {
        (0..ticks)
            .map(|_| {
                let outcome = self.tick();
                thread::sleep(self.config.cadence);
                outcome
            })
            .collect()
    }

    /// Run forever
    pub fn run(&mut self) -> ! {
        info!(
            "Station running {} channels every {:?}",
            CHANNEL_COUNT, self.config.cadence
        );

        loop {
            self.tick();
            thread::sleep(self.config.cadence);
        }
    }

    /// Ticks attempted so far, skipped ones included
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Ticks skipped for lack of a usable clock
    pub fn skipped_ticks(&self) -> u64 {
        self.skipped
    }

    pub fn channels(&self) -> &'a [Channel; CHANNEL_COUNT] {
        self.channels
    }

    pub fn config(&self) -> &StationConfig {
        &self.config
    }

    pub fn sampler(&self) -> &RateSampler<T> {
        &self.sampler
    }

    pub fn clock(&self) -> &K {
        &self.clock
    }

    pub fn connector(&self) -> &C {
        self.publisher.connector()
    }

    pub fn connector_mut(&mut self) -> &mut C {
        self.publisher.connector_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use chrono::NaiveDate;
    use leaktrack_core::constants::{PRIMARY_CHANNEL, SECONDARY_CHANNEL};
    use leaktrack_core::time::{FixedClock, FixedTime};

    fn channels() -> [Channel; CHANNEL_COUNT] {
        [PRIMARY_CHANNEL.channel(), SECONDARY_CHANNEL.channel()]
    }

    fn clock() -> FixedClock {
        FixedClock::at(
            NaiveDate::from_ymd_opt(2024, 3, 14)
                .and_then(|d| d.and_hms_opt(9, 26, 53))
                .unwrap(),
        )
    }

    fn fast() -> StationConfig {
        StationConfig::default()
            .with_cadence(Duration::ZERO)
            .with_ready_poll(Duration::ZERO)
    }

    #[test]
    fn default_config() {
        let config = StationConfig::default();
        assert_eq!(config.cadence, Duration::from_millis(100));
        assert_eq!(config.paths, StorePaths::default());
        assert_eq!(config.sampler.liters_per_pulse, 1.0);
    }

    #[test]
    fn tick_publishes_every_channel_in_order() {
        let channels = channels();
        let time = FixedTime::new(0);
        let mut station = Station::new(&channels, &time, clock(), MemoryStore::new(), fast());

        for _ in 0..600 {
            channels[0].on_edge();
        }
        time.advance(1_000);

        let outcome = station.tick();
        let reports = outcome.reports();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].sensor_name, "Sensor1");
        assert_eq!(reports[1].sensor_name, "Sensor2");

        let first = reports[0].sample().unwrap();
        assert_eq!(first.rate_per_minute(), 10.0);
        assert_eq!(first.cumulative_volume(), 600.0);
        assert_eq!(reports[1].sample().unwrap().rate_per_minute(), 0.0);

        let paths: Vec<_> = station.connector().calls().iter().map(|c| c.path.as_str()).collect();
        assert_eq!(
            paths,
            [
                "/lastData/Sensor1/",
                "/sensorData/Sensor1/",
                "/lastData/Sensor2/",
                "/sensorData/Sensor2/",
            ]
        );
    }

    #[test]
    fn skipped_tick_keeps_pulses_and_epoch() {
        let channels = channels();
        let time = FixedTime::new(0);
        let wall = FixedClock::unsynchronized();
        let mut station = Station::new(&channels, &time, &wall, MemoryStore::new(), fast());

        for _ in 0..30 {
            channels[1].on_edge();
        }
        time.advance(500);

        assert_eq!(station.tick(), TickOutcome::Skipped(FlowError::ClockUnavailable));
        assert_eq!(channels[1].counter().pending(), 30);
        assert_eq!(station.sampler().window_start(), 0);
        assert!(station.connector().calls().is_empty());

        wall.set(NaiveDate::from_ymd_opt(2024, 1, 1).and_then(|d| d.and_hms_opt(0, 0, 0)).unwrap());
        time.advance(500);

        let outcome = station.tick();
        let reading = outcome.reports()[1].reading;
        assert_eq!((reading.pulses, reading.elapsed_ms), (30, 1_000));
        assert_eq!((station.ticks(), station.skipped_ticks()), (2, 1));
    }

    #[test]
    fn wait_gives_up_after_max_polls() {
        let channels = channels();
        let mut store = MemoryStore::new();
        store.set_connected(false);
        let mut station = Station::new(&channels, FixedTime::new(0), clock(), &mut store, fast());

        assert!(!station.wait_until_ready(Some(3)));

        station.connector_mut().set_connected(true);
        assert!(station.wait_until_ready(Some(1)));
    }

    #[test]
    fn run_for_counts_ticks() {
        let channels = channels();
        let time = FixedTime::new(0);
        let mut station = Station::new(&channels, &time, clock(), MemoryStore::new(), fast());

        let outcomes = station.run_for(3);
        assert_eq!(outcomes.len(), 3);
        assert!(outcomes.iter().all(|o| !o.is_skipped()));
        assert_eq!(station.connector().history("/sensorData/Sensor2/").len(), 3);
    }
}
