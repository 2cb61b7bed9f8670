//! Time management for the measurement path
//!
//! Two unrelated notions of time are in play:
//! - **Monotonic milliseconds** ([`TimeSource`]) measure how long a window
//!   lasted. Boot-relative, never adjusted, always available.
//! - **Calendar time** ([`WallClock`]) stamps each sample. Comes from NTP and
//!   may not be available yet right after boot.
//!
//! Keeping them apart means an NTP step never distorts a flow rate, and a
//! missing NTP sync never stops pulses from being counted.

use chrono::NaiveDateTime;

use crate::errors::FlowResult;

/// Timestamp in milliseconds since device boot
pub type Timestamp = u64;

/// Monotonic millisecond source used to measure window lengths
pub trait TimeSource {
    /// Get current timestamp in milliseconds
    fn now(&self) -> Timestamp;
}

impl<T: TimeSource + ?Sized> TimeSource for &T {
    fn now(&self) -> Timestamp {
        (**self).now()
    }
}

/// Calendar time provider
///
/// Returns local time, or [`crate::FlowError::ClockUnavailable`] while the
/// clock has not been synchronized.
pub trait WallClock {
    /// Local date and time now
    fn local_time(&self) -> FlowResult<NaiveDateTime>;
}

impl<C: WallClock + ?Sized> WallClock for &C {
    fn local_time(&self) -> FlowResult<NaiveDateTime> {
        (**self).local_time()
    }
}

/// Monotonic time since construction (requires std)
#[cfg(feature = "std")]
#[derive(Debug, Clone)]
pub struct MonotonicTime {
    start: std::time::Instant,
}

#[cfg(feature = "std")]
impl MonotonicTime {
    /// Start counting from now
    pub fn new() -> Self {
        Self {
            start: std::time::Instant::now(),
        }
    }
}

#[cfg(feature = "std")]
impl Default for MonotonicTime {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "std")]
impl TimeSource for MonotonicTime {
    fn now(&self) -> Timestamp {
        self.start.elapsed().as_millis() as Timestamp
    }
}

/// System wall clock shifted to a fixed local offset (requires std)
///
/// Readings before [`SYNCHRONIZED_AFTER_YEAR`](crate::constants::SYNCHRONIZED_AFTER_YEAR)
/// are reported as unavailable: that is what an RTC that was never set by
/// NTP looks like.
#[cfg(feature = "std")]
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    offset: chrono::FixedOffset,
}

#[cfg(feature = "std")]
impl SystemClock {
    /// Clock at the deployment's default offset
    pub fn new() -> Self {
        use crate::constants::{DAYLIGHT_OFFSET_SECS, UTC_OFFSET_SECS};

        Self::with_offset(UTC_OFFSET_SECS + DAYLIGHT_OFFSET_SECS).unwrap_or(Self {
            offset: chrono::Offset::fix(&chrono::Utc),
        })
    }

    /// Clock at `seconds` east of UTC (negative for west)
    pub fn with_offset(seconds: i32) -> FlowResult<Self> {
        chrono::FixedOffset::east_opt(seconds)
            .map(|offset| Self { offset })
            .ok_or(crate::FlowError::InvalidUtcOffset { seconds })
    }

    /// Configured offset in seconds east of UTC
    pub fn offset_secs(&self) -> i32 {
        self.offset.local_minus_utc()
    }
}

#[cfg(feature = "std")]
impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "std")]
impl WallClock for SystemClock {
    fn local_time(&self) -> FlowResult<NaiveDateTime> {
        let now = chrono::Utc::now().with_timezone(&self.offset).naive_local();
        synchronized(now)
    }
}

/// Reject readings from a clock that was never synchronized
pub fn synchronized(now: NaiveDateTime) -> FlowResult<NaiveDateTime> {
    use chrono::Datelike;

    if now.year() < crate::constants::SYNCHRONIZED_AFTER_YEAR {
        log_debug!("wall clock still at {}, not synchronized", now);
        return Err(crate::FlowError::ClockUnavailable);
    }
    Ok(now)
}

/// Fixed time source for testing
///
/// Interior mutability lets a test keep advancing time while the sampler
/// holds a shared reference to it.
#[derive(Debug, Clone, Default)]
pub struct FixedTime {
    timestamp: core::cell::Cell<Timestamp>,
}

impl FixedTime {
    /// Time source stopped at `timestamp`
    pub fn new(timestamp: Timestamp) -> Self {
        Self {
            timestamp: core::cell::Cell::new(timestamp),
        }
    }

    /// Jump to `timestamp`, backwards included
    pub fn set(&self, timestamp: Timestamp) {
        self.timestamp.set(timestamp);
    }

    /// Move forward by `ms`
    pub fn advance(&self, ms: u64) {
        self.timestamp.set(self.timestamp.get() + ms);
    }
}

impl TimeSource for FixedTime {
    fn now(&self) -> Timestamp {
        self.timestamp.get()
    }
}

/// Settable wall clock for testing
///
/// Starts either unsynchronized or at a given date; `set`/`clear` switch
/// between the two through a shared reference.
#[derive(Debug, Clone, Default)]
pub struct FixedClock {
    now: core::cell::Cell<Option<NaiveDateTime>>,
}

impl FixedClock {
    /// Clock that has not been synchronized yet
    pub fn unsynchronized() -> Self {
        Self::default()
    }

    /// Clock reading `now`
    pub fn at(now: NaiveDateTime) -> Self {
        Self {
            now: core::cell::Cell::new(Some(now)),
        }
    }

    /// Synchronize to `now`
    pub fn set(&self, now: NaiveDateTime) {
        self.now.set(Some(now));
    }

    /// Drop synchronization (simulates a clock that lost its time)
    pub fn clear(&self) {
        self.now.set(None);
    }

    /// Move forward by `secs`; no effect while unsynchronized
    pub fn advance_secs(&self, secs: i64) {
        if let Some(now) = self.now.get() {
            self.now.set(Some(now + chrono::Duration::seconds(secs)));
        }
    }
}

impl WallClock for FixedClock {
    fn local_time(&self) -> FlowResult<NaiveDateTime> {
        match self.now.get() {
            Some(now) => synchronized(now),
            None => Err(crate::FlowError::ClockUnavailable),
        }
    }
}
