//! Error Types for the Measurement Path
//!
//! Errors here are returned once per cadence tick at most, and never from
//! interrupt context. They stay small and `Copy`: no `String`, only inline
//! data, so the core keeps working without an allocator.
//!
//! ## Error Categories
//!
//! ### Time
//! - `ClockUnavailable`: wall clock not synchronized yet. The caller skips the
//!   whole tick for every channel instead of stamping a sample with a bogus date.
//! - `InvalidUtcOffset`: a clock was configured with an offset chrono rejects.
//!
//! ### Formatting
//! - `TimestampOverflow`: the formatted date did not fit the inline buffer.
//!
//! A zero-length window is deliberately *not* an error: the rate is defined
//! as zero for it (see [`crate::sampler`]).
//!
//! ```rust
//! use leaktrack_core::FlowError;
//! use leaktrack_core::time::{FixedClock, WallClock};
//!
//! let clock = FixedClock::unsynchronized();
//! match clock.local_time() {
//!     Ok(_now) => { /* drain, build, publish */ }
//!     Err(FlowError::ClockUnavailable) => { /* skip this tick */ }
//!     Err(_) => {}
//! }
//! ```

use thiserror_no_std::Error;

/// Result type for measurement operations
pub type FlowResult<T> = Result<T, FlowError>;

/// Measurement errors - kept small for embedded use
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowError {
    /// Wall clock has not been synchronized yet
    #[error("Clock unavailable: time not synchronized")]
    ClockUnavailable,

    /// UTC offset outside the range chrono accepts
    #[error("Invalid UTC offset: {seconds}s")]
    InvalidUtcOffset {
        /// Offset that was rejected, in seconds east of UTC
        seconds: i32,
    },

    /// Formatted timestamp exceeded the inline buffer
    #[error("Timestamp longer than {capacity} bytes")]
    TimestampOverflow {
        /// Capacity of the timestamp buffer
        capacity: usize,
    },
}

#[cfg(feature = "defmt")]
impl defmt::Format for FlowError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Self::ClockUnavailable =>
                defmt::write!(fmt, "Clock unavailable"),
            Self::InvalidUtcOffset { seconds } =>
                defmt::write!(fmt, "Invalid UTC offset {}s", seconds),
            Self::TimestampOverflow { capacity } =>
                defmt::write!(fmt, "Timestamp longer than {} bytes", capacity),
        }
    }
}
