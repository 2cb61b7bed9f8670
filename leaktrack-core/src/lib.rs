//! Measurement core for LeakTrack
//!
//! Turns rising edges from two pulse-output flow sensors into one flow
//! sample per channel per cadence tick.
//!
//! Key constraints:
//! - Edge handler runs in interrupt context: one atomic increment, nothing else
//! - Drain is a single atomic exchange, so no pulse is lost or counted twice
//! - No heap allocation anywhere in the measurement path
//!
//! ```no_run
//! use leaktrack_core::{Channel, RateSampler, SampleBuilder, SamplerConfig};
//! use leaktrack_core::time::{FixedClock, FixedTime, WallClock};
//!
//! static SENSOR_1: Channel = Channel::new(4, "Sensor1", "1 andar");
//!
//! // Interrupt handler bound to GPIO 4
//! fn on_rising_edge() {
//!     SENSOR_1.on_edge();
//! }
//!
//! let time = FixedTime::new(0);
//! let clock = FixedClock::unsynchronized();
//! let mut sampler = RateSampler::new(&time, SamplerConfig::default());
//! let builder = SampleBuilder::new(SamplerConfig::default());
//!
//! // Once per cadence tick
//! if let Ok(now) = clock.local_time() {
//!     sampler.close_window();
//!     let reading = sampler.drain_and_reset(&SENSOR_1);
//!     let sample = builder.build(&SENSOR_1, reading, &now).unwrap();
//!     // hand `sample` to the publisher
//! }
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]
#![warn(missing_docs)]

// Macros for optional logging
#[cfg(feature = "log")]
macro_rules! log_debug {
    ($($arg:tt)*) => { log::debug!($($arg)*) };
}

#[cfg(not(feature = "log"))]
macro_rules! log_debug {
    ($($arg:tt)*) => {};
}

#[cfg(feature = "log")]
macro_rules! log_warn {
    ($($arg:tt)*) => { log::warn!($($arg)*) };
}

#[cfg(not(feature = "log"))]
macro_rules! log_warn {
    ($($arg:tt)*) => {};
}

pub mod channel;
pub mod constants;
pub mod counter;
pub mod errors;
pub mod sample;
pub mod sampler;
pub mod time;

// Public API
pub use channel::Channel;
pub use counter::PulseCounter;
pub use errors::{FlowError, FlowResult};
pub use sample::{FlowSample, SampleBuilder, TIMESTAMP_FORMAT};
pub use sampler::{FlowMeasurement, RateSampler, SamplerConfig, WindowReading};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
