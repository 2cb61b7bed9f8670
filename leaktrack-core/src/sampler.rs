//! Windowed Rate Sampler
//!
//! ## Overview
//!
//! Once per cadence tick the sampler closes the current measurement window,
//! drains every channel's pulse counter, and turns (pulses, elapsed) into a
//! flow figure:
//!
//! ```text
//! flow            = pulses × 1000 / elapsed_ms     (pulses per second)
//! rate_per_minute = flow / 60
//! volume          = flow                          (per-window quantity)
//! ```
//!
//! Both channels share one epoch: the window is closed once per tick with
//! [`RateSampler::close_window`] and every drain in that tick reports the same
//! elapsed time.
//!
//! ## Window Boundaries
//!
//! ```text
//!  close        close             close
//!    │  window 1  │    window 2     │
//! ───┼────────────┼─────────────────┼──→ monotonic ms
//!      ↑ ↑↑  ↑      ↑   ↑ ↑↑↑ ↑
//!      pulses land in whichever drain follows them
//! ```
//!
//! Counters are never reset anywhere except by the drain itself, so pulses
//! arriving while a publish blocks the loop are simply counted in the next
//! window, whose elapsed time has grown by the same stall.
//!
//! ## Degenerate Windows
//!
//! A zero-length window (two ticks inside the same millisecond, or a time
//! source that stepped backwards) has no defined rate. It is reported as zero
//! flow instead of dividing by zero.

use crate::channel::Channel;
use crate::constants::{LITERS_PER_PULSE, MS_PER_SECOND, SECONDS_PER_MINUTE};
use crate::time::{TimeSource, Timestamp};

/// Sampler configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplerConfig {
    /// Fixed linear pulses-to-liters factor applied to the flow
    pub liters_per_pulse: f64,
}

impl SamplerConfig {
    /// Override the pulses-to-liters factor
    pub fn with_liters_per_pulse(mut self, liters_per_pulse: f64) -> Self {
        self.liters_per_pulse = liters_per_pulse;
        self
    }
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            liters_per_pulse: LITERS_PER_PULSE,
        }
    }
}

/// Result of draining one channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowReading {
    /// Pulses counted since the previous drain
    pub pulses: u32,
    /// Length of the window the pulses belong to
    pub elapsed_ms: u64,
}

impl WindowReading {
    /// Flow computed from this reading
    pub fn measure(&self, config: &SamplerConfig) -> FlowMeasurement {
        let flow = pulse_flow(self.pulses, self.elapsed_ms) * config.liters_per_pulse;

        FlowMeasurement {
            volume_liters: flow as f32,
            rate_per_minute: (flow / SECONDS_PER_MINUTE) as f32,
        }
    }
}

/// Flow derived from one window
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FlowMeasurement {
    /// Per-window volume figure, published as the cumulative volume
    pub volume_liters: f32,
    /// Liters per minute
    pub rate_per_minute: f32,
}

/// Pulses per second over a window, zero for an empty window
pub fn pulse_flow(pulses: u32, elapsed_ms: u64) -> f64 {
    if elapsed_ms == 0 {
        return 0.0;
    }

    pulses as f64 * MS_PER_SECOND / elapsed_ms as f64
}

/// Liters per minute over a window, zero for an empty window
pub fn rate_per_minute(pulses: u32, elapsed_ms: u64) -> f64 {
    pulse_flow(pulses, elapsed_ms) / SECONDS_PER_MINUTE
}

/// Closes measurement windows and drains channels
///
/// Owns the epoch clock shared by all channels. The type parameter is the
/// monotonic millisecond source, typically a hardware timer on the device
/// and [`FixedTime`](crate::time::FixedTime) in tests.
pub struct RateSampler<T: TimeSource> {
    time: T,
    config: SamplerConfig,
    window_start: Timestamp,
    window_elapsed_ms: u64,
}

impl<T: TimeSource> RateSampler<T> {
    /// Start the first window now
    pub fn new(time: T, config: SamplerConfig) -> Self {
        let window_start = time.now();
        Self {
            time,
            config,
            window_start,
            window_elapsed_ms: 0,
        }
    }

    /// End the current window and start the next one
    ///
    /// Returns the closed window's length; every drain until the next close
    /// reports it.
    pub fn close_window(&mut self) -> u64 {
        let now = self.time.now();
        let elapsed = now.saturating_sub(self.window_start);

        if elapsed == 0 {
            log_warn!("degenerate window at {}ms, flow reported as zero", now);
        }

        self.window_start = now;
        self.window_elapsed_ms = elapsed;
        elapsed
    }

    /// Atomically take the channel's pulses and pair them with the window length
    pub fn drain_and_reset(&self, channel: &Channel) -> WindowReading {
        WindowReading {
            pulses: channel.counter().drain(),
            elapsed_ms: self.window_elapsed_ms,
        }
    }

    /// Length of the most recently closed window
    pub fn window_elapsed_ms(&self) -> u64 {
        self.window_elapsed_ms
    }

    /// Start of the window currently accumulating
    pub fn window_start(&self) -> Timestamp {
        self.window_start
    }

    /// Calibration in use
    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    /// Flow for a reading under this sampler's calibration
    pub fn measure(&self, reading: &WindowReading) -> FlowMeasurement {
        reading.measure(&self.config)
    }
}
