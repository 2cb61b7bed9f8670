//! Sensor channel configuration
//!
//! A channel pairs one digital input line with the identity reported for it
//! in every published record. The channel owns its pulse counter, so the
//! usual deployment is one `static` per sensor, shared by the GPIO
//! interrupt handler and the cadence loop.

use crate::counter::PulseCounter;

/// One flow sensor: input pin, identity and its pulse counter
#[derive(Debug)]
pub struct Channel {
    pin: u8,
    sensor_name: &'static str,
    position: &'static str,
    counter: PulseCounter,
}

impl Channel {
    /// Create a channel with a zeroed counter
    pub const fn new(pin: u8, sensor_name: &'static str, position: &'static str) -> Self {
        Self {
            pin,
            sensor_name,
            position,
            counter: PulseCounter::new(),
        }
    }

    /// GPIO number the sensor is wired to
    pub const fn pin(&self) -> u8 {
        self.pin
    }

    /// Sensor identifier, also used as the store path segment
    pub const fn sensor_name(&self) -> &'static str {
        self.sensor_name
    }

    /// Human-readable mounting position
    pub const fn position(&self) -> &'static str {
        self.position
    }

    /// Pulse counter fed by this channel's interrupt
    pub const fn counter(&self) -> &PulseCounter {
        &self.counter
    }

    /// Interrupt entry point for this channel's rising edge
    #[inline]
    pub fn on_edge(&self) {
        self.counter.on_edge();
    }
}
