//! Interrupt-Safe Pulse Counter
//!
//! ## Overview
//!
//! A flow sensor emits one rising edge per fixed volume of water. The GPIO
//! interrupt handler for that line calls [`PulseCounter::on_edge`], and the
//! cadence loop periodically calls [`PulseCounter::drain`] to take the count
//! accumulated since the previous drain.
//!
//! These two calls are the only shared mutable state between interrupt and
//! main context in the whole system:
//!
//! ```text
//! GPIO ISR (preempts anywhere)          Cadence loop
//!      ↓                                     ↓
//!   fetch_add(1) ───→ AtomicU32 ←─── swap(0)
//!      ↓                                     ↓
//!   Never blocks                     Gets every edge exactly once
//! ```
//!
//! ## Why a Swap?
//!
//! A load followed by a store of zero leaves a gap: an edge landing between
//! the two is erased. `swap(0)` reads and resets in one indivisible
//! instruction, so every edge is observed either by this drain or by the
//! next one, never both and never neither.
//!
//! ## Memory Ordering
//!
//! - **Relaxed** on increment: the counter carries no other data, the ISR
//!   publishes nothing else through it.
//! - **AcqRel** on drain: the swap is totally ordered with every increment on
//!   the same atomic, which is what conservation needs.
//!
//! ## Overflow
//!
//! The counter wraps at `u32::MAX`. At 100 ms cadence a sensor would need
//! ~43 billion pulses per second to get there.

use core::sync::atomic::{AtomicU32, Ordering};

/// Pulse counter shared between one GPIO interrupt handler and the cadence loop
///
/// `const`-constructible so it can live in a `static` next to the ISR:
///
/// ```rust
/// use leaktrack_core::PulseCounter;
///
/// static PULSES: PulseCounter = PulseCounter::new();
///
/// PULSES.on_edge();
/// PULSES.on_edge();
/// assert_eq!(PULSES.drain(), 2);
/// assert_eq!(PULSES.drain(), 0);
/// ```
#[derive(Debug, Default)]
pub struct PulseCounter {
    pulses: AtomicU32,
}

impl PulseCounter {
    /// Create a counter at zero
    pub const fn new() -> Self {
        Self {
            pulses: AtomicU32::new(0),
        }
    }

    /// Record one rising edge
    ///
    /// Interrupt context: no logging, no allocation, no blocking.
    #[inline]
    pub fn on_edge(&self) {
        self.pulses.fetch_add(1, Ordering::Relaxed);
    }

    /// Take every pulse counted so far and reset to zero
    #[inline]
    pub fn drain(&self) -> u32 {
        self.pulses.swap(0, Ordering::AcqRel)
    }

    /// Current count without resetting (diagnostics only)
    pub fn pending(&self) -> u32 {
        self.pulses.load(Ordering::Acquire)
    }
}
