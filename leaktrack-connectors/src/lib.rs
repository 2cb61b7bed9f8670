//! Remote Store Connectors for Flow Telemetry
//!
//! ## Overview
//!
//! This crate takes the [`FlowSample`](leaktrack_core::FlowSample)s produced
//! by the measurement core and gets them into a remote JSON tree store, then
//! drives the whole measure-and-publish cycle on a fixed cadence.
//!
//! ```text
//! ┌────────────────────┐   ┌─────────────┐   ┌──────────────────┐
//! │ Station (cadence)  │──▶│  Publisher  │──▶│  StoreConnector  │
//! │ drain/build/tick   │   │ latest+hist │   │ memory | rtdb    │
//! └────────────────────┘   └─────────────┘   └──────────────────┘
//! ```
//!
//! ## Store Layout
//!
//! Every sample is written twice, as two unrelated writes:
//!
//! | Write   | Operation | Path                    | Semantics            |
//! |---------|-----------|-------------------------|----------------------|
//! | latest  | overwrite | `/lastData/<sensor>/`   | last write wins      |
//! | history | append    | `/sensorData/<sensor>/` | store picks the key  |
//!
//! A failure of one write never prevents the other, and nothing is retried:
//! the next tick brings a fresh sample anyway. Reconnection and session
//! handling belong to the connector, the publisher only sees the reason
//! string of each failed write.
//!
//! ## Connectors
//!
//! - [`memory::MemoryStore`]: in-process tree store with failure injection,
//!   for tests and simulations.
//! - `rtdb::RtdbConnector` (feature `rtdb`): Firebase Realtime Database REST
//!   API over blocking HTTPS.
//!
//! ## Example Usage
//!
//! ```rust
//! use leaktrack_connectors::{memory::MemoryStore, Publisher};
//!
//! let mut publisher = Publisher::new(MemoryStore::new());
//! # let sample = leaktrack_core::FlowSample::new("Sensor1", "1 andar", Default::default(), 0.0, 0.0);
//! let report = publisher.publish(&sample);
//! assert!(report.is_complete());
//! assert!(publisher.connector().latest("/lastData/Sensor1/").is_some());
//! ```

pub mod memory;
pub mod publisher;
pub mod station;

#[cfg(feature = "rtdb")]
pub mod rtdb;

// Re-export common types
pub use memory::MemoryStore;
pub use publisher::{PublishError, PublishReport, Publisher, StorePaths};
pub use station::{ChannelOutcome, ChannelReport, Station, StationConfig, TickOutcome};

#[cfg(feature = "rtdb")]
pub use rtdb::{RtdbConfig, RtdbConnector, RtdbError};

use std::fmt;
use thiserror::Error;

/// Common connector errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConnectorError {
    #[error("Not connected")]
    NotConnected,

    #[error("Write rejected: {0}")]
    Rejected(String),

    #[error("Protocol error: {0}")]
    ProtocolError(String),
}

/// A connected, authenticated JSON tree store
///
/// Both writes are blocking from the caller's point of view. Implementations
/// own reconnection; a call made while disconnected should fail fast.
pub trait StoreConnector {
    /// Error type; its `Display` output is the diagnostic reason string
    type Error: fmt::Display;

    /// Replace whatever is stored at `path` with `record`
    fn overwrite(&mut self, path: &str, record: &[u8]) -> Result<(), Self::Error>;

    /// Add `record` as a new child of `path`, returning the generated key
    fn append(&mut self, path: &str, record: &[u8]) -> Result<String, Self::Error>;

    /// Check if connected
    fn is_connected(&self) -> bool;

    /// Actively re-check the connection, refreshing [`Self::is_connected`]
    fn check_connection(&mut self) -> bool {
        self.is_connected()
    }

    /// Get connection statistics
    fn stats(&self) -> ConnectionStats;
}

impl<C: StoreConnector + ?Sized> StoreConnector for &mut C {
    type Error = C::Error;

    fn overwrite(&mut self, path: &str, record: &[u8]) -> Result<(), Self::Error> {
        (**self).overwrite(path, record)
    }

    fn append(&mut self, path: &str, record: &[u8]) -> Result<String, Self::Error> {
        (**self).append(path, record)
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }

    fn check_connection(&mut self) -> bool {
        (**self).check_connection()
    }

    fn stats(&self) -> ConnectionStats {
        (**self).stats()
    }
}

/// Connection statistics common to all connectors
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConnectionStats {
    /// Total writes accepted by the store
    pub messages_sent: u64,
    /// Total writes that failed
    pub messages_failed: u64,
    /// Total payload bytes accepted
    pub bytes_sent: u64,
    /// Last error message
    pub last_error: Option<String>,
}

impl ConnectionStats {
    pub(crate) fn record_sent(&mut self, bytes: usize) {
        self.messages_sent += 1;
        self.bytes_sent += bytes as u64;
    }

    pub(crate) fn record_failed(&mut self, reason: impl Into<String>) {
        self.messages_failed += 1;
        self.last_error = Some(reason.into());
    }
}
