//! Sample publisher: one record, two independent writes
//!
//! ## Write Protocol
//!
//! ```text
//! FlowSample ──serialize──▶ record ──┬──▶ overwrite /lastData/<sensor>/
//!                                    └──▶ append    /sensorData/<sensor>/
//! ```
//!
//! The two writes are not a transaction. [`Publisher::publish`] always
//! attempts both and reports each outcome separately; the station logs them
//! and moves on to the next channel.
//!
//! ## Record Format
//!
//! The record is the sample's serde form, keys in a fixed order:
//! `NomeDoSensor`, `date`, `PosicaoDoSensor`, `litrosPorMin`, `qtdAguaTotal`.

use leaktrack_core::FlowSample;
use log::{debug, info, warn};
use thiserror::Error;

use crate::StoreConnector;

/// Default prefix of the overwrite-latest paths
pub const LATEST_PREFIX: &str = "/lastData/";

/// Default prefix of the append-history paths
pub const HISTORY_PREFIX: &str = "/sensorData/";

/// Publish failures
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PublishError {
    /// Sample could not be turned into a record
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Store refused the write or could not be reached
    #[error("{0}")]
    Store(String),
}

impl PublishError {
    /// Diagnostic reason string
    pub fn reason(&self) -> &str {
        match self {
            Self::Serialization(reason) | Self::Store(reason) => reason,
        }
    }
}

/// Where samples land in the store tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorePaths {
    latest_prefix: String,
    history_prefix: String,
}

impl StorePaths {
    /// Paths under custom prefixes (each ends with `/`)
    pub fn new(latest_prefix: impl Into<String>, history_prefix: impl Into<String>) -> Self {
        Self {
            latest_prefix: with_trailing_slash(latest_prefix.into()),
            history_prefix: with_trailing_slash(history_prefix.into()),
        }
    }

    /// Overwrite path for a sensor
    pub fn latest(&self, sensor_name: &str) -> String {
        format!("{}{}/", self.latest_prefix, sensor_name)
    }

    /// Append path for a sensor
    pub fn history(&self, sensor_name: &str) -> String {
        format!("{}{}/", self.history_prefix, sensor_name)
    }
}

impl Default for StorePaths {
    fn default() -> Self {
        Self::new(LATEST_PREFIX, HISTORY_PREFIX)
    }
}

fn with_trailing_slash(mut prefix: String) -> String {
    if !prefix.ends_with('/') {
        prefix.push('/');
    }
    prefix
}

/// Outcome of both writes for one sample
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReport {
    /// Overwrite of the latest path
    pub latest: Result<(), PublishError>,
    /// Append to the history path, with the store-generated key
    pub history: Result<String, PublishError>,
}

impl PublishReport {
    /// Both writes accepted
    pub fn is_complete(&self) -> bool {
        self.latest.is_ok() && self.history.is_ok()
    }

    /// Number of failed writes (0-2)
    pub fn failures(&self) -> usize {
        self.latest.is_err() as usize + self.history.is_err() as usize
    }
}

/// Serializes samples and writes them through a connector
pub struct Publisher<C: StoreConnector> {
    connector: C,
    paths: StorePaths,
}

impl<C: StoreConnector> Publisher<C> {
    /// Publisher with the default store layout
    pub fn new(connector: C) -> Self {
        Self::with_paths(connector, StorePaths::default())
    }

    pub fn with_paths(connector: C, paths: StorePaths) -> Self {
        Self { connector, paths }
    }

    /// Serialize a sample to its wire record
    pub fn encode(sample: &FlowSample) -> Result<Vec<u8>, PublishError> {
        serde_json::to_vec(sample).map_err(|e| PublishError::Serialization(e.to_string()))
    }

    /// Overwrite the sensor's latest value with this sample
    pub fn publish_latest(&mut self, sample: &FlowSample) -> Result<(), PublishError> {
        let path = self.paths.latest(sample.sensor_name());
        let record = Self::encode(sample)?;
        debug!("overwrite {} {}", path, String::from_utf8_lossy(&record));

        match self.connector.overwrite(&path, &record) {
            Ok(()) => {
                info!("Latest data sent for {}", sample.sensor_name());
                Ok(())
            }
            Err(e) => {
                let reason = e.to_string();
                warn!("Failed to send latest data for {}: {}", sample.sensor_name(), reason);
                Err(PublishError::Store(reason))
            }
        }
    }

    /// Append this sample to the sensor's history
    pub fn publish_history(&mut self, sample: &FlowSample) -> Result<String, PublishError> {
        let path = self.paths.history(sample.sensor_name());
        let record = Self::encode(sample)?;
        debug!("append {} {}", path, String::from_utf8_lossy(&record));

        match self.connector.append(&path, &record) {
            Ok(key) => {
                info!("History data sent for {} as {}", sample.sensor_name(), key);
                Ok(key)
            }
            Err(e) => {
                let reason = e.to_string();
                warn!("Failed to send history data for {}: {}", sample.sensor_name(), reason);
                Err(PublishError::Store(reason))
            }
        }
    }

    /// Attempt both writes, latest first; neither outcome affects the other
    pub fn publish(&mut self, sample: &FlowSample) -> PublishReport {
        let latest = self.publish_latest(sample);
        let history = self.publish_history(sample);
        PublishReport { latest, history }
    }

    pub fn paths(&self) -> &StorePaths {
        &self.paths
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    pub fn connector_mut(&mut self) -> &mut C {
        &mut self.connector
    }

    pub fn into_connector(self) -> C {
        self.connector
    }
}
