//! In-process JSON tree store
//!
//! Behaves like the remote store as far as the publisher can tell: overwrite
//! replaces the value at a path, append adds a child under a fresh key that
//! sorts in insertion order. Every call is also recorded, accepted or not,
//! so tests can assert on what was *attempted*.
//!
//! Failures can be injected per operation and persist until [`MemoryStore::heal`].

use std::collections::BTreeMap;

use serde_json::Value;

use crate::{ConnectionStats, ConnectorError, StoreConnector};

/// Kind of write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOp {
    Overwrite,
    Append,
}

/// One write as seen by the store
#[derive(Debug, Clone, PartialEq)]
pub struct StoreCall {
    pub op: WriteOp,
    pub path: String,
    /// Raw record exactly as sent
    pub body: String,
    pub accepted: bool,
}

/// Tree store held in memory
#[derive(Debug)]
pub struct MemoryStore {
    latest: BTreeMap<String, Value>,
    history: BTreeMap<String, Vec<(String, Value)>>,
    calls: Vec<StoreCall>,
    next_key: u64,
    connected: bool,
    overwrite_failure: Option<String>,
    append_failure: Option<String>,
    stats: ConnectionStats,
}

impl MemoryStore {
    /// Empty, connected store
    pub fn new() -> Self {
        Self {
            latest: BTreeMap::new(),
            history: BTreeMap::new(),
            calls: Vec::new(),
            next_key: 0,
            connected: true,
            overwrite_failure: None,
            append_failure: None,
            stats: ConnectionStats::default(),
        }
    }

    /// Reject every overwrite with `reason`
    pub fn fail_overwrites(&mut self, reason: impl Into<String>) {
        self.overwrite_failure = Some(reason.into());
    }

    /// Reject every append with `reason`
    pub fn fail_appends(&mut self, reason: impl Into<String>) {
        self.append_failure = Some(reason.into());
    }

    /// Stop injecting failures
    pub fn heal(&mut self) {
        self.overwrite_failure = None;
        self.append_failure = None;
    }

    pub fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }

    /// Value currently stored at an overwrite path
    pub fn latest(&self, path: &str) -> Option<&Value> {
        self.latest.get(path)
    }

    /// Children appended under `path`, in key order
    pub fn history(&self, path: &str) -> &[(String, Value)] {
        self.history.get(path).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every write attempted so far
    pub fn calls(&self) -> &[StoreCall] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    fn admit(&mut self, op: WriteOp, path: &str, record: &[u8]) -> Result<Value, ConnectorError> {
        let injected = match op {
            WriteOp::Overwrite => self.overwrite_failure.clone(),
            WriteOp::Append => self.append_failure.clone(),
        };

        let result = if !self.connected {
            Err(ConnectorError::NotConnected)
        } else if let Some(reason) = injected {
            Err(ConnectorError::Rejected(reason))
        } else {
            serde_json::from_slice(record).map_err(|e| ConnectorError::ProtocolError(e.to_string()))
        };

        self.calls.push(StoreCall {
            op,
            path: path.to_owned(),
            body: String::from_utf8_lossy(record).into_owned(),
            accepted: result.is_ok(),
        });

        match &result {
            Ok(_) => self.stats.record_sent(record.len()),
            Err(e) => self.stats.record_failed(e.to_string()),
        }

        result
    }

    /// Push-style key: fixed width so lexical order is insertion order
    fn generate_key(&mut self) -> String {
        self.next_key += 1;
        format!("-K{:018}", self.next_key)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StoreConnector for MemoryStore {
    type Error = ConnectorError;

    fn overwrite(&mut self, path: &str, record: &[u8]) -> Result<(), Self::Error> {
        let value = self.admit(WriteOp::Overwrite, path, record)?;
        self.latest.insert(path.to_owned(), value);
        Ok(())
    }

    fn append(&mut self, path: &str, record: &[u8]) -> Result<String, Self::Error> {
        let value = self.admit(WriteOp::Append, path, record)?;
        let key = self.generate_key();
        self.history
            .entry(path.to_owned())
            .or_default()
            .push((key.clone(), value));
        Ok(key)
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn stats(&self) -> ConnectionStats {
        self.stats.clone()
    }
}
