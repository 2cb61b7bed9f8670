//! Firebase Realtime Database connector over the REST API
//!
//! ## Overview
//!
//! The database is one JSON tree; every path has a REST resource at
//! `<host><path>.json`. The two store operations map onto it directly:
//!
//! | Store op  | HTTP | Response                       |
//! |-----------|------|--------------------------------|
//! | overwrite | PUT  | the written value              |
//! | append    | POST | `{"name": "<generated key>"}`  |
//!
//! Generated keys sort chronologically, so the history path lists samples in
//! publish order.
//!
//! ## Authentication
//!
//! - **Legacy token**: database secret sent as the `auth` query parameter.
//! - **Bearer**: OAuth2 access token in the `Authorization` header.
//!
//! ## Failure Handling
//!
//! Requests are blocking with a per-request timeout and are never retried:
//! a failed write is reported once and the next cadence tick brings a fresh
//! sample. For rejected writes the database's `{"error": "..."}` body is the
//! failure reason.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use leaktrack_connectors::rtdb::{RtdbConfig, RtdbConnector};
//! use leaktrack_connectors::StoreConnector;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = RtdbConfig::new("https://leaktrack-demo.firebaseio.com")
//!     .legacy_token("database-secret")
//!     .timeout_secs(10);
//!
//! let mut rtdb = RtdbConnector::new(config)?;
//! rtdb.overwrite("/lastData/Sensor1/", br#"{"litrosPorMin":0.0}"#)?;
//! let key = rtdb.append("/sensorData/Sensor1/", br#"{"litrosPorMin":0.0}"#)?;
//! println!("stored as {}", key);
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use log::{debug, warn};
use serde::Deserialize;
use thiserror::Error;

use crate::{ConnectionStats, StoreConnector};

/// Request timeout, matching the device firmware's session timeout
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Realtime Database errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RtdbError {
    /// Network or transport failure
    #[error("Request failed: {0}")]
    Request(String),

    /// Database answered with an error status
    #[error("Server error {status}: {message}")]
    ServerError { status: u16, message: String },

    /// Unreadable response body
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Authentication methods
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthMethod {
    /// Open database rules
    None,
    /// Database secret as `auth` query parameter
    LegacyToken(String),
    /// OAuth2 access token
    Bearer(String),
}

/// Server-side write size guard (`writeSizeLimit`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteSizeLimit {
    /// Up to 1 second of server time
    #[default]
    Tiny,
    Small,
    Medium,
    Large,
    Unlimited,
}

impl WriteSizeLimit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tiny => "tiny",
            Self::Small => "small",
            Self::Medium => "medium",
            Self::Large => "large",
            Self::Unlimited => "unlimited",
        }
    }
}

/// Realtime Database configuration
#[derive(Debug, Clone)]
pub struct RtdbConfig {
    /// Database URL, e.g. `https://<project>.firebaseio.com`
    pub host: String,
    /// Request timeout
    pub timeout: Duration,
    /// Authentication method
    pub auth: AuthMethod,
    /// Write size guard sent with every write
    pub write_size_limit: WriteSizeLimit,
    /// User agent string
    pub user_agent: String,
}

impl RtdbConfig {
    /// Create new configuration for a database URL
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            auth: AuthMethod::None,
            write_size_limit: WriteSizeLimit::default(),
            user_agent: format!("LeakTrack/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Authenticate with a legacy database secret
    pub fn legacy_token(mut self, token: impl Into<String>) -> Self {
        self.auth = AuthMethod::LegacyToken(token.into());
        self
    }

    /// Authenticate with an OAuth2 access token
    pub fn bearer_token(mut self, token: impl Into<String>) -> Self {
        self.auth = AuthMethod::Bearer(token.into());
        self
    }

    /// Set request timeout in seconds
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    pub fn write_size_limit(mut self, limit: WriteSizeLimit) -> Self {
        self.write_size_limit = limit;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

#[derive(Deserialize)]
struct PushResponse {
    name: String,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: String,
}

/// Realtime Database connector using the blocking ureq client
pub struct RtdbConnector {
    config: RtdbConfig,
    agent: ureq::Agent,
    stats: ConnectionStats,
    reachable: bool,
}

impl RtdbConnector {
    /// Create new connector; no request is made until the first write or probe
    pub fn new(mut config: RtdbConfig) -> Result<Self, RtdbError> {
        if !config.host.starts_with("http://") && !config.host.starts_with("https://") {
            return Err(RtdbError::Config(
                "Database URL must start with http:// or https://".into(),
            ));
        }
        config.host = config.host.trim_end_matches('/').to_owned();

        let agent = ureq::AgentBuilder::new()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build();

        Ok(Self {
            config,
            agent,
            stats: ConnectionStats::default(),
            reachable: false,
        })
    }

    pub fn config(&self) -> &RtdbConfig {
        &self.config
    }

    /// REST resource for a database path
    pub fn resource_url(&self, path: &str) -> String {
        let path = path.trim_matches('/');
        if path.is_empty() {
            format!("{}/.json", self.config.host)
        } else {
            format!("{}/{}.json", self.config.host, path)
        }
    }

    /// Check that the database answers at all
    ///
    /// Any HTTP response counts, including a rules rejection; only a
    /// transport failure makes the database unreachable.
    pub fn probe(&mut self) -> Result<(), RtdbError> {
        let url = self.resource_url("/");
        let request = self.build_request(self.agent.get(&url)).query("shallow", "true");

        match request.call() {
            Ok(_) | Err(ureq::Error::Status(..)) => {
                self.reachable = true;
                Ok(())
            }
            Err(ureq::Error::Transport(e)) => {
                self.reachable = false;
                Err(RtdbError::Request(e.to_string()))
            }
        }
    }

    /// Add authentication and standard headers
    fn build_request(&self, mut request: ureq::Request) -> ureq::Request {
        match &self.config.auth {
            AuthMethod::None => {}
            AuthMethod::LegacyToken(token) => {
                request = request.query("auth", token);
            }
            AuthMethod::Bearer(token) => {
                request = request.set("Authorization", &format!("Bearer {}", token));
            }
        }

        request
            .set("Content-Type", "application/json")
            .set("Accept", "application/json")
    }

    fn write_request(&self, method: &str, path: &str) -> ureq::Request {
        let url = self.resource_url(path);
        self.build_request(self.agent.request(method, &url))
            .query("writeSizeLimit", self.config.write_size_limit.as_str())
    }

    /// Send one write, no retries
    fn execute(&mut self, request: ureq::Request, record: &[u8]) -> Result<String, RtdbError> {
        match request.send_bytes(record) {
            Ok(response) => {
                self.reachable = true;
                response
                    .into_string()
                    .map_err(|e| RtdbError::Request(e.to_string()))
            }
            Err(ureq::Error::Status(status, response)) => {
                self.reachable = true;
                let body = response.into_string().unwrap_or_default();
                Err(RtdbError::ServerError {
                    status,
                    message: error_reason(&body),
                })
            }
            Err(ureq::Error::Transport(e)) => {
                self.reachable = false;
                Err(RtdbError::Request(e.to_string()))
            }
        }
    }

    /// Count the final outcome of a write
    fn settle<T>(&mut self, result: Result<T, RtdbError>, bytes: usize) -> Result<T, RtdbError> {
        match &result {
            Ok(_) => self.stats.record_sent(bytes),
            Err(e) => self.stats.record_failed(e.to_string()),
        }
        result
    }
}

/// Reason string from an error body, falling back to the raw body
pub fn error_reason(body: &str) -> String {
    serde_json::from_str::<ErrorResponse>(body)
        .map(|e| e.error)
        .unwrap_or_else(|_| body.trim().to_owned())
}

/// Generated key from a POST response body
pub fn pushed_key(body: &str) -> Result<String, RtdbError> {
    serde_json::from_str::<PushResponse>(body)
        .map(|r| r.name)
        .map_err(|e| RtdbError::Serialization(e.to_string()))
}

impl StoreConnector for RtdbConnector {
    type Error = RtdbError;

    fn overwrite(&mut self, path: &str, record: &[u8]) -> Result<(), Self::Error> {
        debug!("PUT {}", self.resource_url(path));
        let request = self.write_request("PUT", path);
        let result = self.execute(request, record).map(|_| ());
        self.settle(result, record.len())
    }

    fn append(&mut self, path: &str, record: &[u8]) -> Result<String, Self::Error> {
        debug!("POST {}", self.resource_url(path));
        let request = self.write_request("POST", path);
        let result = self.execute(request, record).and_then(|body| {
            pushed_key(&body).map_err(|e| {
                warn!("Record stored under {} without a usable key: {}", path, e);
                e
            })
        });
        self.settle(result, record.len())
    }

    fn is_connected(&self) -> bool {
        self.reachable
    }

    fn check_connection(&mut self) -> bool {
        if let Err(e) = self.probe() {
            debug!("Database probe failed: {}", e);
        }
        self.reachable
    }

    fn stats(&self) -> ConnectionStats {
        self.stats.clone()
    }
}
