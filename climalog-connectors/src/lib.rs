//! Sink Publishers for climalog Records
//!
//! ## Overview
//!
//! Every iteration produces one [`Record`] that is delivered to two
//! independent sinks. Each sink is a long-lived object built once at startup
//! and handed to the sampling loop; nothing here is global.
//!
//! ### InfluxDB (time-series sink)
//!
//! - One HTTP `POST /write` per record, InfluxDB line protocol, second precision
//! - Stateless: every write opens (or reuses) a plain HTTP connection
//! - Credentials passed through as HTTP Basic auth
//!
//! ### MQTT (broker sink)
//!
//! - One QoS 1 publish per record to `topic_prefix + location`
//! - Persistent connection driven by a background task, reconnected lazily
//! - JSON payload with the same field names as the time-series point
//!
//! ## Failure Isolation
//!
//! A publish never panics and never blocks longer than its configured
//! timeout. Every failure is reported as a [`SinkError`] for the caller to
//! log; the two sinks share no state, so one failing never affects the other.
//!
//! | Failure | InfluxDB | MQTT |
//! |---------|----------|------|
//! | Server unreachable | `ConnectionFailed` | `Disconnected` |
//! | Bad credentials | `AuthRejected` (401/403) | `AuthRejected` (CONNACK refusal) |
//! | Slow server | `Timeout` | `Timeout` |
//! | Unencodable record | `SerializationFailed` | `SerializationFailed` |
//!
//! There is no buffering: a record that fails to publish is dropped, and the
//! next iteration publishes a fresh one.
//!
//! ## Example Usage
//!
//! ```no_run
//! use climalog_connectors::{RecordSink, influx::{InfluxConfig, InfluxPublisher}};
//! # async fn example(record: climalog_core::Record) -> Result<(), Box<dyn std::error::Error>> {
//! let influx = InfluxPublisher::new(
//!     InfluxConfig::new("localhost", 8086, "telemetry").credentials("agent", "secret"),
//! )?;
//! influx.publish(&record).await?;
//! # Ok(())
//! # }
//! ```

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use climalog_core::Record;
use thiserror::Error;

#[cfg(feature = "influxdb")]
pub mod influx;

#[cfg(feature = "mqtt")]
pub mod mqtt;

// Re-export common types
#[cfg(feature = "influxdb")]
pub use influx::{InfluxConfig, InfluxPublisher};
#[cfg(feature = "mqtt")]
pub use mqtt::{LinkState, MqttConfig, MqttPublisher};

/// Why a record was not delivered to a sink
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SinkError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Authentication rejected: {0}")]
    AuthRejected(String),

    #[error("Not connected")]
    Disconnected,

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Serialization failed: {0}")]
    SerializationFailed(String),
}

impl SinkError {
    /// Short name of the failure kind, used in log lines
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ConnectionFailed(_) => "connection_failed",
            Self::AuthRejected(_) => "auth_rejected",
            Self::Disconnected => "disconnected",
            Self::Timeout(_) => "timeout",
            Self::SerializationFailed(_) => "serialization_failed",
        }
    }
}

/// A destination for records
///
/// Publishing the same record twice delivers it twice; sinks are append-only.
#[async_trait::async_trait]
pub trait RecordSink: Send + Sync {
    /// Human-readable sink name for logs
    fn name(&self) -> &str;

    /// Deliver one record, bounded by the sink's timeout
    async fn publish(&self, record: &Record) -> Result<(), SinkError>;

    /// Get connection statistics
    fn stats(&self) -> ConnectionStats;
}

#[async_trait::async_trait]
impl<T: RecordSink + ?Sized> RecordSink for Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn publish(&self, record: &Record) -> Result<(), SinkError> {
        (**self).publish(record).await
    }

    fn stats(&self) -> ConnectionStats {
        (**self).stats()
    }
}

/// Connection statistics common to all sinks
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ConnectionStats {
    /// Total messages sent successfully
    pub messages_sent: u64,
    /// Total messages failed to send
    pub messages_failed: u64,
    /// Total bytes sent
    pub bytes_sent: u64,
    /// Number of reconnections
    pub reconnections: u32,
    /// Last error message
    pub last_error: Option<String>,
}

/// Shared, lock-protected statistics handle
#[derive(Debug, Clone, Default)]
pub(crate) struct StatsHandle(Arc<Mutex<ConnectionStats>>);

impl StatsHandle {
    pub(crate) fn snapshot(&self) -> ConnectionStats {
        self.lock().clone()
    }

    /// Account for one publish outcome
    pub(crate) fn record(&self, result: &Result<(), SinkError>, bytes: usize) {
        let mut stats = self.lock();
        match result {
            Ok(()) => {
                stats.messages_sent += 1;
                stats.bytes_sent += bytes as u64;
            }
            Err(e) => {
                stats.messages_failed += 1;
                stats.last_error = Some(e.to_string());
            }
        }
    }

    #[cfg_attr(not(feature = "mqtt"), allow(dead_code))]
    pub(crate) fn reconnected(&self) {
        self.lock().reconnections += 1;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ConnectionStats> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
