//! InfluxDB Time-Series Sink
//!
//! ## Overview
//!
//! Writes one point per record through the InfluxDB 1.x HTTP API:
//!
//! ```text
//! POST /write?db=<database>&precision=s
//! Authorization: Basic <user:password>
//!
//! environment,location=office dew_point=15,heat_index_c=25.89,humidity=50,temperature_c=25 1704067200
//! ```
//!
//! ## Implementation Choices
//!
//! - `ureq` is a small blocking client; each write runs on Tokio's blocking
//!   pool so the sampling task never stalls on a socket
//! - The whole write (connect, send, response) is bounded by one timeout;
//!   the agent's own socket timeout sits slightly above it so the outer
//!   bound is the one that fires
//! - No retries: a failed write is reported and the next iteration writes a
//!   fresh point
//!
//! ## Status Mapping
//!
//! | Response | Result |
//! |----------|--------|
//! | 2xx | `Ok(())` |
//! | 401, 403 | `SinkError::AuthRejected` |
//! | other 4xx/5xx | `SinkError::ConnectionFailed` |
//! | transport error | `SinkError::ConnectionFailed` |
//! | no answer within timeout | `SinkError::Timeout` |
//! | socket timed out | `SinkError::Timeout` |

use std::error::Error as _;
use std::fmt::Write as _;
use std::io;
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use climalog_core::Record;

use crate::{ConnectionStats, RecordSink, SinkError, StatsHandle};

/// Extra time the agent's socket timeout gets over the write timeout
const AGENT_TIMEOUT_GRACE: Duration = Duration::from_millis(500);

/// InfluxDB connection settings
#[derive(Clone)]
pub struct InfluxConfig {
    /// Server host name or address
    pub host: String,
    /// HTTP API port
    pub port: u16,
    /// Target database
    pub database: String,
    /// Optional user name and password
    pub credentials: Option<(String, String)>,
    /// Use HTTPS instead of HTTP
    pub https: bool,
    /// Bound on a whole write request
    pub timeout: Duration,
    /// User agent string
    pub user_agent: String,
}

impl std::fmt::Debug for InfluxConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InfluxConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.credentials.as_ref().map(|(user, _)| user))
            .field("https", &self.https)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl InfluxConfig {
    /// Create new configuration for a database on `host:port`
    pub fn new(host: impl Into<String>, port: u16, database: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            database: database.into(),
            credentials: None,
            https: false,
            timeout: Duration::from_secs(10),
            user_agent: format!("climalog/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Set basic authentication
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Some((username.into(), password.into()));
        self
    }

    /// Talk HTTPS to the server
    pub fn https(mut self, enabled: bool) -> Self {
        self.https = enabled;
        self
    }

    /// Set request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Base URL of the write endpoint, without query string
    pub fn write_url(&self) -> String {
        let scheme = if self.https { "https" } else { "http" };
        format!("{}://{}:{}/write", scheme, self.host, self.port)
    }
}

/// Time-series publisher built once at startup
pub struct InfluxPublisher {
    config: InfluxConfig,
    agent: ureq::Agent,
    stats: StatsHandle,
}

impl InfluxPublisher {
    /// Create new publisher; does not contact the server
    pub fn new(config: InfluxConfig) -> Result<Self, SinkError> {
        if config.host.trim().is_empty() {
            return Err(SinkError::ConnectionFailed("InfluxDB host is empty".into()));
        }
        if config.database.trim().is_empty() {
            return Err(SinkError::ConnectionFailed("InfluxDB database is empty".into()));
        }

        let agent = ureq::AgentBuilder::new()
            .timeout(config.timeout + AGENT_TIMEOUT_GRACE)
            .user_agent(&config.user_agent)
            .build();

        Ok(Self {
            config,
            agent,
            stats: StatsHandle::default(),
        })
    }

    pub fn config(&self) -> &InfluxConfig {
        &self.config
    }

    /// Build request with authentication and query parameters
    fn build_request(&self) -> ureq::Request {
        let mut request = self
            .agent
            .post(&self.config.write_url())
            .query("db", &self.config.database)
            .query("precision", "s")
            .set("Content-Type", "text/plain; charset=utf-8");

        if let Some((username, password)) = &self.config.credentials {
            let token = STANDARD.encode(format!("{}:{}", username, password));
            request = request.set("Authorization", &format!("Basic {}", token));
        }

        request
    }

    async fn write(&self, body: String) -> Result<(), SinkError> {
        let request = self.build_request();
        let timeout = self.config.timeout;

        let call = tokio::task::spawn_blocking(move || request.send_string(&body));
        match tokio::time::timeout(timeout, call).await {
            Err(_) => Err(SinkError::Timeout(timeout)),
            Ok(Err(join)) => Err(SinkError::ConnectionFailed(format!("write task failed: {}", join))),
            Ok(Ok(response)) => map_response(response, timeout),
        }
    }
}

fn map_response(response: Result<ureq::Response, ureq::Error>, timeout: Duration) -> Result<(), SinkError> {
    match response {
        Ok(_) => Ok(()),
        Err(ureq::Error::Status(code, resp)) => {
            let message = format!("HTTP {}: {}", code, resp.into_string().unwrap_or_default().trim());
            if code == 401 || code == 403 {
                Err(SinkError::AuthRejected(message))
            } else {
                Err(SinkError::ConnectionFailed(message))
            }
        }
        Err(ureq::Error::Transport(e)) if timed_out(&e) => Err(SinkError::Timeout(timeout)),
        Err(ureq::Error::Transport(e)) => Err(SinkError::ConnectionFailed(e.to_string())),
    }
}

fn timed_out(error: &ureq::Transport) -> bool {
    error
        .source()
        .and_then(|source| source.downcast_ref::<io::Error>())
        .map(|io| matches!(io.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock))
        .unwrap_or(false)
}

#[async_trait::async_trait]
impl RecordSink for InfluxPublisher {
    fn name(&self) -> &str {
        "influxdb"
    }

    async fn publish(&self, record: &Record) -> Result<(), SinkError> {
        let body = line_protocol(record)?;
        let bytes = body.len();
        let result = self.write(body).await;
        self.stats.record(&result, bytes);
        result
    }

    fn stats(&self) -> ConnectionStats {
        self.stats.snapshot()
    }
}

/// Encode a record as one line-protocol point with a seconds timestamp
///
/// Tags with empty values are dropped; InfluxDB rejects them.
pub fn line_protocol(record: &Record) -> Result<String, SinkError> {
    if record.measurement().is_empty() {
        return Err(SinkError::SerializationFailed("measurement name is empty".into()));
    }
    if record.fields().is_empty() {
        return Err(SinkError::SerializationFailed("record has no fields".into()));
    }

    let mut line = escape(record.measurement(), &[',', ' ']);
    for (key, value) in record.tags() {
        if value.is_empty() {
            continue;
        }
        let _ = write!(line, ",{}={}", escape(key, &[',', '=', ' ']), escape(value, &[',', '=', ' ']));
    }

    let mut separator = ' ';
    for (key, value) in record.fields() {
        if !value.is_finite() {
            return Err(SinkError::SerializationFailed(format!("field {} is not finite", key)));
        }
        let _ = write!(line, "{}{}={}", separator, escape(key, &[',', '=', ' ']), value);
        separator = ',';
    }

    let _ = write!(line, " {}", record.time().timestamp());
    Ok(line)
}

fn escape(raw: &str, special: &[char]) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if c == '\\' || special.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use climalog_core::{derive, FixedClock, RawSample, RecordBuilder, RecordConfig, ValidatedSample};

    fn record(config: RecordConfig) -> Record {
        let sample = ValidatedSample::validate(RawSample {
            temperature_c: 25.0,
            humidity_pct: 50.0,
            pressure_hpa: None,
            acceleration: None,
        })
        .unwrap();
        RecordBuilder::new(FixedClock::from_unix(1_704_067_200)).build(&sample, &derive(&sample), &config)
    }

    #[test]
    fn encodes_point() {
        let line = line_protocol(&record(RecordConfig::new("environment", "office"))).unwrap();
        assert_eq!(
            line,
            "environment,location=office dew_point=15,heat_index_c=25.89,heat_index_f=78.6,\
             humidity=50,temperature_c=25,temperature_f=77 1704067200"
        );
    }

    #[test]
    fn escapes_identifiers() {
        let config = RecordConfig::new("env data", "living room,north").tag("empty", "");
        let line = line_protocol(&record(config)).unwrap();
        assert!(line.starts_with("env\\ data,location=living\\ room\\,north dew_point="));
        assert!(!line.contains("empty"));
    }

    #[test]
    fn config_builder() {
        let config = InfluxConfig::new("influx.local", 8086, "telemetry")
            .credentials("agent", "secret")
            .https(true)
            .timeout(Duration::from_secs(3));

        assert_eq!(config.write_url(), "https://influx.local:8086/write");
        assert_eq!(config.timeout, Duration::from_secs(3));
        assert!(!format!("{:?}", config).contains("secret"));
    }

    #[test]
    fn socket_timeout_maps_to_timeout() {
        let timeout = Duration::from_millis(200);
        let transport = ureq::Error::from(io::Error::new(io::ErrorKind::TimedOut, "read timed out"));
        assert_eq!(map_response(Err(transport), timeout), Err(SinkError::Timeout(timeout)));

        let refused = ureq::Error::from(io::Error::new(io::ErrorKind::ConnectionRefused, "refused"));
        assert!(matches!(map_response(Err(refused), timeout), Err(SinkError::ConnectionFailed(_))));
    }

    #[test]
    fn rejects_empty_database() {
        let result = InfluxPublisher::new(InfluxConfig::new("localhost", 8086, " "));
        assert!(result.is_err());

        let result = InfluxPublisher::new(InfluxConfig::new("localhost", 8086, "telemetry"));
        assert!(result.is_ok());
    }
}
