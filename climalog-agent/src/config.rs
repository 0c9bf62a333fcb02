//! Agent Configuration
//!
//! Read once at startup from a JSON file:
//!
//! ```json
//! {
//!   "sensor": {
//!     "driver": { "kind": "iio", "device": "/sys/bus/iio/devices/iio:device0" },
//!     "measurement": "environment",
//!     "location": "office"
//!   },
//!   "interval_secs": 15,
//!   "influxdb": { "host": "localhost", "port": 8086, "dbname": "telemetry" },
//!   "mqtt": { "broker_address": "localhost", "port": 1883, "topic_prefix": "home/" },
//!   "display": { "enabled": true, "input_device": "/dev/input/event0" }
//! }
//! ```
//!
//! A missing `influxdb` or `mqtt` section disables that sink. Everything
//! else has a default.

use std::path::{Path, PathBuf};
use std::time::Duration;

use climalog_connectors::{InfluxConfig, MqttConfig};
use climalog_core::{constants::DEFAULT_SAMPLE_INTERVAL_SECS, sensor::DEFAULT_READ_ATTEMPTS, RecordConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable naming the config file when no argument is given
pub const CONFIG_ENV_VAR: &str = "CLIMALOG_CONFIG";

/// Config file used when neither argument nor environment names one
pub const DEFAULT_CONFIG_PATH: &str = "settings.json";

/// Why the configuration could not be loaded
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid configuration: {field} {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Top-level agent configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default)]
    pub sensor: SensorSection,

    /// Seconds between iterations
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    #[serde(default)]
    pub influxdb: Option<InfluxSection>,

    #[serde(default)]
    pub mqtt: Option<MqttSection>,

    #[serde(default)]
    pub display: DisplaySection,
}

/// Which sensor driver to use
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DriverSection {
    /// Linux Industrial I/O sysfs device
    Iio {
        /// Device directory carrying temperature and humidity channels
        device: PathBuf,
        /// Separate device directory for the accelerometer, if any
        #[serde(default)]
        accel_device: Option<PathBuf>,
    },
    /// Deterministic simulated readings
    Simulated {
        #[serde(default = "default_sim_temperature")]
        temperature_c: f64,
        #[serde(default = "default_sim_humidity")]
        humidity_pct: f64,
        #[serde(default)]
        seed: Option<u32>,
    },
}

impl Default for DriverSection {
    fn default() -> Self {
        Self::Simulated {
            temperature_c: default_sim_temperature(),
            humidity_pct: default_sim_humidity(),
            seed: None,
        }
    }
}

/// Sensor and record identity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorSection {
    #[serde(default)]
    pub driver: DriverSection,

    #[serde(default = "default_measurement")]
    pub measurement: String,

    #[serde(default = "default_location")]
    pub location: String,

    #[serde(default = "default_read_attempts")]
    pub read_attempts: u32,
}

impl Default for SensorSection {
    fn default() -> Self {
        Self {
            driver: DriverSection::default(),
            measurement: default_measurement(),
            location: default_location(),
            read_attempts: default_read_attempts(),
        }
    }
}

impl SensorSection {
    pub fn record_config(&self) -> RecordConfig {
        RecordConfig::new(&self.measurement, &self.location)
    }
}

/// InfluxDB connection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfluxSection {
    pub host: String,

    #[serde(default = "default_influx_port")]
    pub port: u16,

    #[serde(default)]
    pub user: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    pub dbname: String,

    #[serde(default)]
    pub https: bool,

    #[serde(default = "default_influx_timeout_secs")]
    pub timeout_secs: u64,
}

impl InfluxSection {
    pub fn to_publisher_config(&self) -> InfluxConfig {
        let mut config = InfluxConfig::new(&self.host, self.port, &self.dbname)
            .https(self.https)
            .timeout(Duration::from_secs(self.timeout_secs));
        if let Some(user) = &self.user {
            config = config.credentials(user, self.password.clone().unwrap_or_default());
        }
        config
    }
}

/// MQTT broker connection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MqttSection {
    pub broker_address: String,

    #[serde(default = "default_mqtt_port")]
    pub port: u16,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    #[serde(default)]
    pub topic_prefix: String,

    #[serde(default)]
    pub client_id: Option<String>,

    #[serde(default = "default_keep_alive_secs")]
    pub keep_alive_secs: u64,

    #[serde(default = "default_mqtt_timeout_secs")]
    pub timeout_secs: u64,
}

impl MqttSection {
    pub fn to_publisher_config(&self) -> MqttConfig {
        let mut config = MqttConfig::new(&self.broker_address, self.port)
            .topic_prefix(&self.topic_prefix)
            .keep_alive(Duration::from_secs(self.keep_alive_secs))
            .timeout(Duration::from_secs(self.timeout_secs));
        if let Some(client_id) = &self.client_id {
            config = config.client_id(client_id);
        }
        if let Some(username) = &self.username {
            config = config.credentials(username, self.password.clone().unwrap_or_default());
        }
        config
    }
}

/// On-device display and joystick
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DisplaySection {
    #[serde(default)]
    pub enabled: bool,

    /// evdev device the joystick reports on
    #[serde(default)]
    pub input_device: Option<PathBuf>,

    /// Shown until the first joystick press
    #[serde(default)]
    pub idle_message: Option<String>,
}

impl AgentConfig {
    /// Load and validate a config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Parse and validate a JSON document
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Config path from the first CLI argument, then the environment, then the default
    pub fn resolve_path(arg: Option<String>) -> PathBuf {
        arg.or_else(|| std::env::var(CONFIG_ENV_VAR).ok())
            .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string())
            .into()
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval_secs == 0 {
            return Err(ConfigError::invalid("interval_secs", "must be at least 1"));
        }
        if self.sensor.measurement.trim().is_empty() {
            return Err(ConfigError::invalid("sensor.measurement", "must not be empty"));
        }
        if self.sensor.read_attempts == 0 {
            return Err(ConfigError::invalid("sensor.read_attempts", "must be at least 1"));
        }
        if let DriverSection::Simulated { humidity_pct, .. } = self.sensor.driver {
            if !(0.0..=100.0).contains(&humidity_pct) {
                return Err(ConfigError::invalid(
                    "sensor.driver.humidity_pct",
                    format!("{} is outside 0-100", humidity_pct),
                ));
            }
        }

        if let Some(influx) = &self.influxdb {
            if influx.host.trim().is_empty() {
                return Err(ConfigError::invalid("influxdb.host", "must not be empty"));
            }
            if influx.dbname.trim().is_empty() {
                return Err(ConfigError::invalid("influxdb.dbname", "must not be empty"));
            }
            if influx.timeout_secs == 0 {
                return Err(ConfigError::invalid("influxdb.timeout_secs", "must be at least 1"));
            }
        }

        if let Some(mqtt) = &self.mqtt {
            if mqtt.broker_address.trim().is_empty() {
                return Err(ConfigError::invalid("mqtt.broker_address", "must not be empty"));
            }
            if mqtt.timeout_secs == 0 {
                return Err(ConfigError::invalid("mqtt.timeout_secs", "must be at least 1"));
            }
            if mqtt.keep_alive_secs < 5 {
                return Err(ConfigError::invalid("mqtt.keep_alive_secs", "must be at least 5"));
            }
        }

        Ok(())
    }
}

fn default_interval_secs() -> u64 {
    DEFAULT_SAMPLE_INTERVAL_SECS
}

fn default_measurement() -> String {
    "environment".to_string()
}

fn default_location() -> String {
    "default".to_string()
}

fn default_read_attempts() -> u32 {
    DEFAULT_READ_ATTEMPTS
}

fn default_sim_temperature() -> f64 {
    21.0
}

fn default_sim_humidity() -> f64 {
    45.0
}

fn default_influx_port() -> u16 {
    8086
}

fn default_influx_timeout_secs() -> u64 {
    10
}

fn default_mqtt_port() -> u16 {
    1883
}

fn default_keep_alive_secs() -> u64 {
    60
}

fn default_mqtt_timeout_secs() -> u64 {
    5
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = AgentConfig::from_json("{}").unwrap();
        assert_eq!(config.interval_secs, 15);
        assert_eq!(config.sensor.read_attempts, 3);
        assert_eq!(config.sensor.measurement, "environment");
        assert!(config.influxdb.is_none());
        assert!(config.mqtt.is_none());
        assert!(!config.display.enabled);
        assert!(matches!(config.sensor.driver, DriverSection::Simulated { .. }));
    }

    #[test]
    fn parses_full_document() {
        let config = AgentConfig::from_json(
            r#"{
                "sensor": {
                    "driver": { "kind": "iio", "device": "/sys/bus/iio/devices/iio:device0" },
                    "measurement": "climate",
                    "location": "garage"
                },
                "interval_secs": 30,
                "influxdb": { "host": "db", "user": "agent", "password": "pw", "dbname": "home" },
                "mqtt": { "broker_address": "broker", "topic_prefix": "home/", "username": "agent" },
                "display": { "enabled": true, "idle_message": "hello" }
            }"#,
        )
        .unwrap();

        assert_eq!(config.interval(), Duration::from_secs(30));
        assert_eq!(
            config.sensor.driver,
            DriverSection::Iio {
                device: "/sys/bus/iio/devices/iio:device0".into(),
                accel_device: None
            }
        );

        let influx = config.influxdb.unwrap().to_publisher_config();
        assert_eq!(influx.port, 8086);
        assert_eq!(influx.credentials, Some(("agent".into(), "pw".into())));

        let mqtt = config.mqtt.unwrap().to_publisher_config();
        assert_eq!(mqtt.port, 1883);
        assert_eq!(mqtt.topic_prefix, "home/");
        assert_eq!(mqtt.credentials, Some(("agent".into(), String::new())));

        assert_eq!(config.display.idle_message.as_deref(), Some("hello"));
        assert_eq!(config.sensor.record_config().tags.get("location").map(String::as_str), Some("garage"));
    }

    #[test]
    fn rejects_invalid_values() {
        let zero_interval = AgentConfig::from_json(r#"{"interval_secs": 0}"#);
        assert!(matches!(zero_interval, Err(ConfigError::Invalid { field: "interval_secs", .. })));

        let empty_db = AgentConfig::from_json(r#"{"influxdb": {"host": "db", "dbname": ""}}"#);
        assert!(matches!(empty_db, Err(ConfigError::Invalid { field: "influxdb.dbname", .. })));

        let bad_sim = AgentConfig::from_json(
            r#"{"sensor": {"driver": {"kind": "simulated", "humidity_pct": 140}}}"#,
        );
        assert!(matches!(bad_sim, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn malformed_json_is_parse_error() {
        assert!(matches!(AgentConfig::from_json("{"), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn explicit_argument_wins() {
        let path = AgentConfig::resolve_path(Some("/etc/climalog.json".into()));
        assert_eq!(path, PathBuf::from("/etc/climalog.json"));
    }
}
