//! Record Builder
//!
//! A [`Record`] is the unit of delivery: one timestamped, tagged set of
//! numeric fields, built fresh every iteration and never mutated afterwards.
//! Both sinks and the display read the same record, keyed by one canonical
//! field schema (see [`fields`]).

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    constants::time::RECORD_TIMESTAMP_FORMAT,
    metrics::DerivedMetrics,
    sensor::ValidatedSample,
    time::{truncate_to_seconds, Clock},
};

/// Canonical field and tag names shared by every sink
pub mod fields {
    pub const TEMPERATURE_C: &str = "temperature_c";
    pub const TEMPERATURE_F: &str = "temperature_f";
    pub const HUMIDITY: &str = "humidity";
    pub const PRESSURE: &str = "pressure";
    pub const ACCEL_X: &str = "x";
    pub const ACCEL_Y: &str = "y";
    pub const ACCEL_Z: &str = "z";
    pub const DEW_POINT: &str = "dew_point";
    pub const HEAT_INDEX_F: &str = "heat_index_f";
    pub const HEAT_INDEX_C: &str = "heat_index_c";

    /// Tag carrying the deployment location
    pub const LOCATION_TAG: &str = "location";
}

/// Static per-deployment record metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordConfig {
    pub measurement: String,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

impl RecordConfig {
    /// Metadata with a single `location` tag
    pub fn new(measurement: impl Into<String>, location: impl Into<String>) -> Self {
        let mut tags = BTreeMap::new();
        tags.insert(fields::LOCATION_TAG.to_string(), location.into());
        Self {
            measurement: measurement.into(),
            tags,
        }
    }

    /// Add an extra tag
    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }
}

/// One fully-derived, timestamped telemetry sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    measurement: String,
    tags: BTreeMap<String, String>,
    #[serde(with = "second_precision")]
    time: DateTime<Utc>,
    fields: BTreeMap<String, f64>,
}

impl Record {
    pub fn measurement(&self) -> &str {
        &self.measurement
    }

    pub fn tags(&self) -> &BTreeMap<String, String> {
        &self.tags
    }

    pub fn fields(&self) -> &BTreeMap<String, f64> {
        &self.fields
    }

    /// Record instant, always whole seconds
    pub fn time(&self) -> DateTime<Utc> {
        self.time
    }

    /// Record instant as `2024-01-01T00:00:00Z`
    pub fn time_string(&self) -> String {
        self.time.format(RECORD_TIMESTAMP_FORMAT).to_string()
    }

    pub fn field(&self, name: &str) -> Option<f64> {
        self.fields.get(name).copied()
    }

    pub fn location(&self) -> Option<&str> {
        self.tags.get(fields::LOCATION_TAG).map(String::as_str)
    }
}

/// Builds records stamped by an injected clock
pub struct RecordBuilder<C> {
    clock: C,
}

impl<C: Clock> RecordBuilder<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }

    /// Assemble a record from one iteration's sample and metrics
    ///
    /// Raw channels are carried as read; derived metrics are rounded to 2
    /// decimals.
    pub fn build(
        &self,
        sample: &ValidatedSample,
        metrics: &DerivedMetrics,
        config: &RecordConfig,
    ) -> Record {
        let derived = metrics.rounded();
        let mut values = BTreeMap::new();
        values.insert(fields::TEMPERATURE_C.to_string(), sample.temperature_c());
        values.insert(fields::HUMIDITY.to_string(), sample.humidity_pct());
        if let Some(pressure) = sample.pressure_hpa() {
            values.insert(fields::PRESSURE.to_string(), pressure);
        }
        if let Some(accel) = sample.acceleration() {
            values.insert(fields::ACCEL_X.to_string(), accel.x);
            values.insert(fields::ACCEL_Y.to_string(), accel.y);
            values.insert(fields::ACCEL_Z.to_string(), accel.z);
        }
        values.insert(fields::TEMPERATURE_F.to_string(), derived.temperature_f);
        values.insert(fields::DEW_POINT.to_string(), derived.dew_point_c);
        values.insert(fields::HEAT_INDEX_F.to_string(), derived.heat_index_f);
        values.insert(fields::HEAT_INDEX_C.to_string(), derived.heat_index_c);

        Record {
            measurement: config.measurement.clone(),
            tags: config.tags.clone(),
            time: truncate_to_seconds(self.clock.now_utc()),
            fields: values,
        }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }
}

/// Serde adapter for `%Y-%m-%dT%H:%M:%SZ` timestamps
mod second_precision {
    use super::*;
    use serde::{de::Error, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&time.format(RECORD_TIMESTAMP_FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&raw, RECORD_TIMESTAMP_FORMAT)
            .map(|naive| naive.and_utc())
            .map_err(D::Error::custom)
    }
}
