//! Shared fixtures for the core integration tests

#![allow(dead_code)]

use climalog_core::{
    DriverError, FixedClock, RawSample, Record, RecordBuilder, RecordConfig, SensorDriver,
    ValidatedSample, derive,
};

/// 2024-01-01T00:00:00Z
pub const NEW_YEAR_2024: i64 = 1_704_067_200;

/// Driver replaying a fixed script of humidity readings
pub struct ScriptedDriver {
    pub temperature_c: f64,
    pub humidity: Vec<Result<f64, DriverError>>,
}

impl ScriptedDriver {
    pub fn new(temperature_c: f64, humidity: Vec<Result<f64, DriverError>>) -> Self {
        Self { temperature_c, humidity }
    }
}

impl SensorDriver for ScriptedDriver {
    fn read_temperature(&mut self) -> Result<f64, DriverError> {
        Ok(self.temperature_c)
    }

    fn read_humidity(&mut self) -> Result<f64, DriverError> {
        if self.humidity.is_empty() {
            return Err(DriverError::Timeout { channel: "humidity" });
        }
        self.humidity.remove(0)
    }
}

/// Build a record for a temperature/humidity pair at a fixed instant
pub fn record_for(temperature_c: f64, humidity_pct: f64) -> Record {
    let sample = ValidatedSample::validate(RawSample {
        temperature_c,
        humidity_pct,
        pressure_hpa: None,
        acceleration: None,
    })
    .expect("fixture sample is valid");
    RecordBuilder::new(FixedClock::from_unix(NEW_YEAR_2024)).build(
        &sample,
        &derive(&sample),
        &RecordConfig::new("environment", "lab"),
    )
}
