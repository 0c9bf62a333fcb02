//! Sensor Reader
//!
//! Wraps a hardware driver collaborator and turns whatever it returns into
//! either a [`ValidatedSample`] or a [`SensorFailure`]:
//!
//! ```text
//! SensorDriver ──→ RawSample ──→ validators ──→ ValidatedSample
//!      │                              │
//!      └── DriverError (retried) ─────┴──→ SensorFailure
//! ```
//!
//! The driver owns the wire protocol (sysfs, I2C, GPIO timing). The reader
//! owns the retry budget and the physical plausibility checks, so every
//! driver gets the same validation.

use serde::{Deserialize, Serialize};

use crate::{
    errors::{DriverError, SensorFailure},
    traits::Validator,
    validators::{check_finite, HumidityValidator},
};

/// Default number of driver attempts before a sample is given up
pub const DEFAULT_READ_ATTEMPTS: u32 = 3;

/// Three-axis acceleration in g
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Acceleration {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// One unvalidated reading of every channel the device has
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawSample {
    pub temperature_c: f64,
    pub humidity_pct: f64,
    pub pressure_hpa: Option<f64>,
    pub acceleration: Option<Acceleration>,
}

/// A sample that passed validation
///
/// Only [`SensorReader`] and [`ValidatedSample::validate`] construct these,
/// so holding one means humidity is finite and within 0-100%.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValidatedSample {
    raw: RawSample,
}

impl ValidatedSample {
    /// Run all channel checks over a raw sample
    pub fn validate(raw: RawSample) -> Result<Self, SensorFailure> {
        HumidityValidator::strict()
            .validate(raw.humidity_pct)
            .map_err(|e| SensorFailure::from_validation("humidity", e))?;
        check_finite(raw.temperature_c)
            .map_err(|e| SensorFailure::from_validation("temperature", e))?;
        if let Some(pressure) = raw.pressure_hpa {
            check_finite(pressure).map_err(|e| SensorFailure::from_validation("pressure", e))?;
        }
        if let Some(accel) = raw.acceleration {
            for axis in [accel.x, accel.y, accel.z] {
                check_finite(axis)
                    .map_err(|e| SensorFailure::from_validation("acceleration", e))?;
            }
        }
        Ok(Self { raw })
    }

    pub fn temperature_c(&self) -> f64 {
        self.raw.temperature_c
    }

    pub fn humidity_pct(&self) -> f64 {
        self.raw.humidity_pct
    }

    pub fn pressure_hpa(&self) -> Option<f64> {
        self.raw.pressure_hpa
    }

    pub fn acceleration(&self) -> Option<Acceleration> {
        self.raw.acceleration
    }
}

/// Hardware collaborator that yields typed numeric readings
///
/// Optional channels default to "not fitted". A driver may report a null
/// reading either as an error or as a non-finite value.
pub trait SensorDriver: Send {
    /// Air temperature in °C
    fn read_temperature(&mut self) -> Result<f64, DriverError>;

    /// Relative humidity in %
    fn read_humidity(&mut self) -> Result<f64, DriverError>;

    /// Barometric pressure in hPa, `None` if the device has no barometer
    fn read_pressure(&mut self) -> Result<Option<f64>, DriverError> {
        Ok(None)
    }

    /// Acceleration in g, `None` if the device has no accelerometer
    fn read_acceleration(&mut self) -> Result<Option<Acceleration>, DriverError> {
        Ok(None)
    }
}

impl<D: SensorDriver + ?Sized> SensorDriver for Box<D> {
    fn read_temperature(&mut self) -> Result<f64, DriverError> {
        (**self).read_temperature()
    }

    fn read_humidity(&mut self) -> Result<f64, DriverError> {
        (**self).read_humidity()
    }

    fn read_pressure(&mut self) -> Result<Option<f64>, DriverError> {
        (**self).read_pressure()
    }

    fn read_acceleration(&mut self) -> Result<Option<Acceleration>, DriverError> {
        (**self).read_acceleration()
    }
}

/// Reads and validates one sample per call
pub struct SensorReader<D> {
    driver: D,
    attempts: u32,
}

impl<D: SensorDriver> SensorReader<D> {
    pub fn new(driver: D) -> Self {
        Self {
            driver,
            attempts: DEFAULT_READ_ATTEMPTS,
        }
    }

    /// Set how many times a failing driver read is retried (minimum 1)
    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts.max(1);
        self
    }

    /// Acquire one validated sample
    ///
    /// Driver errors are retried up to the attempt budget. Implausible values
    /// are not retried: the sensor answered, the answer was wrong.
    pub fn read(&mut self) -> Result<ValidatedSample, SensorFailure> {
        let mut last_error = None;
        for attempt in 1..=self.attempts {
            match self.read_raw() {
                Ok(raw) => return ValidatedSample::validate(raw),
                Err(e) => {
                    log::debug!("sensor read attempt {}/{} failed: {}", attempt, self.attempts, e);
                    last_error = Some(e);
                }
            }
        }
        Err(last_error
            .map(SensorFailure::from)
            .unwrap_or_else(|| SensorFailure::Unavailable("no read attempted".into())))
    }

    fn read_raw(&mut self) -> Result<RawSample, DriverError> {
        Ok(RawSample {
            humidity_pct: self.driver.read_humidity()?,
            temperature_c: self.driver.read_temperature()?,
            pressure_hpa: self.driver.read_pressure()?,
            acceleration: self.driver.read_acceleration()?,
        })
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }
}

/// Deterministic stand-in for real hardware
///
/// Produces readings that wander around a base point with a seeded
/// pseudo-random walk, plus a level accelerometer and a barometer.
#[derive(Debug, Clone)]
pub struct SimulatedDriver {
    base_temp_c: f64,
    base_humidity_pct: f64,
    base_pressure_hpa: f64,
    seed: u32,
}

impl SimulatedDriver {
    pub fn new(base_temp_c: f64, base_humidity_pct: f64) -> Self {
        Self {
            base_temp_c,
            base_humidity_pct,
            base_pressure_hpa: 1013.25,
            seed: 42,
        }
    }

    /// Reseed the noise generator
    pub fn with_seed(mut self, seed: u32) -> Self {
        self.seed = seed;
        self
    }

    fn random_float(&mut self) -> f64 {
        // Linear congruential generator
        self.seed = self.seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
        f64::from((self.seed / 65_536) % 32_768) / 32_768.0
    }

    fn noise(&mut self, amplitude: f64) -> f64 {
        (self.random_float() * 2.0 - 1.0) * amplitude
    }
}

impl SensorDriver for SimulatedDriver {
    fn read_temperature(&mut self) -> Result<f64, DriverError> {
        Ok(self.base_temp_c + self.noise(0.5))
    }

    fn read_humidity(&mut self) -> Result<f64, DriverError> {
        Ok((self.base_humidity_pct + self.noise(2.0)).clamp(0.0, 100.0))
    }

    fn read_pressure(&mut self) -> Result<Option<f64>, DriverError> {
        Ok(Some(self.base_pressure_hpa + self.noise(1.0)))
    }

    fn read_acceleration(&mut self) -> Result<Option<Acceleration>, DriverError> {
        Ok(Some(Acceleration {
            x: self.noise(0.02),
            y: self.noise(0.02),
            z: 1.0 + self.noise(0.02),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FlakyDriver {
        failures_left: u32,
        humidity: f64,
        calls: u32,
    }

    impl SensorDriver for FlakyDriver {
        fn read_temperature(&mut self) -> Result<f64, DriverError> {
            Ok(22.0)
        }

        fn read_humidity(&mut self) -> Result<f64, DriverError> {
            self.calls += 1;
            if self.failures_left > 0 {
                self.failures_left -= 1;
                return Err(DriverError::Timeout { channel: "humidity" });
            }
            Ok(self.humidity)
        }
    }

    #[test]
    fn retries_driver_errors() {
        let driver = FlakyDriver { failures_left: 2, humidity: 40.0, calls: 0 };
        let mut reader = SensorReader::new(driver).with_attempts(3);
        let sample = reader.read().expect("third attempt succeeds");
        assert_eq!(sample.humidity_pct(), 40.0);
        assert_eq!(reader.driver().calls, 3);
    }

    #[test]
    fn exhausted_retries_are_unavailable() {
        let driver = FlakyDriver { failures_left: 10, humidity: 40.0, calls: 0 };
        let mut reader = SensorReader::new(driver).with_attempts(2);
        assert!(matches!(reader.read(), Err(SensorFailure::Unavailable(_))));
        assert_eq!(reader.driver().calls, 2);
    }

    #[test]
    fn out_of_range_is_not_retried() {
        let driver = FlakyDriver { failures_left: 0, humidity: 120.0, calls: 0 };
        let mut reader = SensorReader::new(driver);
        assert_eq!(
            reader.read(),
            Err(SensorFailure::OutOfRange { channel: "humidity", value: 120.0 })
        );
        assert_eq!(reader.driver().calls, 1);
    }

    #[test]
    fn non_finite_optional_channel_is_unavailable() {
        let raw = RawSample {
            temperature_c: 20.0,
            humidity_pct: 50.0,
            pressure_hpa: Some(f64::NAN),
            acceleration: None,
        };
        assert!(matches!(
            ValidatedSample::validate(raw),
            Err(SensorFailure::Unavailable(_))
        ));
    }

    #[test]
    fn simulated_driver_is_plausible() {
        let mut reader = SensorReader::new(SimulatedDriver::new(21.0, 45.0));
        for _ in 0..100 {
            let sample = reader.read().expect("simulated readings validate");
            assert!((sample.temperature_c() - 21.0).abs() <= 0.5);
            assert!(sample.pressure_hpa().is_some());
            assert!(sample.acceleration().is_some());
        }
    }
}
