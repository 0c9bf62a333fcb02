//! Humidity Validation
//!
//! Relative humidity (RH) is the ratio of water vapor present to the maximum
//! possible at a given temperature, as a percentage. By definition it lives
//! in `[0, 100]`.
//!
//! Cheap capacitive sensors (DHT22, HTS221) report error codes as values far
//! outside that range, and some drivers report a null reading as NaN. Both
//! must stop the iteration before a record is built.

use crate::{
    constants::physics::{HUMIDITY_MAX_PCT, HUMIDITY_MIN_PCT},
    errors::ValidationResult,
    traits::Validator,
};

use super::utils;

/// Humidity validator for relative humidity percentage
#[derive(Debug, Clone, PartialEq)]
pub struct HumidityValidator {
    min_percent: f64,
    max_percent: f64,
}

impl Default for HumidityValidator {
    fn default() -> Self {
        Self::strict()
    }
}

impl HumidityValidator {
    /// Validator that enforces the 0-100% definition range
    pub fn strict() -> Self {
        Self {
            min_percent: HUMIDITY_MIN_PCT,
            max_percent: HUMIDITY_MAX_PCT,
        }
    }
}

impl Validator for HumidityValidator {
    type Value = f64;

    fn validate(&self, value: Self::Value) -> ValidationResult<()> {
        utils::check_finite(value)?;
        utils::check_range(value, self.min_percent, self.max_percent)
    }
}
