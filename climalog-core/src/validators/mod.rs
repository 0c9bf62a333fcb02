//! Channel Validators
//!
//! Every raw number coming out of a sensor driver passes through a validator
//! before it can become part of a record. Two layers apply:
//!
//! ### 1. Finiteness
//! Drivers signal "no reading" with NaN or infinity. Those are rejected as
//! `ValidationError::InvalidValue`.
//!
//! ### 2. Range Validation
//! Relative humidity is a percentage: anything outside 0-100% is an error
//! code from the sensor, not weather.
//!
//! ```rust
//! use climalog_core::validators::HumidityValidator;
//! use climalog_core::traits::Validator;
//!
//! let validator = HumidityValidator::strict();
//! assert!(validator.validate(45.0).is_ok());
//! assert!(validator.validate(101.0).is_err());
//! assert!(validator.validate(f64::NAN).is_err());
//! ```

mod humidity;
pub(crate) mod utils;

pub use humidity::HumidityValidator;
pub use utils::{check_finite, check_range};
