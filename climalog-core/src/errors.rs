//! Error Types for Sampling Failures
//!
//! ## Error Categories
//!
//! Errors are split by the layer that produces them:
//!
//! ### Driver
//! - `DriverError`: the hardware collaborator could not produce a number
//!   (I/O failure, unparsable sysfs value, device timeout).
//!
//! ### Validation
//! - `ValidationError`: a number was produced but it makes no physical sense
//!   (NaN, infinity, humidity outside 0-100%).
//!
//! ### Iteration
//! - `SensorFailure`: what the sampling loop sees. Every driver or validation
//!   error collapses into one of two kinds, so the loop only has to decide
//!   "skip this iteration" and log the reason.
//!
//! ## Error Handling Strategy
//!
//! ```rust
//! use climalog_core::{SensorFailure, SensorReader, sensor::SimulatedDriver};
//!
//! let mut reader = SensorReader::new(SimulatedDriver::new(21.0, 45.0));
//! match reader.read() {
//!     Ok(sample) => {
//!         // derive, build, publish
//!         # let _ = sample;
//!     }
//!     Err(SensorFailure::OutOfRange { .. }) => {
//!         // Sensor answered with garbage - skip and wait for the next tick
//!     }
//!     Err(SensorFailure::Unavailable(_)) => {
//!         // Sensor did not answer at all
//!     }
//! }
//! ```

use thiserror::Error;

/// Result type for validation operations
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validation errors - kept small and `Copy`
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum ValidationError {
    /// Value outside physical limits
    #[error("Value {value} outside range [{min}, {max}]")]
    OutOfRange {
        /// The actual sensor reading that failed validation
        value: f64,
        /// Minimum acceptable value
        min: f64,
        /// Maximum acceptable value
        max: f64,
    },

    /// Value makes no physical sense (NaN, infinity, etc)
    #[error("Invalid value: not a valid number")]
    InvalidValue,
}

/// Errors reported by a sensor driver collaborator
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DriverError {
    /// Reading the device failed
    #[error("I/O error on {channel}: {message}")]
    Io {
        /// Channel being read (e.g. `humidity`)
        channel: &'static str,
        /// Underlying error text
        message: String,
    },

    /// The device answered with something that is not a number
    #[error("Malformed value on {channel}: {raw:?}")]
    Malformed {
        /// Channel being read
        channel: &'static str,
        /// Raw text returned by the device
        raw: String,
    },

    /// The device did not answer in time
    #[error("Timed out reading {channel}")]
    Timeout {
        /// Channel being read
        channel: &'static str,
    },
}

/// Why a sampling attempt produced no record
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SensorFailure {
    /// Sensor missing, read failed after retries, or a null-sentinel value
    #[error("Sensor unavailable: {0}")]
    Unavailable(String),

    /// Sensor answered with a value outside its physical range
    #[error("Reading out of range: {channel}={value}")]
    OutOfRange {
        /// Channel that failed the range check
        channel: &'static str,
        /// Offending value
        value: f64,
    },
}

impl SensorFailure {
    /// Short name of the failure kind, used in log lines
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Unavailable(_) => "unavailable",
            Self::OutOfRange { .. } => "out_of_range",
        }
    }

    /// Map a validation error on `channel` to the loop-level failure kind
    pub fn from_validation(channel: &'static str, err: ValidationError) -> Self {
        match err {
            ValidationError::OutOfRange { value, .. } => Self::OutOfRange { channel, value },
            ValidationError::InvalidValue => {
                Self::Unavailable(format!("{channel} returned a null sentinel"))
            }
        }
    }
}

impl From<DriverError> for SensorFailure {
    fn from(err: DriverError) -> Self {
        Self::Unavailable(err.to_string())
    }
}
