//! Validation traits shared by every sensor channel

use crate::errors::ValidationResult;

/// Checks one channel's readings against its physical limits
pub trait Validator {
    /// The type of value this validator handles
    type Value;

    /// Validate a single reading
    fn validate(&self, value: Self::Value) -> ValidationResult<()>;
}

/// Readings that can carry a null sentinel
pub trait Validatable {
    /// False for NaN and infinities
    fn is_valid(&self) -> bool;
}

impl Validatable for f64 {
    fn is_valid(&self) -> bool {
        self.is_finite()
    }
}
