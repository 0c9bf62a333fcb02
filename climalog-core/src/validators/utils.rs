//! Common validation helpers shared by the channel validators.
//!
//! All helpers are pure functions: they never touch the sensor and never
//! allocate, so they can be called from anywhere in the sampling path.

use crate::{
    errors::{ValidationError, ValidationResult},
    traits::Validatable,
};

/// Check if a value is within the specified inclusive range
pub fn check_range(value: f64, min: f64, max: f64) -> ValidationResult<()> {
    if value < min || value > max {
        Err(ValidationError::OutOfRange { value, min, max })
    } else {
        Ok(())
    }
}

/// Reject NaN and infinities, which drivers use as "no reading" sentinels
pub fn check_finite(value: f64) -> ValidationResult<()> {
    if value.is_valid() {
        Ok(())
    } else {
        Err(ValidationError::InvalidValue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_check() {
        assert!(check_range(5.0, 0.0, 10.0).is_ok());
        assert!(check_range(0.0, 0.0, 10.0).is_ok());
        assert!(check_range(10.0, 0.0, 10.0).is_ok());
        assert!(check_range(-1.0, 0.0, 10.0).is_err());
        assert!(check_range(11.0, 0.0, 10.0).is_err());
    }

    #[test]
    fn finiteness() {
        assert!(check_finite(5.0).is_ok());
        assert_eq!(check_finite(f64::NAN), Err(ValidationError::InvalidValue));
        assert_eq!(check_finite(f64::NEG_INFINITY), Err(ValidationError::InvalidValue));
    }
}
