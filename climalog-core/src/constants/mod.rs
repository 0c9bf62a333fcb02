//! Constants for climalog core
//!
//! All numeric values used by the sampling path live here with their units
//! in the name.
//!
//! ## Organization
//!
//! - **Physics**: unit conversions, valid ranges, heat index regression
//! - **Time**: sampling cadence and timestamp formats
//! - **Display**: fixed on-device messages

/// Physical constants, unit conversions and regression coefficients.
pub mod physics;

/// Sampling intervals and timestamp formats.
pub mod time;

/// Fixed strings shown on the device display.
pub mod display;

pub use physics::{HUMIDITY_MAX_PCT, HUMIDITY_MIN_PCT, STANDARD_GRAVITY_M_PER_S2};
pub use time::{DEFAULT_SAMPLE_INTERVAL_SECS, RECORD_TIMESTAMP_FORMAT};
