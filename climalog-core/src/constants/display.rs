//! Fixed display strings.

/// Shown once the user disables the screen.
pub const DISABLED_MESSAGE: &str = "Screen Disabled";

/// Transient indicator shown when the sensor failed this iteration.
pub const ERROR_INDICATOR: &str = "Err";

/// Shown in the acceleration view when the device has no accelerometer.
pub const NO_ACCELEROMETER_MESSAGE: &str = "No accelerometer";

/// Upper bound on input events drained per iteration.
pub const MAX_EVENTS_PER_POLL: usize = 32;
