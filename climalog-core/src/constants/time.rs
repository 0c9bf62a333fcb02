//! Time-Related Constants
//!
//! Sampling cadence and the textual formats used on the wire and on the
//! display.

/// Default pause between two sampling iterations (seconds).
///
/// Matches the cadence of the deployed agents.
pub const DEFAULT_SAMPLE_INTERVAL_SECS: u64 = 15;

/// Record timestamp format: ISO-8601 UTC at second precision.
pub const RECORD_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Local wall-clock format shown on the display (e.g. `3:07 PM`).
pub const DISPLAY_CLOCK_FORMAT: &str = "%-I:%M %p";
