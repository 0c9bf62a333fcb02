//! Core sampling engine for climalog
//!
//! Turns one raw sensor sample into one immutable, unit-complete record:
//!
//! ```text
//! SensorReader ──→ ValidatedSample ──→ derive() ──→ RecordBuilder ──→ Record
//! ```
//!
//! The display state machine that reacts to joystick input also lives here,
//! since it only depends on records and a clock.
//!
//! ```no_run
//! use climalog_core::{
//!     derive, RecordBuilder, RecordConfig, SensorReader,
//!     sensor::SimulatedDriver, time::SystemClock,
//! };
//!
//! let mut reader = SensorReader::new(SimulatedDriver::new(22.0, 45.0));
//! let builder = RecordBuilder::new(SystemClock);
//! let config = RecordConfig::new("environment", "office");
//!
//! if let Ok(sample) = reader.read() {
//!     let record = builder.build(&sample, &derive(&sample), &config);
//!     println!("{}", record.time_string());
//! }
//! ```

#![deny(unsafe_code)]

pub mod constants;
pub mod display;
pub mod errors;
pub mod metrics;
pub mod record;
pub mod sensor;
pub mod time;
pub mod traits;
pub mod validators;

// Public API
pub use display::{
    Action, ChannelInput, Direction, DisplayController, DisplaySink, DisplayState, InputEvent,
    InputSource, NoInput,
};
pub use errors::{DriverError, SensorFailure, ValidationError, ValidationResult};
pub use metrics::{derive, DerivedMetrics};
pub use record::{Record, RecordBuilder, RecordConfig};
pub use sensor::{Acceleration, RawSample, SensorDriver, SensorReader, ValidatedSample};
pub use time::{Clock, FixedClock, SystemClock};
pub use traits::{Validatable, Validator};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
