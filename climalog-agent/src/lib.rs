//! climalog sampling agent
//!
//! Wires the core sampling engine to real hardware and to the configured
//! sinks:
//!
//! - [`config`]: JSON configuration file and its validation
//! - [`drivers`]: Linux IIO and simulated sensor drivers
//! - [`input`]: evdev joystick reader
//! - [`display`]: display outputs
//! - [`orchestrator`]: the sample, publish, render, sleep cycle

pub mod config;
pub mod display;
pub mod drivers;
pub mod input;
pub mod orchestrator;

pub use config::{AgentConfig, ConfigError};
pub use display::ConsoleDisplay;
pub use orchestrator::{IterationReport, Orchestrator, Phase};
