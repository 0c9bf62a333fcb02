//! Display Controller
//!
//! Drives a small on-device text display from joystick input and the newest
//! record. The controller is a state machine over [`DisplayState`]:
//!
//! | Direction | Next state | Shows |
//! |---|---|---|
//! | up | `TemperatureSummary` | temperature, humidity, pressure |
//! | down | `Clock` | local time |
//! | right | `Disabled` | fixed disabled message |
//! | left | `AccelerationSummary` | x/y/z in g |
//! | none | unchanged | current mode again |
//!
//! Any direction is reachable from any state; `none` never changes state.
//! Input is drained with a bounded, non-blocking poll once per iteration, so
//! a quiet joystick never stalls the sampling cadence. The selected mode
//! persists between iterations and is re-rendered from the newest record.

use std::sync::mpsc::{Receiver, TryRecvError};

use crate::{
    constants::{
        display::{DISABLED_MESSAGE, ERROR_INDICATOR, MAX_EVENTS_PER_POLL, NO_ACCELEROMETER_MESSAGE},
        time::DISPLAY_CLOCK_FORMAT,
    },
    metrics::round2,
    record::{fields, Record},
    time::Clock,
};

/// Joystick direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
    /// Middle press or anything the device reports that has no direction
    None,
}

/// Joystick action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Pressed,
    Released,
    Held,
}

/// One input event from the joystick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputEvent {
    pub direction: Direction,
    pub action: Action,
}

impl InputEvent {
    pub fn pressed(direction: Direction) -> Self {
        Self {
            direction,
            action: Action::Pressed,
        }
    }
}

/// What the display currently shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayState {
    #[default]
    Idle,
    TemperatureSummary,
    Clock,
    Disabled,
    AccelerationSummary,
}

impl DisplayState {
    /// Next state after a joystick direction
    pub fn transition(self, direction: Direction) -> Self {
        match direction {
            Direction::Up => Self::TemperatureSummary,
            Direction::Down => Self::Clock,
            Direction::Right => Self::Disabled,
            Direction::Left => Self::AccelerationSummary,
            Direction::None => self,
        }
    }
}

/// Non-blocking source of input events
pub trait InputSource: Send {
    /// Return at most `max` buffered events, oldest first; never blocks
    fn poll(&mut self, max: usize) -> Vec<InputEvent>;
}

/// Text output on the device
pub trait DisplaySink: Send {
    fn show(&mut self, message: &str);
}

/// Input source fed through a channel, e.g. by a device reader thread
pub struct ChannelInput {
    events: Receiver<InputEvent>,
    closed: bool,
}

impl ChannelInput {
    pub fn new(events: Receiver<InputEvent>) -> Self {
        Self {
            events,
            closed: false,
        }
    }
}

impl InputSource for ChannelInput {
    fn poll(&mut self, max: usize) -> Vec<InputEvent> {
        let mut drained = Vec::new();
        while drained.len() < max && !self.closed {
            match self.events.try_recv() {
                Ok(event) => drained.push(event),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    log::warn!("input device channel closed, joystick disabled");
                    self.closed = true;
                }
            }
        }
        drained
    }
}

/// Input source for devices without a joystick
#[derive(Debug, Default)]
pub struct NoInput;

impl InputSource for NoInput {
    fn poll(&mut self, _max: usize) -> Vec<InputEvent> {
        Vec::new()
    }
}

/// Owns the display state; the only writer of it
pub struct DisplayController {
    input: Box<dyn InputSource>,
    output: Box<dyn DisplaySink>,
    state: DisplayState,
    idle_message: Option<String>,
}

impl DisplayController {
    pub fn new(input: Box<dyn InputSource>, output: Box<dyn DisplaySink>) -> Self {
        Self {
            input,
            output,
            state: DisplayState::Idle,
            idle_message: None,
        }
    }

    /// Message shown while no mode has been selected yet
    pub fn with_idle_message(mut self, message: impl Into<String>) -> Self {
        self.idle_message = Some(message.into());
        self
    }

    pub fn state(&self) -> DisplayState {
        self.state
    }

    /// Apply a single event and return the resulting state
    pub fn apply(&mut self, event: InputEvent) -> DisplayState {
        let next = self.state.transition(event.direction);
        if next != self.state {
            log::debug!("display {:?} -> {:?} ({:?})", self.state, next, event.action);
        }
        self.state = next;
        next
    }

    /// Drain pending input without blocking; returns the number of events applied
    pub fn drain_input(&mut self) -> usize {
        let events = self.input.poll(MAX_EVENTS_PER_POLL);
        for event in &events {
            self.apply(*event);
        }
        events.len()
    }

    /// Text for the current state, `None` when nothing should be shown
    pub fn render(&self, record: &Record, clock: &dyn Clock) -> Option<String> {
        match self.state {
            DisplayState::Idle => self.idle_message.clone(),
            DisplayState::TemperatureSummary => Some(temperature_summary(record)),
            DisplayState::Clock => Some(clock.now_local().format(DISPLAY_CLOCK_FORMAT).to_string()),
            DisplayState::Disabled => Some(DISABLED_MESSAGE.to_string()),
            DisplayState::AccelerationSummary => Some(acceleration_summary(record)),
        }
    }

    /// Drain input, then show the current mode for `record`
    pub fn refresh(&mut self, record: &Record, clock: &dyn Clock) -> Option<String> {
        self.drain_input();
        let message = self.render(record, clock)?;
        self.output.show(&message);
        Some(message)
    }

    /// Drain input, then show the transient error indicator
    ///
    /// The selected mode is kept; it comes back with the next good record.
    pub fn show_error(&mut self) {
        self.drain_input();
        self.output.show(ERROR_INDICATOR);
    }
}

fn temperature_summary(record: &Record) -> String {
    let mut text = format!(
        "{} C {} %",
        display_value(record.field(fields::TEMPERATURE_C)),
        display_value(record.field(fields::HUMIDITY)),
    );
    if let Some(pressure) = record.field(fields::PRESSURE) {
        text.push_str(&format!(" {} mBar", display_value(Some(pressure))));
    }
    text
}

fn acceleration_summary(record: &Record) -> String {
    let axes = [fields::ACCEL_X, fields::ACCEL_Y, fields::ACCEL_Z].map(|axis| record.field(axis));
    if axes.iter().any(Option::is_none) {
        return NO_ACCELEROMETER_MESSAGE.to_string();
    }
    axes.iter()
        .map(|axis| display_value(*axis))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Two-decimal rendering that keeps one decimal on whole numbers (`25.0`)
fn display_value(value: Option<f64>) -> String {
    match value.map(round2) {
        Some(v) if v.fract() == 0.0 => format!("{:.1}", v),
        Some(v) => v.to_string(),
        None => "?".to_string(),
    }
}
