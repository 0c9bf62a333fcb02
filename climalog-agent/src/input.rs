//! Joystick input from a Linux evdev device
//!
//! A reader thread blocks on the device file and forwards decoded key events
//! into a channel. The display controller drains that channel through
//! [`ChannelInput`] without ever blocking the sampling loop.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::sync::mpsc::{self, Sender};
use std::thread::{self, JoinHandle};

use climalog_core::{Action, ChannelInput, Direction, InputEvent};

/// `struct input_event`: a `timeval`, then type, code and value
const EVENT_SIZE: usize = 2 * std::mem::size_of::<usize>() + 8;

const EV_KEY: u16 = 0x01;

const KEY_ENTER: u16 = 28;
const KEY_UP: u16 = 103;
const KEY_LEFT: u16 = 105;
const KEY_RIGHT: u16 = 106;
const KEY_DOWN: u16 = 108;

/// Open an evdev device and start the reader thread
///
/// The thread exits when the device read fails or the returned input is
/// dropped.
pub fn spawn_evdev(device: &Path) -> io::Result<(ChannelInput, JoinHandle<()>)> {
    let file = File::open(device)?;
    let (tx, rx) = mpsc::channel();
    let name = device.display().to_string();

    let handle = thread::Builder::new()
        .name("climalog-evdev".into())
        .spawn(move || read_events(file, tx, &name))?;

    log::info!("reading joystick events from {}", device.display());
    Ok((ChannelInput::new(rx), handle))
}

fn read_events(mut device: impl Read, tx: Sender<InputEvent>, name: &str) {
    let mut buf = [0u8; EVENT_SIZE];
    loop {
        if let Err(e) = device.read_exact(&mut buf) {
            log::error!("joystick device {} failed: {}", name, e);
            return;
        }
        if let Some(event) = decode(&buf) {
            if tx.send(event).is_err() {
                return;
            }
        }
    }
}

/// Decode one raw `input_event`; `None` for anything that is not a joystick key
pub fn decode(raw: &[u8; EVENT_SIZE]) -> Option<InputEvent> {
    let at = EVENT_SIZE - 8;
    let kind = u16::from_ne_bytes([raw[at], raw[at + 1]]);
    let code = u16::from_ne_bytes([raw[at + 2], raw[at + 3]]);
    let value = i32::from_ne_bytes([raw[at + 4], raw[at + 5], raw[at + 6], raw[at + 7]]);

    if kind != EV_KEY {
        return None;
    }
    Some(InputEvent {
        direction: direction(code)?,
        action: action(value)?,
    })
}

fn direction(code: u16) -> Option<Direction> {
    match code {
        KEY_UP => Some(Direction::Up),
        KEY_DOWN => Some(Direction::Down),
        KEY_LEFT => Some(Direction::Left),
        KEY_RIGHT => Some(Direction::Right),
        KEY_ENTER => Some(Direction::None),
        _ => None,
    }
}

fn action(value: i32) -> Option<Action> {
    match value {
        0 => Some(Action::Released),
        1 => Some(Action::Pressed),
        2 => Some(Action::Held),
        _ => None,
    }
}
