//! Linux Industrial I/O (IIO) sysfs driver
//!
//! Each channel is a text file under the device directory. A channel is read
//! either as a processed value or computed from its raw parts:
//!
//! ```text
//! in_<ch>_input                          processed value
//! (in_<ch>_raw + in_<ch>_offset) * scale  otherwise
//! ```
//!
//! where `scale` is `in_<ch>_scale`, falling back to the shared
//! `in_<type>_scale` (e.g. `in_accel_scale` for `accel_x`).
//!
//! ## Units
//!
//! | Channel | IIO unit | Reported as |
//! |---------|----------|-------------|
//! | `temp` | milli °C | °C |
//! | `humidityrelative` | milli %RH | %RH |
//! | `pressure` | kPa | hPa |
//! | `accel_x/y/z` | m/s² | g |

use std::fs;
use std::path::{Path, PathBuf};

use climalog_core::constants::physics::{HPA_PER_KPA, IIO_MILLI_SCALE, STANDARD_GRAVITY_M_PER_S2};
use climalog_core::{Acceleration, DriverError, SensorDriver};

const TEMPERATURE: &str = "temp";
const HUMIDITY: &str = "humidityrelative";
const PRESSURE: &str = "pressure";
const ACCEL_AXES: [&str; 3] = ["accel_x", "accel_y", "accel_z"];

/// Sensor driver over one or two IIO device directories
#[derive(Debug, Clone)]
pub struct IioDriver {
    device: PathBuf,
    accel_device: Option<PathBuf>,
    has_pressure: bool,
}

impl IioDriver {
    /// Open a device directory, probing which optional channels it has
    pub fn open(device: impl Into<PathBuf>, accel_device: Option<PathBuf>) -> Result<Self, DriverError> {
        let device = device.into();
        if !has_channel(&device, TEMPERATURE) {
            return Err(DriverError::Io {
                channel: "temperature",
                message: format!("{} has no {} channel", device.display(), TEMPERATURE),
            });
        }
        if !has_channel(&device, HUMIDITY) {
            return Err(DriverError::Io {
                channel: "humidity",
                message: format!("{} has no {} channel", device.display(), HUMIDITY),
            });
        }

        let has_pressure = has_channel(&device, PRESSURE);
        let accel_device = accel_device.filter(|dir| {
            let present = has_channel(dir, ACCEL_AXES[0]);
            if !present {
                log::warn!("{} has no accelerometer channels, ignoring", dir.display());
            }
            present
        });

        log::info!(
            "IIO sensor at {} (pressure: {}, accelerometer: {})",
            device.display(),
            has_pressure,
            accel_device.is_some()
        );

        Ok(Self {
            device,
            accel_device,
            has_pressure,
        })
    }

    pub fn has_pressure(&self) -> bool {
        self.has_pressure
    }

    pub fn has_accelerometer(&self) -> bool {
        self.accel_device.is_some()
    }
}

impl SensorDriver for IioDriver {
    fn read_temperature(&mut self) -> Result<f64, DriverError> {
        Ok(read_channel(&self.device, TEMPERATURE, "temperature")? / IIO_MILLI_SCALE)
    }

    fn read_humidity(&mut self) -> Result<f64, DriverError> {
        Ok(read_channel(&self.device, HUMIDITY, "humidity")? / IIO_MILLI_SCALE)
    }

    fn read_pressure(&mut self) -> Result<Option<f64>, DriverError> {
        if !self.has_pressure {
            return Ok(None);
        }
        Ok(Some(read_channel(&self.device, PRESSURE, "pressure")? * HPA_PER_KPA))
    }

    fn read_acceleration(&mut self) -> Result<Option<Acceleration>, DriverError> {
        let Some(dir) = &self.accel_device else {
            return Ok(None);
        };
        let [x, y, z] = ACCEL_AXES;
        Ok(Some(Acceleration {
            x: read_channel(dir, x, "acceleration")? / STANDARD_GRAVITY_M_PER_S2,
            y: read_channel(dir, y, "acceleration")? / STANDARD_GRAVITY_M_PER_S2,
            z: read_channel(dir, z, "acceleration")? / STANDARD_GRAVITY_M_PER_S2,
        }))
    }
}

fn attribute(dir: &Path, channel: &str, suffix: &str) -> PathBuf {
    dir.join(format!("in_{}_{}", channel, suffix))
}

fn has_channel(dir: &Path, channel: &str) -> bool {
    attribute(dir, channel, "input").exists() || attribute(dir, channel, "raw").exists()
}

fn read_channel(dir: &Path, channel: &str, label: &'static str) -> Result<f64, DriverError> {
    let processed = attribute(dir, channel, "input");
    if processed.exists() {
        return read_number(&processed, label);
    }

    let raw = read_number(&attribute(dir, channel, "raw"), label)?;
    let offset = read_optional(&attribute(dir, channel, "offset"), label)?.unwrap_or(0.0);
    let scale = match read_optional(&attribute(dir, channel, "scale"), label)? {
        Some(scale) => scale,
        None => {
            let kind = channel.split('_').next().unwrap_or(channel);
            read_optional(&attribute(dir, kind, "scale"), label)?.unwrap_or(1.0)
        }
    };
    Ok((raw + offset) * scale)
}

fn read_optional(path: &Path, label: &'static str) -> Result<Option<f64>, DriverError> {
    if path.exists() {
        read_number(path, label).map(Some)
    } else {
        Ok(None)
    }
}

fn read_number(path: &Path, label: &'static str) -> Result<f64, DriverError> {
    let text = fs::read_to_string(path).map_err(|e| DriverError::Io {
        channel: label,
        message: format!("{}: {}", path.display(), e),
    })?;
    text.trim().parse::<f64>().map_err(|_| DriverError::Malformed {
        channel: label,
        raw: text.trim().to_string(),
    })
}
