//! Sensor drivers selectable from the config file

pub mod iio;

pub use iio::IioDriver;

use climalog_core::{sensor::SimulatedDriver, DriverError, SensorDriver};

use crate::config::DriverSection;

/// Build the driver a config section names
pub fn from_config(section: &DriverSection) -> Result<Box<dyn SensorDriver>, DriverError> {
    match section {
        DriverSection::Iio {
            device,
            accel_device,
        } => Ok(Box::new(IioDriver::open(device, accel_device.clone())?)),
        DriverSection::Simulated {
            temperature_c,
            humidity_pct,
            seed,
        } => {
            log::info!("using simulated sensor around {} C / {} %", temperature_c, humidity_pct);
            let mut driver = SimulatedDriver::new(*temperature_c, *humidity_pct);
            if let Some(seed) = seed {
                driver = driver.with_seed(*seed);
            }
            Ok(Box::new(driver))
        }
    }
}
