//! Shared fixtures for the agent integration tests

#![allow(dead_code)]

use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use climalog_agent::Orchestrator;
use climalog_connectors::{ConnectionStats, RecordSink, SinkError};
use climalog_core::{
    ChannelInput, DisplayController, DisplaySink, DriverError, FixedClock, InputEvent, Record,
    RecordConfig, SensorDriver, SensorReader,
};

/// 2024-01-01T00:00:00Z
pub const NEW_YEAR_2024: i64 = 1_704_067_200;

/// Driver returning a fixed temperature and a scripted humidity sequence
///
/// The last humidity value repeats once the script runs out.
pub struct ScriptedDriver {
    temperature_c: f64,
    humidity: Vec<f64>,
}

impl ScriptedDriver {
    pub fn new(temperature_c: f64, humidity: &[f64]) -> Self {
        Self {
            temperature_c,
            humidity: humidity.to_vec(),
        }
    }
}

impl SensorDriver for ScriptedDriver {
    fn read_temperature(&mut self) -> Result<f64, DriverError> {
        Ok(self.temperature_c)
    }

    fn read_humidity(&mut self) -> Result<f64, DriverError> {
        match self.humidity.len() {
            0 => Err(DriverError::Timeout { channel: "humidity" }),
            1 => Ok(self.humidity[0]),
            _ => Ok(self.humidity.remove(0)),
        }
    }
}

/// In-memory sink that either accepts everything or fails with a fixed error
#[derive(Clone)]
pub struct FakeSink {
    name: &'static str,
    failure: Option<SinkError>,
    published: Arc<Mutex<Vec<Record>>>,
}

impl FakeSink {
    pub fn accepting(name: &'static str) -> Self {
        Self {
            name,
            failure: None,
            published: Arc::default(),
        }
    }

    pub fn failing(name: &'static str, failure: SinkError) -> Self {
        Self {
            failure: Some(failure),
            ..Self::accepting(name)
        }
    }

    pub fn published(&self) -> Vec<Record> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl RecordSink for FakeSink {
    fn name(&self) -> &str {
        self.name
    }

    async fn publish(&self, record: &Record) -> Result<(), SinkError> {
        tokio::time::sleep(Duration::from_millis(10)).await;
        match &self.failure {
            Some(failure) => Err(failure.clone()),
            None => {
                self.published.lock().unwrap().push(record.clone());
                Ok(())
            }
        }
    }

    fn stats(&self) -> ConnectionStats {
        ConnectionStats {
            messages_sent: self.published.lock().unwrap().len() as u64,
            ..ConnectionStats::default()
        }
    }
}

/// Display output that keeps every message it was asked to show
#[derive(Clone, Default)]
pub struct RecordingDisplay(Arc<Mutex<Vec<String>>>);

impl RecordingDisplay {
    pub fn messages(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn last(&self) -> Option<String> {
        self.messages().pop()
    }
}

impl DisplaySink for RecordingDisplay {
    fn show(&mut self, message: &str) {
        self.0.lock().unwrap().push(message.to_string());
    }
}

/// Orchestrator over a scripted driver at a fixed instant, location "lab"
pub fn orchestrator(driver: ScriptedDriver) -> Orchestrator {
    let driver: Box<dyn SensorDriver> = Box::new(driver);
    Orchestrator::new(
        SensorReader::new(driver).with_attempts(1),
        RecordConfig::new("environment", "lab"),
        Arc::new(FixedClock::from_unix(NEW_YEAR_2024)),
    )
}

/// Display controller fed by a channel, plus the sender end and the output
pub fn display() -> (DisplayController, Sender<InputEvent>, RecordingDisplay) {
    let (tx, rx) = mpsc::channel();
    let output = RecordingDisplay::default();
    let controller = DisplayController::new(Box::new(ChannelInput::new(rx)), Box::new(output.clone()));
    (controller, tx, output)
}
