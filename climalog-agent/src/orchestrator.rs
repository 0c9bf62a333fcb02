//! Loop Orchestrator
//!
//! Runs the sampling cycle at a fixed cadence:
//!
//! ```text
//! Idle ─► Sampling ─► Publishing ─► Rendering ─► Sleeping ─┐
//!             │                                   ▲        │
//!             └──── sensor failure ───────────────┘        │
//!             ▲                                            │
//!             └────────────────────────────────────────────┘
//! ```
//!
//! Nothing that goes wrong inside an iteration ends the loop. A sensor
//! failure skips publishing and shows the error indicator; a sink failure is
//! logged and the other sink is unaffected. Only the shutdown signal stops
//! the cycle, and it is honoured between iterations and during sleep.
//!
//! Driver reads are blocking I/O (sysfs files, retries), so they run on
//! Tokio's blocking pool.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use climalog_connectors::{RecordSink, SinkError};
use climalog_core::{
    constants::DEFAULT_SAMPLE_INTERVAL_SECS, derive, Clock, DisplayController, Record, RecordBuilder,
    RecordConfig, SensorDriver, SensorFailure, SensorReader, ValidatedSample,
};
use tokio::sync::watch;

/// Where the orchestrator currently is in its cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Sampling,
    Publishing,
    Rendering,
    Sleeping,
}

/// Outcome of one iteration
///
/// A sink outcome of `None` means the sink is not configured.
#[derive(Debug, Clone, Default)]
pub struct IterationReport {
    pub record: Option<Record>,
    pub sensor_failure: Option<SensorFailure>,
    pub timeseries: Option<Result<(), SinkError>>,
    pub broker: Option<Result<(), SinkError>>,
    pub rendered: Option<String>,
}

impl IterationReport {
    /// True when a record was built and every configured sink took it
    pub fn fully_delivered(&self) -> bool {
        self.record.is_some()
            && !matches!(self.timeseries, Some(Err(_)))
            && !matches!(self.broker, Some(Err(_)))
    }
}

/// Owns every long-lived collaborator of the sampling cycle
pub struct Orchestrator {
    reader: Arc<Mutex<SensorReader<Box<dyn SensorDriver>>>>,
    builder: RecordBuilder<Arc<dyn Clock>>,
    record_config: RecordConfig,
    timeseries: Option<Box<dyn RecordSink>>,
    broker: Option<Box<dyn RecordSink>>,
    display: Option<DisplayController>,
    clock: Arc<dyn Clock>,
    interval: Duration,
    phase: Phase,
    iterations: u64,
}

impl Orchestrator {
    pub fn new(
        reader: SensorReader<Box<dyn SensorDriver>>,
        record_config: RecordConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            reader: Arc::new(Mutex::new(reader)),
            builder: RecordBuilder::new(Arc::clone(&clock)),
            record_config,
            timeseries: None,
            broker: None,
            display: None,
            clock,
            interval: Duration::from_secs(DEFAULT_SAMPLE_INTERVAL_SECS),
            phase: Phase::Idle,
            iterations: 0,
        }
    }

    pub fn with_timeseries(mut self, sink: Box<dyn RecordSink>) -> Self {
        self.timeseries = Some(sink);
        self
    }

    pub fn with_broker(mut self, sink: Box<dyn RecordSink>) -> Self {
        self.broker = Some(sink);
        self
    }

    pub fn with_display(mut self, display: DisplayController) -> Self {
        self.display = Some(display);
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    pub fn display(&self) -> Option<&DisplayController> {
        self.display.as_ref()
    }

    /// Run one sample, publish, render cycle without sleeping
    pub async fn run_iteration(&mut self) -> IterationReport {
        self.iterations += 1;
        let mut report = IterationReport::default();

        self.phase = Phase::Sampling;
        let sample = match self.sample().await {
            Ok(sample) => sample,
            Err(failure) => {
                log::error!("sensor read failed ({}): {}", failure.kind(), failure);
                self.phase = Phase::Rendering;
                if let Some(display) = self.display.as_mut() {
                    display.show_error();
                }
                report.sensor_failure = Some(failure);
                self.phase = Phase::Sleeping;
                return report;
            }
        };

        let record = self.builder.build(&sample, &derive(&sample), &self.record_config);

        self.phase = Phase::Publishing;
        let (timeseries, broker) = tokio::join!(
            publish(self.timeseries.as_deref(), &record),
            publish(self.broker.as_deref(), &record),
        );
        report.timeseries = timeseries;
        report.broker = broker;

        self.phase = Phase::Rendering;
        let clock = self.clock.as_ref();
        report.rendered = self
            .display
            .as_mut()
            .and_then(|display| display.refresh(&record, clock));

        report.record = Some(record);
        self.phase = Phase::Sleeping;
        report
    }

    async fn sample(&self) -> Result<ValidatedSample, SensorFailure> {
        let reader = Arc::clone(&self.reader);
        tokio::task::spawn_blocking(move || {
            reader.lock().unwrap_or_else(PoisonError::into_inner).read()
        })
        .await
        .unwrap_or_else(|e| Err(SensorFailure::Unavailable(format!("sensor task failed: {}", e))))
    }

    /// Iterate until `shutdown` turns true or its sender is dropped
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) {
        log::info!(
            "sampling every {:?} (timeseries: {}, broker: {}, display: {})",
            self.interval,
            sink_label(self.timeseries.as_deref()),
            sink_label(self.broker.as_deref()),
            self.display.is_some()
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            let report = self.run_iteration().await;
            log::debug!(
                "iteration {} done (delivered: {})",
                self.iterations,
                report.fully_delivered()
            );

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        self.phase = Phase::Idle;
        log::info!("sampling stopped after {} iterations", self.iterations);
    }
}

async fn publish(sink: Option<&dyn RecordSink>, record: &Record) -> Option<Result<(), SinkError>> {
    let sink = sink?;
    let result = sink.publish(record).await;
    match &result {
        Ok(()) => log::debug!("published {} to {}", record.time_string(), sink.name()),
        Err(e) => log::error!("{} publish failed ({}): {}", sink.name(), e.kind(), e),
    }
    Some(result)
}

fn sink_label(sink: Option<&dyn RecordSink>) -> &str {
    sink.map(|s| s.name()).unwrap_or("disabled")
}
