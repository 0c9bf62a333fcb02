//! climalog agent binary
//!
//! ```text
//! climalog [CONFIG]
//! ```
//!
//! The config path defaults to `$CLIMALOG_CONFIG`, then `settings.json`.
//! Log verbosity follows `RUST_LOG` (default `info`).

use std::sync::Arc;

use anyhow::Context;
use climalog_agent::{config::DisplaySection, drivers, input, AgentConfig, ConsoleDisplay, Orchestrator};
use climalog_connectors::{InfluxPublisher, MqttPublisher};
use climalog_core::{DisplayController, InputSource, NoInput, SensorReader, SystemClock};
use tokio::sync::watch;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let path = AgentConfig::resolve_path(std::env::args().nth(1));
    let config = AgentConfig::load(&path)
        .with_context(|| format!("loading configuration from {}", path.display()))?;
    log::info!("climalog {} starting with {}", climalog_core::VERSION, path.display());

    let driver = drivers::from_config(&config.sensor.driver).context("opening sensor")?;
    let reader = SensorReader::new(driver).with_attempts(config.sensor.read_attempts);

    let mut orchestrator = Orchestrator::new(reader, config.sensor.record_config(), Arc::new(SystemClock))
        .with_interval(config.interval());

    if let Some(section) = &config.influxdb {
        let publisher = InfluxPublisher::new(section.to_publisher_config())
            .context("creating InfluxDB publisher")?;
        orchestrator = orchestrator.with_timeseries(Box::new(publisher));
    }

    let mqtt = config
        .mqtt
        .as_ref()
        .map(|section| Arc::new(MqttPublisher::connect(section.to_publisher_config())));
    if let Some(publisher) = &mqtt {
        // The first sample should not race the CONNACK
        if let Err(e) = publisher.wait_connected(publisher.config().timeout).await {
            log::warn!("MQTT broker not ready at startup ({}): {}", e.kind(), e);
        }
        orchestrator = orchestrator.with_broker(Box::new(Arc::clone(publisher)));
    }

    if config.display.enabled {
        orchestrator = orchestrator.with_display(display_controller(&config.display));
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        wait_for_signal().await;
        log::info!("shutdown requested");
        let _ = shutdown_tx.send(true);
    });

    orchestrator.run(shutdown_rx).await;

    if let Some(publisher) = mqtt {
        publisher.disconnect().await;
    }
    Ok(())
}

fn display_controller(section: &DisplaySection) -> DisplayController {
    let input: Box<dyn InputSource> = match &section.input_device {
        Some(device) => match input::spawn_evdev(device) {
            Ok((input, _reader)) => Box::new(input),
            Err(e) => {
                log::warn!("joystick {} unavailable, display mode is fixed: {}", device.display(), e);
                Box::new(NoInput)
            }
        },
        None => Box::new(NoInput),
    };

    let controller = DisplayController::new(input, Box::new(ConsoleDisplay::new()));
    match &section.idle_message {
        Some(message) => controller.with_idle_message(message),
        None => controller,
    }
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut terminate) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = terminate.recv() => {}
            }
        }
        Err(e) => {
            log::warn!("cannot listen for SIGTERM: {}", e);
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
