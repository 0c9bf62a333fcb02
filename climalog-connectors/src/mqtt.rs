//! MQTT Broker Sink
//!
//! Publishes each record as a JSON document to `topic_prefix + location`
//! with QoS 1.
//!
//! ## Connection Model
//!
//! The connection is opened once, when the publisher is created. A background
//! task drives the `rumqttc` event loop and tracks the link:
//!
//! ```text
//! Connecting ──CONNACK ok──► Connected
//!     ▲   │                      │
//!     │   └─CONNACK refused─► Refused
//!     └──── poll error ◄─────────┘
//! ```
//!
//! Polling again after an error makes `rumqttc` reconnect, so the link heals
//! on its own. A publish issued while the first CONNACK is still pending
//! waits for it, up to the publish timeout. While the link is down, `publish`
//! fails fast with `SinkError::Disconnected` instead of queueing: there is no
//! store-and-forward.

use std::time::Duration;

use climalog_core::Record;
use rumqttc::{
    AsyncClient, ConnectReturnCode, ConnectionError, Event, EventLoop, MqttOptions, Outgoing,
    Packet, QoS,
};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::{ConnectionStats, RecordSink, SinkError, StatsHandle};

/// Pending requests the client buffers before `publish` has to wait
const REQUEST_CHANNEL_CAPACITY: usize = 10;

/// MQTT connection settings
#[derive(Clone)]
pub struct MqttConfig {
    /// Broker host name or address
    pub broker_address: String,
    /// Broker port
    pub port: u16,
    /// Client identifier presented to the broker
    pub client_id: String,
    /// Optional user name and password
    pub credentials: Option<(String, String)>,
    /// Prefix every record topic starts with
    pub topic_prefix: String,
    /// Keep-alive interval
    pub keep_alive: Duration,
    /// Bound on handing one publish to the client
    pub timeout: Duration,
    /// Pause between reconnect attempts
    pub reconnect_delay: Duration,
}

impl std::fmt::Debug for MqttConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MqttConfig")
            .field("broker_address", &self.broker_address)
            .field("port", &self.port)
            .field("client_id", &self.client_id)
            .field("user", &self.credentials.as_ref().map(|(user, _)| user))
            .field("topic_prefix", &self.topic_prefix)
            .field("keep_alive", &self.keep_alive)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl MqttConfig {
    pub fn new(broker_address: impl Into<String>, port: u16) -> Self {
        Self {
            broker_address: broker_address.into(),
            port,
            client_id: format!("climalog-{}", std::process::id()),
            credentials: None,
            topic_prefix: String::new(),
            keep_alive: Duration::from_secs(60),
            timeout: Duration::from_secs(5),
            reconnect_delay: Duration::from_secs(5),
        }
    }

    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = client_id.into();
        self
    }

    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Some((username.into(), password.into()));
        self
    }

    pub fn topic_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.topic_prefix = prefix.into();
        self
    }

    pub fn keep_alive(mut self, keep_alive: Duration) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    fn options(&self) -> MqttOptions {
        let mut options = MqttOptions::new(&self.client_id, &self.broker_address, self.port);
        options.set_keep_alive(self.keep_alive);
        if let Some((username, password)) = &self.credentials {
            options.set_credentials(username, password);
        }
        options
    }
}

/// Broker link as seen by the event loop task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkState {
    /// Waiting for the first CONNACK
    Connecting,
    /// CONNACK accepted
    Connected,
    /// Broker refused the connection
    Refused { auth: bool, reason: String },
    /// Link dropped; the event loop is reconnecting
    Down,
}

/// Broker publisher built once at startup
pub struct MqttPublisher {
    config: MqttConfig,
    client: AsyncClient,
    link: watch::Receiver<LinkState>,
    stats: StatsHandle,
    driver: JoinHandle<()>,
}

impl MqttPublisher {
    /// Open the broker connection and start the event loop task
    ///
    /// Must be called from within a Tokio runtime. Returns immediately; the
    /// connection completes in the background.
    pub fn connect(config: MqttConfig) -> Self {
        let (client, eventloop) = AsyncClient::new(config.options(), REQUEST_CHANNEL_CAPACITY);
        let (link_tx, link) = watch::channel(LinkState::Connecting);
        let stats = StatsHandle::default();

        log::info!(
            "connecting to MQTT broker {}:{} as {}",
            config.broker_address,
            config.port,
            config.client_id
        );
        let driver = tokio::spawn(drive(eventloop, link_tx, stats.clone(), config.reconnect_delay));

        Self {
            config,
            client,
            link,
            stats,
            driver,
        }
    }

    pub fn config(&self) -> &MqttConfig {
        &self.config
    }

    pub fn link_state(&self) -> LinkState {
        self.link.borrow().clone()
    }

    /// Wait until the broker has answered the CONNECT
    ///
    /// Returns `Ok(())` once connected. A refusal, a dropped link or no answer
    /// within `timeout` is reported as the matching `SinkError`.
    pub async fn wait_connected(&self, timeout: Duration) -> Result<(), SinkError> {
        match self.settled_link(timeout).await {
            LinkState::Connected => Ok(()),
            LinkState::Refused { auth: true, reason } => Err(SinkError::AuthRejected(reason)),
            LinkState::Refused { auth: false, reason } => Err(SinkError::ConnectionFailed(reason)),
            LinkState::Connecting => Err(SinkError::Timeout(timeout)),
            LinkState::Down => Err(SinkError::Disconnected),
        }
    }

    /// Link state once it has left `Connecting`, or `Connecting` after `timeout`
    async fn settled_link(&self, timeout: Duration) -> LinkState {
        let mut link = self.link.clone();
        let settled = tokio::time::timeout(
            timeout,
            link.wait_for(|state| *state != LinkState::Connecting),
        )
        .await;
        let state = match settled {
            Ok(Ok(state)) => (*state).clone(),
            // Event loop task has ended
            Ok(Err(_)) => LinkState::Down,
            Err(_) => LinkState::Connecting,
        };
        state
    }

    /// Topic a record is published to: prefix followed by its location tag
    pub fn topic_for(&self, record: &Record) -> String {
        format!("{}{}", self.config.topic_prefix, record.location().unwrap_or_default())
    }

    /// Publish a record to an explicit topic
    pub async fn publish_to(&self, record: &Record, topic: &str) -> Result<(), SinkError> {
        let payload = serde_json::to_vec(record)
            .map_err(|e| SinkError::SerializationFailed(e.to_string()))?;
        let bytes = payload.len();

        let result = self.send(topic, payload).await;
        self.stats.record(&result, bytes);
        result
    }

    async fn send(&self, topic: &str, payload: Vec<u8>) -> Result<(), SinkError> {
        match self.settled_link(self.config.timeout).await {
            LinkState::Connected => {}
            LinkState::Refused { auth: true, reason } => return Err(SinkError::AuthRejected(reason)),
            _ => return Err(SinkError::Disconnected),
        }

        let publish = self.client.publish(topic, QoS::AtLeastOnce, false, payload);
        match tokio::time::timeout(self.config.timeout, publish).await {
            Err(_) => Err(SinkError::Timeout(self.config.timeout)),
            Ok(Err(_)) => Err(SinkError::Disconnected),
            Ok(Ok(())) => Ok(()),
        }
    }

    /// Send DISCONNECT and stop the event loop task
    pub async fn disconnect(&self) {
        if let Err(e) = self.client.disconnect().await {
            log::debug!("MQTT disconnect request failed: {}", e);
        }
        if tokio::time::timeout(self.config.timeout, wait_finished(&self.driver)).await.is_err() {
            self.driver.abort();
        }
    }
}

impl Drop for MqttPublisher {
    fn drop(&mut self) {
        self.driver.abort();
    }
}

async fn wait_finished(handle: &JoinHandle<()>) {
    while !handle.is_finished() {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

#[async_trait::async_trait]
impl RecordSink for MqttPublisher {
    fn name(&self) -> &str {
        "mqtt"
    }

    async fn publish(&self, record: &Record) -> Result<(), SinkError> {
        let topic = self.topic_for(record);
        self.publish_to(record, &topic).await
    }

    fn stats(&self) -> ConnectionStats {
        self.stats.snapshot()
    }
}

/// Drive the event loop until the client disconnects
async fn drive(
    mut eventloop: EventLoop,
    link: watch::Sender<LinkState>,
    stats: StatsHandle,
    retry: Duration,
) {
    let mut ever_connected = false;
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                if ack.code == ConnectReturnCode::Success {
                    if ever_connected {
                        stats.reconnected();
                    }
                    ever_connected = true;
                    link.send_replace(LinkState::Connected);
                    log::info!("MQTT broker connected");
                } else {
                    link.send_replace(refusal(ack.code));
                }
            }
            Ok(Event::Incoming(Packet::Disconnect)) => {
                link.send_replace(LinkState::Down);
                log::warn!("MQTT broker closed the session");
            }
            Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                link.send_replace(LinkState::Down);
                log::info!("MQTT client disconnected");
                return;
            }
            Ok(_) => {}
            Err(ConnectionError::ConnectionRefused(code)) => {
                let state = refusal(code);
                log::error!("MQTT broker refused connection: {:?}", state);
                link.send_replace(state);
                tokio::time::sleep(retry).await;
            }
            Err(e) => {
                if link.send_replace(LinkState::Down) == LinkState::Connected {
                    log::warn!("MQTT link lost: {}", e);
                } else {
                    log::debug!("MQTT connect failed: {}", e);
                }
                tokio::time::sleep(retry).await;
            }
        }
    }
}

fn refusal(code: ConnectReturnCode) -> LinkState {
    let auth = matches!(
        code,
        ConnectReturnCode::BadUserNamePassword | ConnectReturnCode::NotAuthorized
    );
    LinkState::Refused {
        auth,
        reason: format!("{:?}", code),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use climalog_core::{derive, FixedClock, RawSample, RecordBuilder, RecordConfig, ValidatedSample};

    fn record(location: &str) -> Record {
        let sample = ValidatedSample::validate(RawSample {
            temperature_c: 20.5,
            humidity_pct: 40.0,
            pressure_hpa: None,
            acceleration: None,
        })
        .unwrap();
        RecordBuilder::new(FixedClock::from_unix(0)).build(
            &sample,
            &derive(&sample),
            &RecordConfig::new("environment", location),
        )
    }

    fn closed_port() -> u16 {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    }

    #[test]
    fn auth_refusals_are_flagged() {
        assert!(matches!(refusal(ConnectReturnCode::NotAuthorized), LinkState::Refused { auth: true, .. }));
        assert!(matches!(
            refusal(ConnectReturnCode::BadUserNamePassword),
            LinkState::Refused { auth: true, .. }
        ));
        assert!(matches!(
            refusal(ConnectReturnCode::ServiceUnavailable),
            LinkState::Refused { auth: false, .. }
        ));
    }

    #[test]
    fn config_hides_password() {
        let config = MqttConfig::new("broker.local", 1883).credentials("agent", "hunter2");
        assert!(!format!("{:?}", config).contains("hunter2"));
    }

    #[tokio::test]
    async fn topic_is_prefix_plus_location() {
        let publisher = MqttPublisher::connect(
            MqttConfig::new("127.0.0.1", closed_port()).topic_prefix("home/sensors/"),
        );
        assert_eq!(publisher.topic_for(&record("office")), "home/sensors/office");
    }

    #[tokio::test]
    async fn unreachable_broker_is_disconnected() {
        let publisher = MqttPublisher::connect(
            MqttConfig::new("127.0.0.1", closed_port()).reconnect_delay(Duration::from_millis(50)),
        );
        let result = publisher.publish(&record("office")).await;

        assert_eq!(result, Err(SinkError::Disconnected));
        assert_ne!(publisher.link_state(), LinkState::Connected);
        assert_eq!(publisher.stats().messages_failed, 1);
    }
}
