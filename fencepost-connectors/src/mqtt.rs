//! MQTT transport
//!
//! Built on `rumqttc`. [`MqttConnector::connect`] opens one broker session,
//! moves its event loop onto a background task and hands back two halves:
//!
//! - [`MqttSource`] yields publishes on the input topic, fed by the event
//!   loop task over a bounded channel. Every connection acknowledgement
//!   triggers a fresh subscription to the input topic; a subscribe request
//!   that cannot be queued is retried after the next event. Connection
//!   errors are logged and retried after the configured delay.
//! - [`MqttPublisher`] queues alerts on the client without waiting. A full
//!   request queue counts as a failed send.
//!
//! Both halves share one [`ConnectionStats`] record.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use log::{debug, info, warn};
use rumqttc::{AsyncClient, ClientError, ConnectionError, Event, EventLoop, MqttOptions, Packet};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub use rumqttc::QoS;

use crate::{AsyncConnector, ConnectionStats, InboundMessage, MessageSource};

/// Shortest keep-alive the client accepts
pub const MIN_KEEP_ALIVE: Duration = Duration::from_secs(5);

/// MQTT-specific errors
#[derive(Debug, Error)]
pub enum MqttError {
    /// Request could not be queued for the event loop
    #[error("Client error: {0}")]
    Client(#[from] ClientError),

    /// Broker connection failed
    #[error("Connection error: {0}")]
    Connection(#[from] ConnectionError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

/// MQTT configuration
#[derive(Debug, Clone, PartialEq)]
pub struct MqttConfig {
    /// Broker host name or address
    pub host: String,
    /// Broker port
    pub port: u16,
    /// Client identifier presented to the broker
    pub client_id: String,
    /// Keep-alive interval
    pub keep_alive: Duration,
    /// Topic readings arrive on
    pub input_topic: String,
    /// Topic alerts are published to
    pub alert_topic: String,
    /// QoS for the subscription and for alerts
    pub qos: QoS,
    /// Capacity of the client request queue
    pub channel_capacity: usize,
    /// Pause before retrying after a connection error
    pub reconnect_delay: Duration,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self::new("localhost", 1883)
    }
}

impl MqttConfig {
    /// Create a configuration for a broker
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            client_id: "fencepost-gateway".into(),
            keep_alive: Duration::from_secs(60),
            input_topic: "sensor/data".into(),
            alert_topic: "sensor/alerts".into(),
            qos: QoS::AtMostOnce,
            channel_capacity: 64,
            reconnect_delay: Duration::from_secs(1),
        }
    }

    /// Set the client identifier
    pub fn client_id(mut self, id: impl Into<String>) -> Self {
        self.client_id = id.into();
        self
    }

    /// Set keep-alive in seconds
    pub fn keep_alive_secs(mut self, secs: u64) -> Self {
        self.keep_alive = Duration::from_secs(secs);
        self
    }

    /// Set the topic readings are consumed from
    pub fn input_topic(mut self, topic: impl Into<String>) -> Self {
        self.input_topic = topic.into();
        self
    }

    /// Set the topic alerts are published to
    pub fn alert_topic(mut self, topic: impl Into<String>) -> Self {
        self.alert_topic = topic.into();
        self
    }

    /// Set the QoS level
    pub fn qos(mut self, qos: QoS) -> Self {
        self.qos = qos;
        self
    }

    /// Set the request queue capacity
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    /// Set the delay before reconnecting
    pub fn reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Check the configuration before connecting
    pub fn validate(&self) -> Result<(), MqttError> {
        if self.host.is_empty() {
            return Err(MqttError::Config("Broker host must not be empty".into()));
        }
        if self.port == 0 {
            return Err(MqttError::Config("Broker port must not be zero".into()));
        }
        if self.client_id.is_empty() {
            return Err(MqttError::Config("Client id must not be empty".into()));
        }
        if self.input_topic.is_empty() || self.alert_topic.is_empty() {
            return Err(MqttError::Config("Topics must not be empty".into()));
        }
        if self.keep_alive < MIN_KEEP_ALIVE {
            return Err(MqttError::Config(format!(
                "Keep-alive must be at least {} seconds",
                MIN_KEEP_ALIVE.as_secs()
            )));
        }
        if self.channel_capacity == 0 {
            return Err(MqttError::Config("Channel capacity must be positive".into()));
        }
        Ok(())
    }

    fn options(&self) -> MqttOptions {
        let mut options = MqttOptions::new(self.client_id.clone(), self.host.clone(), self.port);
        options.set_keep_alive(self.keep_alive);
        options
    }
}

#[derive(Debug, Default)]
struct Shared {
    connected: AtomicBool,
    stats: Mutex<ConnectionStats>,
}

impl Shared {
    fn stats(&self) -> MutexGuard<'_, ConnectionStats> {
        self.stats.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Entry point for the MQTT transport
pub struct MqttConnector;

impl MqttConnector {
    /// Open a broker session and split it into its inbound and outbound halves
    ///
    /// Must be called from within a tokio runtime. The event loop task starts
    /// connecting straight away and runs until the source is dropped.
    pub fn connect(config: MqttConfig) -> Result<(MqttSource, MqttPublisher), MqttError> {
        config.validate()?;

        let (client, eventloop) = AsyncClient::new(config.options(), config.channel_capacity);
        let (tx, rx) = mpsc::channel(config.channel_capacity);
        let shared = Arc::new(Shared::default());

        info!(
            "Connecting to MQTT broker {}:{} as {}",
            config.host, config.port, config.client_id
        );

        let driver = Driver {
            client: client.clone(),
            topic: config.input_topic.clone(),
            qos: config.qos,
            reconnect_delay: config.reconnect_delay,
            sessions: 0,
            subscribe_pending: false,
            shared: Arc::clone(&shared),
            tx,
        };
        let task = tokio::spawn(driver.run(eventloop));

        let source = MqttSource {
            rx,
            topic: config.input_topic,
            task,
        };
        let publisher = MqttPublisher {
            client,
            qos: config.qos,
            shared,
        };
        Ok((source, publisher))
    }
}

/// Owns the event loop; runs on its own task
struct Driver {
    client: AsyncClient,
    topic: String,
    qos: QoS,
    reconnect_delay: Duration,
    sessions: u32,
    subscribe_pending: bool,
    shared: Arc<Shared>,
    tx: mpsc::Sender<InboundMessage>,
}

impl Driver {
    async fn run(mut self, mut eventloop: EventLoop) {
        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(_))) => self.on_connack(),
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    let message = InboundMessage {
                        topic: publish.topic,
                        payload: publish.payload.to_vec(),
                    };
                    if self.tx.send(message).await.is_err() {
                        debug!("MQTT source dropped, stopping event loop");
                        return;
                    }
                }
                Ok(Event::Incoming(Packet::SubAck(_))) => debug!("Subscribed to {}", self.topic),
                Ok(_) => {}
                Err(e) => {
                    self.on_error(e);
                    tokio::time::sleep(self.reconnect_delay).await;
                }
            }

            if self.subscribe_pending {
                self.resubscribe();
            }
        }
    }

    fn on_connack(&mut self) {
        info!("Connected to MQTT Broker");
        self.shared.connected.store(true, Ordering::SeqCst);
        if self.sessions > 0 {
            self.shared.stats().reconnections += 1;
        }
        self.sessions += 1;
        self.subscribe_pending = true;
    }

    /// Queue the input subscription; returns whether it was accepted
    fn resubscribe(&mut self) -> bool {
        match self.client.try_subscribe(self.topic.clone(), self.qos) {
            Ok(()) => {
                self.subscribe_pending = false;
                true
            }
            Err(e) => {
                warn!("Failed to subscribe to {}: {}; will retry", self.topic, e);
                false
            }
        }
    }

    fn on_error(&self, error: ConnectionError) {
        self.shared.connected.store(false, Ordering::SeqCst);
        self.shared.stats().last_error = Some(error.to_string());
        warn!(
            "MQTT connection error: {}; retrying in {:?}",
            error, self.reconnect_delay
        );
    }
}

/// Inbound half: yields publishes on the input topic
pub struct MqttSource {
    rx: mpsc::Receiver<InboundMessage>,
    topic: String,
    task: JoinHandle<()>,
}

impl MqttSource {
    /// Topic this source subscribes to
    pub fn topic(&self) -> &str {
        &self.topic
    }
}

impl Drop for MqttSource {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[async_trait::async_trait]
impl MessageSource for MqttSource {
    type Error = MqttError;

    async fn next_message(&mut self) -> Result<Option<InboundMessage>, Self::Error> {
        Ok(self.rx.recv().await)
    }
}

/// Outbound half: publishes alerts
#[derive(Clone)]
pub struct MqttPublisher {
    client: AsyncClient,
    qos: QoS,
    shared: Arc<Shared>,
}

#[async_trait::async_trait]
impl AsyncConnector for MqttPublisher {
    type Error = MqttError;

    async fn send(&mut self, topic: &str, data: &[u8]) -> Result<(), Self::Error> {
        // Non-blocking; the event loop task may be parked on the inbound channel
        match self.client.try_publish(topic, self.qos, false, data.to_vec()) {
            Ok(()) => {
                self.shared.stats().record_sent(data.len());
                Ok(())
            }
            Err(e) => {
                self.shared.stats().record_failure(&e);
                Err(e.into())
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::SeqCst)
    }

    fn stats(&self) -> ConnectionStats {
        self.shared.stats().clone()
    }
}
