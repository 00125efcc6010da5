//! Message transports for Fencepost
//!
//! ## Overview
//!
//! Receiver nodes publish one JSON reading per message to a broker topic; the
//! gateway consumes them, runs the localization pipeline and publishes one
//! alert per completed reading set. This crate holds the two sides of that
//! exchange behind small async traits, so the service loop never knows which
//! transport it is driving:
//!
//! - [`MessageSource`]: inbound readings, one at a time
//! - [`AsyncConnector`]: outbound alerts
//!
//! ## Transports
//!
//! ### MQTT
//!
//! The deployed transport (feature `mqtt`, on by default). One broker
//! connection is split into a [`mqtt::MqttSource`] that drives the event loop
//! and a [`mqtt::MqttPublisher`] that sends alerts. The source re-subscribes
//! after every connection acknowledgement, so a broker restart is survived
//! without help from the service.
//!
//! ### In-memory
//!
//! [`memory::ChannelSource`] and [`memory::MemorySink`] stand in for the
//! broker in tests and demos.
//!
//! ## Processing model
//!
//! [`service::GatewayService`] is a single consumer: every message is fully
//! handled, alert included, before the next one is pulled from the source.
//! Nothing that goes wrong with a single message stops the loop.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use fencepost_connectors::mqtt::{MqttConfig, MqttConnector};
//! use fencepost_connectors::service::GatewayService;
//! use fencepost_core::{FencepostConfig, LocalizationPipeline};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = MqttConfig::new("localhost", 1883).client_id("gateway-01");
//! let alert_topic = config.alert_topic.clone();
//! let (source, publisher) = MqttConnector::connect(config)?;
//!
//! let pipeline = LocalizationPipeline::new(&FencepostConfig::default())?;
//! let mut service = GatewayService::new(pipeline, source, publisher, alert_topic);
//! service.run().await?;
//! # Ok(())
//! # }
//! ```

pub mod memory;
#[cfg(feature = "mqtt")]
pub mod mqtt;
pub mod service;

// Re-export common types
pub use memory::{ChannelSource, MemorySink};
#[cfg(feature = "mqtt")]
pub use mqtt::{MqttConfig, MqttConnector, MqttError, MqttPublisher, MqttSource, QoS};
pub use service::{GatewayService, ServiceStats};

use thiserror::Error;

/// Common connector errors
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// Transport is not connected
    #[error("Not connected")]
    NotConnected,

    /// Inbound or outbound queue closed
    #[error("Channel closed")]
    Closed,

    /// Protocol-level failure
    #[error("Protocol error: {0}")]
    ProtocolError(String),

    /// Invalid transport configuration
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// One message taken off the inbound transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Topic the message arrived on
    pub topic: String,
    /// Raw message body
    pub payload: Vec<u8>,
}

impl InboundMessage {
    /// Create a message
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }
}

/// Inbound side of a transport
#[async_trait::async_trait]
pub trait MessageSource: Send {
    /// Error type
    type Error: std::error::Error + Send + Sync + 'static;

    /// Wait for the next message
    ///
    /// `Ok(None)` means the source is closed and no more messages will come.
    async fn next_message(&mut self) -> Result<Option<InboundMessage>, Self::Error>;
}

/// Outbound side of a transport
#[async_trait::async_trait]
pub trait AsyncConnector: Send {
    /// Error type
    type Error: std::error::Error + Send + Sync + 'static;

    /// Publish a payload to a topic
    async fn send(&mut self, topic: &str, data: &[u8]) -> Result<(), Self::Error>;

    /// Check if connected
    fn is_connected(&self) -> bool;

    /// Get connection statistics
    fn stats(&self) -> ConnectionStats;
}

/// Connection statistics common to all connectors
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConnectionStats {
    /// Total messages sent successfully
    pub messages_sent: u64,
    /// Total messages failed to send
    pub messages_failed: u64,
    /// Total bytes sent
    pub bytes_sent: u64,
    /// Number of reconnections
    pub reconnections: u32,
    /// Last error message
    pub last_error: Option<String>,
}

impl ConnectionStats {
    /// Record a successful send
    pub fn record_sent(&mut self, bytes: usize) {
        self.messages_sent += 1;
        self.bytes_sent += bytes as u64;
    }

    /// Record a failed send
    pub fn record_failure(&mut self, error: impl ToString) {
        self.messages_failed += 1;
        self.last_error = Some(error.to_string());
    }
}
