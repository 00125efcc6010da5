//! In-memory transport
//!
//! A channel-backed source and a recording sink with the same interfaces as
//! the MQTT transport. Clones of a [`MemorySink`] share their record, so a
//! test can keep one handle and give the other to the service.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::mpsc;

use crate::{AsyncConnector, ConnectionStats, ConnectorError, InboundMessage, MessageSource};

/// Inbound messages fed through a tokio channel
///
/// The source closes once every sender has been dropped and the queue is
/// drained.
#[derive(Debug)]
pub struct ChannelSource {
    rx: mpsc::Receiver<InboundMessage>,
}

impl ChannelSource {
    /// Create a source and the sender that feeds it
    pub fn new(capacity: usize) -> (mpsc::Sender<InboundMessage>, Self) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (tx, Self { rx })
    }
}

#[async_trait::async_trait]
impl MessageSource for ChannelSource {
    type Error = ConnectorError;

    async fn next_message(&mut self) -> Result<Option<InboundMessage>, Self::Error> {
        Ok(self.rx.recv().await)
    }
}

#[derive(Debug, Default)]
struct SinkState {
    published: Vec<(String, Vec<u8>)>,
    stats: ConnectionStats,
}

/// Records every publish instead of sending it
#[derive(Debug, Clone)]
pub struct MemorySink {
    state: Arc<Mutex<SinkState>>,
    connected: Arc<AtomicBool>,
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySink {
    /// Create a connected, empty sink
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(SinkState::default())),
            connected: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Simulate losing or regaining the connection
    ///
    /// While disconnected every send fails with [`ConnectorError::NotConnected`].
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    /// Everything published so far, in order
    pub fn published(&self) -> Vec<(String, Vec<u8>)> {
        self.lock().published.clone()
    }

    /// Published payloads decoded as JSON, skipping any that do not parse
    pub fn published_json(&self) -> Vec<serde_json::Value> {
        self.lock()
            .published
            .iter()
            .filter_map(|(_, payload)| serde_json::from_slice(payload).ok())
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, SinkState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait::async_trait]
impl AsyncConnector for MemorySink {
    type Error = ConnectorError;

    async fn send(&mut self, topic: &str, data: &[u8]) -> Result<(), Self::Error> {
        let mut state = self.lock();
        if !self.connected.load(Ordering::SeqCst) {
            state.stats.record_failure(ConnectorError::NotConnected);
            return Err(ConnectorError::NotConnected);
        }

        state.published.push((topic.to_string(), data.to_vec()));
        state.stats.record_sent(data.len());
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn stats(&self) -> ConnectionStats {
        self.lock().stats.clone()
    }
}
