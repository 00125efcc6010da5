//! Gateway service loop
//!
//! Pulls one message at a time from a [`MessageSource`], runs it through the
//! [`LocalizationPipeline`] and publishes any resulting alert through an
//! [`AsyncConnector`] before taking the next message. Per-message failures
//! are logged, counted and dropped.

use fencepost_core::{AlertResult, DistanceModel, LocalizationPipeline, PipelineError, PropagationModel};
use log::{info, warn};

use crate::{AsyncConnector, InboundMessage, MessageSource};

/// Counters kept by the service loop
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ServiceStats {
    /// Messages taken off the source
    pub received: u64,
    /// Messages dropped as undecodable or invalid
    pub rejected: u64,
    /// Completed reading sets processed
    pub cycles: u64,
    /// Alerts published
    pub published: u64,
    /// Alerts that could not be published
    pub publish_failures: u64,
    /// Accepted messages that failed later in the pipeline
    pub processing_errors: u64,
}

/// Single-consumer gateway
pub struct GatewayService<S, K, M: DistanceModel = PropagationModel> {
    pipeline: LocalizationPipeline<M>,
    source: S,
    sink: K,
    alert_topic: String,
    stats: ServiceStats,
}

impl<S, K, M> GatewayService<S, K, M>
where
    S: MessageSource,
    K: AsyncConnector,
    M: DistanceModel,
{
    /// Wire a pipeline to a transport
    pub fn new(pipeline: LocalizationPipeline<M>, source: S, sink: K, alert_topic: impl Into<String>) -> Self {
        Self {
            pipeline,
            source,
            sink,
            alert_topic: alert_topic.into(),
            stats: ServiceStats::default(),
        }
    }

    /// Consume messages until the source closes
    ///
    /// Only a failing source ends the loop early; everything that goes wrong
    /// with an individual message is absorbed by [`handle`](Self::handle).
    pub async fn run(&mut self) -> Result<ServiceStats, S::Error> {
        info!("Gateway running, alerts go to {}", self.alert_topic);

        while let Some(message) = self.source.next_message().await? {
            self.handle(&message).await;
        }

        info!(
            "Message source closed after {} messages, {} alerts published",
            self.stats.received, self.stats.published
        );
        Ok(self.stats.clone())
    }

    /// Process one message, publishing its alert if it completes a cycle
    ///
    /// Returns the alert that was produced, whether or not publishing it
    /// succeeded.
    pub async fn handle(&mut self, message: &InboundMessage) -> Option<AlertResult> {
        self.stats.received += 1;

        match self.pipeline.handle_payload(&message.payload) {
            Ok(Some(report)) => {
                self.stats.cycles += 1;
                self.publish(&report.alert).await;
                Some(report.alert)
            }
            Ok(None) => None,
            Err(PipelineError::Malformed(reason)) => {
                self.stats.rejected += 1;
                warn!("Failed to decode JSON: {}", reason);
                None
            }
            Err(PipelineError::Validation(e)) => {
                self.stats.rejected += 1;
                warn!("Invalid message: {}", e);
                None
            }
            Err(e) => {
                self.stats.processing_errors += 1;
                warn!("Failed to process reading set: {}", e);
                None
            }
        }
    }

    async fn publish(&mut self, alert: &AlertResult) {
        let payload = match serde_json::to_vec(alert) {
            Ok(payload) => payload,
            Err(e) => {
                self.stats.publish_failures += 1;
                warn!("Failed to encode alert for {}: {}", alert.device_id, e);
                return;
            }
        };

        match self.sink.send(&self.alert_topic, &payload).await {
            Ok(()) => self.stats.published += 1,
            Err(e) => {
                self.stats.publish_failures += 1;
                warn!("Failed to publish alert for {}: {}", alert.device_id, e);
            }
        }
    }

    /// Service counters
    pub fn stats(&self) -> &ServiceStats {
        &self.stats
    }

    /// The pipeline being driven
    pub fn pipeline(&self) -> &LocalizationPipeline<M> {
        &self.pipeline
    }

    /// The outbound connector
    pub fn sink(&self) -> &K {
        &self.sink
    }

    /// Topic alerts are published to
    pub fn alert_topic(&self) -> &str {
        &self.alert_topic
    }
}
