//! Localization Pipeline
//!
//! ## Overview
//!
//! One owned object holds every piece of long-lived state: the per-device
//! reading buffers and the per-node smoothing windows. Messages go through it
//! one at a time and each is finished, including any alert it produces,
//! before the next is accepted.
//!
//! ```text
//! payload → decode → validate → aggregate ─(set complete)─▶ filter → distance
//!                                                              ↓
//!                                       alert ◀── geofence ◀── solve
//! ```
//!
//! ## Example
//!
//! ```rust
//! use fencepost_core::{AlertStatus, FencepostConfig, LocalizationPipeline};
//!
//! let mut pipeline = LocalizationPipeline::new(&FencepostConfig::default())?;
//!
//! let readings = [
//!     r#"{"device_id": "D1", "node_id": "Node_A", "RSSI": -80, "timestamp": "100"}"#,
//!     r#"{"device_id": "D1", "node_id": "Node_B", "RSSI": -85, "timestamp": "101"}"#,
//!     r#"{"device_id": "D1", "node_id": "Node_C", "RSSI": -78, "timestamp": "99"}"#,
//! ];
//! for payload in readings {
//!     assert!(pipeline.handle_payload(payload.as_bytes())?.is_none());
//! }
//!
//! let report = pipeline
//!     .handle_payload(br#"{"device_id": "D1", "node_id": "Node_D", "RSSI": -82, "timestamp": "102"}"#)?
//!     .expect("fourth node completes the set");
//!
//! assert_eq!(report.alert.timestamp, "102");
//! assert_eq!(report.alert.status, AlertStatus::Safe);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::sync::Arc;

use serde_json::{json, Value};

use crate::aggregator::{Aggregator, CompletedCycle};
use crate::config::FencepostConfig;
use crate::distance::{DistanceModel, PropagationModel};
use crate::errors::{ConfigError, PipelineError, PipelineResult, ValidationError};
use crate::filter::NoiseFilter;
use crate::geofence::SafeZone;
use crate::solver::multilaterate;
use crate::types::{AlertResult, AlertStatus, DistanceSample, Point};
use crate::validator::MessageValidator;

/// Everything derived from one completed cycle
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    /// The reading set that triggered the cycle
    pub cycle: CompletedCycle,
    /// Per-node distances, in reading order
    pub distances: Vec<DistanceSample>,
    /// Estimated position
    pub location: Point,
    /// Geofence verdict to publish
    pub alert: AlertResult,
}

/// Stateful reading processor for one deployment
#[derive(Debug, Clone)]
pub struct LocalizationPipeline<M: DistanceModel = PropagationModel> {
    validator: MessageValidator,
    aggregator: Aggregator,
    filter: NoiseFilter,
    model: M,
    zone: SafeZone,
}

impl LocalizationPipeline<PropagationModel> {
    /// Build a pipeline using the configured propagation model
    pub fn new(config: &FencepostConfig) -> Result<Self, ConfigError> {
        Self::with_model(config, config.distance_model)
    }
}

impl<M: DistanceModel> LocalizationPipeline<M> {
    /// Build a pipeline with a custom distance model
    pub fn with_model(config: &FencepostConfig, model: M) -> Result<Self, ConfigError> {
        config.validate()?;

        Ok(Self {
            validator: MessageValidator::new(Arc::new(config.nodes.clone())),
            aggregator: Aggregator::new(config.aggregation, config.nodes.len()),
            filter: NoiseFilter::new(config.filter_scope),
            model,
            zone: config.safe_zone,
        })
    }

    /// Decode and handle one raw message body
    pub fn handle_payload(&mut self, payload: &[u8]) -> PipelineResult<Option<CycleReport>> {
        let message: Value =
            serde_json::from_slice(payload).map_err(|e| PipelineError::Malformed(e.to_string()))?;
        self.handle_message(&message)
    }

    /// Handle one decoded message
    ///
    /// Returns the cycle report when this message completes a reading set.
    pub fn handle_message(&mut self, message: &Value) -> PipelineResult<Option<CycleReport>> {
        // Arrays, strings and scalars carry none of the required keys
        let object = message.as_object().ok_or(ValidationError::MissingKey { key: "device_id" })?;

        let accepted = self.validator.validate_object(object)?;
        log_info!(
            "Received Data: Device: {}, Node: {}, RSSI: {}, Timestamp: {}",
            accepted.device_id,
            accepted.reading.node_id,
            accepted.reading.rssi,
            accepted.reading.timestamp
        );

        match self.aggregator.ingest(accepted)? {
            Some(cycle) => self.process_cycle(cycle).map(Some),
            None => Ok(None),
        }
    }

    /// Run a complete reading set through filter, distance, solve and geofence
    pub fn process_cycle(&mut self, cycle: CompletedCycle) -> PipelineResult<CycleReport> {
        let distances: Vec<DistanceSample> = cycle
            .readings
            .iter()
            .map(|reading| {
                let smoothed = self.filter.filter(&cycle.device_id, &reading.node_id, reading.rssi);
                DistanceSample {
                    node_id: reading.node_id.clone(),
                    distance: self.model.estimate(smoothed),
                    location: reading.location,
                }
            })
            .collect();

        let location = multilaterate(&distances)?;
        let alert = AlertResult {
            device_id: cycle.device_id.clone(),
            timestamp: cycle.timestamp.clone(),
            status: AlertStatus::from_inside(self.zone.contains(location)),
            location,
        };

        log_cycle(&cycle, &distances, location, &alert);

        Ok(CycleReport {
            cycle,
            distances,
            location,
            alert,
        })
    }

    /// Reading buffers
    pub fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }

    /// Smoothing state
    pub fn filter(&self) -> &NoiseFilter {
        &self.filter
    }

    /// Safe zone in force
    pub fn zone(&self) -> SafeZone {
        self.zone
    }

    /// Node table in force
    pub fn nodes(&self) -> &crate::config::NodeTable {
        self.validator.nodes()
    }
}

#[cfg_attr(not(feature = "log"), allow(unused_variables))]
fn log_cycle(cycle: &CompletedCycle, distances: &[DistanceSample], location: Point, alert: &AlertResult) {
    let distance_data = json!({
        "device_id": cycle.device_id,
        "timestamp": cycle.timestamp,
        "distance_data": distances,
    });

    log_info!("Aggregated Data:\n{}", pretty(&cycle));
    log_info!("Distance Data:\n{}", pretty(&distance_data));
    log_info!("Estimated Location (Trilateration): [{}, {}]", location.x, location.y);
    log_info!("Geofencing & Alerts:\n{}", pretty(alert));
}

#[cfg_attr(not(feature = "log"), allow(dead_code))]
fn pretty<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::{AggregationPolicy, BufferState};
    use crate::errors::ValidationError;
    use crate::filter::FilterScope;

    fn payload(device: &str, node: &str, rssi: f64, ts: &str) -> Vec<u8> {
        json!({ "device_id": device, "node_id": node, "RSSI": rssi, "timestamp": ts })
            .to_string()
            .into_bytes()
    }

    fn pipeline() -> LocalizationPipeline {
        LocalizationPipeline::new(&FencepostConfig::default()).unwrap()
    }

    #[test]
    fn reference_scenario() {
        let mut pipeline = pipeline();
        let mut reports = Vec::new();
        for (node, rssi, ts) in [
            ("Node_A", -80.0, "100"),
            ("Node_B", -85.0, "101"),
            ("Node_C", -78.0, "99"),
            ("Node_D", -82.0, "102"),
        ] {
            reports.push(pipeline.handle_payload(&payload("D1", node, rssi, ts)).unwrap());
        }

        assert!(reports[..3].iter().all(Option::is_none));
        let report = reports[3].clone().unwrap();

        let distances: Vec<f64> = report.distances.iter().map(|d| d.distance).collect();
        assert_eq!(distances, vec![5.0, 5.5, 4.8, 5.2]);
        assert_eq!(report.location, Point::new(5.6, 2.5));
        assert_eq!(report.alert.timestamp, "102");
        assert_eq!(report.alert.status, AlertStatus::Safe);
        assert_eq!(pipeline.aggregator().state("D1"), BufferState::Empty);
    }

    #[test]
    fn rejected_messages_leave_no_state() {
        let mut pipeline = pipeline();

        assert!(matches!(
            pipeline.handle_payload(b"{not json"),
            Err(PipelineError::Malformed(_))
        ));
        assert!(matches!(
            pipeline.handle_payload(b"[1, 2, 3]"),
            Err(PipelineError::Validation(ValidationError::MissingKey { key: "device_id" }))
        ));
        assert!(matches!(
            pipeline.handle_payload(b"\"Node_A\""),
            Err(PipelineError::Validation(ValidationError::MissingKey { key: "device_id" }))
        ));
        assert!(matches!(
            pipeline.handle_payload(&payload("D1", "Node_A", -200.0, "1")),
            Err(PipelineError::Validation(ValidationError::RssiOutOfRange { .. }))
        ));

        assert_eq!(pipeline.aggregator().state("D1"), BufferState::Empty);
        assert!(pipeline.filter().window("D1", "Node_A").is_none());
    }

    #[test]
    fn filter_is_only_fed_on_completed_cycles() {
        let mut pipeline = pipeline();
        pipeline.handle_payload(&payload("D1", "Node_A", -80.0, "1")).unwrap();
        pipeline.handle_payload(&payload("D1", "Node_A", -60.0, "2")).unwrap();
        assert!(pipeline.filter().window("D1", "Node_A").is_none());
    }

    #[test]
    fn second_cycle_is_smoothed() {
        let mut pipeline = pipeline();
        for rssi in [-80.0, -60.0] {
            for node in ["Node_A", "Node_B", "Node_C", "Node_D"] {
                pipeline.handle_payload(&payload("D1", node, rssi, "1")).unwrap();
            }
        }

        let window = pipeline.filter().window("D1", "Node_A").unwrap();
        assert_eq!(window.len(), 2);
        assert_eq!(window.mean(), Some(-70.0));
    }

    #[test]
    fn far_device_raises_alert() {
        let mut pipeline = pipeline();
        let mut last = None;
        for (node, rssi) in [("Node_A", -120.0), ("Node_B", -35.0), ("Node_C", -110.0), ("Node_D", -45.0)] {
            last = pipeline.handle_payload(&payload("D9", node, rssi, "7")).unwrap();
        }
        let report = last.unwrap();
        assert_eq!(report.alert.status, AlertStatus::Alert);
        assert!(!pipeline.zone().contains(report.location));
    }

    #[test]
    fn device_node_scope_keeps_devices_apart() {
        let config = FencepostConfig {
            filter_scope: FilterScope::DeviceNode,
            aggregation: AggregationPolicy::Device,
            ..FencepostConfig::default()
        };
        let mut pipeline = LocalizationPipeline::new(&config).unwrap();
        for device in ["D1", "D2"] {
            for node in ["Node_A", "Node_B", "Node_C", "Node_D"] {
                pipeline.handle_payload(&payload(device, node, -70.0, "1")).unwrap();
            }
        }
        assert_eq!(pipeline.filter().window("D1", "Node_A").unwrap().len(), 1);
        assert_eq!(pipeline.filter().window("D2", "Node_A").unwrap().len(), 1);
    }

    #[test]
    fn custom_model_plugs_in() {
        struct Constant;
        impl DistanceModel for Constant {
            fn distance(&self, _smoothed_rssi: f64) -> f64 {
                1.0
            }
        }

        let config = FencepostConfig {
            nodes: [("L", Point::new(0.0, 0.0)), ("R", Point::new(10.0, 0.0))]
                .into_iter()
                .map(|(id, p)| (id.to_string(), p))
                .collect(),
            ..FencepostConfig::default()
        };
        let mut pipeline = LocalizationPipeline::with_model(&config, Constant).unwrap();
        pipeline.handle_payload(&payload("D1", "L", -50.0, "1")).unwrap();
        let report = pipeline.handle_payload(&payload("D1", "R", -50.0, "2")).unwrap().unwrap();
        assert_eq!(report.location, Point::new(5.0, 0.0));
    }
}
