//! Inbound reading validation
//!
//! Each receiver node publishes one JSON object per reading:
//!
//! ```json
//! { "device_id": "D1", "node_id": "Node_A", "RSSI": "-80", "timestamp": "100" }
//! ```
//!
//! Checks run in a fixed order and the first failure wins:
//!
//! 1. `device_id`, `node_id`, `RSSI`, `timestamp` are all present
//! 2. `RSSI` is a real number (JSON number or numeric string)
//! 3. `RSSI` lies in [-150, 0] dBm
//! 4. `node_id` is in the node-location table
//!
//! Validation is a pure check. A rejected message leaves no trace in any
//! pipeline state. Unknown extra keys are ignored.

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::config::NodeTable;
use crate::errors::{ValidationError, ValidationResult};
use crate::time::ReadingTimestamp;
use crate::types::{DeviceReading, Reading};

/// Weakest RSSI accepted, in dBm
pub const RSSI_MIN_DBM: f64 = -150.0;

/// Strongest RSSI accepted, in dBm
pub const RSSI_MAX_DBM: f64 = 0.0;

/// Fields every reading must carry, in check order
pub const REQUIRED_KEYS: [&str; 4] = ["device_id", "node_id", "RSSI", "timestamp"];

/// Core validator trait
pub trait Validator {
    /// What is being validated
    type Input: ?Sized;

    /// What a successful validation produces
    type Output;

    /// Check the input, producing a typed value or the first failure
    fn validate(&self, input: &Self::Input) -> ValidationResult<Self::Output>;
}

/// Validator for raw reading messages
#[derive(Debug, Clone)]
pub struct MessageValidator {
    nodes: Arc<NodeTable>,
}

impl MessageValidator {
    /// Create a validator over a node-location table
    pub fn new(nodes: Arc<NodeTable>) -> Self {
        Self { nodes }
    }

    /// Node table this validator checks against
    pub fn nodes(&self) -> &NodeTable {
        &self.nodes
    }

    /// Validate a decoded JSON object
    pub fn validate_object(&self, message: &Map<String, Value>) -> ValidationResult<DeviceReading> {
        if let Some(key) = REQUIRED_KEYS.iter().copied().find(|key| !message.contains_key(*key)) {
            return Err(ValidationError::MissingKey { key });
        }

        let rssi = parse_rssi(&message["RSSI"])?;
        check_range(rssi, RSSI_MIN_DBM, RSSI_MAX_DBM)?;

        let node_id = id_text(&message["node_id"]);
        let location = *self
            .nodes
            .get(&node_id)
            .ok_or_else(|| ValidationError::UnknownNode { node_id: node_id.clone() })?;

        Ok(DeviceReading {
            device_id: id_text(&message["device_id"]),
            reading: Reading {
                node_id,
                rssi,
                timestamp: ReadingTimestamp::new(message["timestamp"].clone()),
                location,
            },
        })
    }
}

impl Validator for MessageValidator {
    type Input = Map<String, Value>;
    type Output = DeviceReading;

    fn validate(&self, input: &Self::Input) -> ValidationResult<Self::Output> {
        self.validate_object(input)
    }
}

/// Interpret an RSSI field as a finite real number
///
/// JSON numbers are taken as-is; strings are trimmed and parsed. Booleans,
/// nulls, containers, NaN and infinities are not real numbers.
pub fn parse_rssi(value: &Value) -> ValidationResult<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    parsed
        .filter(|v| v.is_finite())
        .ok_or(ValidationError::InvalidRssi)
}

/// Check if an RSSI value is within the accepted range, inclusive
pub fn check_range(value: f64, min: f64, max: f64) -> ValidationResult<()> {
    if value < min || value > max {
        Err(ValidationError::RssiOutOfRange { value })
    } else {
        Ok(())
    }
}

/// Identifier text for a JSON id field
///
/// Strings are used verbatim; any other JSON value uses its compact JSON form,
/// so `7` and `"7"` name the same device.
fn id_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
