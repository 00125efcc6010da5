//! Deployment configuration
//!
//! Everything the pipeline needs to know about the physical installation:
//! where the receiver nodes sit, which rectangle counts as safe, and which
//! aggregation / filtering policies to run. Every field has a default that
//! reproduces the reference ward installation, so an empty JSON object is a
//! valid config.
//!
//! ```json
//! {
//!   "nodes": { "Node_A": [2, 5], "Node_B": [10, 2], "Node_C": [5, 7], "Node_D": [9, 2] },
//!   "safe_zone": { "xmin": 4.0, "xmax": 6.7, "ymin": 0.2, "ymax": 5.0 },
//!   "aggregation": "device",
//!   "filter_scope": "node",
//!   "distance_model": { "kind": "linear", "offset": 30.0, "slope": 10.0 }
//! }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::aggregator::AggregationPolicy;
use crate::distance::PropagationModel;
use crate::errors::ConfigError;
use crate::filter::FilterScope;
use crate::geofence::SafeZone;
use crate::types::Point;

/// Immutable node id → location lookup, populated once at startup
pub type NodeTable = BTreeMap<String, Point>;

/// Node table of the reference installation
pub fn default_node_table() -> NodeTable {
    [
        ("Node_A", Point::new(2.0, 5.0)),
        ("Node_B", Point::new(10.0, 2.0)),
        ("Node_C", Point::new(5.0, 7.0)),
        ("Node_D", Point::new(9.0, 2.0)),
    ]
    .into_iter()
    .map(|(id, location)| (id.to_string(), location))
    .collect()
}

/// Full deployment configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FencepostConfig {
    /// Receiver node locations
    pub nodes: NodeTable,
    /// Rectangle in which a tracked device counts as safe
    pub safe_zone: SafeZone,
    /// How readings are grouped into cycles
    pub aggregation: AggregationPolicy,
    /// Whether smoothing windows are shared across devices
    pub filter_scope: FilterScope,
    /// RSSI to distance conversion
    pub distance_model: PropagationModel,
}

impl Default for FencepostConfig {
    fn default() -> Self {
        Self {
            nodes: default_node_table(),
            safe_zone: SafeZone::default(),
            aggregation: AggregationPolicy::default(),
            filter_scope: FilterScope::default(),
            distance_model: PropagationModel::default(),
        }
    }
}

impl FencepostConfig {
    /// Parse and check a JSON config document
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and check a JSON config file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Reject deployments the pipeline cannot run
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.nodes.is_empty() {
            return Err(ConfigError::Invalid("node table is empty"));
        }

        if self
            .nodes
            .values()
            .any(|p| !p.x.is_finite() || !p.y.is_finite())
        {
            return Err(ConfigError::Invalid("node location is not finite"));
        }

        if !self.safe_zone.is_well_formed() {
            return Err(ConfigError::Invalid("safe zone bounds are inverted or not finite"));
        }

        self.distance_model.check()?;

        Ok(())
    }
}
