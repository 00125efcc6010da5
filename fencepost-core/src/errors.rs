//! Error Types for the Localization Pipeline
//!
//! ## Error Categories
//!
//! Errors fall into four groups, matching how the gateway reacts to them:
//!
//! ### Malformed Input
//! - `PipelineError::Malformed`: payload is not valid JSON
//!
//! ### Validation Failures
//! - `MissingKey`: one of `device_id`, `node_id`, `RSSI`, `timestamp` absent
//! - `InvalidRssi`: RSSI is not a finite real number
//! - `RssiOutOfRange`: RSSI outside [-150, 0]
//! - `UnknownNode`: node id not in the deployment's node table
//!
//! ### Aggregation
//! - `InvalidTimestamp`: a complete reading set cannot be ordered numerically
//!
//! ### Numeric
//! - `SolverError`: no samples, or weights that cancel out in the centroid fallback
//!
//! None of these are fatal. Every error path drops the offending message and
//! the next message is served normally.
//!
//! ```rust
//! use fencepost_core::{FencepostConfig, LocalizationPipeline, PipelineError, ValidationError};
//!
//! let mut pipeline = LocalizationPipeline::new(&FencepostConfig::default()).unwrap();
//! let payload = br#"{"device_id": "D1", "node_id": "Node_Z", "RSSI": -70, "timestamp": "1"}"#;
//!
//! match pipeline.handle_payload(payload) {
//!     Err(PipelineError::Validation(ValidationError::UnknownNode { node_id })) => {
//!         assert_eq!(node_id, "Node_Z");
//!     }
//!     other => panic!("unexpected: {:?}", other),
//! }
//! ```

use thiserror_no_std::Error;

/// Result type for validation operations
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Reasons a raw reading is rejected by the validator
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// A required field is absent
    #[error("Missing key: {key}")]
    MissingKey {
        /// Name of the first missing field, in check order
        key: &'static str,
    },

    /// RSSI could not be read as a finite real number
    #[error("RSSI is not a valid number")]
    InvalidRssi,

    /// RSSI outside the accepted dBm range
    #[error("RSSI value {value} out of range")]
    RssiOutOfRange {
        /// The parsed RSSI
        value: f64,
    },

    /// Node id is not part of the node-location table
    #[error("Unknown node_id: {node_id}")]
    UnknownNode {
        /// The rejected node id, as reported
        node_id: String,
    },
}

/// Multilateration failures
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverError {
    /// No distance samples reached the solver
    #[error("no distance samples to solve")]
    NoSamples,

    /// Centroid weights sum to zero (only possible with negative distances)
    #[error("centroid weights sum to zero")]
    DegenerateWeights,
}

/// Aggregator failures
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AggregationError {
    /// A buffered reading's timestamp is not an integer
    #[error("timestamp {timestamp} for device {device_id} is not numeric")]
    InvalidTimestamp {
        /// Device whose reading set is stuck
        device_id: String,
        /// The offending timestamp as received
        timestamp: String,
    },
}

/// Configuration loading and checking failures
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The config file could not be read
    #[error("failed to read config {path}: {source}")]
    Io {
        /// Path that was requested
        path: String,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// The config document is not valid JSON for this schema
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    /// The config parsed but describes an unusable deployment
    #[error("invalid config: {0}")]
    Invalid(&'static str),
}

/// Any failure while handling one inbound message
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Payload is not valid JSON
    #[error("malformed message: {0}")]
    Malformed(String),

    /// Payload decoded but failed validation
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Reading set completed but could not be ordered
    #[error(transparent)]
    Aggregation(#[from] AggregationError),

    /// Position solve failed
    #[error(transparent)]
    Solver(#[from] SolverError),
}
