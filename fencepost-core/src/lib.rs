//! Core localization engine for Fencepost
//!
//! Estimates where a tracked wearable is from the RSSI its signal arrives
//! with at four fixed receiver nodes, and decides whether that position is
//! inside the safe zone.
//!
//! Raw RSSI is noisy, so every completed reading set goes through:
//! - a per-node moving average (last 5 readings)
//! - a linear RSSI to distance model
//! - least-squares multilateration (distance-weighted centroid below 3 nodes)
//! - an inclusive rectangular geofence test
//!
//! ```no_run
//! use fencepost_core::{FencepostConfig, LocalizationPipeline};
//!
//! let mut pipeline = LocalizationPipeline::new(&FencepostConfig::default())?;
//!
//! // Feed raw message bodies as they arrive
//! # let payload: &[u8] = b"{}";
//! match pipeline.handle_payload(payload) {
//!     Ok(Some(_report)) => { /* publish _report.alert */ }
//!     Ok(None) => {}  // waiting for more nodes
//!     Err(_e) => {}   // dropped
//! }
//! # Ok::<(), fencepost_core::ConfigError>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

// Macros for optional logging
#[cfg(feature = "log")]
macro_rules! log_info {
    ($($arg:tt)*) => { log::info!($($arg)*) };
}

#[cfg(not(feature = "log"))]
macro_rules! log_info {
    ($($arg:tt)*) => {};
}

pub mod aggregator;
pub mod config;
pub mod distance;
pub mod errors;
pub mod filter;
pub mod geofence;
pub mod pipeline;
pub mod solver;
pub mod time;
pub mod types;
pub mod validator;
pub mod window;

// Public API
pub use aggregator::{AggregationPolicy, Aggregator, BufferState, CompletedCycle};
pub use config::{FencepostConfig, NodeTable};
pub use distance::{DistanceModel, PropagationModel};
pub use errors::{
    AggregationError, ConfigError, PipelineError, PipelineResult, SolverError, ValidationError,
    ValidationResult,
};
pub use filter::{FilterScope, NoiseFilter};
pub use geofence::SafeZone;
pub use pipeline::{CycleReport, LocalizationPipeline};
pub use solver::multilaterate;
pub use types::{AlertResult, AlertStatus, DeviceReading, DistanceSample, Point, Reading};
pub use validator::{MessageValidator, Validator};
pub use window::WINDOW_SIZE;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
