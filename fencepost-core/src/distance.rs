//! RSSI to distance conversion
//!
//! The deployed calibration is a straight line, `(|rssi| - 30) / 10`. It is
//! not fitted to any measured path loss; it only has to grow with signal
//! attenuation. Strong signals (|rssi| < 30) give negative distances, which
//! are passed on to the solver unchanged.
//!
//! Any replacement model must keep the same contract: RSSI magnitude in,
//! monotonically increasing distance out.

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;
use crate::types::round_tenths;

/// Converts a smoothed RSSI value to a distance
pub trait DistanceModel {
    /// Unrounded distance for a smoothed RSSI in dBm
    fn distance(&self, smoothed_rssi: f64) -> f64;

    /// Distance rounded to one decimal, as handed to the solver
    fn estimate(&self, smoothed_rssi: f64) -> f64 {
        round_tenths(self.distance(smoothed_rssi))
    }
}

/// Built-in propagation models
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PropagationModel {
    /// `(|rssi| - offset) / slope`
    Linear {
        /// RSSI magnitude mapped to zero distance
        offset: f64,
        /// dB of attenuation per distance unit
        slope: f64,
    },
    /// Log-distance path loss: `10^((rssi_at_1m - rssi) / (10 n))`
    LogDistance {
        /// Expected RSSI one unit away from the node
        rssi_at_1m: f64,
        /// Path loss exponent `n` (2.0 free space, 2.5-4.0 indoors)
        path_loss_exponent: f64,
    },
}

impl Default for PropagationModel {
    fn default() -> Self {
        PropagationModel::Linear {
            offset: 30.0,
            slope: 10.0,
        }
    }
}

impl PropagationModel {
    /// Reject parameters that would break monotonicity
    pub fn check(&self) -> Result<(), ConfigError> {
        match *self {
            PropagationModel::Linear { offset, slope } => {
                if !offset.is_finite() || !(slope.is_finite() && slope > 0.0) {
                    return Err(ConfigError::Invalid("linear model needs a finite offset and positive slope"));
                }
            }
            PropagationModel::LogDistance { rssi_at_1m, path_loss_exponent } => {
                if !rssi_at_1m.is_finite() || !(path_loss_exponent.is_finite() && path_loss_exponent > 0.0) {
                    return Err(ConfigError::Invalid("log-distance model needs a positive path loss exponent"));
                }
            }
        }
        Ok(())
    }
}

impl DistanceModel for PropagationModel {
    fn distance(&self, smoothed_rssi: f64) -> f64 {
        match *self {
            PropagationModel::Linear { offset, slope } => (smoothed_rssi.abs() - offset) / slope,
            PropagationModel::LogDistance { rssi_at_1m, path_loss_exponent } => {
                // RSSI is non-positive, so -|rssi| keeps the curve monotonic in magnitude
                let exponent = (rssi_at_1m + smoothed_rssi.abs()) / (10.0 * path_loss_exponent);
                10f64.powf(exponent)
            }
        }
    }
}
