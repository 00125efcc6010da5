//! Data carried between pipeline stages

use serde::{Deserialize, Serialize};

use crate::time::ReadingTimestamp;

/// A 2-D coordinate in deployment units (metres in practice)
///
/// Serialized as a two-element array `[x, y]`, which is how node locations
/// are written in config files and how estimated locations are published.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Point {
    /// Horizontal coordinate
    pub x: f64,
    /// Vertical coordinate
    pub y: f64,
}

impl Point {
    /// Create a point
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Both coordinates rounded to one decimal place
    pub fn rounded(self) -> Self {
        Self::new(round_tenths(self.x), round_tenths(self.y))
    }
}

impl From<[f64; 2]> for Point {
    fn from([x, y]: [f64; 2]) -> Self {
        Self::new(x, y)
    }
}

impl From<Point> for [f64; 2] {
    fn from(p: Point) -> Self {
        [p.x, p.y]
    }
}

/// Round to one decimal place
///
/// Rounds the exact binary value: `5.35` (stored as `5.3499…`) goes down,
/// and only values exactly halfway go to the even digit.
pub fn round_tenths(value: f64) -> f64 {
    if !value.is_finite() {
        return value;
    }
    format!("{:.1}", value).parse().unwrap_or(value)
}

/// A validated RSSI report from one receiver node
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reading {
    /// Reporting node
    pub node_id: String,
    /// Raw signal strength in dBm, within [-150, 0]
    #[serde(rename = "RSSI")]
    pub rssi: f64,
    /// Timestamp as reported
    pub timestamp: ReadingTimestamp,
    /// Fixed location of the reporting node
    pub location: Point,
}

/// A reading accepted by the validator, tagged with its device
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceReading {
    /// Tracked device the reading is about
    pub device_id: String,
    /// The reading itself
    pub reading: Reading,
}

/// Estimated distance from one node, valid for a single cycle
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistanceSample {
    /// Node the distance is measured from
    pub node_id: String,
    /// Distance, rounded to one decimal; may be negative
    pub distance: f64,
    /// Location of that node
    pub location: Point,
}

/// Geofence verdict for one cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertStatus {
    /// Estimated position inside the safe zone
    #[serde(rename = "Safe")]
    Safe,
    /// Estimated position outside the safe zone
    #[serde(rename = "ALERT: Patient Outside Safe Zone!")]
    Alert,
}

impl AlertStatus {
    /// Status for a geofence test result
    pub const fn from_inside(inside: bool) -> Self {
        if inside {
            AlertStatus::Safe
        } else {
            AlertStatus::Alert
        }
    }

    /// Published status text
    pub const fn as_str(&self) -> &'static str {
        match self {
            AlertStatus::Safe => "Safe",
            AlertStatus::Alert => "ALERT: Patient Outside Safe Zone!",
        }
    }
}

/// Outcome of one completed cycle, published once and not retained
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertResult {
    /// Tracked device
    pub device_id: String,
    /// Cycle timestamp (maximum of the buffered readings)
    pub timestamp: String,
    /// Geofence verdict
    pub status: AlertStatus,
    /// Estimated location, rounded to one decimal
    pub location: Point,
}
