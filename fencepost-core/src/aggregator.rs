//! Reading aggregation
//!
//! Receiver nodes report independently, so a position can only be computed
//! once every node has been heard for a device. The aggregator buffers
//! validated readings per device and hands out a [`CompletedCycle`] as soon
//! as the buffer holds exactly one reading from each known node.
//!
//! ## Per-device states
//!
//! ```text
//!            reading            reading (n < nodes)
//!   EMPTY ─────────────▶ PARTIAL ◀──────────┐
//!     ▲                    │ └──────────────┘
//!     │                    │ reading completes the set
//!     │                    ▼
//!     └──── hand-off ── COMPLETE
//! ```
//!
//! A later reading from a node that is already buffered replaces the earlier
//! one in place; nothing is averaged and no extra cycle is triggered. There
//! is no timeout: a device missing a node waits for it indefinitely.
//!
//! ## Policies
//!
//! [`AggregationPolicy::Device`] keeps one buffer per device and stamps the
//! cycle with the largest buffered timestamp. [`AggregationPolicy::DeviceTimestamp`]
//! only groups readings carrying the same timestamp. The two group readings
//! differently under clock skew, so a deployment runs exactly one of them.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::errors::AggregationError;
use crate::time::{ReadingTimestamp, Timestamp};
use crate::types::{DeviceReading, Reading};

/// How readings are grouped into cycles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationPolicy {
    /// Latest reading per node, per device; cycle timestamp is the maximum
    #[default]
    Device,
    /// Readings grouped by device and exact timestamp
    DeviceTimestamp,
}

/// Observable buffer state for one device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferState {
    /// Nothing buffered
    Empty,
    /// Some, but not all, nodes buffered
    Partial(usize),
}

/// Latest reading per node since the last completed cycle
///
/// Readings keep the slot of the first report from their node, so iteration
/// order is the order in which nodes were first heard this cycle.
#[derive(Debug, Clone, Default)]
pub struct DeviceBuffer {
    readings: Vec<Reading>,
}

impl DeviceBuffer {
    /// Store a reading, replacing any earlier one from the same node
    ///
    /// Returns `true` if an earlier reading was replaced.
    pub fn upsert(&mut self, reading: Reading) -> bool {
        match self.readings.iter_mut().find(|r| r.node_id == reading.node_id) {
            Some(slot) => {
                *slot = reading;
                true
            }
            None => {
                self.readings.push(reading);
                false
            }
        }
    }

    /// Number of distinct nodes buffered
    pub fn len(&self) -> usize {
        self.readings.len()
    }

    /// Check if nothing is buffered
    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    /// Buffered readings in first-heard order
    pub fn readings(&self) -> &[Reading] {
        &self.readings
    }

    /// Largest buffered timestamp, or the first one that is not numeric
    fn max_timestamp(&self) -> Result<Timestamp, &ReadingTimestamp> {
        let mut max = Timestamp::MIN;
        for reading in &self.readings {
            let ts = reading.timestamp.numeric().ok_or(&reading.timestamp)?;
            max = max.max(ts);
        }
        Ok(max)
    }

    /// Empty the buffer, returning its readings
    fn take(&mut self) -> Vec<Reading> {
        std::mem::take(&mut self.readings)
    }
}

/// A full reading set, ready for the processing pipeline
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletedCycle {
    /// Tracked device
    pub device_id: String,
    /// Cycle timestamp
    pub timestamp: String,
    /// One reading per known node, in first-heard order
    #[serde(rename = "RSSI_data")]
    pub readings: Vec<Reading>,
}

/// Per-device reading buffers
#[derive(Debug, Clone)]
pub struct Aggregator {
    policy: AggregationPolicy,
    node_count: usize,
    devices: HashMap<String, DeviceBuffer>,
    buckets: HashMap<(String, String), DeviceBuffer>,
}

impl Aggregator {
    /// Create an aggregator expecting `node_count` distinct nodes per cycle
    pub fn new(policy: AggregationPolicy, node_count: usize) -> Self {
        Self {
            policy,
            node_count,
            devices: HashMap::new(),
            buckets: HashMap::new(),
        }
    }

    /// Policy in force
    pub fn policy(&self) -> AggregationPolicy {
        self.policy
    }

    /// Buffer a validated reading, returning the cycle it completes, if any
    ///
    /// Under the device policy, a completed set whose timestamps are not all
    /// numeric is an error and stays buffered; a later report from the
    /// offending node replaces the bad reading and retries completion.
    pub fn ingest(&mut self, input: DeviceReading) -> Result<Option<CompletedCycle>, AggregationError> {
        match self.policy {
            AggregationPolicy::Device => self.ingest_by_device(input),
            AggregationPolicy::DeviceTimestamp => Ok(self.ingest_by_timestamp(input)),
        }
    }

    fn ingest_by_device(&mut self, input: DeviceReading) -> Result<Option<CompletedCycle>, AggregationError> {
        let DeviceReading { device_id, reading } = input;
        let buffer = self.devices.entry(device_id.clone()).or_default();
        buffer.upsert(reading);

        if buffer.len() < self.node_count {
            return Ok(None);
        }

        let timestamp = buffer.max_timestamp().map_err(|ts| AggregationError::InvalidTimestamp {
            device_id: device_id.clone(),
            timestamp: ts.to_string(),
        })?;

        Ok(Some(CompletedCycle {
            device_id,
            timestamp: timestamp.to_string(),
            readings: buffer.take(),
        }))
    }

    fn ingest_by_timestamp(&mut self, input: DeviceReading) -> Option<CompletedCycle> {
        let DeviceReading { device_id, reading } = input;
        let key = (device_id, reading.timestamp.grouping_key());

        let bucket = self.buckets.entry(key.clone()).or_default();
        bucket.upsert(reading);
        if bucket.len() < self.node_count {
            return None;
        }

        let mut bucket = self.buckets.remove(&key)?;
        let (device_id, timestamp) = key;
        Some(CompletedCycle {
            device_id,
            timestamp,
            readings: bucket.take(),
        })
    }

    /// Readings currently buffered for a device
    ///
    /// Under the timestamp policy this counts across all open buckets.
    pub fn buffered(&self, device_id: &str) -> usize {
        match self.policy {
            AggregationPolicy::Device => self.devices.get(device_id).map_or(0, DeviceBuffer::len),
            AggregationPolicy::DeviceTimestamp => self
                .buckets
                .iter()
                .filter(|((device, _), _)| device == device_id)
                .map(|(_, bucket)| bucket.len())
                .sum(),
        }
    }

    /// Buffer state for a device
    pub fn state(&self, device_id: &str) -> BufferState {
        match self.buffered(device_id) {
            0 => BufferState::Empty,
            n => BufferState::Partial(n),
        }
    }

    /// Whether the device has ever been seen (device policy only)
    pub fn knows_device(&self, device_id: &str) -> bool {
        self.devices.contains_key(device_id)
    }

    /// Open timestamp buckets (timestamp policy only)
    pub fn open_buckets(&self) -> usize {
        self.buckets.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Point;

    fn reading(device: &str, node: &str, rssi: f64, ts: &str) -> DeviceReading {
        DeviceReading {
            device_id: device.into(),
            reading: Reading {
                node_id: node.into(),
                rssi,
                timestamp: ReadingTimestamp::from(ts),
                location: Point::default(),
            },
        }
    }

    #[test]
    fn three_nodes_never_complete() {
        let mut agg = Aggregator::new(AggregationPolicy::Device, 4);
        for node in ["A", "B", "C"] {
            assert_eq!(agg.ingest(reading("D1", node, -70.0, "1")), Ok(None));
        }
        assert_eq!(agg.state("D1"), BufferState::Partial(3));
    }

    #[test]
    fn fourth_node_completes_and_resets() {
        let mut agg = Aggregator::new(AggregationPolicy::Device, 4);
        for (node, ts) in [("A", "100"), ("B", "101"), ("C", "99")] {
            agg.ingest(reading("D1", node, -70.0, ts)).unwrap();
        }

        let cycle = agg.ingest(reading("D1", "D", -70.0, "102")).unwrap().unwrap();
        assert_eq!(cycle.device_id, "D1");
        assert_eq!(cycle.timestamp, "102");
        let order: Vec<_> = cycle.readings.iter().map(|r| r.node_id.as_str()).collect();
        assert_eq!(order, ["A", "B", "C", "D"]);

        assert_eq!(agg.state("D1"), BufferState::Empty);
        assert!(agg.knows_device("D1"));

        // A fifth reading starts a fresh cycle
        assert_eq!(agg.ingest(reading("D1", "A", -70.0, "103")), Ok(None));
        assert_eq!(agg.state("D1"), BufferState::Partial(1));
    }

    #[test]
    fn cycle_timestamp_is_numeric_max_not_last() {
        let mut agg = Aggregator::new(AggregationPolicy::Device, 3);
        agg.ingest(reading("D1", "A", -70.0, "9")).unwrap();
        agg.ingest(reading("D1", "B", -70.0, "100")).unwrap();
        let cycle = agg.ingest(reading("D1", "C", -70.0, "20")).unwrap().unwrap();
        // Lexically "9" would win
        assert_eq!(cycle.timestamp, "100");
    }

    #[test]
    fn duplicate_node_overwrites_in_place() {
        let mut agg = Aggregator::new(AggregationPolicy::Device, 4);
        agg.ingest(reading("D1", "A", -70.0, "1")).unwrap();
        agg.ingest(reading("D1", "B", -71.0, "1")).unwrap();
        assert_eq!(agg.ingest(reading("D1", "A", -90.0, "2")), Ok(None));
        assert_eq!(agg.buffered("D1"), 2);

        agg.ingest(reading("D1", "C", -72.0, "1")).unwrap();
        let cycle = agg.ingest(reading("D1", "D", -73.0, "1")).unwrap().unwrap();
        assert_eq!(cycle.readings[0].node_id, "A");
        assert_eq!(cycle.readings[0].rssi, -90.0);
    }

    #[test]
    fn identical_resend_is_idempotent() {
        let mut agg = Aggregator::new(AggregationPolicy::Device, 4);
        agg.ingest(reading("D1", "A", -70.0, "1")).unwrap();
        agg.ingest(reading("D1", "B", -70.0, "1")).unwrap();
        agg.ingest(reading("D1", "C", -70.0, "1")).unwrap();
        assert_eq!(agg.ingest(reading("D1", "C", -70.0, "1")), Ok(None));
        assert_eq!(agg.buffered("D1"), 3);
    }

    #[test]
    fn devices_are_independent() {
        let mut agg = Aggregator::new(AggregationPolicy::Device, 2);
        agg.ingest(reading("D1", "A", -70.0, "1")).unwrap();
        assert_eq!(agg.ingest(reading("D2", "B", -70.0, "1")), Ok(None));
        assert_eq!(agg.buffered("D1"), 1);
        assert_eq!(agg.buffered("D2"), 1);
        assert_eq!(agg.state("D3"), BufferState::Empty);
    }

    #[test]
    fn non_numeric_timestamp_keeps_buffer() {
        let mut agg = Aggregator::new(AggregationPolicy::Device, 2);
        agg.ingest(reading("D1", "A", -70.0, "soon")).unwrap();
        let err = agg.ingest(reading("D1", "B", -70.0, "5")).unwrap_err();
        assert_eq!(
            err,
            AggregationError::InvalidTimestamp { device_id: "D1".into(), timestamp: "soon".into() }
        );
        assert_eq!(agg.buffered("D1"), 2);

        // Node A reports again with a usable timestamp
        let cycle = agg.ingest(reading("D1", "A", -70.0, "6")).unwrap().unwrap();
        assert_eq!(cycle.timestamp, "6");
        assert_eq!(agg.buffered("D1"), 0);
    }

    #[test]
    fn timestamp_policy_groups_by_exact_timestamp() {
        let mut agg = Aggregator::new(AggregationPolicy::DeviceTimestamp, 2);
        agg.ingest(reading("D1", "A", -70.0, "100")).unwrap();
        assert_eq!(agg.ingest(reading("D1", "B", -70.0, "101")), Ok(None));
        assert_eq!(agg.open_buckets(), 2);
        assert_eq!(agg.buffered("D1"), 2);

        let cycle = agg.ingest(reading("D1", "B", -75.0, "100")).unwrap().unwrap();
        assert_eq!(cycle.timestamp, "100");
        assert_eq!(cycle.readings.len(), 2);

        // Completed bucket is discarded, the other stays open
        assert_eq!(agg.open_buckets(), 1);
        assert_eq!(agg.state("D1"), BufferState::Partial(1));
    }

    #[test]
    fn cycle_serializes_with_rssi_data_key() {
        let mut agg = Aggregator::new(AggregationPolicy::Device, 1);
        let cycle = agg.ingest(reading("D1", "A", -70.0, "1")).unwrap().unwrap();
        let json = serde_json::to_value(&cycle).unwrap();
        assert_eq!(json["RSSI_data"][0]["RSSI"], -70.0);
        assert_eq!(json["timestamp"], "1");
    }
}
