//! Shared fixtures for integration tests
//!
//! - Message builders for well-formed and broken readings
//! - A reading-set driver that feeds every node of the default deployment
//! - Geometry helpers for ground-truth positions

#![allow(dead_code)]

use fencepost_core::{
    config::default_node_table, CycleReport, FencepostConfig, LocalizationPipeline, Point,
};
use serde_json::{json, Value};

/// Node ids of the default deployment, in report order
pub const NODES: [&str; 4] = ["Node_A", "Node_B", "Node_C", "Node_D"];

/// Well-formed reading message
pub fn reading(device: &str, node: &str, rssi: f64, ts: i64) -> Value {
    json!({
        "device_id": device,
        "node_id": node,
        "RSSI": rssi,
        "timestamp": ts.to_string(),
    })
}

/// Pipeline over the default deployment
pub fn default_pipeline() -> LocalizationPipeline {
    LocalizationPipeline::new(&FencepostConfig::default()).expect("default config is valid")
}

/// Feed one reading per node; returns whatever the last message produced
pub fn feed_cycle(
    pipeline: &mut LocalizationPipeline,
    device: &str,
    rssi: [f64; 4],
    ts: i64,
) -> Option<CycleReport> {
    let mut last = None;
    for (node, value) in NODES.iter().zip(rssi) {
        last = pipeline
            .handle_message(&reading(device, node, value, ts))
            .expect("fixture readings are valid");
    }
    last
}

/// Euclidean distance
pub fn distance(a: Point, b: Point) -> f64 {
    ((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt()
}

/// RSSI that the default linear model maps back to `distance`
pub fn rssi_for_distance(distance: f64) -> f64 {
    -(distance * 10.0 + 30.0)
}

/// RSSI per node (default deployment order) for a device standing at `truth`
pub fn rssi_profile(truth: Point) -> [f64; 4] {
    let nodes = default_node_table();
    let mut out = [0.0; 4];
    for (slot, node) in out.iter_mut().zip(NODES) {
        *slot = rssi_for_distance(distance(nodes[node], truth));
    }
    out
}
