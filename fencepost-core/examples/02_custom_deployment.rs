//! Custom Deployment Example
//!
//! Loads a deployment from JSON: a three-node room, a smaller safe zone,
//! timestamp-keyed aggregation and per-device smoothing windows.
//!
//! ## Running the Example
//!
//! ```bash
//! cargo run --example 02_custom_deployment
//! ```

use fencepost_core::{FencepostConfig, LocalizationPipeline};
use serde_json::json;

const DEPLOYMENT: &str = r#"{
    "nodes": { "North": [0, 10], "West": [0, 0], "East": [10, 0] },
    "safe_zone": { "xmin": 2.0, "xmax": 8.0, "ymin": 2.0, "ymax": 8.0 },
    "aggregation": "device_timestamp",
    "filter_scope": "device_node"
}"#;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Fencepost Custom Deployment Example");
    println!("===================================\n");

    let config = FencepostConfig::from_json_str(DEPLOYMENT)?;
    let mut pipeline = LocalizationPipeline::new(&config)?;

    // Two devices interleaved; readings only group when timestamps match
    let traffic = [
        ("wristband-1", "West", -75.0, 10),
        ("wristband-2", "West", -95.0, 10),
        ("wristband-1", "East", -85.0, 10),
        ("wristband-1", "North", -80.0, 11), // different timestamp, new bucket
        ("wristband-2", "East", -60.0, 10),
        ("wristband-2", "North", -100.0, 10),
        ("wristband-1", "North", -80.0, 10),
    ];

    for (device, node, rssi, ts) in traffic {
        let message = json!({ "device_id": device, "node_id": node, "RSSI": rssi, "timestamp": ts });
        if let Some(report) = pipeline.handle_message(&message)? {
            println!(
                "{} @ {}: ({}, {}) {}",
                report.alert.device_id,
                report.alert.timestamp,
                report.location.x,
                report.location.y,
                report.alert.status.as_str()
            );
        }
    }

    println!("\nOpen buckets left waiting: {}", pipeline.aggregator().open_buckets());
    Ok(())
}
