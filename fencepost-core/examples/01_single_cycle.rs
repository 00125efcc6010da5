//! Single Localization Cycle Example
//!
//! Feeds one complete set of readings for a device through the pipeline
//! and prints every intermediate result.
//!
//! ## What You'll Learn
//!
//! - Building a pipeline from the default deployment
//! - Why nothing happens until every node has reported
//! - Reading the distances, location and alert of a cycle
//!
//! ## Running the Example
//!
//! ```bash
//! cargo run --example 01_single_cycle
//! ```

use fencepost_core::{FencepostConfig, LocalizationPipeline, PipelineError};
use serde_json::json;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Fencepost Single Cycle Example");
    println!("==============================\n");

    let config = FencepostConfig::default();
    println!("Receiver nodes:");
    for (id, location) in &config.nodes {
        println!("  {:7} at ({:4.1}, {:4.1})", id, location.x, location.y);
    }
    println!(
        "Safe zone: x {}..{}, y {}..{}\n",
        config.safe_zone.xmin, config.safe_zone.xmax, config.safe_zone.ymin, config.safe_zone.ymax
    );

    let mut pipeline = LocalizationPipeline::new(&config)?;

    let readings = [
        json!({ "device_id": "D1", "node_id": "Node_A", "RSSI": -80, "timestamp": "100" }),
        json!({ "device_id": "D1", "node_id": "Node_B", "RSSI": "-85", "timestamp": "101" }),
        // Rejected: unknown node, leaves no trace
        json!({ "device_id": "D1", "node_id": "Node_X", "RSSI": -70, "timestamp": "101" }),
        json!({ "device_id": "D1", "node_id": "Node_C", "RSSI": -78, "timestamp": "99" }),
        json!({ "device_id": "D1", "node_id": "Node_D", "RSSI": -82, "timestamp": "102" }),
    ];

    for message in &readings {
        match pipeline.handle_message(message) {
            Ok(None) => println!(
                "{} buffered ({} of {} nodes)",
                message["node_id"],
                pipeline.aggregator().buffered("D1"),
                pipeline.nodes().len()
            ),
            Ok(Some(report)) => {
                println!("\nCycle complete at timestamp {}", report.alert.timestamp);
                for sample in &report.distances {
                    println!("  {} -> {:.1}", sample.node_id, sample.distance);
                }
                println!("Estimated location: ({}, {})", report.location.x, report.location.y);
                println!("Status: {}", report.alert.status.as_str());
                println!("Published: {}", serde_json::to_string(&report.alert)?);
            }
            Err(PipelineError::Validation(e)) => println!("Invalid message: {}", e),
            Err(e) => println!("Dropped: {}", e),
        }
    }

    Ok(())
}
