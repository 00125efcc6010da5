//! Property tests for the pipeline's pure components

mod common;

use fencepost_core::{
    config::default_node_table, filter::NoiseFilter, geofence::SafeZone, validator::MessageValidator,
    window::RssiWindow, DistanceModel, FilterScope, Point, PropagationModel, WINDOW_SIZE,
};
use proptest::prelude::*;
use serde_json::json;
use std::sync::Arc;

proptest! {
    #[test]
    fn window_keeps_last_values(values in prop::collection::vec(-150.0f64..=0.0, 0..40)) {
        let mut window = RssiWindow::<WINDOW_SIZE>::new();
        for v in &values {
            window.push(*v);
        }

        let start = values.len().saturating_sub(WINDOW_SIZE);
        let expected: Vec<f64> = values[start..].to_vec();
        prop_assert_eq!(window.iter().collect::<Vec<_>>(), expected.clone());
        prop_assert!(window.len() <= WINDOW_SIZE);

        if !expected.is_empty() {
            let mean = expected.iter().sum::<f64>() / expected.len() as f64;
            prop_assert!((window.mean().unwrap() - mean).abs() < 1e-9);
        }
    }

    #[test]
    fn filter_returns_window_mean(values in prop::collection::vec(-150.0f64..=0.0, 1..20)) {
        let mut filter = NoiseFilter::new(FilterScope::Node);
        let mut last = 0.0;
        for v in &values {
            last = filter.filter("D1", "Node_A", *v);
        }
        let tail = &values[values.len().saturating_sub(WINDOW_SIZE)..];
        let mean = tail.iter().sum::<f64>() / tail.len() as f64;
        prop_assert!((last - mean).abs() < 1e-9);
    }

    #[test]
    fn validator_accepts_iff_in_range(rssi in -300.0f64..100.0, node_idx in 0usize..6) {
        let nodes = ["Node_A", "Node_B", "Node_C", "Node_D", "Node_E", "gateway"];
        let validator = MessageValidator::new(Arc::new(default_node_table()));
        let message = json!({
            "device_id": "D1", "node_id": nodes[node_idx], "RSSI": rssi, "timestamp": "1"
        });

        let accepted = validator.validate_object(message.as_object().unwrap()).is_ok();
        let expected = (-150.0..=0.0).contains(&rssi) && node_idx < 4;
        prop_assert_eq!(accepted, expected);
    }

    #[test]
    fn linear_distance_grows_with_attenuation(a in -150.0f64..=0.0, b in -150.0f64..=0.0) {
        let model = PropagationModel::default();
        if a.abs() < b.abs() {
            prop_assert!(model.distance(a) < model.distance(b));
        }
    }

    #[test]
    fn geofence_matches_interval_test(x in 0.0f64..10.0, y in -1.0f64..8.0) {
        let zone = SafeZone::default();
        let inside = (4.0..=6.7).contains(&x) && (0.2..=5.0).contains(&y);
        prop_assert_eq!(zone.contains(Point::new(x, y)), inside);
    }
}
