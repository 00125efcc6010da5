//! Per-node RSSI noise filter
//!
//! A moving average over the last [`WINDOW_SIZE`] readings. By default the
//! smoothing state is keyed by node alone, so two devices heard by the same
//! node feed one shared window. [`FilterScope::DeviceNode`] isolates them.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::window::{RssiWindow, WINDOW_SIZE};

/// What a smoothing window is keyed by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterScope {
    /// One window per node, shared by every device the node hears
    #[default]
    Node,
    /// One window per (device, node) pair
    DeviceNode,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct WindowKey {
    device_id: Option<String>,
    node_id: String,
}

/// Moving-average filter state for every node seen so far
#[derive(Debug, Clone, Default)]
pub struct NoiseFilter {
    scope: FilterScope,
    windows: HashMap<WindowKey, RssiWindow<WINDOW_SIZE>>,
}

impl NoiseFilter {
    /// Create an empty filter
    pub fn new(scope: FilterScope) -> Self {
        Self {
            scope,
            windows: HashMap::new(),
        }
    }

    /// Scope this filter was built with
    pub fn scope(&self) -> FilterScope {
        self.scope
    }

    /// Feed one RSSI value and return the smoothed value
    ///
    /// `device_id` only matters under [`FilterScope::DeviceNode`].
    pub fn filter(&mut self, device_id: &str, node_id: &str, rssi: f64) -> f64 {
        let key = self.key(device_id, node_id);
        let window = self.windows.entry(key).or_default();
        window.push(rssi);
        window.mean().unwrap_or(rssi)
    }

    /// Current window for a node, if it has received anything
    pub fn window(&self, device_id: &str, node_id: &str) -> Option<&RssiWindow<WINDOW_SIZE>> {
        self.windows.get(&self.key(device_id, node_id))
    }

    fn key(&self, device_id: &str, node_id: &str) -> WindowKey {
        WindowKey {
            device_id: match self.scope {
                FilterScope::Node => None,
                FilterScope::DeviceNode => Some(device_id.to_string()),
            },
            node_id: node_id.to_string(),
        }
    }
}
