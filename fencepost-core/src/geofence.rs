//! Rectangular safe-zone test

use serde::{Deserialize, Serialize};

use crate::types::Point;

/// Axis-aligned safe zone, inclusive on every edge
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SafeZone {
    /// Left edge
    pub xmin: f64,
    /// Right edge
    pub xmax: f64,
    /// Bottom edge
    pub ymin: f64,
    /// Top edge
    pub ymax: f64,
}

impl Default for SafeZone {
    /// The reference ward: (4.0, 0.2) to (6.7, 5.0)
    fn default() -> Self {
        Self::new(4.0, 6.7, 0.2, 5.0)
    }
}

impl SafeZone {
    /// Create a zone from its edges
    pub const fn new(xmin: f64, xmax: f64, ymin: f64, ymax: f64) -> Self {
        Self { xmin, xmax, ymin, ymax }
    }

    /// Whether a point lies inside or on the boundary
    pub fn contains(&self, point: Point) -> bool {
        self.xmin <= point.x && point.x <= self.xmax && self.ymin <= point.y && point.y <= self.ymax
    }

    /// Edges are finite and not inverted
    pub fn is_well_formed(&self) -> bool {
        [self.xmin, self.xmax, self.ymin, self.ymax]
            .iter()
            .all(|v| v.is_finite())
            && self.xmin <= self.xmax
            && self.ymin <= self.ymax
    }
}
