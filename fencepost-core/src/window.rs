//! Fixed-Size Sliding Window for RSSI Smoothing
//!
//! ## Overview
//!
//! Raw RSSI jumps by several dBm between consecutive reports from the same
//! node even when nothing moves. Each node therefore keeps the last few values
//! it reported, and the pipeline works with their mean rather than the raw
//! reading.
//!
//! The window has a compile-time capacity and never allocates:
//! - O(1) insertion (evicts the oldest value when full)
//! - O(1) access to the newest value
//! - O(n) mean over the current contents
//!
//! ## Eviction
//!
//! ```text
//! RssiWindow<5>, pushing -80, -82, -79, -81, -90, -85:
//!
//! after 5 pushes:  [-80, -82, -79, -81, -90]   mean = -82.4
//! after 6 pushes:  [-82, -79, -81, -90, -85]   mean = -83.4
//!                    ↑ oldest (-80) evicted
//! ```
//!
//! ## Usage Example
//!
//! ```rust
//! use fencepost_core::window::RssiWindow;
//!
//! let mut window: RssiWindow<3> = RssiWindow::new();
//! window.push(-80.0);
//! window.push(-70.0);
//! assert_eq!(window.mean(), Some(-75.0));
//!
//! window.push(-60.0);
//! assert_eq!(window.push(-50.0), Some(-80.0)); // evicted
//! assert_eq!(window.mean(), Some(-60.0));
//! ```

use heapless::Deque;

/// Number of past RSSI values averaged per window
pub const WINDOW_SIZE: usize = 5;

/// Bounded FIFO of recent RSSI values
///
/// ## Internal Invariants
///
/// - `len() <= N`
/// - Values iterate from oldest to newest
///
/// ## Thread Safety
///
/// This type is not thread-safe. The pipeline owns every window and only
/// touches them from the single consumer that processes readings.
#[derive(Debug, Clone)]
pub struct RssiWindow<const N: usize> {
    values: Deque<f64, N>,
}

impl<const N: usize> RssiWindow<N> {
    /// Creates a new empty window
    pub const fn new() -> Self {
        Self { values: Deque::new() }
    }

    /// Appends a value, returning the evicted oldest value if the window was full
    pub fn push(&mut self, value: f64) -> Option<f64> {
        let evicted = if self.values.is_full() {
            self.values.pop_front()
        } else {
            None
        };

        // Cannot fail: a slot was freed above if the deque was full
        let _ = self.values.push_back(value);
        evicted
    }

    /// Arithmetic mean of the current contents
    pub fn mean(&self) -> Option<f64> {
        if self.values.is_empty() {
            return None;
        }

        let sum: f64 = self.values.iter().sum();
        Some(sum / self.values.len() as f64)
    }

    /// Number of stored values
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the window is empty
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Check if the window is full
    pub fn is_full(&self) -> bool {
        self.values.is_full()
    }

    /// Most recent value
    pub fn last(&self) -> Option<f64> {
        self.values.back().copied()
    }

    /// Iterate over values from oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.values.iter().copied()
    }

    /// Drop all values
    pub fn clear(&mut self) {
        self.values.clear();
    }
}

impl<const N: usize> Default for RssiWindow<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_window() {
        let window: RssiWindow<WINDOW_SIZE> = RssiWindow::new();
        assert!(window.is_empty());
        assert_eq!(window.len(), 0);
        assert!(window.mean().is_none());
        assert!(window.last().is_none());
    }

    #[test]
    fn push_and_average() {
        let mut window = RssiWindow::<WINDOW_SIZE>::new();

        assert_eq!(window.push(-80.0), None);
        assert_eq!(window.mean(), Some(-80.0));

        window.push(-70.0);
        assert_eq!(window.len(), 2);
        assert_eq!(window.mean(), Some(-75.0));
        assert_eq!(window.last(), Some(-70.0));
    }

    #[test]
    fn overflow_evicts_oldest() {
        let mut window = RssiWindow::<3>::new();

        for i in 0..5 {
            window.push(-(i as f64));
        }

        assert_eq!(window.len(), 3);
        assert!(window.is_full());

        let values: Vec<f64> = window.iter().collect();
        assert_eq!(values, vec![-2.0, -3.0, -4.0]);
        assert_eq!(window.mean(), Some(-3.0));
    }

    #[test]
    fn clear_resets() {
        let mut window = RssiWindow::<WINDOW_SIZE>::new();
        window.push(-60.0);
        window.clear();
        assert!(window.is_empty());
    }
}
