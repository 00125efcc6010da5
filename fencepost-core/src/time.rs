//! Reading timestamps
//!
//! Receiver nodes stamp readings with whatever their clock produces: an
//! integer, or an integer rendered as a string. Timestamps are carried through
//! the pipeline exactly as received and only interpreted numerically when a
//! reading set completes and the cycle timestamp (the maximum) is chosen.

use core::fmt;

use serde::{Serialize, Serializer};
use serde_json::Value;

/// Numeric timestamp used for ordering readings within a cycle
pub type Timestamp = i64;

/// Timestamp as reported by a receiver node
#[derive(Debug, Clone, PartialEq)]
pub struct ReadingTimestamp(Value);

impl ReadingTimestamp {
    /// Wrap a raw JSON timestamp value
    pub fn new(raw: Value) -> Self {
        Self(raw)
    }

    /// Raw value as received
    pub fn raw(&self) -> &Value {
        &self.0
    }

    /// Integer interpretation of the timestamp
    ///
    /// Integers and integer strings (optionally signed, surrounding
    /// whitespace allowed) parse. JSON floats truncate toward zero. Anything
    /// else, including fractional strings, has no numeric value.
    pub fn numeric(&self) -> Option<Timestamp> {
        match &self.0 {
            Value::Number(n) => n.as_i64().or_else(|| {
                n.as_f64()
                    .filter(|f| f.is_finite())
                    .map(|f| f.trunc() as Timestamp)
            }),
            Value::String(s) => s.trim().parse::<Timestamp>().ok(),
            _ => None,
        }
    }

    /// Key used to group readings that share a timestamp
    ///
    /// `"100"` and `100` land in the same group; non-numeric timestamps group
    /// by their literal text.
    pub fn grouping_key(&self) -> String {
        match self.numeric() {
            Some(ts) => ts.to_string(),
            None => self.to_string(),
        }
    }
}

impl fmt::Display for ReadingTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Value::String(s) => f.write_str(s),
            other => write!(f, "{}", other),
        }
    }
}

impl Serialize for ReadingTimestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl From<Timestamp> for ReadingTimestamp {
    fn from(ts: Timestamp) -> Self {
        Self(Value::from(ts))
    }
}

impl From<&str> for ReadingTimestamp {
    fn from(ts: &str) -> Self {
        Self(Value::from(ts))
    }
}
