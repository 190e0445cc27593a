//! Time-series point model

use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

/// Tag set attached to a point (key-ordered)
pub type Tags = BTreeMap<String, String>;

/// Field set attached to a point (key-ordered)
pub type Fields = BTreeMap<String, FieldValue>;

/// Typed value of a single field
#[derive(Debug, Clone)]
pub enum FieldValue {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
}

impl FieldValue {
    /// False only for NaN and infinite floats
    pub fn is_finite(&self) -> bool {
        match self {
            FieldValue::Float(v) => v.is_finite(),
            _ => true,
        }
    }

    /// Keep the value unless it is a non-finite float
    pub fn sanitized(self) -> Option<Self> {
        self.is_finite().then_some(self)
    }
}

// Floats compare by bit pattern so points can live in a hash set.
impl PartialEq for FieldValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (FieldValue::String(a), FieldValue::String(b)) => a == b,
            (FieldValue::Integer(a), FieldValue::Integer(b)) => a == b,
            (FieldValue::Float(a), FieldValue::Float(b)) => a.to_bits() == b.to_bits(),
            (FieldValue::Boolean(a), FieldValue::Boolean(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for FieldValue {}

impl Hash for FieldValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            FieldValue::String(v) => v.hash(state),
            FieldValue::Integer(v) => v.hash(state),
            FieldValue::Float(v) => v.to_bits().hash(state),
            FieldValue::Boolean(v) => v.hash(state),
        }
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Integer(v)
    }
}

impl From<i32> for FieldValue {
    fn from(v: i32) -> Self {
        FieldValue::Integer(v.into())
    }
}

impl From<u32> for FieldValue {
    fn from(v: u32) -> Self {
        FieldValue::Integer(v.into())
    }
}

impl From<u64> for FieldValue {
    fn from(v: u64) -> Self {
        FieldValue::Integer(i64::try_from(v).unwrap_or(i64::MAX))
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Float(v)
    }
}

impl From<f32> for FieldValue {
    fn from(v: f32) -> Self {
        FieldValue::Float(v.into())
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Boolean(v)
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::String(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::String(v.to_string())
    }
}

/// One timestamped observation.
///
/// A missing timestamp means "now" at serialization time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Point {
    measurement: String,
    tags: Tags,
    fields: Fields,
    timestamp: Option<i64>,
}

impl Point {
    pub fn new(measurement: impl Into<String>, fields: Fields) -> Self {
        Self {
            measurement: measurement.into(),
            tags: Tags::new(),
            fields,
            timestamp: None,
        }
    }

    pub fn with_tags(mut self, tags: Tags) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Set the timestamp in epoch milliseconds
    pub fn with_timestamp(mut self, millis: i64) -> Self {
        self.timestamp = Some(millis);
        self
    }

    pub fn measurement(&self) -> &str {
        &self.measurement
    }

    pub fn tags(&self) -> &Tags {
        &self.tags
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    pub fn timestamp(&self) -> Option<i64> {
        self.timestamp
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_float_equality_by_bits() {
        assert_eq!(FieldValue::Float(f64::NAN), FieldValue::Float(f64::NAN));
        assert_ne!(FieldValue::Float(0.0), FieldValue::Float(-0.0));
        assert_ne!(FieldValue::Integer(1), FieldValue::Float(1.0));
    }

    #[test]
    fn test_is_finite() {
        assert!(FieldValue::Float(1.5).is_finite());
        assert!(!FieldValue::Float(f64::NAN).is_finite());
        assert!(!FieldValue::Float(f64::NEG_INFINITY).is_finite());
        assert!(FieldValue::String("NaN".into()).is_finite());
        assert!(FieldValue::Float(f64::INFINITY).sanitized().is_none());
        assert_eq!(FieldValue::from(7).sanitized(), Some(FieldValue::Integer(7)));
    }

    #[test]
    fn test_equal_points_hash_together() {
        let make = || {
            Point::new("cpu", Fields::from([("value".to_string(), 1.0.into())]))
                .with_tag("host", "a")
                .with_timestamp(1_000)
        };
        let mut set = HashSet::new();
        assert!(set.insert(make()));
        assert!(!set.insert(make()));
        assert!(set.insert(make().with_timestamp(2_000)));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_u64_saturates() {
        assert_eq!(FieldValue::from(u64::MAX), FieldValue::Integer(i64::MAX));
    }
}
