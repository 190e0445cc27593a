//! Write batch buffered by a sender between flushes

use rustc_hash::FxHashSet;

use super::point::{Point, Tags};
use crate::utils::time::TimeUnit;

/// Points collected during one report cycle plus their write parameters
#[derive(Debug, Clone)]
pub struct WriteBatch {
    database: String,
    precision: TimeUnit,
    tags: Tags,
    points: FxHashSet<Point>,
}

impl WriteBatch {
    pub fn new(database: impl Into<String>, precision: TimeUnit) -> Self {
        Self {
            database: database.into(),
            precision,
            tags: Tags::new(),
            points: FxHashSet::default(),
        }
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn precision(&self) -> TimeUnit {
        self.precision
    }

    /// Global tags merged into every point at render time
    pub fn tags(&self) -> &Tags {
        &self.tags
    }

    pub fn set_tags(&mut self, tags: Tags) {
        self.tags = tags;
    }

    pub fn points(&self) -> impl Iterator<Item = &Point> {
        self.points.iter()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Drop every buffered point
    pub fn flush(&mut self) {
        self.points = FxHashSet::default();
    }

    /// Add a point; returns false when an identical point is already buffered
    pub fn append_point(&mut self, point: Point) -> bool {
        self.points.insert(point)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::point::Fields;

    fn point(value: i64) -> Point {
        Point::new("requests", Fields::from([("count".to_string(), value.into())]))
            .with_timestamp(60_000)
    }

    #[test]
    fn test_identical_points_collapse() {
        let mut batch = WriteBatch::new("metrics", TimeUnit::Minutes);
        assert!(batch.append_point(point(1)));
        assert!(!batch.append_point(point(1)));
        assert!(batch.append_point(point(2)));
        assert_eq!(batch.len(), 2);
    }

    #[test]
    fn test_flush_empties_batch() {
        let mut batch = WriteBatch::new("metrics", TimeUnit::Minutes);
        batch.append_point(point(1));
        assert!(!batch.is_empty());
        batch.flush();
        assert!(batch.is_empty());
        assert_eq!(batch.points().count(), 0);
    }

    #[test]
    fn test_write_parameters() {
        let mut batch = WriteBatch::new("metrics", TimeUnit::Seconds);
        batch.set_tags(Tags::from([("env".to_string(), "prod".to_string())]));
        assert_eq!(batch.database(), "metrics");
        assert_eq!(batch.precision(), TimeUnit::Seconds);
        assert_eq!(batch.tags().get("env").map(String::as_str), Some("prod"));
    }
}
