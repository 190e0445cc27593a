//! Idle-metric tracking across report cycles

use rustc_hash::FxHashMap;

/// Last reported count per metric name
#[derive(Debug, Default)]
pub struct IdleTracker {
    previous: FxHashMap<String, i64>,
}

impl IdleTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Change since the last reported count, `None` on first sight.
    ///
    /// A decreasing count is logged and treated as no change.
    pub fn delta(&self, name: &str, count: i64) -> Option<i64> {
        let previous = *self.previous.get(name)?;
        if count < previous {
            tracing::warn!(
                metric = name,
                previous,
                count,
                "Saw a non-monotonically increasing value for metric"
            );
            return Some(0);
        }
        Some(count - previous)
    }

    /// True when the metric has not moved since it was last reported.
    ///
    /// The stored count only advances when the metric is not idle.
    pub fn is_idle(&mut self, name: &str, count: i64) -> bool {
        let idle = self.delta(name, count) == Some(0);
        if !idle {
            self.previous.insert(name.to_string(), count);
        }
        idle
    }

    pub fn len(&self) -> usize {
        self.previous.len()
    }

    pub fn is_empty(&self) -> bool {
        self.previous.is_empty()
    }
}
