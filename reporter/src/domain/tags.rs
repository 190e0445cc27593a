//! Tag transformers
//!
//! A transformer turns a fully qualified metric name into the tag set attached
//! to its points. Selection is a closed set of strategies plus an escape hatch
//! for embedding applications.

use std::fmt;
use std::sync::{Arc, LazyLock};

use regex::Regex;

use super::error::ConfigError;
use crate::data::point::Tags;

/// Tag carrying the raw metric name
pub const METRIC_NAME_TAG: &str = "metricName";

static PACKAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(.*)\.[A-Z].*").expect("valid package pattern"));
static CLASS_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r".*\.([A-Z][^.]*).*").expect("valid class pattern"));
static METHOD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r".*\.[A-Z][^.]*\.(.*)").expect("valid method pattern"));

/// User-supplied tag extraction
pub trait Transformer: Send + Sync {
    fn tags(&self, metric_name: &str) -> Tags;
}

/// Strategy used to derive tags from a metric name
#[derive(Clone, Default)]
pub enum TagTransformer {
    /// `{metricName: name}`
    #[default]
    Noop,
    /// `metricName` plus `package`, `className` and `method` when present
    ClassBased,
    /// Named categories picking one dot-separated segment
    PositionBased(PositionBasedTransformer),
    Custom(Arc<dyn Transformer>),
}

impl TagTransformer {
    pub fn tags(&self, metric_name: &str) -> Tags {
        match self {
            TagTransformer::Noop => {
                Tags::from([(METRIC_NAME_TAG.to_string(), metric_name.to_string())])
            }
            TagTransformer::ClassBased => class_based_tags(metric_name),
            TagTransformer::PositionBased(transformer) => transformer.tags(metric_name),
            TagTransformer::Custom(transformer) => transformer.tags(metric_name),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            TagTransformer::Noop => "noop",
            TagTransformer::ClassBased => "class_based",
            TagTransformer::PositionBased(_) => "position_based",
            TagTransformer::Custom(_) => "custom",
        }
    }
}

impl fmt::Debug for TagTransformer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagTransformer::PositionBased(t) => f.debug_tuple("PositionBased").field(t).finish(),
            other => f.write_str(other.name()),
        }
    }
}

fn class_based_tags(metric_name: &str) -> Tags {
    let mut tags = Tags::from([(METRIC_NAME_TAG.to_string(), metric_name.to_string())]);
    let captures = [
        ("package", &*PACKAGE),
        ("className", &*CLASS_NAME),
        ("method", &*METHOD),
    ];
    for (tag, pattern) in captures {
        if let Some(m) = pattern.captures(metric_name).and_then(|c| c.get(1)) {
            tags.insert(tag.to_string(), m.as_str().to_string());
        }
    }
    tags
}

/// Segment selector for [`PositionBasedTransformer`]
#[derive(Debug, Clone)]
pub struct Category {
    position: usize,
    pattern: Regex,
}

impl Category {
    /// `pattern` must match the whole metric name for the category to apply
    pub fn new(name: &str, position: i64, pattern: &str) -> Result<Self, ConfigError> {
        let position = usize::try_from(position).map_err(|_| ConfigError::InvalidPosition {
            name: name.to_string(),
            position,
        })?;
        let pattern = Regex::new(&format!("^(?:{pattern})$"))
            .map_err(|e| ConfigError::invalid_pattern(name, pattern, e))?;
        Ok(Self { position, pattern })
    }

    pub fn position(&self) -> usize {
        self.position
    }
}

#[derive(Debug, Clone, Default)]
pub struct PositionBasedTransformer {
    categories: Vec<(String, Category)>,
}

impl PositionBasedTransformer {
    pub fn new(categories: impl IntoIterator<Item = (String, Category)>) -> Self {
        Self {
            categories: categories.into_iter().collect(),
        }
    }

    pub fn tags(&self, metric_name: &str) -> Tags {
        let mut parts: Vec<&str> = metric_name.split('.').collect();
        while parts.last().is_some_and(|p| p.is_empty()) {
            parts.pop();
        }

        self.categories
            .iter()
            .filter(|(_, category)| category.position < parts.len())
            .filter(|(_, category)| category.pattern.is_match(metric_name))
            .map(|(tag, category)| (tag.clone(), parts[category.position].to_string()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noop_tags_metric_name() {
        let tags = TagTransformer::Noop.tags("jvm.threads.count");
        assert_eq!(tags.len(), 1);
        assert_eq!(tags.get("metricName").unwrap(), "jvm.threads.count");
    }

    #[test]
    fn test_class_based_full_name() {
        let tags = TagTransformer::ClassBased
            .tags("com.example.metrics.tags.ClassBasedTransformer.count");
        assert_eq!(tags.get("package").unwrap(), "com.example.metrics.tags");
        assert_eq!(tags.get("className").unwrap(), "ClassBasedTransformer");
        assert_eq!(tags.get("method").unwrap(), "count");
        assert_eq!(
            tags.get("metricName").unwrap(),
            "com.example.metrics.tags.ClassBasedTransformer.count"
        );
    }

    #[test]
    fn test_class_based_without_method() {
        let tags = TagTransformer::ClassBased.tags("com.example.Resource");
        assert_eq!(tags.get("package").unwrap(), "com.example");
        assert_eq!(tags.get("className").unwrap(), "Resource");
        assert!(!tags.contains_key("method"));
    }

    #[test]
    fn test_class_based_without_class() {
        let tags = TagTransformer::ClassBased.tags("metric.without.class");
        assert_eq!(tags.len(), 1);
        assert_eq!(tags.get("metricName").unwrap(), "metric.without.class");
    }

    fn position_transformer() -> PositionBasedTransformer {
        PositionBasedTransformer::new([
            (
                "className".to_string(),
                Category::new("className", 5, r"com\.example\.metrics\.influx\.tags\..*").unwrap(),
            ),
            (
                "function".to_string(),
                Category::new("function", 6, r"com\.example\.metrics\.influx\.tags\..*").unwrap(),
            ),
        ])
    }

    #[test]
    fn test_position_based_extracts_segments() {
        let transformer = TagTransformer::PositionBased(position_transformer());
        let tags = transformer.tags("com.example.metrics.influx.tags.PositionBased.count");
        assert_eq!(tags.get("className").unwrap(), "PositionBased");
        assert_eq!(tags.get("function").unwrap(), "count");
        assert!(!tags.contains_key("metricName"));
    }

    #[test]
    fn test_position_based_requires_full_match() {
        let tags = position_transformer().tags("org.example.metrics.influx.tags.Other.count");
        assert!(tags.is_empty());
    }

    #[test]
    fn test_position_out_of_bounds_ignored() {
        let transformer = PositionBasedTransformer::new([(
            "incorrectTag".to_string(),
            Category::new("incorrectTag", 42, ".*").unwrap(),
        )]);
        assert!(transformer.tags("a.b.c").is_empty());
    }

    #[test]
    fn test_category_rejects_negative_position() {
        let err = Category::new("tag", -1, ".*").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPosition { position: -1, .. }));
    }

    #[test]
    fn test_category_rejects_bad_regex() {
        let err = Category::new("tag", 1, r"[[a-z,\.']").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPattern { .. }));
    }

    struct Fixed;

    impl Transformer for Fixed {
        fn tags(&self, metric_name: &str) -> Tags {
            Tags::from([("name_len".to_string(), metric_name.len().to_string())])
        }
    }

    #[test]
    fn test_custom_transformer() {
        let transformer = TagTransformer::Custom(Arc::new(Fixed));
        assert_eq!(transformer.tags("abc").get("name_len").unwrap(), "3");
        assert_eq!(format!("{transformer:?}"), "custom");
    }
}
