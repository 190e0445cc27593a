//! Measurement naming
//!
//! Metric names map to measurements through an ordered list of whole-name
//! patterns. The first pattern that matches wins; unmatched names are used as
//! is, optionally with their package segments abbreviated.

use std::sync::LazyLock;

use regex::Regex;

use super::error::ConfigError;
use crate::core::constants::DEFAULT_MEASUREMENT_MAPPINGS;

static LOWERCASE_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[a-z][A-Za-z0-9_]+").expect("valid word pattern"));

/// Ordered `(measurement, pattern)` table
#[derive(Debug, Clone, Default)]
pub struct MeasurementMappings {
    entries: Vec<(String, Regex)>,
}

impl MeasurementMappings {
    /// Compile `(measurement, pattern)` pairs, keeping their order
    pub fn compile<I, K, V>(entries: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let entries = entries
            .into_iter()
            .map(|(name, pattern)| {
                let (name, pattern) = (name.as_ref(), pattern.as_ref());
                Regex::new(&format!("^(?:{pattern})$"))
                    .map(|regex| (name.to_string(), regex))
                    .map_err(|e| ConfigError::invalid_pattern(name, pattern, e))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { entries })
    }

    /// The built-in table
    pub fn defaults() -> Result<Self, ConfigError> {
        Self::compile(DEFAULT_MEASUREMENT_MAPPINGS.iter().copied())
    }

    /// Measurement for `metric_name`, if any pattern matches the whole name
    pub fn resolve(&self, metric_name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, pattern)| pattern.is_match(metric_name))
            .map(|(name, _)| name.as_str())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Apply overrides to a base table.
///
/// An empty pattern removes the entry, a non-empty one replaces it in place,
/// and unknown names are appended in override order.
pub fn merge_mappings(
    base: &[(String, String)],
    overrides: &[(String, String)],
) -> Vec<(String, String)> {
    let mut merged = base.to_vec();
    for (name, pattern) in overrides {
        let existing = merged.iter().position(|(n, _)| n == name);
        match (existing, pattern.is_empty()) {
            (Some(idx), true) => {
                merged.remove(idx);
            }
            (Some(idx), false) => merged[idx].1 = pattern.clone(),
            (None, true) => {}
            (None, false) => merged.push((name.clone(), pattern.clone())),
        }
    }
    merged
}

/// Shorten every lowercase word that precedes a capitalised segment to its
/// first letter: `com.example.Foo.bar` becomes `c.e.Foo.bar`.
pub fn abbreviate_package(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut last = 0;
    for word in LOWERCASE_WORD.find_iter(name) {
        if !has_class_segment(&name[word.end()..]) {
            continue;
        }
        out.push_str(&name[last..word.start() + 1]);
        last = word.end();
    }
    out.push_str(&name[last..]);
    out
}

fn has_class_segment(rest: &str) -> bool {
    rest.as_bytes()
        .windows(2)
        .any(|w| w[0] == b'.' && w[1].is_ascii_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(entries: &[(&str, &str)]) -> Vec<(String, String)> {
        entries
            .iter()
            .map(|(a, b)| (a.to_string(), b.to_string()))
            .collect()
    }

    #[test]
    fn test_default_table_resolves() {
        let mappings = MeasurementMappings::defaults().unwrap();
        assert_eq!(mappings.len(), 12);
        assert_eq!(
            mappings.resolve("com.example.resources.UserResource.get"),
            Some("resources")
        );
        assert_eq!(mappings.resolve("com.example.app.health.db"), Some("health"));
        assert_eq!(
            mappings.resolve("org.eclipse.jetty.server.HttpConnectionFactory.8080.connections"),
            Some("connections")
        );
        assert_eq!(mappings.resolve("jvm.memory.heap.used"), None);
    }

    #[test]
    fn test_patterns_match_whole_name() {
        let mappings = MeasurementMappings::compile([("raw_sql", r"org\.skife\.jdbi\.v2\.DBI\.raw-sql")])
            .unwrap();
        assert_eq!(mappings.resolve("org.skife.jdbi.v2.DBI.raw-sql"), Some("raw_sql"));
        assert_eq!(mappings.resolve("org.skife.jdbi.v2.DBI.raw-sql.count"), None);
    }

    #[test]
    fn test_first_match_wins() {
        let mappings =
            MeasurementMappings::compile([("first", r".*\.auth.*"), ("second", r".*")]).unwrap();
        assert_eq!(mappings.resolve("app.auth.login"), Some("first"));
        assert_eq!(mappings.resolve("app.other"), Some("second"));
    }

    #[test]
    fn test_bad_pattern_rejected() {
        let err = MeasurementMappings::compile([("bad", "(")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPattern { .. }));
    }

    #[test]
    fn test_merge_removes_replaces_and_appends() {
        let base = pairs(&[("health", "h.*"), ("auth", "a.*"), ("dao", "d.*")]);
        let overrides = pairs(&[("auth", ""), ("health", "x.*"), ("queues", "q.*"), ("nope", "")]);
        let merged = merge_mappings(&base, &overrides);
        assert_eq!(
            merged,
            pairs(&[("health", "x.*"), ("dao", "d.*"), ("queues", "q.*")])
        );
    }

    #[test]
    fn test_abbreviate_package() {
        assert_eq!(
            abbreviate_package("com.example.project.server.resources.TestResource.fooBar"),
            "c.e.p.s.r.TestResource.fooBar"
        );
        assert_eq!(abbreviate_package("jvm.threads.used"), "jvm.threads.used");
        assert_eq!(
            abbreviate_package("jvm.memory.pools.Compressed-Class-Space.committed"),
            "j.m.p.Compressed-Class-Space.committed"
        );
        assert_eq!(
            abbreviate_package("org.eclipse.jetty.server.HttpConnectionFactory.8081.connections"),
            "o.e.j.s.HttpConnectionFactory.8081.connections"
        );
        assert_eq!(abbreviate_package("TestClass.foo"), "TestClass.foo");
    }
}
