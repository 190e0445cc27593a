//! Build-time configuration errors

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid pattern '{pattern}' for '{name}': {source}")]
    InvalidPattern {
        name: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Invalid position {position} for category '{name}': position must not be negative")]
    InvalidPosition { name: String, position: i64 },

    #[error("Configuration error: {0}")]
    Invalid(String),
}

impl ConfigError {
    pub fn invalid_pattern(name: &str, pattern: &str, source: regex::Error) -> Self {
        Self::InvalidPattern {
            name: name.to_string(),
            pattern: pattern.to_string(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_position_display() {
        let err = ConfigError::InvalidPosition {
            name: "service".to_string(),
            position: -1,
        };
        assert_eq!(
            err.to_string(),
            "Invalid position -1 for category 'service': position must not be negative"
        );
    }

    #[test]
    fn test_invalid_pattern_display() {
        let source = regex::Regex::new("(").unwrap_err();
        let err = ConfigError::invalid_pattern("health", "(", source);
        assert!(err.to_string().starts_with("Invalid pattern '(' for 'health':"));
    }
}
