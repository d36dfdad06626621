use std::path::Path;

use serde::Deserialize;

use crate::error::LeadgenResult;

/// Root application configuration. Loaded from an optional TOML file and
/// then environment variables with the prefix `LEADGEN__`.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_node_id")]
    pub node_id: String,
    #[serde(default)]
    pub log_format: LogFormat,
    #[serde(default)]
    pub segmentation: SegmentationConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Text,
}

/// Group nesting accepted when no limit is configured.
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// Settings for the ruleset compiler.
#[derive(Debug, Clone, Deserialize)]
pub struct SegmentationConfig {
    /// Deepest group nesting accepted before compilation is refused.
    ///
    /// Rulesets read from JSON text are also bound by serde_json's recursion
    /// limit of 128, which allows about 63 nested groups; values above that
    /// surface as JSON errors for text input.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    /// Name of the customer-to-interaction relation in the search index.
    #[serde(default = "default_relation")]
    pub relation: String,
    /// Interaction field targeted by relative date ranges.
    #[serde(default = "default_timestamp_field")]
    pub timestamp_field: String,
}

// Default functions
fn default_node_id() -> String {
    "node-01".to_string()
}
fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}
fn default_relation() -> String {
    "interactions".to_string()
}
fn default_timestamp_field() -> String {
    "created_at".to_string()
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            relation: default_relation(),
            timestamp_field: default_timestamp_field(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            node_id: default_node_id(),
            log_format: LogFormat::default(),
            segmentation: SegmentationConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables and optional config file.
    pub fn load(path: Option<&Path>) -> LeadgenResult<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        let config = builder
            .add_source(
                config::Environment::with_prefix("LEADGEN")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        Ok(config.try_deserialize()?)
    }

    /// Parse configuration from TOML text, without consulting the environment.
    pub fn from_toml(text: &str) -> LeadgenResult<Self> {
        let config = config::Config::builder()
            .add_source(config::File::from_str(text, config::FileFormat::Toml))
            .build()?;
        Ok(config.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.segmentation.max_depth, 32);
        assert_eq!(config.segmentation.relation, "interactions");
        assert_eq!(config.segmentation.timestamp_field, "created_at");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = AppConfig::from_toml(
            r#"
            log_format = "text"

            [segmentation]
            max_depth = 4
            "#,
        )
        .unwrap();
        assert_eq!(config.node_id, "node-01");
        assert_eq!(config.log_format, LogFormat::Text);
        assert_eq!(config.segmentation.max_depth, 4);
        assert_eq!(config.segmentation.relation, "interactions");
    }

    #[test]
    fn test_invalid_log_format_is_rejected() {
        assert!(AppConfig::from_toml(r#"log_format = "xml""#).is_err());
    }
}
