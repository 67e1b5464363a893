//! Engine configuration
//!
//! Every field has a default, so an empty JSON object is a valid
//! configuration file.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Configuration for schema compilation and DTO construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Deepest allowed nesting of constructed instances (default 64)
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Keep compiled schemas between constructions (default true)
    #[serde(default = "default_cache_compiled")]
    pub cache_compiled: bool,
}

fn default_max_depth() -> usize {
    64
}
fn default_cache_compiled() -> bool {
    true
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            cache_compiled: default_cache_compiled(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: EngineConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Config with the compiled-schema cache turned off.
    pub fn uncached() -> Self {
        Self {
            cache_compiled: false,
            ..Self::default()
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_depth == 0 {
            return Err(ConfigError::Invalid("max_depth must be > 0".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.max_depth, 64);
        assert!(config.cache_compiled);
    }

    #[test]
    fn test_empty_json_uses_defaults() {
        let config: EngineConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("engine.json");
        fs::write(&path, r#"{"max_depth": 8, "cache_compiled": false}"#).unwrap();

        let config = EngineConfig::load(&path).unwrap();
        assert_eq!(config.max_depth, 8);
        assert!(!config.cache_compiled);
    }

    #[test]
    fn test_zero_depth_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("engine.json");
        fs::write(&path, r#"{"max_depth": 0}"#).unwrap();

        let result = EngineConfig::load(&path);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        let result = EngineConfig::load(&dir.path().join("nope.json"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
