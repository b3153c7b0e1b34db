//! Engine configuration, read from an optional JSON file.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

fn default_true() -> bool { true }
fn default_order_no_step() -> u32 { 10 }
fn default_log_level() -> String { "warn".to_string() }

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CoreConfig {
    /// Step between order numbers when fields are saved as a new version.
    #[serde(default = "default_order_no_step")]
    pub order_no_step: u32,
    /// Reject malformed field schemas when saving a new version.
    #[serde(default = "default_true")]
    pub validate_field_schemas: bool,
    /// Fallback filter when `SCALESHEET_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            order_no_step: default_order_no_step(),
            validate_field_schemas: true,
            log_level: default_log_level(),
        }
    }
}

impl CoreConfig {
    /// Missing file means defaults; a present but malformed file is an error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"orderNoStep": 1}"#).unwrap();

        let config = CoreConfig::load(&path).unwrap();
        assert_eq!(config.order_no_step, 1);
        assert!(config.validate_field_schemas);
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = CoreConfig::load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config, CoreConfig::default());
    }

    #[test]
    fn test_malformed_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{not json").unwrap();
        assert!(CoreConfig::load(&path).is_err());
    }
}
