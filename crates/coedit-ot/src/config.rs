//! Engine configuration.
//!
//! ```toml
//! [transform]
//! priority = "server"
//! ```

use std::path::Path as FsPath;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Which side of a transform keeps its effect when two concurrent
/// operations conflict on the same slot (same insert index, same property,
/// two sets of one node, two moves of one element).
///
/// Every site of a deployment must use the same value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[default]
    Server,
    Client,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformConfig {
    #[serde(default)]
    pub priority: Priority,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub transform: TransformConfig,
}

impl EngineConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    pub fn load(path: impl AsRef<FsPath>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_config_uses_server_priority() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config.transform.priority, Priority::Server);
    }

    #[test]
    fn parses_client_priority() {
        let config = EngineConfig::from_toml_str("[transform]\npriority = \"client\"\n").unwrap();
        assert_eq!(config.transform.priority, Priority::Client);
    }

    #[test]
    fn rejects_unknown_priority() {
        let err = EngineConfig::from_toml_str("[transform]\npriority = \"random\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[transform]").unwrap();
        writeln!(file, "priority = \"client\"").unwrap();
        let config = EngineConfig::load(file.path()).unwrap();
        assert_eq!(config.transform.priority, Priority::Client);
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = EngineConfig::load(dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
