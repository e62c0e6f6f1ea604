//! Persistent configuration for the command-line tool.
//!
//! Configuration is loaded with the following priority:
//! 1. CLI arguments (highest priority)
//! 2. Config file (~/.config/grammar-vocab/config.toml)
//! 3. Default values (lowest priority)

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Persistent configuration stored in TOML format.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CliConfig {
    /// Model identifier (HuggingFace Hub format).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// HuggingFace model revision.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,

    /// Local model directory; takes precedence over `model`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_dir: Option<PathBuf>,

    /// End-of-sequence strings added to every resolution.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra_eos_tokens: Vec<String>,

    /// Include the full vocabulary table in the report.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emit_vocab: Option<bool>,

    /// Log level filter (e.g. "debug").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
}

impl CliConfig {
    /// Get the default config file path.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("grammar-vocab").join("config.toml"))
    }

    /// Load configuration from the default path, or defaults if unreadable.
    pub fn load() -> Self {
        Self::default_path()
            .and_then(|path| Self::load_from(&path).ok())
            .unwrap_or_default()
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
        toml::from_str(&content).map_err(ConfigError::Parse)
    }

    /// Save configuration to the default path.
    pub fn save(&self) -> Result<PathBuf, ConfigError> {
        let path = Self::default_path().ok_or(ConfigError::NoConfigDir)?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(ConfigError::Io)?;
        }

        let content = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        fs::write(path, content).map_err(ConfigError::Io)?;
        Ok(())
    }

    /// Merge with another config, preferring values from `other`.
    ///
    /// EOS lists are concatenated rather than replaced. A hub model in
    /// `other` without a directory replaces any saved directory and
    /// revision, so it is the model that gets resolved.
    pub fn merge(&mut self, other: &CliConfig) {
        if other.model.is_some() {
            self.model = other.model.clone();
            if other.model_dir.is_none() {
                self.model_dir = None;
                self.revision = None;
            }
        }
        if other.revision.is_some() {
            self.revision = other.revision.clone();
        }
        if other.model_dir.is_some() {
            self.model_dir = other.model_dir.clone();
        }
        for token in &other.extra_eos_tokens {
            if !self.extra_eos_tokens.contains(token) {
                self.extra_eos_tokens.push(token.clone());
            }
        }
        if other.emit_vocab.is_some() {
            self.emit_vocab = other.emit_vocab;
        }
        if other.log_level.is_some() {
            self.log_level = other.log_level.clone();
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(std::io::Error),
    #[error("Parse error: {0}")]
    Parse(toml::de::Error),
    #[error("Serialize error: {0}")]
    Serialize(toml::ser::Error),
    #[error("No config directory available")]
    NoConfigDir,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let config = CliConfig {
            model: Some("Qwen/Qwen3-0.6B".to_string()),
            extra_eos_tokens: vec!["<|endoftext|>".to_string()],
            emit_vocab: Some(true),
            ..Default::default()
        };

        config.save_to(&path).unwrap();
        let loaded = CliConfig::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_merge() {
        let mut base = CliConfig {
            model: Some("base-model".to_string()),
            extra_eos_tokens: vec!["<|end|>".to_string()],
            log_level: Some("info".to_string()),
            ..Default::default()
        };

        let override_config = CliConfig {
            model_dir: Some(PathBuf::from("/models/local")),
            extra_eos_tokens: vec!["<|end|>".to_string(), "<|eot_id|>".to_string()],
            log_level: Some("debug".to_string()),
            ..Default::default()
        };

        base.merge(&override_config);

        assert_eq!(base.model, Some("base-model".to_string()));
        assert_eq!(base.model_dir, Some(PathBuf::from("/models/local")));
        assert_eq!(base.extra_eos_tokens, vec!["<|end|>", "<|eot_id|>"]);
        assert_eq!(base.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_merge_model_replaces_saved_dir() {
        let mut base = CliConfig {
            model_dir: Some(PathBuf::from("/saved/dir")),
            revision: Some("v1".to_string()),
            ..Default::default()
        };

        base.merge(&CliConfig {
            model: Some("Qwen/Qwen3-0.6B".to_string()),
            ..Default::default()
        });

        assert_eq!(base.model, Some("Qwen/Qwen3-0.6B".to_string()));
        assert_eq!(base.model_dir, None);
        assert_eq!(base.revision, None);
    }

    #[test]
    fn test_empty_config_serializes_empty() {
        let content = toml::to_string_pretty(&CliConfig::default()).unwrap();
        assert!(content.trim().is_empty());
    }

    #[test]
    fn test_parse_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "model = [unterminated").unwrap();

        assert!(matches!(
            CliConfig::load_from(&path),
            Err(ConfigError::Parse(_))
        ));
    }
}
