//! Fetching the tokenizer metadata blobs for a model.
//!
//! A model is addressed by HuggingFace Hub id (downloaded through the local
//! hub cache) or by a local directory. `tokenizer.json` is required;
//! `config.json` and `tokenizer_config.json` are read when present.

use std::fmt;
use std::path::{Path, PathBuf};

use hf_hub::{api::sync::Api, Repo, RepoType};
use serde_json::Value;

use crate::error::{LoadError, Result};
use crate::metadata::TokenizerMetadata;

pub const MODEL_CONFIG_FILE: &str = "config.json";
pub const TOKENIZER_CONFIG_FILE: &str = "tokenizer_config.json";
pub const TOKENIZER_FILE: &str = "tokenizer.json";

/// Where a model's files come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelSource {
    Hub {
        id: String,
        revision: Option<String>,
    },
    Directory(PathBuf),
}

impl ModelSource {
    /// Hub model at the default revision.
    pub fn hub(id: impl Into<String>) -> Self {
        Self::Hub {
            id: id.into(),
            revision: None,
        }
    }

    /// Hub model pinned to a branch, tag or commit.
    pub fn hub_revision(id: impl Into<String>, revision: impl Into<String>) -> Self {
        Self::Hub {
            id: id.into(),
            revision: Some(revision.into()),
        }
    }
}

impl fmt::Display for ModelSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hub { id, revision: None } => write!(f, "{id}"),
            Self::Hub {
                id,
                revision: Some(rev),
            } => write!(f, "{id}@{rev}"),
            Self::Directory(dir) => write!(f, "{}", dir.display()),
        }
    }
}

/// A model plus caller-supplied end-of-sequence strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelConfiguration {
    pub source: ModelSource,
    /// Appended to the model configuration's `extra_eos_tokens`.
    pub extra_eos_tokens: Vec<String>,
}

impl ModelConfiguration {
    pub fn new(source: ModelSource) -> Self {
        Self {
            source,
            extra_eos_tokens: Vec::new(),
        }
    }

    pub fn with_extra_eos_tokens(mut self, tokens: Vec<String>) -> Self {
        self.extra_eos_tokens = tokens;
        self
    }
}

/// Load the metadata blobs for a model, blocking on any downloads.
pub fn load_metadata(configuration: &ModelConfiguration) -> Result<TokenizerMetadata> {
    let metadata = match &configuration.source {
        ModelSource::Hub { id, revision } => fetch_from_hub(id, revision.as_deref())?,
        ModelSource::Directory(dir) => load_from_dir(dir)?,
    };
    tracing::debug!(source = %configuration.source, "loaded tokenizer metadata");
    Ok(metadata.with_extra_eos_tokens(configuration.extra_eos_tokens.iter().cloned()))
}

/// Async wrapper around [`load_metadata`] that runs on a blocking thread.
pub async fn load_metadata_async(configuration: ModelConfiguration) -> Result<TokenizerMetadata> {
    tokio::task::spawn_blocking(move || load_metadata(&configuration))
        .await
        .map_err(|e| LoadError::TaskJoin(e.to_string()))?
}

/// Read the metadata files from a local model directory.
pub fn load_from_dir(dir: &Path) -> Result<TokenizerMetadata> {
    let tokenizer_path = dir.join(TOKENIZER_FILE);
    if !tokenizer_path.is_file() {
        return Err(LoadError::MissingFile(tokenizer_path.display().to_string()));
    }

    Ok(TokenizerMetadata::new(
        read_optional_json(&dir.join(MODEL_CONFIG_FILE))?,
        read_optional_json(&dir.join(TOKENIZER_CONFIG_FILE))?,
        read_json(&tokenizer_path)?,
    ))
}

fn fetch_from_hub(id: &str, revision: Option<&str>) -> Result<TokenizerMetadata> {
    let api = Api::new().map_err(|e| LoadError::Hub(e.to_string()))?;
    let repo = match revision {
        Some(rev) => Repo::with_revision(id.to_string(), RepoType::Model, rev.to_string()),
        None => Repo::new(id.to_string(), RepoType::Model),
    };
    let repo = api.repo(repo);

    let tokenizer_path = repo
        .get(TOKENIZER_FILE)
        .map_err(|e| LoadError::Hub(format!("{id}/{TOKENIZER_FILE}: {e}")))?;
    let model_config_path = repo.get(MODEL_CONFIG_FILE).ok();
    let tokenizer_config_path = repo.get(TOKENIZER_CONFIG_FILE).ok();

    Ok(TokenizerMetadata::new(
        model_config_path.as_deref().map(read_json).transpose()?,
        tokenizer_config_path.as_deref().map(read_json).transpose()?,
        read_json(&tokenizer_path)?,
    ))
}

fn read_json(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| LoadError::Json {
        file: path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string()),
        source,
    })
}

fn read_optional_json(path: &Path) -> Result<Option<Value>> {
    if path.is_file() {
        read_json(path).map(Some)
    } else {
        Ok(None)
    }
}
