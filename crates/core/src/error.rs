//! Error types for metadata loading and grammar matcher construction.
//!
//! Vocabulary resolution itself never fails; only the collaborators on
//! either side of it (fetching the metadata blobs, building the grammar
//! engine) report errors.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while fetching or parsing tokenizer metadata.
#[derive(Error, Debug)]
pub enum LoadError {
    /// Reading a metadata file from disk failed.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A metadata file was present but is not valid JSON.
    #[error("invalid JSON in {file}: {source}")]
    Json {
        file: String,
        #[source]
        source: serde_json::Error,
    },

    /// The required `tokenizer.json` could not be found.
    #[error("required metadata file {0} not found")]
    MissingFile(String),

    /// The model hub rejected or failed a request.
    #[error("model hub error: {0}")]
    Hub(String),

    /// The blocking load task panicked or was cancelled.
    #[error("metadata load task failed: {0}")]
    TaskJoin(String),
}

/// Errors raised while constructing a grammar matcher.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GrammarError {
    /// The grammar specification was rejected by the backend.
    #[error("invalid grammar: {0}")]
    InvalidGrammar(String),

    /// The grammar engine failed for a reason of its own.
    #[error("grammar backend error: {0}")]
    Backend(String),
}

/// Errors from building a logit processor straight from a model source.
#[derive(Error, Debug)]
pub enum FactoryError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Grammar(#[from] GrammarError),
}

pub type Result<T> = std::result::Result<T, LoadError>;
