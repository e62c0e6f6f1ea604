//! Seam to the grammar-matching engine.
//!
//! The engine itself lives behind [`GrammarBackend`]: it receives the
//! resolved vocabulary and a caller-supplied [`Grammar`], and returns a
//! [`GrammarMatcher`] that fills per-step token masks. Construction errors
//! are passed through to the caller untouched.

pub mod bitmask;
pub mod processor;

pub use bitmask::TokenBitmask;
pub use processor::GrammarMaskedLogitProcessor;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::GrammarError;
use crate::resolve::ResolvedVocabulary;

/// A grammar specification, forwarded to the backend unmodified.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Grammar {
    /// EBNF / GBNF grammar source.
    Ebnf(String),
    Regex(String),
    /// JSON Schema document as text.
    JsonSchema(String),
}

impl Grammar {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Ebnf(_) => "ebnf",
            Self::Regex(_) => "regex",
            Self::JsonSchema(_) => "json_schema",
        }
    }

    pub fn source(&self) -> &str {
        match self {
            Self::Ebnf(s) | Self::Regex(s) | Self::JsonSchema(s) => s,
        }
    }
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({} bytes)", self.kind(), self.source().len())
    }
}

/// Stateful matcher produced by a grammar engine for one generation.
pub trait GrammarMatcher: Send {
    /// Advance the grammar by one sampled token.
    ///
    /// Returns `false` if the token is not a valid continuation.
    fn accept_token(&mut self, token_id: u32) -> bool;

    /// Mark every token allowed in the current state. The mask arrives
    /// cleared.
    fn fill_next_token_bitmask(&self, mask: &mut TokenBitmask);

    /// Undo the last `num_tokens` accepted tokens.
    fn rollback(&mut self, num_tokens: usize);

    /// Whether the grammar has reached an accepting end state.
    fn is_terminated(&self) -> bool;

    fn reset(&mut self);
}

/// Grammar engine that compiles matchers against a resolved vocabulary.
pub trait GrammarBackend: Send + Sync {
    fn build_matcher(
        &self,
        vocabulary: Arc<ResolvedVocabulary>,
        grammar: &Grammar,
    ) -> Result<Box<dyn GrammarMatcher>, GrammarError>;
}
