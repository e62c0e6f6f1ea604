//! Dense id → token-string table.
//!
//! Built once per resolution and shared read-only afterwards. Slots with
//! no known text hold the empty string.

use serde::Serialize;

use crate::metadata::AddedToken;

/// Index-addressable vocabulary: `tokens[id]` is the text of token `id`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct VocabTable {
    tokens: Vec<String>,
}

impl VocabTable {
    /// Build the table from a resolved size, base vocabulary and added tokens.
    ///
    /// Base entries at or beyond `vocab_size` are dropped; when two base
    /// entries share an id the later one in `vocab` wins. Added tokens are
    /// applied afterwards, in order, growing the table as needed so they are
    /// never dropped and can override base entries at the same id.
    pub fn build(vocab_size: usize, vocab: &[(&str, u32)], added: &[AddedToken<'_>]) -> Self {
        let mut tokens = vec![String::new(); vocab_size];

        let mut dropped = 0usize;
        for &(token, id) in vocab {
            match tokens.get_mut(id as usize) {
                Some(slot) => *slot = token.to_string(),
                None => dropped += 1,
            }
        }
        if dropped > 0 {
            tracing::debug!(
                dropped,
                vocab_size,
                "dropped base vocabulary entries beyond resolved size"
            );
        }

        for token in added {
            let Some(content) = token.content else {
                continue;
            };
            let index = token.id as usize;
            if index >= tokens.len() {
                tokens.resize(index + 1, String::new());
            }
            tokens[index] = content.to_string();
        }

        if tokens.len() > vocab_size {
            tracing::debug!(
                vocab_size,
                table_len = tokens.len(),
                "added tokens grew vocabulary table"
            );
        }

        Self { tokens }
    }

    /// Text for a token id; empty for unknown or out-of-range ids.
    #[inline]
    pub fn token(&self, token_id: u32) -> &str {
        self.tokens
            .get(token_id as usize)
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Number of slots, gaps included.
    #[inline]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Slot texts indexed by token id.
    pub fn as_slice(&self) -> &[String] {
        &self.tokens
    }

    /// Iterate over all `(token_id, text)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> {
        self.tokens
            .iter()
            .enumerate()
            .map(|(id, token)| (id as u32, token.as_str()))
    }

    /// Take the underlying `Vec`.
    pub fn into_inner(self) -> Vec<String> {
        self.tokens
    }
}

impl From<Vec<String>> for VocabTable {
    fn from(tokens: Vec<String>) -> Self {
        Self { tokens }
    }
}
