//! Tokenizer metadata resolution for grammar-constrained decoding.
//!
//! Turns a model's raw tokenizer metadata into the fixed inputs a grammar
//! engine needs: a dense id → text vocabulary table, the decoder's
//! byte-encoding scheme and the set of stop token ids.
//!
//! ```
//! use grammar_vocab_core::{metadata::TokenizerMetadata, resolve::ResolvedVocabulary};
//! use serde_json::json;
//!
//! let metadata = TokenizerMetadata::from_tokenizer_data(json!({
//!     "model": { "vocab": { "x": 0, "y": 1 } },
//!     "added_tokens": [{ "id": 5, "content": "<eos>" }]
//! }));
//! let resolved = ResolvedVocabulary::from_metadata(&metadata);
//! assert_eq!(resolved.vocab.as_slice(), &["x", "y", "", "", "", "<eos>"]);
//! ```

pub mod error;
pub mod grammar;
pub mod loader;
pub mod metadata;
pub mod resolve;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use error::{FactoryError, GrammarError, LoadError};
pub use grammar::{Grammar, GrammarBackend, GrammarMaskedLogitProcessor, GrammarMatcher};
pub use metadata::{MetadataView, TokenizerMetadata};
pub use resolve::{resolve_vocabulary, ResolvedVocabulary, VocabTable, VocabType};
