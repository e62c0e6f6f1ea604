//! Shared test utilities for grammar-vocab-core.
//!
//! Metadata fixtures shaped like real tokenizer repositories and a mock
//! grammar backend that records what it was asked to build.

pub mod fixtures;
mod mock_backend;

pub use mock_backend::{MockGrammarBackend, MockMatcher};
