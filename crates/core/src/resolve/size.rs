//! Authoritative vocabulary length.
//!
//! Configured sizes are tried in priority order (tokenizer config, then
//! model config); the first non-zero one becomes the candidate. The result
//! is never smaller than the size implied by the highest referenced id,
//! and a configured size above [`MAX_VOCAB_SIZE`] is treated as garbage.

use serde::Serialize;

use crate::metadata::{AddedToken, MetadataView};

/// Largest vocabulary size accepted from configuration.
pub const MAX_VOCAB_SIZE: usize = 1_000_000;

/// Where the resolved size came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SizeSource {
    TokenizerConfig,
    ModelConfig,
    Calculated,
}

/// Size inputs gathered from the metadata.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SizeCandidates {
    pub tokenizer_config: Option<usize>,
    pub model_config: Option<usize>,
    /// `1 + max id` over base and added tokens, or 0 if there are none.
    pub calculated: usize,
}

type CandidateFn = fn(&SizeCandidates) -> Option<usize>;

/// Configured sources in precedence order.
const CONFIGURED_SOURCES: [(SizeSource, CandidateFn); 2] = [
    (SizeSource::TokenizerConfig, |c: &SizeCandidates| c.tokenizer_config),
    (SizeSource::ModelConfig, |c: &SizeCandidates| c.model_config),
];

/// The chosen vocabulary length and which input supplied it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedSize {
    pub size: usize,
    pub source: SizeSource,
}

impl SizeCandidates {
    /// Gather every candidate from a metadata view.
    pub fn from_view(view: &MetadataView<'_>) -> Self {
        Self {
            tokenizer_config: view.tokenizer_config_vocab_size(),
            model_config: view.model_config_vocab_size(),
            calculated: calculated_size(&view.vocab_entries(), &view.added_tokens()),
        }
    }

    /// First configured size that is present and non-zero.
    pub fn configured(&self) -> Option<(SizeSource, usize)> {
        CONFIGURED_SOURCES.iter().find_map(|(source, candidate)| {
            candidate(self)
                .filter(|&size| size != 0)
                .map(|size| (*source, size))
        })
    }

    /// Whether the referenced ids alone already exceed [`MAX_VOCAB_SIZE`].
    ///
    /// The calculated size is still honoured in that case; the table will
    /// be allocated at that length.
    pub fn calculated_exceeds_bound(&self) -> bool {
        self.calculated > MAX_VOCAB_SIZE
    }

    /// Pick the authoritative size from the candidates.
    pub fn resolve(&self) -> ResolvedSize {
        if self.calculated_exceeds_bound() {
            tracing::warn!(
                calculated = self.calculated,
                bound = MAX_VOCAB_SIZE,
                "highest token id exceeds vocab size sanity bound, table will be allocated at that size"
            );
        }

        let calculated = ResolvedSize {
            size: self.calculated,
            source: SizeSource::Calculated,
        };

        let Some((source, configured)) = self.configured() else {
            return calculated;
        };

        if configured > MAX_VOCAB_SIZE {
            tracing::warn!(
                ?source,
                configured,
                calculated = self.calculated,
                "configured vocab size exceeds sanity bound, using calculated size"
            );
            return calculated;
        }

        if configured < self.calculated {
            tracing::debug!(
                ?source,
                configured,
                calculated = self.calculated,
                "configured vocab size is smaller than highest token id"
            );
            return calculated;
        }

        ResolvedSize {
            size: configured,
            source,
        }
    }
}

/// `1 + max id` over base vocabulary and added tokens, 0 when both are empty.
pub fn calculated_size(vocab: &[(&str, u32)], added: &[AddedToken<'_>]) -> usize {
    vocab
        .iter()
        .map(|&(_, id)| id)
        .chain(added.iter().map(|token| token.id))
        .max()
        .map_or(0, |max_id| max_id as usize + 1)
}

/// Resolve the vocabulary length for the given metadata.
pub fn resolve_vocab_size(view: &MetadataView<'_>) -> ResolvedSize {
    SizeCandidates::from_view(view).resolve()
}
