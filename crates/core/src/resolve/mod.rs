//! Tokenizer metadata → grammar engine vocabulary inputs.
//!
//! Resolution runs leaf-first and never fails:
//!
//! 1. [`size`] picks the authoritative vocabulary length.
//! 2. [`table`] builds the dense id → text table.
//! 3. [`scheme`] classifies the decoder's byte handling.
//! 4. [`stop`] maps configured EOS strings to ids.

pub mod scheme;
pub mod size;
pub mod stop;
pub mod table;

pub use scheme::{classify_decoder, VocabType};
pub use size::{resolve_vocab_size, ResolvedSize, SizeCandidates, SizeSource, MAX_VOCAB_SIZE};
pub use stop::{resolve_stop_tokens, ReverseIndex, StopTokenIds};
pub use table::VocabTable;

use serde::Serialize;

use crate::metadata::{MetadataView, TokenizerMetadata};

/// Everything the grammar engine needs about a vocabulary.
///
/// Immutable once built; share it behind an `Arc` across decoding sessions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedVocabulary {
    pub vocab: VocabTable,
    pub vocab_type: VocabType,
    pub stop_token_ids: StopTokenIds,
    /// Length chosen before added tokens could grow the table.
    #[serde(skip)]
    pub resolved_size: ResolvedSize,
}

impl ResolvedVocabulary {
    /// Resolve owned metadata.
    pub fn from_metadata(metadata: &TokenizerMetadata) -> Self {
        resolve_vocabulary(&metadata.view())
    }

    /// Length of the vocabulary table.
    #[inline]
    pub fn vocab_size(&self) -> usize {
        self.vocab.len()
    }

    /// Stop token ids as a sequence, ascending.
    pub fn stop_token_id_list(&self) -> Vec<u32> {
        self.stop_token_ids.iter().copied().collect()
    }

    #[inline]
    pub fn is_stop_token(&self, token_id: u32) -> bool {
        self.stop_token_ids.contains(&token_id)
    }
}

/// Run the full resolution pipeline over a metadata view.
pub fn resolve_vocabulary(view: &MetadataView<'_>) -> ResolvedVocabulary {
    let vocab_entries = view.vocab_entries();
    let added_tokens = view.added_tokens();

    let candidates = SizeCandidates {
        tokenizer_config: view.tokenizer_config_vocab_size(),
        model_config: view.model_config_vocab_size(),
        calculated: size::calculated_size(&vocab_entries, &added_tokens),
    };
    let resolved_size = candidates.resolve();

    let vocab = VocabTable::build(resolved_size.size, &vocab_entries, &added_tokens);
    let vocab_type = classify_decoder(&view.decoder_stages());
    let stop_token_ids = resolve_stop_tokens(
        &vocab,
        &view.model_config_extra_eos_tokens(),
        view.tokenizer_config_eos_token(),
    );

    tracing::debug!(
        resolved_size = resolved_size.size,
        size_source = ?resolved_size.source,
        vocab_size = vocab.len(),
        %vocab_type,
        stop_tokens = stop_token_ids.len(),
        "resolved vocabulary"
    );

    ResolvedVocabulary {
        vocab,
        vocab_type,
        stop_token_ids,
        resolved_size,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn end_to_end_added_token_growth() {
        let metadata = TokenizerMetadata::from_tokenizer_data(json!({
            "model": { "vocab": { "x": 0, "y": 1 } },
            "added_tokens": [{ "id": 5, "content": "<eos>" }]
        }));
        let resolved = ResolvedVocabulary::from_metadata(&metadata);

        assert_eq!(resolved.resolved_size.size, 6);
        assert_eq!(resolved.resolved_size.source, SizeSource::Calculated);
        assert_eq!(resolved.vocab.as_slice(), &["x", "y", "", "", "", "<eos>"]);
        assert_eq!(resolved.vocab_type, VocabType::None);
        assert!(resolved.stop_token_ids.is_empty());
    }

    #[test]
    fn configured_size_pads_table() {
        let metadata = TokenizerMetadata::new(
            None,
            Some(json!({ "vocab_size": 8, "eos_token": "</s>" })),
            json!({
                "model": { "vocab": { "<s>": 0, "</s>": 1, "a": 2 } },
                "decoder": { "type": "ByteLevel" }
            }),
        );
        let resolved = ResolvedVocabulary::from_metadata(&metadata);

        assert_eq!(resolved.vocab_size(), 8);
        assert_eq!(resolved.vocab_type, VocabType::ByteLevel);
        assert_eq!(resolved.stop_token_id_list(), vec![1]);
        assert!(resolved.is_stop_token(1));
        assert!(!resolved.is_stop_token(0));
    }

    #[test]
    fn table_length_covers_every_referenced_id() {
        let metadata = TokenizerMetadata::new(
            Some(json!({ "vocab_size": 4 })),
            None,
            json!({
                "model": { "vocab": { "a": 0, "b": 9 } },
                "added_tokens": [{ "id": 12, "content": "<x>" }, { "id": 15 }]
            }),
        );
        let resolved = ResolvedVocabulary::from_metadata(&metadata);

        assert!(resolved.vocab_size() >= 16);
        assert_eq!(resolved.vocab.token(9), "b");
        assert_eq!(resolved.vocab.token(12), "<x>");
    }

    #[test]
    fn shared_base_id_keeps_later_file_entry() {
        let data = serde_json::from_str(
            r#"{ "model": { "vocab": { "zz": 0, "aa": 0, "b": 1 } } }"#,
        )
        .unwrap();
        let metadata = TokenizerMetadata::from_tokenizer_data(data);
        let resolved = ResolvedVocabulary::from_metadata(&metadata);
        assert_eq!(resolved.vocab.as_slice(), &["aa", "b"]);
    }

    #[test]
    fn fixture_families_resolve() {
        use crate::testing::fixtures;

        let llama = ResolvedVocabulary::from_metadata(&fixtures::byte_fallback_metadata());
        assert_eq!(llama.vocab_size(), 8);
        assert_eq!(llama.resolved_size.source, SizeSource::ModelConfig);
        assert_eq!(llama.vocab_type, VocabType::ByteFallback);
        assert_eq!(llama.stop_token_id_list(), vec![2]);

        let qwen = ResolvedVocabulary::from_metadata(&fixtures::byte_level_metadata());
        assert_eq!(qwen.vocab_size(), 7);
        assert_eq!(qwen.resolved_size.source, SizeSource::Calculated);
        assert_eq!(qwen.vocab_type, VocabType::ByteLevel);
        assert_eq!(qwen.stop_token_id_list(), vec![5, 6]);
        assert_eq!(qwen.vocab.token(2), "Ġhello");
    }

    #[test]
    fn serializes_engine_bundle() {
        let metadata = TokenizerMetadata::new(
            Some(json!({ "extra_eos_tokens": ["b"] })),
            None,
            json!({
                "model": { "vocab": { "a": 0, "b": 1 } },
                "decoder": { "type": "Sequence", "decoders": [{ "type": "ByteFallback" }] }
            }),
        );
        let resolved = ResolvedVocabulary::from_metadata(&metadata);
        let value = serde_json::to_value(&resolved).unwrap();

        assert_eq!(
            value,
            json!({ "vocab": ["a", "b"], "vocab_type": 1, "stop_token_ids": [1] })
        );
    }
}
