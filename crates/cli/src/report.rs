//! JSON report of a resolved vocabulary.

use grammar_vocab_core::resolve::{ResolvedVocabulary, SizeSource, VocabTable};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ResolutionReport<'a> {
    pub source: String,
    pub vocab_size: usize,
    pub resolved_size: usize,
    pub size_source: SizeSource,
    pub vocab_type: i32,
    pub vocab_type_name: &'static str,
    pub stop_token_ids: Vec<u32>,
    /// Text of each stop token, parallel to `stop_token_ids`.
    pub stop_tokens: Vec<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vocab: Option<&'a VocabTable>,
}

impl<'a> ResolutionReport<'a> {
    pub fn new(source: String, resolved: &'a ResolvedVocabulary, emit_vocab: bool) -> Self {
        let stop_token_ids = resolved.stop_token_id_list();
        let stop_tokens = stop_token_ids
            .iter()
            .map(|&id| resolved.vocab.token(id))
            .collect();
        Self {
            source,
            vocab_size: resolved.vocab_size(),
            resolved_size: resolved.resolved_size.size,
            size_source: resolved.resolved_size.source,
            vocab_type: resolved.vocab_type.code(),
            vocab_type_name: resolved.vocab_type.name(),
            stop_token_ids,
            stop_tokens,
            vocab: emit_vocab.then_some(&resolved.vocab),
        }
    }
}
