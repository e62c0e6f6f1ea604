//! Logit processor that applies a grammar matcher's mask each decode step.

use std::fmt;
use std::sync::Arc;

use super::{Grammar, GrammarBackend, GrammarMatcher, TokenBitmask};
use crate::error::{FactoryError, GrammarError};
use crate::loader::{self, ModelConfiguration};
use crate::metadata::TokenizerMetadata;
use crate::resolve::ResolvedVocabulary;

/// Masks logits so only grammar-valid tokens can be sampled.
///
/// Once the grammar terminates, only the resolved stop tokens stay
/// allowed so the generation loop can end the sequence. With no stop
/// tokens resolved the row is left unmasked within the vocabulary.
pub struct GrammarMaskedLogitProcessor {
    matcher: Box<dyn GrammarMatcher>,
    vocabulary: Arc<ResolvedVocabulary>,
    /// Reused every step.
    mask: TokenBitmask,
}

impl fmt::Debug for GrammarMaskedLogitProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GrammarMaskedLogitProcessor")
            .field("vocab_size", &self.vocabulary.vocab_size())
            .field("vocab_type", &self.vocabulary.vocab_type)
            .field("is_terminated", &self.matcher.is_terminated())
            .finish()
    }
}

impl GrammarMaskedLogitProcessor {
    /// Wrap a matcher already built for `vocabulary`.
    pub fn new(matcher: Box<dyn GrammarMatcher>, vocabulary: Arc<ResolvedVocabulary>) -> Self {
        let mask = TokenBitmask::new(vocabulary.vocab_size());
        Self {
            matcher,
            vocabulary,
            mask,
        }
    }

    /// Build a processor from an already resolved vocabulary.
    pub fn from_vocabulary<B>(
        backend: &B,
        vocabulary: Arc<ResolvedVocabulary>,
        grammar: &Grammar,
    ) -> Result<Self, GrammarError>
    where
        B: GrammarBackend + ?Sized,
    {
        let matcher = backend.build_matcher(Arc::clone(&vocabulary), grammar)?;
        Ok(Self::new(matcher, vocabulary))
    }

    /// Resolve the vocabulary from raw metadata, then build the matcher.
    pub fn from_metadata<B>(
        backend: &B,
        metadata: &TokenizerMetadata,
        grammar: &Grammar,
    ) -> Result<Self, GrammarError>
    where
        B: GrammarBackend + ?Sized,
    {
        let vocabulary = Arc::new(ResolvedVocabulary::from_metadata(metadata));
        tracing::debug!(
            vocab_size = vocabulary.vocab_size(),
            vocab_type = %vocabulary.vocab_type,
            stop_token_ids = ?vocabulary.stop_token_ids,
            %grammar,
            "building grammar matcher"
        );
        Self::from_vocabulary(backend, vocabulary, grammar)
    }

    /// Fetch a model's metadata, resolve it and build the matcher.
    pub async fn from_model<B>(
        backend: &B,
        configuration: &ModelConfiguration,
        grammar: &Grammar,
    ) -> Result<Self, FactoryError>
    where
        B: GrammarBackend + ?Sized,
    {
        let metadata = loader::load_metadata_async(configuration.clone()).await?;
        Ok(Self::from_metadata(backend, &metadata, grammar)?)
    }

    /// Mask `logits` in place for the next sampling step.
    pub fn process(&mut self, logits: &mut [f32]) {
        self.mask.clear();
        if self.matcher.is_terminated() {
            if self.vocabulary.stop_token_ids.is_empty() {
                self.mask.allow_all();
            }
            for &token_id in &self.vocabulary.stop_token_ids {
                self.mask.allow(token_id);
            }
        } else {
            self.matcher.fill_next_token_bitmask(&mut self.mask);
        }
        self.mask.apply_to_logits(logits);
    }

    /// Feed the sampled token to the matcher.
    ///
    /// Stop tokens sampled after termination are accepted without
    /// advancing the grammar.
    pub fn did_sample(&mut self, token_id: u32) -> bool {
        if self.matcher.is_terminated() && self.vocabulary.is_stop_token(token_id) {
            return true;
        }
        let accepted = self.matcher.accept_token(token_id);
        if !accepted {
            tracing::warn!(token_id, "sampled token rejected by grammar");
        }
        accepted
    }

    /// Undo the last `num_tokens` accepted tokens.
    pub fn rollback(&mut self, num_tokens: usize) {
        self.matcher.rollback(num_tokens);
    }

    pub fn is_terminated(&self) -> bool {
        self.matcher.is_terminated()
    }

    /// Restart the grammar from its initial state.
    pub fn reset(&mut self) {
        self.matcher.reset();
    }

    pub fn vocabulary(&self) -> &Arc<ResolvedVocabulary> {
        &self.vocabulary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fixtures, MockGrammarBackend};

    fn grammar() -> Grammar {
        Grammar::Regex("[ab]+".to_string())
    }

    #[test]
    fn process_masks_disallowed_tokens() {
        let backend = MockGrammarBackend::allowing(vec![1, 2]);
        let mut processor = GrammarMaskedLogitProcessor::from_metadata(
            &backend,
            &fixtures::byte_fallback_metadata(),
            &grammar(),
        )
        .unwrap();

        let mut logits = vec![1.0f32; processor.vocabulary().vocab_size()];
        processor.process(&mut logits);

        for (i, &l) in logits.iter().enumerate() {
            if i == 1 || i == 2 {
                assert_eq!(l, 1.0, "token {i} should be allowed");
            } else {
                assert_eq!(l, f32::NEG_INFINITY, "token {i} should be masked");
            }
        }
    }

    #[test]
    fn terminated_grammar_allows_only_stop_tokens() {
        let backend = MockGrammarBackend::allowing(vec![1, 2]).terminating_after(1);
        let metadata = fixtures::byte_fallback_metadata();
        let mut processor =
            GrammarMaskedLogitProcessor::from_metadata(&backend, &metadata, &grammar()).unwrap();
        let stop_ids = processor.vocabulary().stop_token_id_list();
        assert!(!stop_ids.is_empty());

        assert!(processor.did_sample(1));
        assert!(processor.is_terminated());

        let mut logits = vec![0.0f32; processor.vocabulary().vocab_size()];
        processor.process(&mut logits);
        for (i, &l) in logits.iter().enumerate() {
            assert_eq!(l.is_finite(), stop_ids.contains(&(i as u32)), "token {i}");
        }
        assert!(processor.did_sample(stop_ids[0]));
    }

    #[test]
    fn terminated_without_stop_tokens_leaves_row_finite() {
        let metadata = TokenizerMetadata::from_tokenizer_data(serde_json::json!({
            "model": { "vocab": { "a": 0, "b": 1 } }
        }));
        let backend = MockGrammarBackend::allowing(vec![0]).terminating_after(1);
        let mut processor =
            GrammarMaskedLogitProcessor::from_metadata(&backend, &metadata, &grammar()).unwrap();
        assert!(processor.vocabulary().stop_token_ids.is_empty());

        assert!(processor.did_sample(0));
        assert!(processor.is_terminated());

        let mut logits = vec![0.25f32; 3];
        processor.process(&mut logits);
        assert_eq!(logits[..2], [0.25, 0.25]);
        assert_eq!(logits[2], f32::NEG_INFINITY);
    }

    #[test]
    fn rejected_token_reports_false() {
        let backend = MockGrammarBackend::allowing(vec![1]);
        let mut processor = GrammarMaskedLogitProcessor::from_metadata(
            &backend,
            &fixtures::byte_fallback_metadata(),
            &grammar(),
        )
        .unwrap();
        assert!(!processor.did_sample(3));
    }

    #[test]
    fn rollback_and_reset_reach_matcher() {
        let backend = MockGrammarBackend::allowing(vec![1, 2]).terminating_after(2);
        let mut processor = GrammarMaskedLogitProcessor::from_metadata(
            &backend,
            &fixtures::byte_fallback_metadata(),
            &grammar(),
        )
        .unwrap();

        processor.did_sample(1);
        processor.did_sample(2);
        assert!(processor.is_terminated());

        processor.rollback(1);
        assert!(!processor.is_terminated());

        processor.did_sample(2);
        processor.reset();
        assert!(!processor.is_terminated());
    }

    #[test]
    fn backend_receives_resolved_bundle_and_grammar() {
        let backend = MockGrammarBackend::allowing(vec![]);
        let metadata = fixtures::byte_fallback_metadata();
        GrammarMaskedLogitProcessor::from_metadata(&backend, &metadata, &grammar()).unwrap();

        let (vocabulary, received) = backend.last_request().expect("backend was called");
        assert_eq!(*vocabulary, ResolvedVocabulary::from_metadata(&metadata));
        assert_eq!(received, grammar());
    }

    #[test]
    fn backend_failure_passes_through() {
        let backend = MockGrammarBackend::failing(GrammarError::InvalidGrammar(
            "unbalanced bracket".to_string(),
        ));
        let err = GrammarMaskedLogitProcessor::from_metadata(
            &backend,
            &fixtures::byte_fallback_metadata(),
            &grammar(),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "invalid grammar: unbalanced bracket");
    }

    #[tokio::test]
    async fn from_model_loads_resolves_and_builds() {
        use crate::loader::{ModelSource, TOKENIZER_CONFIG_FILE, TOKENIZER_FILE};

        let metadata = fixtures::byte_level_metadata();
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(TOKENIZER_FILE),
            metadata.tokenizer_data.to_string(),
        )
        .unwrap();
        std::fs::write(
            dir.path().join(TOKENIZER_CONFIG_FILE),
            metadata.tokenizer_config.as_ref().unwrap().to_string(),
        )
        .unwrap();

        let configuration = ModelConfiguration::new(ModelSource::Directory(dir.path().into()))
            .with_extra_eos_tokens(vec!["<|endoftext|>".to_string()]);
        let backend = MockGrammarBackend::allowing(vec![2, 3]);
        let processor =
            GrammarMaskedLogitProcessor::from_model(&backend, &configuration, &grammar())
                .await
                .unwrap();

        let vocabulary = processor.vocabulary();
        assert_eq!(vocabulary.vocab_type, crate::resolve::VocabType::ByteLevel);
        assert_eq!(vocabulary.stop_token_id_list(), vec![5, 6]);
    }

    #[tokio::test]
    async fn from_model_missing_tokenizer_is_load_error() {
        use crate::loader::ModelSource;

        let dir = tempfile::tempdir().unwrap();
        let configuration = ModelConfiguration::new(ModelSource::Directory(dir.path().into()));
        let backend = MockGrammarBackend::allowing(vec![]);
        let err = GrammarMaskedLogitProcessor::from_model(&backend, &configuration, &grammar())
            .await
            .unwrap_err();
        assert!(matches!(err, FactoryError::Load(_)));
        assert!(backend.last_request().is_none());
    }
}
