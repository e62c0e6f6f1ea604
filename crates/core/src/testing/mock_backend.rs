use std::sync::{Arc, Mutex};

use crate::error::GrammarError;
use crate::grammar::{Grammar, GrammarBackend, GrammarMatcher, TokenBitmask};
use crate::resolve::ResolvedVocabulary;

/// Matcher that allows a fixed token set at every step.
#[derive(Debug, Clone)]
pub struct MockMatcher {
    allowed: Vec<u32>,
    accepted: Vec<u32>,
    terminate_after: Option<usize>,
}

impl GrammarMatcher for MockMatcher {
    fn accept_token(&mut self, token_id: u32) -> bool {
        if !self.allowed.contains(&token_id) {
            return false;
        }
        self.accepted.push(token_id);
        true
    }

    fn fill_next_token_bitmask(&self, mask: &mut TokenBitmask) {
        for &token_id in &self.allowed {
            mask.allow(token_id);
        }
    }

    fn rollback(&mut self, num_tokens: usize) {
        let keep = self.accepted.len().saturating_sub(num_tokens);
        self.accepted.truncate(keep);
    }

    fn is_terminated(&self) -> bool {
        self.terminate_after
            .is_some_and(|limit| self.accepted.len() >= limit)
    }

    fn reset(&mut self) {
        self.accepted.clear();
    }
}

type Request = (Arc<ResolvedVocabulary>, Grammar);

/// Backend producing [`MockMatcher`]s, or failing with a fixed error.
#[derive(Debug, Default)]
pub struct MockGrammarBackend {
    allowed: Vec<u32>,
    terminate_after: Option<usize>,
    failure: Option<GrammarError>,
    last_request: Mutex<Option<Request>>,
}

impl MockGrammarBackend {
    pub fn allowing(allowed: Vec<u32>) -> Self {
        Self {
            allowed,
            ..Default::default()
        }
    }

    pub fn failing(error: GrammarError) -> Self {
        Self {
            failure: Some(error),
            ..Default::default()
        }
    }

    /// Matchers report termination after `num_tokens` accepted tokens.
    pub fn terminating_after(mut self, num_tokens: usize) -> Self {
        self.terminate_after = Some(num_tokens);
        self
    }

    /// The vocabulary and grammar of the most recent build request.
    pub fn last_request(&self) -> Option<Request> {
        self.last_request
            .lock()
            .expect("mock backend lock poisoned")
            .clone()
    }
}

impl GrammarBackend for MockGrammarBackend {
    fn build_matcher(
        &self,
        vocabulary: Arc<ResolvedVocabulary>,
        grammar: &Grammar,
    ) -> Result<Box<dyn GrammarMatcher>, GrammarError> {
        *self.last_request.lock().expect("mock backend lock poisoned") =
            Some((vocabulary, grammar.clone()));

        if let Some(error) = &self.failure {
            return Err(error.clone());
        }
        Ok(Box::new(MockMatcher {
            allowed: self.allowed.clone(),
            accepted: Vec::new(),
            terminate_after: self.terminate_after,
        }))
    }
}
