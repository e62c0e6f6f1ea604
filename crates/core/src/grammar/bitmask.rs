//! Single-row packed token mask.
//!
//! One bit per token id in `u32` words: bit set = token allowed. Sized to
//! the resolved vocabulary; logits beyond it (padded LM heads) are always
//! masked.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenBitmask {
    words: Vec<u32>,
    vocab_size: usize,
}

impl TokenBitmask {
    /// All tokens disallowed.
    pub fn new(vocab_size: usize) -> Self {
        Self {
            words: vec![0; vocab_size.div_ceil(32)],
            vocab_size,
        }
    }

    /// Disallow every token.
    pub fn clear(&mut self) {
        self.words.fill(0);
    }

    /// Allow every token in the vocabulary.
    pub fn allow_all(&mut self) {
        self.words.fill(u32::MAX);
        let tail = self.vocab_size % 32;
        if let (Some(last), true) = (self.words.last_mut(), tail != 0) {
            *last = (1u32 << tail) - 1;
        }
    }

    /// Allow `token_id`; ids outside the vocabulary are ignored.
    #[inline]
    pub fn allow(&mut self, token_id: u32) {
        let id = token_id as usize;
        if id < self.vocab_size {
            self.words[id / 32] |= 1 << (id % 32);
        }
    }

    #[inline]
    pub fn is_allowed(&self, token_id: u32) -> bool {
        let id = token_id as usize;
        id < self.vocab_size && (self.words[id / 32] >> (id % 32)) & 1 == 1
    }

    /// Number of allowed tokens.
    pub fn allowed_count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Raw packed words, e.g. for handing to a native grammar engine.
    pub fn words(&self) -> &[u32] {
        &self.words
    }

    pub fn vocab_size(&self) -> usize {
        self.vocab_size
    }

    /// Set every disallowed logit to negative infinity.
    pub fn apply_to_logits(&self, logits: &mut [f32]) {
        for (chunk_idx, chunk) in logits.chunks_mut(32).enumerate() {
            match self.words.get(chunk_idx).copied() {
                Some(u32::MAX) => {}
                Some(0) | None => chunk.fill(f32::NEG_INFINITY),
                Some(word) => {
                    for (bit, logit) in chunk.iter_mut().enumerate() {
                        if (word >> bit) & 1 == 0 {
                            *logit = f32::NEG_INFINITY;
                        }
                    }
                }
            }
        }
    }
}
