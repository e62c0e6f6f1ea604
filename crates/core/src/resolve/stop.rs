//! End-of-sequence string → token id resolution.
//!
//! Lookups go through a reverse index built once per resolution, so each
//! configured EOS string costs a hash probe instead of a scan over the
//! whole vocabulary.

use std::collections::BTreeSet;

use ahash::AHashMap;

use super::table::VocabTable;

/// Token ids that terminate generation.
pub type StopTokenIds = BTreeSet<u32>;

/// Maps token text to the first id carrying it.
///
/// Every slot is indexed, gaps included, so `""` resolves to the first
/// empty slot.
#[derive(Debug)]
pub struct ReverseIndex<'a> {
    first_ids: AHashMap<&'a str, u32>,
}

impl<'a> ReverseIndex<'a> {
    pub fn new(table: &'a VocabTable) -> Self {
        let mut first_ids = AHashMap::with_capacity(table.len());
        for (id, token) in table.iter() {
            first_ids.entry(token).or_insert(id);
        }
        Self { first_ids }
    }

    /// Lowest id whose text equals `token`.
    #[inline]
    pub fn first_id(&self, token: &str) -> Option<u32> {
        self.first_ids.get(token).copied()
    }
}

/// Resolve extra EOS strings, then the primary EOS token, into ids.
///
/// Strings not present in the vocabulary are skipped.
pub fn resolve_stop_tokens(
    table: &VocabTable,
    extra_eos_tokens: &[&str],
    eos_token: Option<&str>,
) -> StopTokenIds {
    if extra_eos_tokens.is_empty() && eos_token.is_none() {
        return StopTokenIds::new();
    }

    let index = ReverseIndex::new(table);
    let mut stop_ids = StopTokenIds::new();
    for &token in extra_eos_tokens.iter().chain(eos_token.iter()) {
        match index.first_id(token) {
            Some(id) => {
                stop_ids.insert(id);
            }
            None => tracing::debug!(token, "EOS token not in vocabulary, skipping"),
        }
    }
    stop_ids
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(tokens: &[&str]) -> VocabTable {
        VocabTable::from(tokens.iter().map(|t| t.to_string()).collect::<Vec<_>>())
    }

    #[test]
    fn unmatched_extra_eos_is_skipped() {
        let vocab = table(&["a", "b", "</s>"]);
        let ids = resolve_stop_tokens(&vocab, &["</s>", "<unk>"], None);
        assert_eq!(ids, StopTokenIds::from([2]));
    }

    #[test]
    fn primary_eos_is_added() {
        let vocab = table(&["a", "b", "</s>"]);
        let ids = resolve_stop_tokens(&vocab, &["</s>", "<unk>"], Some("b"));
        assert_eq!(ids, StopTokenIds::from([1, 2]));
    }

    #[test]
    fn duplicates_count_once() {
        let vocab = table(&["<|im_end|>", "x"]);
        let ids = resolve_stop_tokens(&vocab, &["<|im_end|>", "<|im_end|>"], Some("<|im_end|>"));
        assert_eq!(ids, StopTokenIds::from([0]));
    }

    #[test]
    fn first_occurrence_wins() {
        let vocab = table(&["a", "</s>", "b", "</s>"]);
        let ids = resolve_stop_tokens(&vocab, &[], Some("</s>"));
        assert_eq!(ids, StopTokenIds::from([1]));
    }

    #[test]
    fn no_sources_gives_empty_set() {
        let vocab = table(&["a"]);
        assert!(resolve_stop_tokens(&vocab, &[], None).is_empty());
    }

    #[test]
    fn missing_primary_eos_is_skipped() {
        let vocab = table(&["a"]);
        assert!(resolve_stop_tokens(&vocab, &[], Some("</s>")).is_empty());
    }

    #[test]
    fn empty_eos_matches_first_empty_slot() {
        let vocab = table(&["", "a"]);
        assert_eq!(resolve_stop_tokens(&vocab, &[], Some("")), StopTokenIds::from([0]));

        let vocab = table(&["a", "", "b", ""]);
        assert_eq!(resolve_stop_tokens(&vocab, &[""], None), StopTokenIds::from([1]));
    }

    #[test]
    fn reverse_index_lookup() {
        let vocab = table(&["x", "y", "x"]);
        let index = ReverseIndex::new(&vocab);
        assert_eq!(index.first_id("x"), Some(0));
        assert_eq!(index.first_id("y"), Some(1));
        assert_eq!(index.first_id("z"), None);
    }
}
