//! Unigram/bigram/trigram multisets and their weighted Jaccard similarity.
//!
//! Words are whitespace separated; words made only of punctuation are skipped
//! without breaking the word chain. N-grams are anchored on the most recent
//! word: for the sequence `a b c` the model counts `c`, `c b` and `c b a`.
//!
//! Bigram and trigram keys are stored as the words joined by a single space.
//! Words never contain whitespace, so the joined key is unambiguous.

use std::collections::HashMap;
use std::hash::Hash;

use serde::{Deserialize, Serialize};

use crate::identifier::tokenize::is_punctuation;

const UNIGRAM_WEIGHT: f64 = 1.0;
const BIGRAM_WEIGHT: f64 = 6.0;
const TRIGRAM_WEIGHT: f64 = 8.0;
const TOTAL_WEIGHT: f64 = UNIGRAM_WEIGHT + BIGRAM_WEIGHT + TRIGRAM_WEIGHT;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NGramModel {
    unigrams: HashMap<String, u32>,
    bigrams: HashMap<String, u32>,
    trigrams: HashMap<String, u32>,
}

impl NGramModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_lines<S: AsRef<str>>(lines: &[S]) -> Self {
        let mut model = Self::new();
        model.add_lines(lines, None);
        model
    }

    /// Build a model that only counts n-grams already present in `universe`.
    pub fn from_lines_within_universe<S: AsRef<str>>(lines: &[S], universe: &NGramModel) -> Self {
        let mut model = Self::new();
        model.add_lines(lines, Some(universe));
        model
    }

    /// Fold `lines` into the model.
    ///
    /// The word chain starts fresh on every call, so n-grams never straddle
    /// two separately added texts.
    pub fn add_lines<S: AsRef<str>>(&mut self, lines: &[S], universe: Option<&NGramModel>) {
        let mut prev2: Option<&str> = None;
        let mut prev: Option<&str> = None;

        for line in lines {
            for word in line.as_ref().split_whitespace() {
                if is_punctuation(word) {
                    continue;
                }
                self.insert(word, prev, prev2, universe);
                prev2 = prev;
                prev = Some(word);
            }
        }
    }

    fn insert(
        &mut self,
        word: &str,
        prev: Option<&str>,
        prev2: Option<&str>,
        universe: Option<&NGramModel>,
    ) {
        if in_universe(universe.map(|u| &u.unigrams), word) {
            *self.unigrams.entry(word.to_string()).or_insert(0) += 1;
        }

        let Some(prev) = prev else {
            return;
        };
        let bigram = format!("{word} {prev}");
        if in_universe(universe.map(|u| &u.bigrams), &bigram) {
            *self.bigrams.entry(bigram.clone()).or_insert(0) += 1;
        }

        let Some(prev2) = prev2 else {
            return;
        };
        let trigram = format!("{bigram} {prev2}");
        if in_universe(universe.map(|u| &u.trigrams), &trigram) {
            *self.trigrams.entry(trigram).or_insert(0) += 1;
        }
    }

    /// Weighted Jaccard similarity over the three multisets.
    ///
    /// Each order scores `Σ min(a, b) / Σ max(a, b)`, or 0 when both sides are
    /// empty; the orders are combined as `(uni + 6 * bi + 8 * tri) / 15`.
    pub fn similarity(&self, other: &NGramModel) -> f64 {
        let uni = multiset_jaccard(&self.unigrams, &other.unigrams);
        let bi = multiset_jaccard(&self.bigrams, &other.bigrams);
        let tri = multiset_jaccard(&self.trigrams, &other.trigrams);

        (uni * UNIGRAM_WEIGHT + bi * BIGRAM_WEIGHT + tri * TRIGRAM_WEIGHT) / TOTAL_WEIGHT
    }

    pub fn is_empty(&self) -> bool {
        self.unigrams.is_empty()
    }

    pub fn unigram_count(&self, word: &str) -> u32 {
        self.unigrams.get(word).copied().unwrap_or(0)
    }

    /// Count of `word` following `prev`.
    pub fn bigram_count(&self, word: &str, prev: &str) -> u32 {
        self.bigrams
            .get(&format!("{word} {prev}"))
            .copied()
            .unwrap_or(0)
    }

    /// Count of `word` following `prev` following `prev2`.
    pub fn trigram_count(&self, word: &str, prev: &str, prev2: &str) -> u32 {
        self.trigrams
            .get(&format!("{word} {prev} {prev2}"))
            .copied()
            .unwrap_or(0)
    }
}

/// Without a universe every n-gram counts.
fn in_universe(universe: Option<&HashMap<String, u32>>, key: &str) -> bool {
    universe.is_none_or(|mset| mset.get(key).is_some_and(|&count| count > 0))
}

fn multiset_total<K>(mset: &HashMap<K, u32>) -> u64 {
    mset.values().map(|&count| u64::from(count)).sum()
}

/// `|A ∩ B| / |A ∪ B|` on multiset counts.
fn multiset_jaccard<K: Eq + Hash>(a: &HashMap<K, u32>, b: &HashMap<K, u32>) -> f64 {
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };

    let intersection: u64 = small
        .iter()
        .filter_map(|(key, &count)| large.get(key).map(|&other| u64::from(count.min(other))))
        .sum();
    let union = multiset_total(a) + multiset_total(b) - intersection;

    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ngrams_are_anchored_on_latest_word() {
        let model = NGramModel::from_lines(&["one", "two", "three", "four"]);

        for word in ["one", "two", "three", "four"] {
            assert_eq!(model.unigram_count(word), 1);
        }
        assert_eq!(model.bigram_count("two", "one"), 1);
        assert_eq!(model.bigram_count("three", "two"), 1);
        assert_eq!(model.bigram_count("four", "three"), 1);
        assert_eq!(model.bigram_count("one", "two"), 0);
        assert_eq!(model.trigram_count("three", "two", "one"), 1);
        assert_eq!(model.trigram_count("four", "three", "two"), 1);
        assert_eq!(model.trigrams.len(), 2);
    }

    #[test]
    fn test_punctuation_words_are_skipped() {
        let model = NGramModel::from_lines(&["a , b -- c"]);
        assert_eq!(model.unigram_count(","), 0);
        assert_eq!(model.bigram_count("b", "a"), 1);
        assert_eq!(model.trigram_count("c", "b", "a"), 1);
    }

    #[test]
    fn test_words_keep_attached_punctuation() {
        let model = NGramModel::from_lines(&["(c) copyright."]);
        assert_eq!(model.unigram_count("(c)"), 1);
        assert_eq!(model.unigram_count("copyright."), 1);
    }

    #[test]
    fn test_universe_restricts_vocabulary() {
        let universe = NGramModel::from_lines(&["a b c d"]);
        let model = NGramModel::from_lines_within_universe(&["a x b c"], &universe);

        assert_eq!(model.unigram_count("a"), 1);
        assert_eq!(model.unigram_count("x"), 0);
        assert_eq!(model.bigram_count("c", "b"), 1);
        assert_eq!(model.bigram_count("b", "x"), 0);
        assert_eq!(model.trigram_count("c", "b", "x"), 0);
    }

    #[test]
    fn test_separate_add_lines_calls_do_not_chain() {
        let mut model = NGramModel::new();
        model.add_lines(&["a b"], None);
        model.add_lines(&["c d"], None);
        assert_eq!(model.bigram_count("c", "b"), 0);
        assert_eq!(model.bigram_count("d", "c"), 1);
    }

    #[test]
    fn test_self_similarity_is_one() {
        let model = NGramModel::from_lines(&["Permission is hereby granted", "free of charge"]);
        assert_eq!(model.similarity(&model), 1.0);
    }

    #[test]
    fn test_disjoint_vocabularies_score_zero() {
        let a = NGramModel::from_lines(&["alpha beta gamma"]);
        let b = NGramModel::from_lines(&["delta epsilon zeta"]);
        assert_eq!(a.similarity(&b), 0.0);
    }

    #[test]
    fn test_empty_models_score_zero() {
        let empty = NGramModel::new();
        assert_eq!(empty.similarity(&empty), 0.0);
    }

    #[test]
    fn test_similarity_is_symmetric() {
        let a = NGramModel::from_lines(&["a b c d e a b"]);
        let b = NGramModel::from_lines(&["b c d x a"]);
        assert_eq!(a.similarity(&b), b.similarity(&a));
    }

    #[test]
    fn test_multiset_counts_use_min_and_max() {
        let a = NGramModel::from_lines(&["a a a"]);
        let b = NGramModel::from_lines(&["a a"]);
        // unigrams 2/3, bigrams (a a) 1/2, trigrams (a a a) 0/1
        let expected = (2.0 / 3.0 + 0.5 * 6.0) / 15.0;
        assert!((a.similarity(&b) - expected).abs() < 1e-12);
    }
}
