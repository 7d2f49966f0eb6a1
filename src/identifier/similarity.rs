//! Scoring a text window against a license template.
//!
//! Two scorers share the [`Scorer`] contract: a fast n-gram Jaccard measure
//! used for shortlisting, and a token alignment measure that penalizes
//! missing license wording far more than extra surrounding text.

use std::sync::Arc;

use serde::Serialize;

use crate::identifier::ngram::NGramModel;
use crate::identifier::sequence::{OpTag, SequenceMatcher};
use crate::identifier::text::{License, Source};
use crate::identifier::tokenize::is_punctuation;

pub const DEFAULT_PENALTY_ONLY_SOURCE: f64 = 1.0;
pub const DEFAULT_PENALTY_ONLY_LICENSE: f64 = 50.0;
pub const DEFAULT_PUNCT_WEIGHT: f64 = 0.01;

/// Pure `[0, 1]` similarity of a window to a license.
pub trait Scorer {
    fn score(&self, license: &License, window: &Source) -> f64;
}

/// N-gram similarity with the window restricted to the library vocabulary.
#[derive(Debug, Clone)]
pub struct NgramSimilarity {
    universe: Arc<NGramModel>,
}

impl NgramSimilarity {
    pub fn new(universe: Arc<NGramModel>) -> Self {
        Self { universe }
    }
}

impl Scorer for NgramSimilarity {
    fn score(&self, license: &License, window: &Source) -> f64 {
        let window_model = NGramModel::from_lines_within_universe(window.lines(), &self.universe);
        license.n_grams().similarity(&window_model)
    }
}

/// Token counts of an alignment, split by side and by punctuation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AlignmentCounts {
    pub both_non_punct: usize,
    pub both_punct: usize,
    pub only_src_non_punct: usize,
    pub only_src_punct: usize,
    pub only_lic_non_punct: usize,
    pub only_lic_punct: usize,
}

impl AlignmentCounts {
    fn add(&mut self, other: &AlignmentCounts) {
        self.both_non_punct += other.both_non_punct;
        self.both_punct += other.both_punct;
        self.only_src_non_punct += other.only_src_non_punct;
        self.only_src_punct += other.only_src_punct;
        self.only_lic_non_punct += other.only_lic_non_punct;
        self.only_lic_punct += other.only_lic_punct;
    }
}

/// One alignment opcode with the tokens and separators on each side.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiffChunk {
    pub op: OpTag,
    pub local_counts: AlignmentCounts,
    pub tokens_src: Vec<String>,
    pub tokens_lic: Vec<String>,
    /// Text following each source token in this chunk.
    pub ignored_src: Vec<String>,
    /// Text following each license token in this chunk.
    pub ignored_lic: Vec<String>,
}

/// Full account of an edit-weighted score.
///
/// Concatenating `init_ignored_src` with each chunk's source tokens and
/// their following separators reproduces the window text (with `\n` line
/// ends); the same holds for the license side.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreRationale {
    pub score: f64,
    pub penalty_only_source: f64,
    pub penalty_only_license: f64,
    pub punct_weight: f64,
    pub init_ignored_src: String,
    pub init_ignored_lic: String,
    pub total_counts: AlignmentCounts,
    pub diff_chunks: Vec<DiffChunk>,
}

/// Alignment-based similarity with asymmetric penalties.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EditWeightedSimilarity {
    pub penalty_only_source: f64,
    pub penalty_only_license: f64,
    pub punct_weight: f64,
}

impl Default for EditWeightedSimilarity {
    fn default() -> Self {
        Self {
            penalty_only_source: DEFAULT_PENALTY_ONLY_SOURCE,
            penalty_only_license: DEFAULT_PENALTY_ONLY_LICENSE,
            punct_weight: DEFAULT_PUNCT_WEIGHT,
        }
    }
}

impl EditWeightedSimilarity {
    pub fn new(penalty_only_source: f64, penalty_only_license: f64, punct_weight: f64) -> Self {
        Self {
            penalty_only_source,
            penalty_only_license,
            punct_weight,
        }
    }

    /// Score plus the per-opcode breakdown of the alignment.
    pub fn score_with_rationale(&self, license: &License, window: &Source) -> ScoreRationale {
        let src_tokens = window.tokens_flat();
        let lic_tokens: Vec<&str> = license.tokens().iter().map(String::as_str).collect();

        let mut ignored_src = window.ignored_strings();
        let mut ignored_lic = license.ignored_strings();
        let init_ignored_src = ignored_src.next().unwrap_or_default();
        let init_ignored_lic = ignored_lic.next().unwrap_or_default();

        let mut total_counts = AlignmentCounts::default();
        let mut diff_chunks = Vec::new();

        for op in SequenceMatcher::new(&src_tokens, &lic_tokens).opcodes() {
            let chunk_src = &src_tokens[op.a_start..op.a_end];
            let chunk_lic = &lic_tokens[op.b_start..op.b_end];
            let local_counts = count_chunk(op.tag, chunk_src, chunk_lic);
            total_counts.add(&local_counts);

            diff_chunks.push(DiffChunk {
                op: op.tag,
                local_counts,
                tokens_src: chunk_src.iter().map(|t| t.to_string()).collect(),
                tokens_lic: chunk_lic.iter().map(|t| t.to_string()).collect(),
                ignored_src: ignored_src.next_n(op.a_len()),
                ignored_lic: ignored_lic.next_n(op.b_len()),
            });
        }

        ScoreRationale {
            score: self.score_counts(&total_counts),
            penalty_only_source: self.penalty_only_source,
            penalty_only_license: self.penalty_only_license,
            punct_weight: self.punct_weight,
            init_ignored_src,
            init_ignored_lic,
            total_counts,
            diff_chunks,
        }
    }

    fn score_counts(&self, counts: &AlignmentCounts) -> f64 {
        let weighted = |non_punct: usize, punct: usize| {
            non_punct as f64 + self.punct_weight * punct as f64
        };
        let unchanged = weighted(counts.both_non_punct, counts.both_punct);
        let only_src = weighted(counts.only_src_non_punct, counts.only_src_punct);
        let only_lic = weighted(counts.only_lic_non_punct, counts.only_lic_punct);

        let denom =
            unchanged + self.penalty_only_source * only_src + self.penalty_only_license * only_lic;
        if denom == 0.0 { 0.0 } else { unchanged / denom }
    }
}

impl Scorer for EditWeightedSimilarity {
    fn score(&self, license: &License, window: &Source) -> f64 {
        let src_tokens = window.tokens_flat();
        let lic_tokens: Vec<&str> = license.tokens().iter().map(String::as_str).collect();

        let mut counts = AlignmentCounts::default();
        for op in SequenceMatcher::new(&src_tokens, &lic_tokens).opcodes() {
            counts.add(&count_chunk(
                op.tag,
                &src_tokens[op.a_start..op.a_end],
                &lic_tokens[op.b_start..op.b_end],
            ));
        }
        self.score_counts(&counts)
    }
}

fn count_chunk(tag: OpTag, src: &[&str], lic: &[&str]) -> AlignmentCounts {
    let src_punct = src.iter().filter(|t| is_punctuation(t)).count();
    let lic_punct = lic.iter().filter(|t| is_punctuation(t)).count();

    if tag == OpTag::Equal {
        AlignmentCounts {
            both_non_punct: src.len() - src_punct,
            both_punct: src_punct,
            ..Default::default()
        }
    } else {
        AlignmentCounts {
            only_src_non_punct: src.len() - src_punct,
            only_src_punct: src_punct,
            only_lic_non_punct: lic.len() - lic_punct,
            only_lic_punct: lic_punct,
            ..Default::default()
        }
    }
}

/// The configured scorer.
#[derive(Debug, Clone)]
pub enum Similarity {
    Ngram(NgramSimilarity),
    EditWeighted(EditWeightedSimilarity),
}

impl Scorer for Similarity {
    fn score(&self, license: &License, window: &Source) -> f64 {
        match self {
            Self::Ngram(scorer) => scorer.score(license, window),
            Self::EditWeighted(scorer) => scorer.score(license, window),
        }
    }
}
