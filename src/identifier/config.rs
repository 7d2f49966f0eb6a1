//! Matching configuration.
//!
//! Build with [`IdentifierConfigBuilder`]; unset fields take the defaults
//! below and the result is validated before it is handed out.

use std::str::FromStr;
use std::sync::Arc;

use derive_builder::Builder;
use strum::{Display, EnumString};

use crate::identifier::error::LicenseIdError;
use crate::identifier::ngram::NGramModel;
use crate::identifier::rank::DEFAULT_RANK_BREAKPOINTS;
use crate::identifier::similarity::{
    DEFAULT_PENALTY_ONLY_LICENSE, DEFAULT_PENALTY_ONLY_SOURCE, DEFAULT_PUNCT_WEIGHT,
    EditWeightedSimilarity, NgramSimilarity, Similarity,
};

pub const DEFAULT_THRESHOLD: f64 = 0.04;
pub const DEFAULT_KEEP_FRACTION_OF_BEST: f64 = 0.9;
pub const DEFAULT_CONTEXT_LINES: usize = 0;
pub const DEFAULT_OVERSHOOT: usize = 5;

/// Region search strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum Strategy {
    Exhaustive,
    #[default]
    OneLineThenExpand,
    WindowThenExpand,
    FullTextOnly,
}

/// Region scorer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum SimilarityKind {
    Ngram,
    #[default]
    EditWeighted,
}

impl Strategy {
    pub fn from_name(name: &str) -> Result<Self, LicenseIdError> {
        Self::from_str(name)
            .map_err(|_| LicenseIdError::InvalidConfig(format!("Unrecognized strategy: {}", name)))
    }
}

impl SimilarityKind {
    pub fn from_name(name: &str) -> Result<Self, LicenseIdError> {
        Self::from_str(name).map_err(|_| {
            LicenseIdError::InvalidConfig(format!("Unrecognized similarity: {}", name))
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parallelism {
    SingleThreaded,
    Workers(usize),
}

impl Default for Parallelism {
    fn default() -> Self {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self::Workers(cores)
    }
}

#[derive(Debug, Clone, PartialEq, Builder)]
#[builder(build_fn(skip))]
pub struct IdentifierConfig {
    /// Minimum whole-document n-gram score for a candidate.
    pub threshold: f64,
    /// Candidates scoring below `best * keep_fraction_of_best` are dropped.
    pub keep_fraction_of_best: f64,
    /// Lines of context added on each side of a found region.
    pub context_lines: usize,
    /// Consecutive non-improving extensions tolerated while expanding.
    pub overshoot: usize,
    pub strategy: Strategy,
    pub similarity: SimilarityKind,
    pub penalty_only_source: f64,
    pub penalty_only_license: f64,
    pub punct_weight: f64,
    /// Ascending bucket boundaries for [`crate::identifier::rank::rank_for_score`].
    pub rank_breakpoints: Vec<f64>,
    /// Also report the matched region without context lines.
    pub include_original_region: bool,
    pub parallelism: Parallelism,
}

impl Default for IdentifierConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            keep_fraction_of_best: DEFAULT_KEEP_FRACTION_OF_BEST,
            context_lines: DEFAULT_CONTEXT_LINES,
            overshoot: DEFAULT_OVERSHOOT,
            strategy: Strategy::default(),
            similarity: SimilarityKind::default(),
            penalty_only_source: DEFAULT_PENALTY_ONLY_SOURCE,
            penalty_only_license: DEFAULT_PENALTY_ONLY_LICENSE,
            punct_weight: DEFAULT_PUNCT_WEIGHT,
            rank_breakpoints: DEFAULT_RANK_BREAKPOINTS.to_vec(),
            include_original_region: false,
            parallelism: Parallelism::default(),
        }
    }
}

impl IdentifierConfigBuilder {
    pub fn build(&self) -> Result<IdentifierConfig, LicenseIdError> {
        let defaults = IdentifierConfig::default();
        let config = IdentifierConfig {
            threshold: self.threshold.unwrap_or(defaults.threshold),
            keep_fraction_of_best: self
                .keep_fraction_of_best
                .unwrap_or(defaults.keep_fraction_of_best),
            context_lines: self.context_lines.unwrap_or(defaults.context_lines),
            overshoot: self.overshoot.unwrap_or(defaults.overshoot),
            strategy: self.strategy.unwrap_or(defaults.strategy),
            similarity: self.similarity.unwrap_or(defaults.similarity),
            penalty_only_source: self
                .penalty_only_source
                .unwrap_or(defaults.penalty_only_source),
            penalty_only_license: self
                .penalty_only_license
                .unwrap_or(defaults.penalty_only_license),
            punct_weight: self.punct_weight.unwrap_or(defaults.punct_weight),
            rank_breakpoints: self
                .rank_breakpoints
                .clone()
                .unwrap_or(defaults.rank_breakpoints),
            include_original_region: self
                .include_original_region
                .unwrap_or(defaults.include_original_region),
            parallelism: self.parallelism.unwrap_or(defaults.parallelism),
        };
        config.validate()?;
        Ok(config)
    }
}

impl IdentifierConfig {
    pub fn validate(&self) -> Result<(), LicenseIdError> {
        let invalid = |msg: String| Err(LicenseIdError::InvalidConfig(msg));

        if !self.threshold.is_finite() {
            return invalid(format!("threshold must be finite, got {}", self.threshold));
        }
        if !(0.0..=1.0).contains(&self.keep_fraction_of_best) {
            return invalid(format!(
                "keep_fraction_of_best must be within [0, 1], got {}",
                self.keep_fraction_of_best
            ));
        }
        for (name, value) in [
            ("penalty_only_source", self.penalty_only_source),
            ("penalty_only_license", self.penalty_only_license),
            ("punct_weight", self.punct_weight),
        ] {
            if !value.is_finite() || value < 0.0 {
                return invalid(format!("{} must be non-negative, got {}", name, value));
            }
        }
        if self.rank_breakpoints.is_empty() {
            return invalid("rank_breakpoints must not be empty".to_string());
        }
        if self.rank_breakpoints.windows(2).any(|pair| pair[0] >= pair[1]) {
            return invalid(format!(
                "rank_breakpoints must be strictly ascending, got {:?}",
                self.rank_breakpoints
            ));
        }
        if self.parallelism == Parallelism::Workers(0) {
            return invalid("worker count must be at least 1".to_string());
        }
        Ok(())
    }

    /// Scorer used for region search.
    pub fn scorer(&self, universe: Arc<NGramModel>) -> Similarity {
        match self.similarity {
            SimilarityKind::Ngram => Similarity::Ngram(NgramSimilarity::new(universe)),
            SimilarityKind::EditWeighted => Similarity::EditWeighted(EditWeightedSimilarity::new(
                self.penalty_only_source,
                self.penalty_only_license,
                self.punct_weight,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let config = IdentifierConfigBuilder::default().build().unwrap();
        assert_eq!(config.threshold, DEFAULT_THRESHOLD);
        assert_eq!(config.keep_fraction_of_best, 0.9);
        assert_eq!(config.overshoot, 5);
        assert_eq!(config.strategy, Strategy::OneLineThenExpand);
        assert_eq!(config.similarity, SimilarityKind::EditWeighted);
        assert_eq!(config.penalty_only_license, 50.0);
        assert_eq!(config.rank_breakpoints, vec![0.06, 0.08, 0.1, 0.5, 1.0]);
        assert!(!config.include_original_region);
    }

    #[test]
    fn test_builder_overrides() {
        let config = IdentifierConfigBuilder::default()
            .threshold(0.2)
            .context_lines(3)
            .strategy(Strategy::Exhaustive)
            .parallelism(Parallelism::SingleThreaded)
            .build()
            .unwrap();
        assert_eq!(config.threshold, 0.2);
        assert_eq!(config.context_lines, 3);
        assert_eq!(config.strategy, Strategy::Exhaustive);
        assert_eq!(config.parallelism, Parallelism::SingleThreaded);
    }

    #[test]
    fn test_keep_fraction_out_of_range_is_rejected() {
        for fraction in [-0.1, 1.1] {
            let err = IdentifierConfigBuilder::default()
                .keep_fraction_of_best(fraction)
                .build()
                .unwrap_err();
            assert!(matches!(err, LicenseIdError::InvalidConfig(_)));
        }
    }

    #[test]
    fn test_negative_penalty_is_rejected() {
        let err = IdentifierConfigBuilder::default()
            .penalty_only_license(-1.0)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("penalty_only_license"));
    }

    #[test]
    fn test_bad_breakpoints_are_rejected() {
        assert!(
            IdentifierConfigBuilder::default()
                .rank_breakpoints(vec![])
                .build()
                .is_err()
        );
        assert!(
            IdentifierConfigBuilder::default()
                .rank_breakpoints(vec![0.5, 0.1])
                .build()
                .is_err()
        );
    }

    #[test]
    fn test_zero_workers_is_rejected() {
        assert!(
            IdentifierConfigBuilder::default()
                .parallelism(Parallelism::Workers(0))
                .build()
                .is_err()
        );
    }

    #[test]
    fn test_strategy_and_similarity_names() {
        assert_eq!(
            Strategy::from_name("one_line_then_expand"),
            Ok(Strategy::OneLineThenExpand)
        );
        assert_eq!(
            Strategy::from_name("window_then_expand"),
            Ok(Strategy::WindowThenExpand)
        );
        assert_eq!(Strategy::from_name("full_text_only"), Ok(Strategy::FullTextOnly));
        assert_eq!(Strategy::Exhaustive.to_string(), "exhaustive");
        assert_eq!(SimilarityKind::from_name("ngram"), Ok(SimilarityKind::Ngram));
        assert_eq!(
            SimilarityKind::from_name("edit_weighted"),
            Ok(SimilarityKind::EditWeighted)
        );
        assert!(matches!(
            Strategy::from_name("greedy"),
            Err(LicenseIdError::InvalidConfig(_))
        ));
        assert!(SimilarityKind::from_name("cosine").is_err());
    }
}
