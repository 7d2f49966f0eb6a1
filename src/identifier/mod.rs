//! License Region Identifier
//!
//! This module finds which known licenses appear inside a text and where.
//! A document is first compared with every template of the
//! [`LicenseLibrary`] using cheap n-gram similarity; the near-best candidates
//! are then located precisely with the [`LocationFinder`], and the search is
//! repeated on the text above and below the winning region.

pub mod config;
pub mod error;
pub mod library;
pub mod location;
pub mod ngram;
pub mod rank;
pub mod sequence;
pub mod similarity;
pub mod text;
pub mod tokenize;

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use log::debug;

use crate::models::{FileAnalysis, MatchResult};
use crate::scanner::process;
use crate::utils::file::files_from_path;

pub use config::{
    IdentifierConfig, IdentifierConfigBuilder, Parallelism, SimilarityKind, Strategy,
};
pub use error::LicenseIdError;
pub use library::LicenseLibrary;
pub use location::{LocationFinder, RegionResult};
pub use ngram::NGramModel;
pub use rank::{Rank, rank_for_score};
pub use text::{License, Source};

/// A shortlisted license and its whole-document n-gram score.
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    pub license: &'a License,
    pub score: f64,
}

/// Matching engine over a shared license library.
pub struct LicenseIdentifier {
    library: Arc<LicenseLibrary>,
    config: IdentifierConfig,
    finder: LocationFinder,
}

impl LicenseIdentifier {
    /// Create an identifier.
    ///
    /// # Arguments
    /// * `library` - License templates, shared read-only
    /// * `config` - Matching configuration; validated again here
    pub fn new(library: Arc<LicenseLibrary>, config: IdentifierConfig) -> Result<Self> {
        config.validate()?;
        let finder = LocationFinder::new(&config, Arc::clone(library.universe_n_grams()));

        Ok(Self {
            library,
            config,
            finder,
        })
    }

    pub fn library(&self) -> &Arc<LicenseLibrary> {
        &self.library
    }

    pub fn config(&self) -> &IdentifierConfig {
        &self.config
    }

    /// Licenses whose n-gram similarity to the whole `source` reaches
    /// `max(threshold, best * keep_fraction_of_best)`, in library order.
    ///
    /// Nothing is kept when the best similarity is 0.
    pub fn top_candidates(&self, source: &Source) -> Vec<Candidate<'_>> {
        let source_model =
            NGramModel::from_lines_within_universe(source.lines(), self.library.universe_n_grams());

        let scored: Vec<Candidate<'_>> = self
            .library
            .licenses()
            .iter()
            .map(|license| Candidate {
                license,
                score: license.n_grams().similarity(&source_model),
            })
            .collect();

        let best = scored.iter().map(|c| c.score).fold(0.0, f64::max);
        if best <= 0.0 {
            return Vec::new();
        }

        let cutoff = self.config.threshold.max(best * self.config.keep_fraction_of_best);
        scored.into_iter().filter(|c| c.score >= cutoff).collect()
    }

    /// Best region of one license in `source`.
    pub fn find_license_region(&self, license: &License, source: &Source) -> RegionResult {
        self.finder.find_region(license, source)
    }

    /// All license regions found in `source`, by descending region score.
    ///
    /// After the best region is reported, the lines strictly above and
    /// strictly below its match (context excluded) are searched the same
    /// way. Equal region scores keep discovery order: a region before the
    /// regions found above it, those before the ones found below.
    pub fn analyze_source(&self, source: &Source) -> Vec<MatchResult> {
        let mut results = Vec::new();
        let mut pending = vec![source.clone()];

        while let Some(current) = pending.pop() {
            if current.is_empty() {
                continue;
            }
            let Some((result, region)) = self.best_match(&current) else {
                continue;
            };
            results.push(result);

            let above_end = current.relative_line_index(region.start_line_orig);
            let below_start = current.relative_line_index(region.end_line_orig);
            let below = current.subset(below_start, current.len());
            let above = current.subset(0, above_end);
            pending.push(below);
            pending.push(above);
        }

        results.sort_by(|a, b| b.region_score.total_cmp(&a.region_score));
        results
    }

    fn best_match(&self, source: &Source) -> Option<(MatchResult, RegionResult)> {
        let candidates = self.top_candidates(source);

        let mut best: Option<(Candidate<'_>, RegionResult)> = None;
        for candidate in candidates {
            let region = self.find_license_region(candidate.license, source);
            debug!(
                "{}: candidate {} (score {:.4}) region score {:.4}",
                source.display_name(),
                candidate.license.name(),
                candidate.score,
                region.score
            );
            if best.as_ref().is_none_or(|(_, b)| region.score > b.score) {
                best = Some((candidate, region));
            }
        }
        let (candidate, region) = best?;

        let original_region = self.config.include_original_region.then(|| {
            crlf_joined(
                source.lines_original_indexing(region.start_line_orig, region.end_line_orig),
            )
        });

        let result = MatchResult {
            input_path: source.display_name(),
            matched_license: candidate.license.name().to_string(),
            score: candidate.score,
            rank: rank::rank(candidate.score, &self.config.rank_breakpoints),
            start_line: region.start_line,
            end_line: region.end_line,
            start_offset: region.start_offset,
            end_offset: region.end_offset,
            region_score: region.score,
            found_region: crlf_joined(
                source.lines_original_indexing(region.start_line, region.end_line),
            ),
            original_region,
        };
        Some((result, region))
    }

    /// Read `path` and analyze it.
    pub fn analyze_file(&self, path: &Path) -> Result<Vec<MatchResult>> {
        let source = Source::from_file(path)?;
        Ok(self.analyze_source(&source))
    }

    /// Analyze every file under `path`, keyed by file path.
    ///
    /// A file that cannot be read gets an entry with its error in
    /// `scan_errors` instead of failing the whole batch.
    pub fn analyze_path(&self, path: &Path) -> Result<BTreeMap<String, FileAnalysis>> {
        let files = files_from_path(path, &[])?;
        Ok(process(self, &files, None)?.files)
    }
}

fn crlf_joined(lines: &[String]) -> String {
    let mut text = lines.join("\r\n");
    text.push_str("\r\n");
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identifier_with(library: LicenseLibrary, config: IdentifierConfig) -> LicenseIdentifier {
        LicenseIdentifier::new(Arc::new(library), config).unwrap()
    }

    fn single_threaded() -> IdentifierConfigBuilder {
        let mut builder = IdentifierConfigBuilder::default();
        builder.parallelism(Parallelism::SingleThreaded);
        builder
    }

    fn three_license_library() -> LicenseLibrary {
        LicenseLibrary::from_licenses([
            License::from_lines("greek", ["alpha beta gamma", "delta epsilon zeta"]),
            License::from_lines("colors", ["red orange yellow", "green blue indigo"]),
            License::from_lines("numbers", ["one two three", "four five six"]),
        ])
    }

    const THREE_LICENSE_DOC: [&str; 10] = [
        "header line here",
        "alpha beta gamma",
        "delta epsilon zeta",
        "filler text goes",
        "red orange yellow",
        "green blue indigo",
        "more filler words",
        "one two three",
        "four five six",
        "footer line end",
    ];

    #[test]
    fn test_finds_three_licenses_by_recursion() {
        let config = single_threaded().threshold(0.01).build().unwrap();
        let identifier = identifier_with(three_license_library(), config);

        let results = identifier.analyze_source(&Source::from_lines(THREE_LICENSE_DOC));

        let mut found: Vec<(String, usize, usize)> = results
            .iter()
            .map(|r| (r.matched_license.clone(), r.start_line, r.end_line))
            .collect();
        found.sort_by_key(|(_, start, _)| *start);
        assert_eq!(
            found,
            vec![
                ("greek".to_string(), 1, 3),
                ("colors".to_string(), 4, 6),
                ("numbers".to_string(), 7, 9),
            ]
        );
        assert!(results.iter().all(|r| r.region_score == 1.0));
        assert!(results.iter().all(|r| r.input_path == "<memory>"));
    }

    #[test]
    fn test_equal_scores_keep_discovery_order() {
        let config = single_threaded().threshold(0.01).build().unwrap();
        let identifier = identifier_with(three_license_library(), config);

        let results = identifier.analyze_source(&Source::from_lines(THREE_LICENSE_DOC));
        let names: Vec<&str> = results.iter().map(|r| r.matched_license.as_str()).collect();
        // greek wins the whole document, colors is found below it and
        // numbers below colors
        assert_eq!(names, vec!["greek", "colors", "numbers"]);
    }

    #[test]
    fn test_region_score_decides_between_near_ties() {
        let library = LicenseLibrary::from_licenses([
            License::from_lines("long", ["the quick brown fox jumps over the lazy dog"]),
            License::from_lines("short", ["the quick brown fox"]),
        ]);
        let identifier = identifier_with(library, single_threaded().build().unwrap());
        let source = Source::from_lines(["the quick brown fox jumps over"]);

        let candidates = identifier.top_candidates(&source);
        assert_eq!(candidates.len(), 2);
        assert!(candidates[0].score > candidates[1].score);

        let results = identifier.analyze_source(&source);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].matched_license, "short");
        assert!((results[0].region_score - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_no_candidates_yields_nothing() {
        let library = LicenseLibrary::from_licenses([License::from_lines("greek", ["alpha beta"])]);
        let identifier = identifier_with(library, single_threaded().build().unwrap());

        assert!(
            identifier
                .analyze_source(&Source::from_lines(["nothing in common"]))
                .is_empty()
        );
        assert!(
            identifier
                .analyze_source(&Source::from_lines(Vec::<String>::new()))
                .is_empty()
        );
    }

    #[test]
    fn test_empty_library_yields_nothing() {
        let identifier = identifier_with(
            LicenseLibrary::from_licenses(Vec::new()),
            single_threaded().build().unwrap(),
        );
        assert!(
            identifier
                .analyze_source(&Source::from_lines(["alpha"]))
                .is_empty()
        );
    }

    #[test]
    fn test_match_result_regions_and_rank() {
        let library = LicenseLibrary::from_licenses([License::from_lines(
            "test_license",
            ["one two three four"],
        )]);
        let config = single_threaded()
            .context_lines(1)
            .include_original_region(true)
            .build()
            .unwrap();
        let identifier = identifier_with(library, config);

        let results = identifier.analyze_source(&Source::from_text(
            "zero\none two three four\nfive\nsix\nseven",
        ));
        assert_eq!(results.len(), 1);

        let result = &results[0];
        assert_eq!(result.matched_license, "test_license");
        assert_eq!(result.score, 1.0);
        assert_eq!(result.rank, Rank::Bucket(5));
        assert_eq!((result.start_line, result.end_line), (0, 3));
        assert_eq!((result.start_offset, result.end_offset), (0, 29));
        assert_eq!(result.found_region, "zero\r\none two three four\r\nfive\r\n");
        assert_eq!(
            result.original_region.as_deref(),
            Some("one two three four\r\n")
        );
    }

    #[test]
    fn test_low_score_is_out_of_range_rank() {
        let library = LicenseLibrary::from_licenses([License::from_lines(
            "numbers",
            ["one two three four five six seven eight nine ten"],
        )]);
        let config = single_threaded().threshold(0.0).build().unwrap();
        let identifier = identifier_with(library, config);

        let results = identifier.analyze_source(&Source::from_lines(["one"]));
        assert_eq!(results.len(), 1);
        assert!(results[0].score < 0.06);
        assert_eq!(results[0].rank, Rank::ScoreOutOfRange);
        assert!(results[0].original_region.is_none());
    }

    #[test]
    fn test_offsets_slice_the_file_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let library = LicenseLibrary::from_licenses([License::from_lines(
            "test_license",
            ["one two three four"],
        )]);
        let identifier = identifier_with(library, single_threaded().build().unwrap());

        let latin1: &[u8] = b"caf\xE9 \xE9\xE9\none two three four\nend\n";
        let with_bom: &[u8] = b"\xEF\xBB\xBFzero\none two three four\n";
        for (name, content) in [("latin1.c", latin1), ("bom.c", with_bom)] {
            let path = dir.path().join(name);
            std::fs::write(&path, content).unwrap();

            let results = identifier.analyze_file(&path).unwrap();
            assert_eq!(results.len(), 1, "{}", name);
            let result = &results[0];
            assert_eq!((result.start_line, result.end_line), (1, 2), "{}", name);
            assert_eq!((result.start_offset, result.end_offset), (8, 27), "{}", name);
            assert_eq!(
                &content[result.start_offset..result.end_offset],
                b"one two three four\n"
            );
        }
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = IdentifierConfig {
            keep_fraction_of_best: 2.0,
            ..IdentifierConfig::default()
        };
        let err = LicenseIdentifier::new(Arc::new(three_license_library()), config)
            .err()
            .unwrap();
        assert!(matches!(
            err.downcast_ref::<LicenseIdError>(),
            Some(LicenseIdError::InvalidConfig(_))
        ));
    }
}
