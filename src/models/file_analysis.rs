use derive_builder::Builder;
use serde::Serialize;

use crate::identifier::rank::Rank;

/// Description of each [`MatchResult`] field, in column order.
pub const MATCH_FIELD_DESCRIPTIONS: [(&str, &str); 11] = [
    ("input_path", "input file path"),
    ("matched_license", "matched license type"),
    ("score", "Score using whole input test"),
    ("rank", "Rank based on score"),
    ("start_line", "Start line number"),
    ("end_line", "End line number"),
    ("start_offset", "Start byte offset"),
    ("end_offset", "End byte offset"),
    ("region_score", "Score using only the license text portion"),
    ("found_region", "Found license text"),
    ("original_region", "Matched license text without context"),
];

/// One license found in one region of an input.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    pub input_path: String,
    pub matched_license: String,
    /// Whole-document n-gram score of the matched license.
    pub score: f64,
    pub rank: Rank,
    pub start_line: usize,
    pub end_line: usize,
    pub start_offset: usize,
    pub end_offset: usize,
    pub region_score: f64,
    /// Region lines with context, CRLF terminated.
    pub found_region: String,
    /// Region lines without context, when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_region: Option<String>,
}

/// Matches and errors for one scanned file.
#[derive(Debug, Clone, PartialEq, Builder, Serialize)]
#[builder(build_fn(skip))]
pub struct FileAnalysis {
    pub path: String,
    #[builder(default)]
    pub matches: Vec<MatchResult>,
    #[builder(default)]
    pub scan_errors: Vec<String>,
}

impl FileAnalysisBuilder {
    pub fn build(&self) -> Result<FileAnalysis, String> {
        Ok(FileAnalysis {
            path: self.path.clone().ok_or("Missing field: path")?,
            matches: self.matches.clone().unwrap_or_default(),
            scan_errors: self.scan_errors.clone().unwrap_or_default(),
        })
    }
}
