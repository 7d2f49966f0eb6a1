mod file_analysis;
mod output;

pub use file_analysis::{FileAnalysis, FileAnalysisBuilder, MATCH_FIELD_DESCRIPTIONS, MatchResult};
pub use output::{ExtraData, Header, OUTPUT_FORMAT_VERSION, Output, SystemEnvironment};
