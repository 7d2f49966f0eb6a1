use clap::Parser;
use log::LevelFilter;

use crate::identifier::config::{
    DEFAULT_CONTEXT_LINES, DEFAULT_KEEP_FRACTION_OF_BEST, DEFAULT_OVERSHOOT, DEFAULT_THRESHOLD,
};
use crate::identifier::similarity::{
    DEFAULT_PENALTY_ONLY_LICENSE, DEFAULT_PENALTY_ONLY_SOURCE, DEFAULT_PUNCT_WEIGHT,
};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory of license templates (*.txt, plus an optional custom/ subdirectory)
    #[arg(short = 'L', long)]
    pub license_folder: Option<String>,

    /// Library cache; written when building from a license folder, read otherwise
    #[arg(short = 'P', long)]
    pub pickle_file_path: Option<String>,

    /// File or directory to analyze
    #[arg(short = 'I', long)]
    pub input_path: String,

    /// Minimum whole-document score for a candidate license
    #[arg(short = 'T', long, default_value_t = DEFAULT_THRESHOLD)]
    pub threshold: f64,

    /// Lines of context around each found region
    #[arg(short = 'C', long, default_value_t = DEFAULT_CONTEXT_LINES)]
    pub context: usize,

    /// Output format
    #[arg(short = 'F', long, value_enum, default_value_t = OutputFormat::Csv)]
    pub output_format: OutputFormat,

    /// Output file path; standard output when omitted
    #[arg(short = 'O', long)]
    pub output_file_path: Option<String>,

    /// Analyze files sequentially
    #[arg(short = 'S', long)]
    pub single_thread: bool,

    /// Keep candidates scoring at least this fraction of the best score
    #[arg(long, default_value_t = DEFAULT_KEEP_FRACTION_OF_BEST)]
    pub keep_fraction_of_best: f64,

    /// Log level
    #[arg(long, default_value_t = LevelFilter::Info)]
    pub log: LevelFilter,

    /// Also report the matched text without context lines
    #[arg(long)]
    pub matched_text_without_context: bool,

    /// Exclude patterns (glob patterns like "*.tmp" or "node_modules")
    #[arg(short, long, value_delimiter = ',')]
    pub exclude: Vec<String>,

    #[arg(long, hide = true, default_value = "one_line_then_expand")]
    pub location_strategy: String,

    #[arg(long, hide = true, default_value = "edit_weighted")]
    pub location_similarity: String,

    #[arg(long, hide = true, default_value_t = DEFAULT_PENALTY_ONLY_SOURCE)]
    pub penalty_only_source: f64,

    #[arg(long, hide = true, default_value_t = DEFAULT_PENALTY_ONLY_LICENSE)]
    pub penalty_only_license: f64,

    #[arg(long, hide = true, default_value_t = DEFAULT_PUNCT_WEIGHT)]
    pub punct_weight: f64,

    #[arg(long, hide = true, default_value_t = DEFAULT_OVERSHOOT)]
    pub overshoot: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["license-identifier", "-L", "licenses", "-I", "src"]).unwrap();
        assert_eq!(cli.license_folder.as_deref(), Some("licenses"));
        assert_eq!(cli.threshold, DEFAULT_THRESHOLD);
        assert_eq!(cli.output_format, OutputFormat::Csv);
        assert_eq!(cli.log, LevelFilter::Info);
        assert_eq!(cli.location_strategy, "one_line_then_expand");
        assert!(!cli.single_thread);
    }

    #[test]
    fn test_short_flags_and_formats() {
        let cli = Cli::try_parse_from([
            "license-identifier",
            "-P",
            "library.bin",
            "-I",
            "input",
            "-T",
            "0.1",
            "-C",
            "2",
            "-F",
            "easy_read",
            "-S",
            "--exclude",
            "*.tmp,target",
            "--log",
            "debug",
        ])
        .unwrap();
        assert_eq!(cli.pickle_file_path.as_deref(), Some("library.bin"));
        assert_eq!(cli.threshold, 0.1);
        assert_eq!(cli.context, 2);
        assert_eq!(cli.output_format, OutputFormat::EasyRead);
        assert!(cli.single_thread);
        assert_eq!(cli.exclude, vec!["*.tmp".to_string(), "target".to_string()]);
        assert_eq!(cli.log, LevelFilter::Debug);
    }

    #[test]
    fn test_input_path_is_required() {
        assert!(Cli::try_parse_from(["license-identifier", "-L", "licenses"]).is_err());
    }
}
