use std::collections::BTreeMap;
use std::io::Write;

use anyhow::Result;

use crate::models::{FileAnalysis, MatchResult};

/// Print a readable summary block for every match.
pub fn write_easy_read<W: Write>(
    mut writer: W,
    results: &BTreeMap<String, FileAnalysis>,
) -> Result<()> {
    for (path, analysis) in results {
        writeln!(
            writer,
            "=== Found {} results for '{}':",
            analysis.matches.len(),
            path
        )?;
        for error in &analysis.scan_errors {
            writeln!(writer, "Error: {}", error)?;
        }
        for result in &analysis.matches {
            write!(writer, "{}", display_block(result))?;
        }
    }
    writer.flush()?;
    Ok(())
}

fn display_block(result: &MatchResult) -> String {
    let mut block = format!(
        "Summary of the analysis\n\n\
         Name of the input file: {}\n\
         Matched license type is {}\n\
         Score for the match is {:.3}\n\
         Rank for the match is {}\n\
         License text begins at line {}.\n\
         License text ends at line {}.\n\
         Start byte offset for the license text is {}.\n\
         End byte offset for the license text is {}.\n\
         The found license text has the score of {:.3}\n\
         The following text is found to be license text\n\
         -----BEGIN-----\n\
         {}\
         -----END-----\n",
        result.input_path,
        result.matched_license,
        result.score,
        result.rank,
        result.start_line,
        result.end_line,
        result.start_offset,
        result.end_offset,
        result.region_score,
        result.found_region,
    );

    if let Some(original_region) = &result.original_region {
        block.push_str(
            "The following text is found to be original matched license text without context\n\
             -----BEGIN-----\n",
        );
        block.push_str(original_region);
        block.push_str("-----END-----\n");
    }
    block.push('\n');
    block
}
