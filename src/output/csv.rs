use std::collections::BTreeMap;
use std::io::Write;

use anyhow::{Context, Result};

use crate::models::{FileAnalysis, MATCH_FIELD_DESCRIPTIONS, MatchResult};

/// Longest text kept in one cell, leaving headroom under the 32767
/// character cell limit of spreadsheet applications.
pub const COLUMN_LIMIT: usize = 32767 - 100;

const FORMULA_PREFIXES: [char; 4] = ['+', '-', '@', '='];

/// Write one row per match, files in map order.
pub fn write_csv<W: Write>(
    writer: W,
    results: &BTreeMap<String, FileAnalysis>,
    include_original_region: bool,
) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    let header: Vec<&str> = MATCH_FIELD_DESCRIPTIONS
        .iter()
        .filter(|(key, _)| include_original_region || *key != "original_region")
        .map(|(_, description)| *description)
        .collect();
    csv_writer
        .write_record(&header)
        .context("Failed to write CSV header")?;

    for analysis in results.values() {
        for result in &analysis.matches {
            csv_writer
                .write_record(csv_row(result, include_original_region))
                .with_context(|| format!("Failed to write CSV row for {}", analysis.path))?;
        }
    }

    csv_writer.flush().context("Failed to flush CSV output")?;
    Ok(())
}

fn csv_row(result: &MatchResult, include_original_region: bool) -> Vec<String> {
    let mut row = vec![
        escape_text(&result.input_path),
        truncate_column(&result.matched_license),
        result.score.to_string(),
        result.rank.to_string(),
        result.start_line.to_string(),
        result.end_line.to_string(),
        result.start_offset.to_string(),
        result.end_offset.to_string(),
        result.region_score.to_string(),
        escape_text(&result.found_region),
    ];
    if include_original_region {
        row.push(escape_text(result.original_region.as_deref().unwrap_or_default()));
    }
    row
}

/// Keep spreadsheet applications from reading a cell as a formula.
fn escape_text(value: &str) -> String {
    if value.starts_with(FORMULA_PREFIXES) {
        truncate_column(&format!(" {}", value))
    } else {
        truncate_column(value)
    }
}

pub fn truncate_column(value: &str) -> String {
    value.chars().take(COLUMN_LIMIT).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifier::Rank;

    fn sample_results(found_region: &str) -> BTreeMap<String, FileAnalysis> {
        let result = MatchResult {
            input_path: "test1.py".to_string(),
            matched_license: "test_license".to_string(),
            score: 1.0,
            rank: Rank::Bucket(5),
            start_line: 1,
            end_line: 2,
            start_offset: 5,
            end_offset: 24,
            region_score: 1.0,
            found_region: found_region.to_string(),
            original_region: Some("one two three four\r\n".to_string()),
        };
        BTreeMap::from([(
            "test1.py".to_string(),
            FileAnalysis {
                path: "test1.py".to_string(),
                matches: vec![result],
                scan_errors: Vec::new(),
            },
        )])
    }

    fn render(results: &BTreeMap<String, FileAnalysis>, include_original: bool) -> String {
        let mut buffer = Vec::new();
        write_csv(&mut buffer, results, include_original).unwrap();
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn test_csv_header_and_row() {
        let output = render(&sample_results("one two three four\r\n"), false);
        let mut reader = csv::Reader::from_reader(output.as_bytes());

        let header: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
        assert_eq!(header.len(), 10);
        assert_eq!(header[0], "input file path");
        assert_eq!(header[9], "Found license text");

        let rows: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(&rows[0][1], "test_license");
        assert_eq!(&rows[0][3], "5");
        assert_eq!(&rows[0][6], "5");
        assert_eq!(&rows[0][7], "24");
        assert_eq!(&rows[0][9], "one two three four\r\n");
    }

    #[test]
    fn test_csv_includes_original_region_on_request() {
        let output = render(&sample_results("x\r\n"), true);
        let mut reader = csv::Reader::from_reader(output.as_bytes());
        assert_eq!(
            reader.headers().unwrap().get(10),
            Some("Matched license text without context")
        );
        let row = reader.records().next().unwrap().unwrap();
        assert_eq!(&row[10], "one two three four\r\n");
    }

    #[test]
    fn test_formula_like_text_is_prefixed() {
        let output = render(&sample_results("=SUM(A1)\r\n"), false);
        let mut reader = csv::Reader::from_reader(output.as_bytes());
        let row = reader.records().next().unwrap().unwrap();
        assert_eq!(&row[9], " =SUM(A1)\r\n");
    }

    #[test]
    fn test_truncate_column() {
        let long = "a".repeat(40000);
        assert_eq!(truncate_column(&long).chars().count(), COLUMN_LIMIT);
        assert_eq!(truncate_column("short"), "short");
    }
}
