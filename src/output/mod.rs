//! Result renderers.

mod csv;
mod easy_read;
mod json;

use std::io::Write;

use anyhow::Result;
use clap::ValueEnum;
use strum::Display;

use crate::models::Output;

pub use self::csv::{COLUMN_LIMIT, truncate_column, write_csv};
pub use self::easy_read::write_easy_read;
pub use self::json::{create_output, write_json};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Display)]
#[value(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Csv,
    EasyRead,
    Json,
}

/// Render `output` in the chosen format.
pub fn write_output<W: Write>(
    format: OutputFormat,
    writer: W,
    output: &Output,
    include_original_region: bool,
) -> Result<()> {
    match format {
        OutputFormat::Csv => write_csv(writer, &output.files, include_original_region),
        OutputFormat::EasyRead => write_easy_read(writer, &output.files),
        OutputFormat::Json => write_json(writer, output),
    }
}
