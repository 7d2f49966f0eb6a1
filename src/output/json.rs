use std::collections::BTreeMap;
use std::env;
use std::io::Write;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use crate::models::{
    ExtraData, FileAnalysis, Header, OUTPUT_FORMAT_VERSION, Output, SystemEnvironment,
};

/// Wrap the per-file results with a run header.
pub fn create_output(
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    files: BTreeMap<String, FileAnalysis>,
    license_count: usize,
) -> Output {
    let duration = (end_time - start_time).num_nanoseconds().unwrap_or(0) as f64 / 1_000_000_000.0;

    let extra_data = ExtraData {
        files_count: files.len(),
        license_count,
        matches_count: files.values().map(|file| file.matches.len()).sum(),
        system_environment: SystemEnvironment {
            operating_system: sys_info::os_type().ok(),
            cpu_architecture: env::consts::ARCH.to_string(),
            platform: format!(
                "{}-{}-{}",
                sys_info::os_type().unwrap_or_else(|_| "unknown".to_string()),
                sys_info::os_release().unwrap_or_else(|_| "unknown".to_string()),
                env::consts::ARCH
            ),
            rust_version: rustc_version_runtime::version().to_string(),
        },
    };

    let errors: Vec<String> = files
        .values()
        .flat_map(|file| {
            file.scan_errors
                .iter()
                .map(move |error| format!("{}: {}", file.path, error))
        })
        .collect();

    Output {
        headers: vec![Header {
            start_timestamp: start_time.to_rfc3339(),
            end_timestamp: end_time.to_rfc3339(),
            duration,
            extra_data,
            errors,
            output_format_version: OUTPUT_FORMAT_VERSION.to_string(),
        }],
        files,
    }
}

pub fn write_json<W: Write>(mut writer: W, output: &Output) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, output).context("Failed to serialize JSON output")?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}
