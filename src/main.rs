use std::fs::File;
use std::io::{self, BufWriter};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use log::{LevelFilter, info};

use license_identifier::cli::Cli;
use license_identifier::identifier::{
    IdentifierConfig, IdentifierConfigBuilder, LicenseIdentifier, LicenseLibrary, Parallelism,
    SimilarityKind, Strategy,
};
use license_identifier::output::{create_output, write_output};
use license_identifier::scanner::process;
use license_identifier::utils::file::{compile_exclude_patterns, files_from_path};

fn main() {
    if let Err(err) = run() {
        eprintln!("Error: {:#}", err);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log);
    let start_time = Utc::now();

    // Rejected before any input is read.
    let config = build_config(&cli)?;
    let library = Arc::new(load_library(&cli)?);
    let identifier = LicenseIdentifier::new(Arc::clone(&library), config)?;

    let exclude_patterns = compile_exclude_patterns(&cli.exclude);
    info!("Exclusion patterns: {:?}", cli.exclude);
    let files = files_from_path(Path::new(&cli.input_path), &exclude_patterns)?;
    info!("Found {} files to analyze", files.len());

    let progress_bar = create_progress_bar(files.len());
    let scan_result = process(&identifier, &files, Some(&progress_bar))?;
    progress_bar.finish_with_message("Scan complete!");

    let output = create_output(start_time, Utc::now(), scan_result.files, library.len());
    match &cli.output_file_path {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file {}", path))?;
            write_output(
                cli.output_format,
                BufWriter::new(file),
                &output,
                cli.matched_text_without_context,
            )?;
            info!("{} output written to {}", cli.output_format, path);
        }
        None => write_output(
            cli.output_format,
            io::stdout().lock(),
            &output,
            cli.matched_text_without_context,
        )?,
    }
    Ok(())
}

fn init_logging(level: LevelFilter) {
    env_logger::Builder::new()
        .filter_level(level)
        .format_timestamp(None)
        .init();
}

fn build_config(cli: &Cli) -> Result<IdentifierConfig> {
    let parallelism = if cli.single_thread {
        Parallelism::SingleThreaded
    } else {
        Parallelism::default()
    };

    let config = IdentifierConfigBuilder::default()
        .threshold(cli.threshold)
        .keep_fraction_of_best(cli.keep_fraction_of_best)
        .context_lines(cli.context)
        .overshoot(cli.overshoot)
        .strategy(Strategy::from_name(&cli.location_strategy)?)
        .similarity(SimilarityKind::from_name(&cli.location_similarity)?)
        .penalty_only_source(cli.penalty_only_source)
        .penalty_only_license(cli.penalty_only_license)
        .punct_weight(cli.punct_weight)
        .include_original_region(cli.matched_text_without_context)
        .parallelism(parallelism)
        .build()?;
    Ok(config)
}

fn load_library(cli: &Cli) -> Result<LicenseLibrary> {
    match (&cli.license_folder, &cli.pickle_file_path) {
        (Some(folder), cache) => {
            let library = LicenseLibrary::from_path(Path::new(folder))?;
            if let Some(cache) = cache {
                library.serialize(Path::new(cache))?;
                info!("License library cached at {}", cache);
            }
            Ok(library)
        }
        (None, Some(cache)) => LicenseLibrary::deserialize(Path::new(cache)),
        (None, None) => bail!("Either a license folder or a library cache is required"),
    }
}

fn create_progress_bar(total_files: usize) -> ProgressBar {
    let progress_bar = ProgressBar::new(total_files as u64);
    match ProgressStyle::default_bar().template(
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files processed ({eta})",
    ) {
        Ok(style) => progress_bar.set_style(style.progress_chars("#>-")),
        Err(e) => log::warn!("Failed to create progress bar style: {}", e),
    }
    progress_bar
}
