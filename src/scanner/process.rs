use crate::identifier::{LicenseIdentifier, Parallelism};
use crate::models::{FileAnalysis, FileAnalysisBuilder};
use crate::scanner::ProcessResult;
use anyhow::{Context, Error};
use indicatif::ProgressBar;
use log::warn;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Analyze `files` with the identifier's configured parallelism.
///
/// Results are keyed by path; single-threaded and parallel runs produce the
/// same map.
pub fn process(
    identifier: &LicenseIdentifier,
    files: &[PathBuf],
    progress_bar: Option<&ProgressBar>,
) -> Result<ProcessResult, Error> {
    let analyze = |path: &PathBuf| {
        let analysis = process_file(identifier, path);
        if let Some(progress_bar) = progress_bar {
            progress_bar.inc(1);
        }
        analysis
    };

    let analyses: Vec<FileAnalysis> = match identifier.config().parallelism {
        Parallelism::SingleThreaded => files.iter().map(analyze).collect(),
        Parallelism::Workers(workers) => {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(workers)
                .build()
                .context("Failed to start worker pool")?;
            pool.install(|| files.par_iter().map(analyze).collect())
        }
    };

    let error_count = analyses.iter().filter(|a| !a.scan_errors.is_empty()).count();
    if error_count > 0 {
        warn!("{} file(s) could not be analyzed", error_count);
    }

    Ok(ProcessResult {
        files: analyses
            .into_iter()
            .map(|analysis| (analysis.path.clone(), analysis))
            .collect::<BTreeMap<_, _>>(),
    })
}

fn process_file(identifier: &LicenseIdentifier, path: &Path) -> FileAnalysis {
    let mut scan_errors: Vec<String> = vec![];
    let mut builder = FileAnalysisBuilder::default();

    match identifier.analyze_file(path) {
        Ok(matches) => {
            builder.matches(matches);
        }
        Err(e) => {
            warn!("Failed to analyze {}: {:#}", path.display(), e);
            scan_errors.push(format!("{:#}", e));
        }
    }

    builder
        .path(path.to_string_lossy().to_string())
        .scan_errors(scan_errors)
        .build()
        .unwrap_or_else(|missing| FileAnalysis {
            path: path.to_string_lossy().to_string(),
            matches: Vec::new(),
            scan_errors: vec![missing],
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifier::{IdentifierConfigBuilder, License, LicenseLibrary};
    use std::fs;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn identifier(parallelism: Parallelism) -> LicenseIdentifier {
        let library = LicenseLibrary::from_licenses([License::from_lines(
            "test_license",
            ["one two three four"],
        )]);
        let config = IdentifierConfigBuilder::default()
            .parallelism(parallelism)
            .build()
            .unwrap();
        LicenseIdentifier::new(Arc::new(library), config).unwrap()
    }

    #[test]
    fn test_unreadable_file_is_recorded_not_fatal() {
        let dir = tempdir().unwrap();
        let good = dir.path().join("good.py");
        fs::write(&good, "# one two three four\n").unwrap();
        let missing = dir.path().join("missing.py");

        let result = process(
            &identifier(Parallelism::SingleThreaded),
            &[good.clone(), missing.clone()],
            None,
        )
        .unwrap();

        let good_entry = &result.files[&good.to_string_lossy().to_string()];
        assert_eq!(good_entry.matches.len(), 1);
        assert!(good_entry.scan_errors.is_empty());

        let missing_entry = &result.files[&missing.to_string_lossy().to_string()];
        assert!(missing_entry.matches.is_empty());
        assert_eq!(missing_entry.scan_errors.len(), 1);
    }

    #[test]
    fn test_parallel_matches_single_threaded() {
        let dir = tempdir().unwrap();
        let mut files = Vec::new();
        for i in 0..8 {
            let path = dir.path().join(format!("file{}.py", i));
            fs::write(&path, format!("line {}\none two three four\nend\n", i)).unwrap();
            files.push(path);
        }

        let single = process(&identifier(Parallelism::SingleThreaded), &files, None).unwrap();
        let parallel = process(&identifier(Parallelism::Workers(4)), &files, None).unwrap();
        assert_eq!(single.files, parallel.files);
        assert_eq!(single.files.len(), 8);
    }
}
