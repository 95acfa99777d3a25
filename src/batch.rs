use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{info, warn};
use rayon::prelude::*;

use crate::analysis::FileAnalyzer;
use crate::config::{Config, FailurePolicy};
use crate::export::write_diagnostics;
use crate::store::RecordStore;

/// Outcome of a batch run.
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub processed: usize,
    /// `(filename, error chain)` of every isolated failure.
    pub failed: Vec<(String, String)>,
}

/// Recordings under `root` with the given extension, sorted by name.
pub fn list_recordings(root: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let entries =
        std::fs::read_dir(root).with_context(|| format!("listing {}", root.display()))?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry
            .with_context(|| format!("listing {}", root.display()))?
            .path();
        let matches = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(extension));
        if matches && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Analyse every file and insert its record into `store`. Diagnostics go to
/// `config.batch.diagnostics_dir` when it is set.
///
/// Under [`FailurePolicy::Isolate`] a failing file is logged and counted;
/// under [`FailurePolicy::FailFast`] the first failure is returned.
pub fn run_batch(
    config: &Config,
    files: &[PathBuf],
    store: &RecordStore,
) -> Result<BatchSummary> {
    let analyzer = FileAnalyzer::new(config)?;
    let diagnostics_dir = config.batch.diagnostics_dir.as_deref();

    let process = |path: &PathBuf| -> Result<()> {
        let analysis = analyzer
            .analyze(path)
            .with_context(|| format!("analysing {}", path.display()))?;
        let record = &analysis.record;
        info!(
            "{}: ruct {} ({:+}% of nominal)",
            record.filename, record.ruct.ruct, record.ruct.ratio_pct
        );
        if let (Some(dir), Some(diag)) = (diagnostics_dir, &analysis.diagnostics) {
            write_diagnostics(dir, &record.filename, diag)?;
        }
        store.insert(record);
        Ok(())
    };

    match config.batch.on_failure {
        FailurePolicy::FailFast => {
            if config.batch.parallel {
                files.par_iter().try_for_each(process)?;
            } else {
                files.iter().try_for_each(process)?;
            }
            Ok(BatchSummary {
                processed: files.len(),
                failed: Vec::new(),
            })
        }
        FailurePolicy::Isolate => {
            let isolate = |path: &PathBuf| {
                process(path).err().map(|err| {
                    warn!("{err:#}");
                    (display_name(path), format!("{err:#}"))
                })
            };
            let failed: Vec<(String, String)> = if config.batch.parallel {
                files.par_iter().filter_map(isolate).collect()
            } else {
                files.iter().filter_map(isolate).collect()
            };
            Ok(BatchSummary {
                processed: files.len() - failed.len(),
                failed,
            })
        }
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::tests::{test_config, write_recording};

    const GOOD: [&str; 2] = [
        "V10_A45_M12_R01_spruce_hss_CH02.txt",
        "V10_A30_M12_R02_spruce_hss_CH02.txt",
    ];
    const BAD: &str = "V10_A45_M12_R03_spruce_hss_CH02.txt";

    fn setup(dir: &Path) -> Vec<PathBuf> {
        for name in GOOD {
            write_recording(&dir.join(name));
        }
        // Only the force burst: no distance peaks at all.
        let text: String = (0..4_000)
            .map(|i| {
                let f = if (1_500..1_600).contains(&i) { 30 } else { 0 };
                format!("0,{f},0,0\n")
            })
            .collect();
        std::fs::write(dir.join(BAD), text).unwrap();
        std::fs::write(dir.join("notes.md"), "not a recording").unwrap();
        list_recordings(dir, "txt").unwrap()
    }

    #[test]
    fn lists_only_matching_extension() {
        let dir = tempfile::tempdir().unwrap();
        let files = setup(dir.path());
        let names: Vec<String> = files.iter().map(|p| display_name(p)).collect();
        assert_eq!(names, vec![GOOD[1], GOOD[0], BAD]);
    }

    #[test]
    fn isolate_policy_continues_past_failures() {
        let dir = tempfile::tempdir().unwrap();
        let files = setup(dir.path());
        for parallel in [false, true] {
            let mut config = test_config(dir.path());
            config.batch.parallel = parallel;
            let store = RecordStore::default();

            let summary = run_batch(&config, &files, &store).unwrap();
            assert_eq!(summary.processed, 2);
            assert_eq!(summary.failed.len(), 1);
            assert_eq!(summary.failed[0].0, BAD);
            assert!(summary.failed[0].1.contains("signal localization failed"));

            let rows = store.into_rows();
            assert_eq!(rows.len(), 2);
            assert!(rows.iter().all(|r| r.uncut_chip_thickness_1 == 0.3));
        }
    }

    #[test]
    fn fail_fast_policy_stops() {
        let dir = tempfile::tempdir().unwrap();
        let files = setup(dir.path());
        let mut config = test_config(dir.path());
        config.batch.on_failure = FailurePolicy::FailFast;
        let store = RecordStore::default();
        assert!(run_batch(&config, &files, &store).is_err());
    }

    #[test]
    fn diagnostics_written_per_file() {
        let dir = tempfile::tempdir().unwrap();
        let files = setup(dir.path());
        let out = dir.path().join("ruct");
        let mut config = test_config(dir.path());
        config.batch.diagnostics_dir = Some(out.clone());

        run_batch(&config, &files, &RecordStore::default()).unwrap();
        let json = std::fs::read_to_string(out.join(
            "V10_A45_M12_R01_spruce_hss_CH02.json",
        ))
        .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["peaks"], serde_json::json!([514, 3014]));
    }
}
