//! Append-only per-run index log: one JSON file per `index_repository`/
//! `index_files` call under `<data_dir>/logs/index/`, per the persistent
//! layout in spec.md §6 (`var/storage/logs/index/*.json`).

use archivist_core::constants::INDEX_RUN_LOG_SUBDIR;
use archivist_core::error::StateError;
use archivist_core::types::{IndexFileError, IndexStats};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// `details` half of a run log record: the file lists a reader can't
/// reconstruct from `summary`'s counts alone.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunLogDetails {
    pub indexed: Vec<String>,
    pub skipped: Vec<String>,
    pub failed: Vec<IndexFileError>,
}

/// One append-only run-log record: `{ timestamp, summary, details }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexRunLog {
    pub timestamp: String,
    pub summary: IndexStats,
    pub details: RunLogDetails,
}

impl IndexRunLog {
    pub fn from_stats(timestamp: String, stats: &IndexStats) -> Self {
        Self {
            timestamp,
            summary: stats.clone(),
            details: RunLogDetails {
                indexed: stats.indexed_files.clone(),
                skipped: stats.skipped_files.clone(),
                failed: stats.errors.clone(),
            },
        }
    }
}

/// Serialize `log` to `<data_dir>/logs/index/<unix_secs>.json`. Never
/// overwrites a prior run's file: each run gets its own timestamped name, so
/// the directory accumulates one entry per run (append-only at the
/// directory level).
pub fn write_run_log(data_dir: &Path, log: &IndexRunLog, unix_secs: u64) -> Result<PathBuf, StateError> {
    let dir = data_dir.join(INDEX_RUN_LOG_SUBDIR);
    std::fs::create_dir_all(&dir).map_err(StateError::Io)?;
    let path = dir.join(format!("{unix_secs}.json"));
    let json = serde_json::to_vec_pretty(log).map_err(|e| StateError::Serialization(e.to_string()))?;
    std::fs::write(&path, json).map_err(StateError::Io)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_stats() -> IndexStats {
        let mut stats = IndexStats {
            total: 2,
            fresh: 1,
            stale: 1,
            indexed: 2,
            embedded: 2,
            ..Default::default()
        };
        stats.indexed_files = vec!["src/a.rs".to_string(), "src/b.rs".to_string()];
        stats.errors.push(IndexFileError {
            file: "src/broken.rs".to_string(),
            error: "parse failed".to_string(),
        });
        stats.finalize();
        stats
    }

    #[test]
    fn write_run_log_creates_timestamped_json_file() {
        let dir = tempdir().unwrap();
        let stats = sample_stats();
        let log = IndexRunLog::from_stats("2024-01-15T12:30:45Z".to_string(), &stats);

        let path = write_run_log(dir.path(), &log, 1_705_321_845).unwrap();
        assert!(path.ends_with("logs/index/1705321845.json"));

        let contents = std::fs::read_to_string(&path).unwrap();
        let parsed: IndexRunLog = serde_json::from_str(&contents).unwrap();
        assert_eq!(parsed.timestamp, "2024-01-15T12:30:45Z");
        assert_eq!(parsed.details.indexed, vec!["src/a.rs", "src/b.rs"]);
        assert_eq!(parsed.details.failed.len(), 1);
        assert_eq!(parsed.summary.total, 2);
    }

    #[test]
    fn successive_runs_append_separate_files_without_overwriting() {
        let dir = tempdir().unwrap();
        let stats = sample_stats();
        let first = IndexRunLog::from_stats("2024-01-15T12:30:45Z".to_string(), &stats);
        let second = IndexRunLog::from_stats("2024-01-15T12:31:10Z".to_string(), &stats);

        write_run_log(dir.path(), &first, 1_705_321_845).unwrap();
        write_run_log(dir.path(), &second, 1_705_321_870).unwrap();

        let mut entries: Vec<String> = std::fs::read_dir(dir.path().join("logs/index"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        entries.sort();
        assert_eq!(entries, vec!["1705321845.json", "1705321870.json"]);
    }
}
