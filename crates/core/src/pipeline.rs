//! Batch trimming over a `tables/<name>/<name>.csv` layout.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;
use serde::Serialize;
use tracing::{error, info, warn};
use walkdir::WalkDir;

use crate::error::{PrepError, Result};
use crate::trim::{trim_file, TrimOutcome};
use crate::{DEFAULT_MAX_ROWS, METADATA_DIR};

/// Configuration for a batch trim.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub max_rows: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_rows: DEFAULT_MAX_ROWS,
        }
    }
}

/// One table directory and its sample CSV.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableFile {
    pub name: String,
    pub dir: PathBuf,
    pub csv: PathBuf,
}

/// A table whose trim failed.
#[derive(Debug, Clone, Serialize)]
pub struct TrimFailure {
    pub path: PathBuf,
    pub error: String,
}

/// Result of trimming every table under a root.
#[derive(Debug, Serialize)]
pub struct TrimSummary {
    pub total_tables: usize,
    pub trimmed: usize,
    pub failed: usize,
    pub short_tables: usize,
    pub unbalanced_tables: usize,
    pub outcomes: Vec<TrimOutcome>,
    pub failures: Vec<TrimFailure>,
}

/// The sample CSV of the table directory `dir`, if it follows the layout.
pub fn table_file(dir: &Path) -> Option<TableFile> {
    let name = dir.file_name()?.to_str()?.to_string();
    let csv = dir.join(format!("{}.csv", name));
    Some(TableFile {
        name,
        dir: dir.to_path_buf(),
        csv,
    })
}

/// Table directories directly under `root`, sorted by name.
///
/// The `metadata` directory is skipped. Directories are returned even when
/// their sample CSV is missing so callers can report them. Failing to list
/// `root` is an error; unreadable entries below it are logged and skipped.
pub fn table_dirs(root: &Path) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(PrepError::NotADirectory(root.to_path_buf()));
    }
    let mut dirs = Vec::new();
    for entry in WalkDir::new(root).min_depth(1).max_depth(1) {
        let entry = match entry {
            Ok(entry) => entry,
            // The root itself could not be listed.
            Err(err) if err.path() == Some(root) => return Err(PrepError::io(root, err.into())),
            Err(err) => {
                warn!("skipping unreadable entry under {:?}: {}", root, err);
                continue;
            }
        };
        if entry.file_type().is_dir() && entry.file_name() != METADATA_DIR {
            dirs.push(entry.into_path());
        }
    }
    dirs.sort();
    Ok(dirs)
}

/// Discover every table under `root` that holds its `<name>.csv` sample.
pub fn discover_tables(root: &Path) -> Result<Vec<TableFile>> {
    let tables = table_dirs(root)?
        .iter()
        .filter_map(|dir| table_file(dir))
        .filter(|table| {
            let present = table.csv.is_file();
            if !present {
                warn!("no sample CSV in {:?}, skipping", table.dir);
            }
            present
        })
        .collect();
    Ok(tables)
}

/// Trim every table under `root` to `config.max_rows` rows.
///
/// Each file is trimmed on its own; distinct tables run in parallel. A failed
/// table is logged and reported without stopping the others.
pub fn trim_all(root: &Path, config: &PipelineConfig) -> Result<TrimSummary> {
    let tables = discover_tables(root)?;
    let total_tables = tables.len();
    if total_tables == 0 {
        warn!("no tables found under {:?}", root);
    }

    let processed_count = AtomicUsize::new(0);
    let results: Vec<std::result::Result<TrimOutcome, TrimFailure>> = tables
        .into_par_iter()
        .map(|table| {
            let result = trim_file(&table.csv, config.max_rows);
            let count = processed_count.fetch_add(1, Ordering::Relaxed) + 1;
            if count % 100 == 0 || count == total_tables {
                info!("processed {}/{} tables", count, total_tables);
            }
            result.map_err(|e| {
                error!("failed to trim {:?}: {}", table.csv, e);
                TrimFailure {
                    path: table.csv,
                    error: e.to_string(),
                }
            })
        })
        .collect();

    let mut outcomes = Vec::new();
    let mut failures = Vec::new();
    for result in results {
        match result {
            Ok(outcome) => outcomes.push(outcome),
            Err(failure) => failures.push(failure),
        }
    }

    if !failures.is_empty() {
        warn!("{} tables failed to trim", failures.len());
    }

    Ok(TrimSummary {
        total_tables,
        trimmed: outcomes.len(),
        failed: failures.len(),
        short_tables: outcomes.iter().filter(|o| o.is_short()).count(),
        unbalanced_tables: outcomes.iter().filter(|o| o.has_unbalanced_quotes()).count(),
        outcomes,
        failures,
    })
}

/// Write a summary as pretty-printed JSON.
pub fn write_summary<T: Serialize>(summary: &T, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(summary)
        .map_err(|e| PrepError::write(path, e.into()))?;
    std::fs::write(path, json).map_err(|e| PrepError::write(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::count::count_rows;
    use std::fs;
    use tempfile::TempDir;

    fn add_table(root: &Path, name: &str, contents: &str) -> PathBuf {
        let dir = root.join(name);
        fs::create_dir_all(&dir).unwrap();
        let csv = dir.join(format!("{}.csv", name));
        fs::write(&csv, contents).unwrap();
        csv
    }

    #[test]
    fn test_discover_tables() {
        let temp = TempDir::new().unwrap();
        add_table(temp.path(), "beta", "h\n");
        add_table(temp.path(), "alpha", "h\n");
        add_table(temp.path(), "metadata", "h\n");
        fs::create_dir_all(temp.path().join("empty")).unwrap();
        fs::write(temp.path().join("loose.csv"), "h\n").unwrap();

        let tables = discover_tables(temp.path()).unwrap();
        let names: Vec<_> = tables.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "beta"]);
        assert_eq!(tables[0].csv, temp.path().join("alpha").join("alpha.csv"));
    }

    #[test]
    fn test_discover_requires_directory() {
        let temp = TempDir::new().unwrap();
        let err = discover_tables(&temp.path().join("missing")).unwrap_err();
        assert!(matches!(err, PrepError::NotADirectory(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_unlistable_root_is_an_error() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let root = temp.path().join("tables");
        add_table(&root, "t", "h\n");
        fs::set_permissions(&root, fs::Permissions::from_mode(0o000)).unwrap();

        // Privileged users can list the directory anyway; nothing to check then.
        if fs::read_dir(&root).is_err() {
            let err = table_dirs(&root).unwrap_err();
            assert!(matches!(err, PrepError::Io { .. }));
        }

        fs::set_permissions(&root, fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[test]
    fn test_trim_all() {
        let temp = TempDir::new().unwrap();
        let long = add_table(temp.path(), "long", "h\n1\n2\n\"3\n3\"\n4\n");
        let short = add_table(temp.path(), "short", "h\n1\n");

        let config = PipelineConfig { max_rows: 3 };
        let summary = trim_all(temp.path(), &config).unwrap();

        assert_eq!(summary.total_tables, 2);
        assert_eq!(summary.trimmed, 2);
        assert_eq!(summary.failed, 0);
        assert_eq!(summary.short_tables, 1);
        assert_eq!(count_rows(&long).unwrap().rows, 3);
        assert_eq!(fs::read_to_string(&long).unwrap(), "h\n1\n2\n\"3\n3\"\n");
        assert_eq!(fs::read_to_string(&short).unwrap(), "h\n1\n");
    }

    #[test]
    fn test_write_summary() {
        let temp = TempDir::new().unwrap();
        add_table(temp.path(), "t", "h\n1\n");
        let summary = trim_all(temp.path(), &PipelineConfig::default()).unwrap();

        let report = temp.path().join("report.json");
        write_summary(&summary, &report).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&report).unwrap()).unwrap();
        assert_eq!(json["total_tables"], 1);
        assert_eq!(json["outcomes"][0]["warnings"][0]["kind"], "row_shortage");
        assert_eq!(json["outcomes"][0]["warnings"][0]["requested"], 65536);
    }
}
