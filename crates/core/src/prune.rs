//! Removal of table directories too small or too large to benchmark.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use crate::count::count_rows;
use crate::error::{PrepError, Result};
use crate::pipeline::{table_dirs, table_file};
use crate::{DEFAULT_MAX_ROWS, DEFAULT_MAX_TABLE_BYTES};

/// Configuration for the pruner.
#[derive(Debug, Clone)]
pub struct PruneConfig {
    /// Tables with fewer logical data rows are removed.
    pub min_rows: usize,
    /// Tables whose sample CSV exceeds this many bytes are removed.
    pub max_bytes: u64,
    /// Table names removed unconditionally.
    pub forced_removals: Vec<String>,
    /// Report decisions without deleting anything.
    pub dry_run: bool,
}

impl Default for PruneConfig {
    fn default() -> Self {
        Self {
            min_rows: DEFAULT_MAX_ROWS,
            max_bytes: DEFAULT_MAX_TABLE_BYTES,
            forced_removals: vec!["github_issues".to_string()],
            dry_run: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RemovalReason {
    Forced,
    TooLarge { bytes: u64, max_bytes: u64 },
    TooFewRows { rows: usize, min_rows: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PruneAction {
    Kept { rows: usize, bytes: u64 },
    Removed(RemovalReason),
    Skipped { reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct TableDecision {
    pub name: String,
    pub dir: PathBuf,
    pub action: PruneAction,
}

#[derive(Debug, Serialize)]
pub struct PruneReport {
    pub dry_run: bool,
    pub decisions: Vec<TableDecision>,
}

impl PruneReport {
    pub fn removed(&self) -> usize {
        self.decisions
            .iter()
            .filter(|d| matches!(d.action, PruneAction::Removed(_)))
            .count()
    }

    pub fn kept(&self) -> usize {
        self.decisions
            .iter()
            .filter(|d| matches!(d.action, PruneAction::Kept { .. }))
            .count()
    }
}

fn decide(dir: &Path, name: &str, csv: &Path, config: &PruneConfig) -> PruneAction {
    if config.forced_removals.iter().any(|forced| forced == name) {
        return PruneAction::Removed(RemovalReason::Forced);
    }
    if !csv.is_file() {
        warn!("no sample CSV in {:?}, skipping", dir);
        return PruneAction::Skipped {
            reason: "missing sample CSV".to_string(),
        };
    }

    let bytes = match fs::metadata(csv) {
        Ok(meta) => meta.len(),
        Err(e) => {
            warn!("cannot stat {:?}: {}", csv, e);
            return PruneAction::Skipped {
                reason: e.to_string(),
            };
        }
    };
    if bytes > config.max_bytes {
        return PruneAction::Removed(RemovalReason::TooLarge {
            bytes,
            max_bytes: config.max_bytes,
        });
    }

    let rows = match count_rows(csv) {
        Ok(count) => count.rows,
        Err(e) => {
            warn!("cannot count rows of {:?}: {}", csv, e);
            return PruneAction::Skipped {
                reason: e.to_string(),
            };
        }
    };
    if rows < config.min_rows {
        return PruneAction::Removed(RemovalReason::TooFewRows {
            rows,
            min_rows: config.min_rows,
        });
    }

    PruneAction::Kept { rows, bytes }
}

/// Remove table directories under `root` that fail the size or row limits.
pub fn prune_tables(root: &Path, config: &PruneConfig) -> Result<PruneReport> {
    let mut decisions = Vec::new();

    for dir in table_dirs(root)? {
        let Some(table) = table_file(&dir) else {
            warn!("skipping {:?}: name is not valid UTF-8", dir);
            continue;
        };
        let action = decide(&table.dir, &table.name, &table.csv, config);

        match &action {
            PruneAction::Removed(reason) => {
                info!("removing {}: {:?}", table.name, reason);
                if !config.dry_run {
                    fs::remove_dir_all(&table.dir).map_err(|e| PrepError::io(&table.dir, e))?;
                }
            }
            PruneAction::Kept { rows, bytes } => {
                info!("keeping {}: {} rows, {} bytes", table.name, rows, bytes);
            }
            PruneAction::Skipped { .. } => {}
        }

        decisions.push(TableDecision {
            name: table.name,
            dir: table.dir,
            action,
        });
    }

    Ok(PruneReport {
        dry_run: config.dry_run,
        decisions,
    })
}
