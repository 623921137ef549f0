//! Core preparation logic for benchmark CSV tables.
//!
//! Tables live in a `tables/<name>/<name>.csv` layout. This crate trims each
//! sample down to an exact number of logical rows (quoted fields may span
//! several physical lines), counts and verifies rows, prunes tables that are
//! too small or too large, checks that a staging directory holds every file
//! its `metadata.csv` lists, and normalizes table names for the filesystem.

mod error;
mod naming;
mod scan;

pub mod count;
pub mod metadata;
pub mod pipeline;
pub mod prune;
pub mod trim;

pub use count::{count_rows, count_rows_in, verify_row_count, RowCount};
pub use error::{PrepError, Result};
pub use metadata::{check_metadata, MetadataEntry, MetadataReport, Presence};
pub use naming::{normalize_table_names, sanitize_table_name, Rename};
pub use pipeline::{
    discover_tables, trim_all, write_summary, PipelineConfig, TableFile, TrimFailure, TrimSummary,
};
pub use prune::{prune_tables, PruneAction, PruneConfig, PruneReport, RemovalReason, TableDecision};
pub use scan::{QuoteParity, QUOTE};
pub use trim::{trim_file, trim_stream, TrimOutcome, TrimStats, TrimWarning};

/// Default number of logical rows kept per table (64 Ki).
pub const DEFAULT_MAX_ROWS: usize = 64 * 1024;

/// Default ceiling on a sample CSV's size (100 MiB).
pub const DEFAULT_MAX_TABLE_BYTES: u64 = 100 * 1024 * 1024;

/// Directory under the tables root that never holds a table.
pub const METADATA_DIR: &str = "metadata";
