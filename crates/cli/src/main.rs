//! CLI tool for preparing benchmark CSV tables.
//!
//! Each subcommand runs one stage of the preparation pipeline over local
//! files. Diagnostics are logged through `tracing` (set `RUST_LOG` to adjust);
//! summaries are printed to stdout and can be written as JSON with `--report`.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::info;

use csv_prep_core::{
    check_metadata, count_rows, normalize_table_names, prune_tables, trim_all, trim_file,
    verify_row_count, write_summary, PipelineConfig, PruneConfig, DEFAULT_MAX_ROWS,
    DEFAULT_MAX_TABLE_BYTES,
};

/// Prepare benchmark CSV tables.
#[derive(Parser, Debug)]
#[command(name = "csv-prep")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Log at debug level unless RUST_LOG is set
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Trim one CSV in place to its header plus the first N logical rows
    Trim {
        /// CSV file to rewrite
        path: PathBuf,

        /// Number of data rows to keep
        #[arg(long, default_value_t = DEFAULT_MAX_ROWS)]
        max_rows: usize,
    },

    /// Trim every tables/<name>/<name>.csv under a root directory
    TrimAll {
        /// Root directory holding one directory per table
        tables_dir: PathBuf,

        /// Number of data rows to keep per table
        #[arg(long, default_value_t = DEFAULT_MAX_ROWS)]
        max_rows: usize,

        /// Write a JSON summary to this path
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Count logical data rows in a CSV
    Count {
        /// CSV file to scan
        path: PathBuf,

        /// Fail unless the file holds exactly this many rows
        #[arg(long)]
        expect: Option<usize>,
    },

    /// Remove tables with too few rows or an oversized sample
    Prune {
        /// Root directory holding one directory per table
        tables_dir: PathBuf,

        /// Minimum number of data rows to keep a table
        #[arg(long, default_value_t = DEFAULT_MAX_ROWS)]
        min_rows: usize,

        /// Maximum sample size in bytes
        #[arg(long, default_value_t = DEFAULT_MAX_TABLE_BYTES)]
        max_bytes: u64,

        /// Table names to remove unconditionally
        #[arg(long = "force-remove", default_values_t = vec!["github_issues".to_string()])]
        forced_removals: Vec<String>,

        /// Report decisions without deleting anything
        #[arg(long)]
        dry_run: bool,

        /// Write a JSON report to this path
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Check that every file listed in <staging_dir>/metadata.csv is present
    CheckMetadata {
        /// Directory holding metadata.csv and the downloaded files
        staging_dir: PathBuf,
    },

    /// Rename table directories to filesystem-safe names
    Normalize {
        /// Root directory holding one directory per table
        tables_dir: PathBuf,

        /// Print planned renames without applying them
        #[arg(long)]
        dry_run: bool,
    },
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_level.into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn write_report<T: serde::Serialize>(report: &T, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(path) = path {
        write_summary(report, path)?;
        println!("  Report: {:?}", path);
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_logging(args.verbose);

    match args.command {
        Command::Trim { path, max_rows } => {
            let outcome = trim_file(&path, max_rows)?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }

        Command::TrimAll {
            tables_dir,
            max_rows,
            report,
        } => {
            info!("trimming tables under {:?} to {} rows", tables_dir, max_rows);
            let config = PipelineConfig { max_rows };
            let summary = trim_all(&tables_dir, &config)?;

            println!("\n[summary]");
            println!("  Tables found: {}", summary.total_tables);
            println!("  Trimmed: {}", summary.trimmed);
            println!("  Short (< {} rows): {}", max_rows, summary.short_tables);
            println!("  Unbalanced quotes: {}", summary.unbalanced_tables);
            println!("  Failed: {}", summary.failed);
            write_report(&summary, report.as_deref())?;

            if summary.failed > 0 {
                return Err(format!("{} tables failed to trim", summary.failed).into());
            }
        }

        Command::Count { path, expect } => {
            let count = match expect {
                Some(expected) => verify_row_count(&path, expected)?,
                None => count_rows(&path)?,
            };
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({
                    "path": path.to_string_lossy(),
                    "rows": count.rows,
                    "physical_lines": count.physical_lines,
                    "unterminated_tail": count.unterminated_tail,
                    "unbalanced_quotes": count.unbalanced_quotes,
                }))?
            );
        }

        Command::Prune {
            tables_dir,
            min_rows,
            max_bytes,
            forced_removals,
            dry_run,
            report,
        } => {
            let config = PruneConfig {
                min_rows,
                max_bytes,
                forced_removals,
                dry_run,
            };
            info!("pruning tables under {:?}", tables_dir);
            let result = prune_tables(&tables_dir, &config)?;

            println!("\n[summary]");
            if dry_run {
                println!("  Dry run: nothing deleted");
            }
            println!("  Tables examined: {}", result.decisions.len());
            println!("  Kept: {}", result.kept());
            println!("  Removed: {}", result.removed());
            write_report(&result, report.as_deref())?;
        }

        Command::CheckMetadata { staging_dir } => {
            let result = check_metadata(&staging_dir)?;
            let missing: Vec<_> = result.missing().map(|e| e.filename.as_str()).collect();
            if !missing.is_empty() {
                for name in &missing {
                    println!("  MISSING {}", name);
                }
                return Err(format!("{} file(s) missing", missing.len()).into());
            }
            println!("All {} files present.", result.entries.len());
        }

        Command::Normalize { tables_dir, dry_run } => {
            let renames = normalize_table_names(&tables_dir, dry_run)?;
            for rename in &renames {
                println!("  {:?} -> {:?}", rename.from, rename.to);
            }
            println!("{} table(s) renamed{}", renames.len(), if dry_run { " (dry run)" } else { "" });
        }
    }

    Ok(())
}
