//! Row-bounded CSV trimming.
//!
//! Reduces a CSV file to its header plus at most `max_rows` logical rows,
//! rewriting it in place through a temporary sibling file so a failed run
//! never leaves a half-written table behind.

use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{PrepError, Result};
use crate::scan::{next_line, QuoteParity};

/// Recoverable conditions noticed while trimming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TrimWarning {
    /// The input held fewer logical rows than requested.
    RowShortage { available: usize, requested: usize },
    /// The input ended inside an open quoted field; the partial row was kept.
    UnbalancedQuotes,
}

impl fmt::Display for TrimWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrimWarning::RowShortage {
                available,
                requested,
            } => write!(f, "{} < {} data rows available", available, requested),
            TrimWarning::UnbalancedQuotes => {
                write!(f, "input ended inside a quoted field; partial row kept")
            }
        }
    }
}

/// Counters from one pass over an input stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TrimStats {
    /// Completed logical rows copied after the header.
    pub rows_written: usize,
    /// Physical lines copied after the header.
    pub physical_lines: usize,
    /// True when the input ran out before the row limit stopped the copy.
    pub input_exhausted: bool,
    /// True when the input ended while a quoted field was still open.
    pub unbalanced_quotes: bool,
}

impl TrimStats {
    /// Warnings implied by these counters for a requested row limit.
    pub fn warnings(&self, max_rows: usize) -> Vec<TrimWarning> {
        let mut warnings = Vec::new();
        if self.rows_written < max_rows {
            warnings.push(TrimWarning::RowShortage {
                available: self.rows_written,
                requested: max_rows,
            });
        }
        if self.unbalanced_quotes {
            warnings.push(TrimWarning::UnbalancedQuotes);
        }
        warnings
    }
}

/// Result of trimming one file.
#[derive(Debug, Clone, Serialize)]
pub struct TrimOutcome {
    pub path: PathBuf,
    pub max_rows: usize,
    pub rows_written: usize,
    pub warnings: Vec<TrimWarning>,
}

impl TrimOutcome {
    pub fn is_short(&self) -> bool {
        self.warnings
            .iter()
            .any(|w| matches!(w, TrimWarning::RowShortage { .. }))
    }

    pub fn has_unbalanced_quotes(&self) -> bool {
        self.warnings.contains(&TrimWarning::UnbalancedQuotes)
    }
}

/// Which side of the copy failed.
enum CopyError {
    Read(io::Error),
    Write(io::Error),
}

impl From<CopyError> for io::Error {
    fn from(err: CopyError) -> Self {
        match err {
            CopyError::Read(e) | CopyError::Write(e) => e,
        }
    }
}

fn copy_rows<R, W>(reader: &mut R, writer: &mut W, max_rows: usize) -> std::result::Result<TrimStats, CopyError>
where
    R: BufRead + ?Sized,
    W: Write + ?Sized,
{
    let mut stats = TrimStats::default();
    let mut line = Vec::new();

    if next_line(reader, &mut line).map_err(CopyError::Read)? == 0 {
        stats.input_exhausted = true;
        return Ok(stats);
    }
    writer.write_all(&line).map_err(CopyError::Write)?;

    let mut parity = QuoteParity::new();
    while stats.rows_written < max_rows {
        if next_line(reader, &mut line).map_err(CopyError::Read)? == 0 {
            stats.input_exhausted = true;
            break;
        }
        writer.write_all(&line).map_err(CopyError::Write)?;
        stats.physical_lines += 1;
        if parity.feed(&line) {
            stats.rows_written += 1;
        }
    }

    stats.unbalanced_quotes = stats.input_exhausted && parity.in_quote();
    Ok(stats)
}

/// Copy the header and at most `max_rows` logical rows from `reader` to `writer`.
///
/// Input past the row limit is left unread.
pub fn trim_stream<R, W>(reader: &mut R, writer: &mut W, max_rows: usize) -> io::Result<TrimStats>
where
    R: BufRead + ?Sized,
    W: Write + ?Sized,
{
    Ok(copy_rows(reader, writer, max_rows)?)
}

/// Run `copy` from `path` into a temporary sibling, then rename the sibling
/// over `path`.
///
/// Both handles are closed before the temporary file is renamed or, on any
/// error, removed.
fn rewrite_in_place<F>(path: &Path, copy: F) -> Result<TrimStats>
where
    F: FnOnce(&mut BufReader<File>, &mut BufWriter<&File>) -> std::result::Result<TrimStats, CopyError>,
{
    let source = File::open(path).map_err(|e| PrepError::open(path, e))?;
    let permissions = source
        .metadata()
        .map_err(|e| PrepError::read(path, e))?
        .permissions();

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let tmp = tempfile::Builder::new()
        .prefix(".trim-")
        .suffix(".csv.tmp")
        .tempfile_in(dir)
        .map_err(|e| PrepError::io(dir, e))?;
    let (file, tmp_path) = tmp.into_parts();
    // Bound after `tmp_path` so the handle closes before the file is removed.
    let tmp_file = file;
    debug!("rewriting {:?} via {:?}", path, tmp_path);

    let stats = {
        let mut reader = BufReader::new(source);
        let mut writer = BufWriter::new(&tmp_file);
        let stats = copy(&mut reader, &mut writer).map_err(|err| match err {
            CopyError::Read(e) => PrepError::read(path, e),
            CopyError::Write(e) => PrepError::write(&*tmp_path, e),
        })?;
        writer.flush().map_err(|e| PrepError::write(&*tmp_path, e))?;
        stats
    };

    tmp_file
        .sync_all()
        .map_err(|e| PrepError::write(&*tmp_path, e))?;
    fs::set_permissions(&tmp_path, permissions).map_err(|e| PrepError::io(&*tmp_path, e))?;
    drop(tmp_file);

    tmp_path.persist(path).map_err(|e| PrepError::Persist {
        path: path.to_path_buf(),
        source: e.error,
    })?;
    Ok(stats)
}

/// Rewrite the CSV at `path` so it holds its header plus the first `max_rows`
/// logical rows.
///
/// The trimmed copy is written to a temporary file next to `path` and renamed
/// over it only after the whole pass succeeded. On any error the temporary file
/// is removed and the original is left untouched.
pub fn trim_file(path: impl AsRef<Path>, max_rows: usize) -> Result<TrimOutcome> {
    let path = path.as_ref();
    let stats = rewrite_in_place(path, |reader, writer| copy_rows(reader, writer, max_rows))?;

    let warnings = stats.warnings(max_rows);
    for warning in &warnings {
        warn!("{:?}: {}", path, warning);
    }
    info!(
        "trimmed {:?} to {} rows ({} physical lines)",
        path, stats.rows_written, stats.physical_lines
    );

    Ok(TrimOutcome {
        path: path.to_path_buf(),
        max_rows,
        rows_written: stats.rows_written,
        warnings,
    })
}
