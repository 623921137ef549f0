//! Logical row counting with the same quote-parity rule the trimmer uses.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use serde::Serialize;
use tracing::debug;

use crate::error::{PrepError, Result};
use crate::scan::{next_line, QuoteParity};

/// Row statistics for one CSV file, header excluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RowCount {
    pub rows: usize,
    pub physical_lines: usize,
    /// The last physical line had no terminator and was not counted.
    pub unterminated_tail: bool,
    /// The input ended inside an open quoted field.
    pub unbalanced_quotes: bool,
}

/// Count logical data rows in a stream.
pub fn count_rows_in<R: BufRead>(mut reader: R) -> io::Result<RowCount> {
    let mut count = RowCount::default();
    let mut line = Vec::new();

    if next_line(&mut reader, &mut line)? == 0 {
        return Ok(count);
    }

    let mut parity = QuoteParity::new();
    while next_line(&mut reader, &mut line)? > 0 {
        count.physical_lines += 1;
        if parity.feed(&line) {
            count.rows += 1;
        }
        count.unterminated_tail = line.last() != Some(&b'\n');
    }
    count.unbalanced_quotes = parity.in_quote();
    Ok(count)
}

/// Count logical data rows in the CSV at `path`.
pub fn count_rows(path: impl AsRef<Path>) -> Result<RowCount> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| PrepError::open(path, e))?;
    let count = count_rows_in(BufReader::new(file)).map_err(|e| PrepError::read(path, e))?;
    debug!("{:?}: {} rows in {} lines", path, count.rows, count.physical_lines);
    Ok(count)
}

/// Check that the CSV at `path` holds exactly `expected` logical data rows.
pub fn verify_row_count(path: impl AsRef<Path>, expected: usize) -> Result<RowCount> {
    let path = path.as_ref();
    let count = count_rows(path)?;
    if count.rows != expected {
        return Err(PrepError::RowCountMismatch {
            path: path.to_path_buf(),
            expected,
            actual: count.rows,
        });
    }
    Ok(count)
}
