//! Error type shared by every preparation stage.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while preparing benchmark tables.
///
/// I/O variants carry the path they failed on so a batch run can report
/// which table broke without extra context.
#[derive(Debug, Error)]
pub enum PrepError {
    #[error("failed to open {path:?}: {source}")]
    Open { path: PathBuf, source: io::Error },

    #[error("failed to read {path:?}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("failed to write {path:?}: {source}")]
    Write { path: PathBuf, source: io::Error },

    #[error("failed to replace {path:?} with trimmed copy: {source}")]
    Persist { path: PathBuf, source: io::Error },

    #[error("I/O error on {path:?}: {source}")]
    Io { path: PathBuf, source: io::Error },

    #[error("failed to parse {path:?}: {source}")]
    Csv { path: PathBuf, source: csv::Error },

    #[error("{0:?} is not a directory")]
    NotADirectory(PathBuf),

    #[error("required file {0:?} not found")]
    MissingFile(PathBuf),

    #[error("{path:?} holds {actual} data rows, expected {expected}")]
    RowCountMismatch {
        path: PathBuf,
        expected: usize,
        actual: usize,
    },

    #[error("cannot rename {from:?} to {to:?}: target already exists")]
    RenameConflict { from: PathBuf, to: PathBuf },
}

pub type Result<T> = std::result::Result<T, PrepError>;

impl PrepError {
    pub(crate) fn open(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Open { path: path.into(), source }
    }

    pub(crate) fn read(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Read { path: path.into(), source }
    }

    pub(crate) fn write(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Write { path: path.into(), source }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }
}
