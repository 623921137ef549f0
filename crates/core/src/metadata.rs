//! Presence check for the files listed in a staging directory's `metadata.csv`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{PrepError, Result};

/// File name of the listing inside a staging directory.
pub const METADATA_FILE: &str = "metadata.csv";

/// A row of `metadata.csv`; every other column is ignored.
#[derive(Debug, Deserialize)]
struct MetadataRow {
    #[serde(default)]
    filename: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "path", rename_all = "snake_case")]
pub enum Presence {
    Found(PathBuf),
    FoundCompressed(PathBuf),
    Missing,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetadataEntry {
    pub filename: String,
    pub presence: Presence,
}

#[derive(Debug, Serialize)]
pub struct MetadataReport {
    pub entries: Vec<MetadataEntry>,
}

impl MetadataReport {
    pub fn missing(&self) -> impl Iterator<Item = &MetadataEntry> {
        self.entries
            .iter()
            .filter(|e| e.presence == Presence::Missing)
    }

    pub fn is_complete(&self) -> bool {
        self.missing().next().is_none()
    }
}

fn locate(staging_dir: &Path, filename: &str) -> Presence {
    let plain = staging_dir.join(filename);
    if plain.exists() {
        return Presence::Found(plain);
    }
    let compressed = staging_dir.join(format!("{}.bz2", filename));
    if compressed.exists() {
        return Presence::FoundCompressed(compressed);
    }
    Presence::Missing
}

/// Check that every file listed in `staging_dir/metadata.csv` is present,
/// either as-is or as its `.bz2` archive.
pub fn check_metadata(staging_dir: &Path) -> Result<MetadataReport> {
    if !staging_dir.is_dir() {
        return Err(PrepError::NotADirectory(staging_dir.to_path_buf()));
    }
    let meta_path = staging_dir.join(METADATA_FILE);
    if !meta_path.is_file() {
        return Err(PrepError::MissingFile(meta_path));
    }

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(&meta_path)
        .map_err(|e| PrepError::Csv {
            path: meta_path.clone(),
            source: e,
        })?;

    // Listings exported from spreadsheets may start with a BOM.
    let headers: csv::StringRecord = reader
        .headers()
        .map_err(|e| PrepError::Csv {
            path: meta_path.clone(),
            source: e,
        })?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}'))
        .collect();
    reader.set_headers(headers);

    let mut entries = Vec::new();
    for result in reader.deserialize() {
        let row: MetadataRow = result.map_err(|e| PrepError::Csv {
            path: meta_path.clone(),
            source: e,
        })?;
        let Some(filename) = row.filename.filter(|f| !f.is_empty()) else {
            continue;
        };

        let presence = locate(staging_dir, &filename);
        match &presence {
            Presence::Missing => warn!("{}: missing", filename),
            Presence::Found(p) | Presence::FoundCompressed(p) => info!("{}: found {:?}", filename, p),
        }
        entries.push(MetadataEntry { filename, presence });
    }

    Ok(MetadataReport { entries })
}
