//! Filesystem-safe table names.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::{PrepError, Result};
use crate::pipeline::table_dirs;

static UNSAFE_CHARS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_]+").unwrap());
static UNDERSCORE_RUN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"_{2,}").unwrap());

/// Replace every character outside `[A-Za-z0-9_]` with `_`, collapse runs of
/// `_` and trim them from both ends.
pub fn sanitize_table_name(name: &str) -> String {
    let replaced = UNSAFE_CHARS_RE.replace_all(name, "_");
    let collapsed = UNDERSCORE_RUN_RE.replace_all(&replaced, "_");
    let trimmed = collapsed.trim_matches('_');
    if trimmed.is_empty() {
        "table".to_string()
    } else {
        trimmed.to_string()
    }
}

/// A directory rename applied (or planned, in a dry run).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rename {
    pub from: PathBuf,
    pub to: PathBuf,
}

/// Rename every table directory under `root`, and the `<name>.csv` inside it,
/// to its sanitized name.
///
/// Every target is planned before anything moves: a target that already
/// exists, or two tables that sanitize to the same name, fail the whole run
/// with nothing renamed.
pub fn normalize_table_names(root: &Path, dry_run: bool) -> Result<Vec<Rename>> {
    let dirs = table_dirs(root)?;
    let mut planned: HashSet<PathBuf> = HashSet::new();
    let mut plan = Vec::new();

    for dir in dirs {
        let Some(name) = dir.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
            continue;
        };
        let clean = sanitize_table_name(&name);
        if clean == name {
            continue;
        }

        let target = root.join(&clean);
        if target.exists() || !planned.insert(target.clone()) {
            return Err(PrepError::RenameConflict { from: dir, to: target });
        }
        plan.push((name, clean, Rename { from: dir, to: target }));
    }

    let mut renames = Vec::with_capacity(plan.len());
    for (name, clean, rename) in plan {
        info!("renaming {:?} -> {:?}", rename.from, rename.to);
        if !dry_run {
            apply_rename(&rename, &name, &clean)?;
        }
        renames.push(rename);
    }

    Ok(renames)
}

/// Move the directory, then its sample CSV; the directory move is undone if
/// the CSV cannot follow.
fn apply_rename(rename: &Rename, name: &str, clean: &str) -> Result<()> {
    fs::rename(&rename.from, &rename.to).map_err(|e| PrepError::io(&rename.from, e))?;

    let old_csv = rename.to.join(format!("{}.csv", name));
    if !old_csv.is_file() {
        return Ok(());
    }
    let new_csv = rename.to.join(format!("{}.csv", clean));
    if let Err(e) = fs::rename(&old_csv, &new_csv) {
        if let Err(undo) = fs::rename(&rename.to, &rename.from) {
            warn!("could not move {:?} back to {:?}: {}", rename.to, rename.from, undo);
        }
        return Err(PrepError::io(&old_csv, e));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_sanitize_table_name() {
        assert_eq!(sanitize_table_name("Corporations_1"), "Corporations_1");
        assert_eq!(sanitize_table_name("world-cities (2019)"), "world_cities_2019");
        assert_eq!(sanitize_table_name("a..b__c"), "a_b_c");
        assert_eq!(sanitize_table_name("__x__"), "x");
        assert_eq!(sanitize_table_name("é€"), "table");
    }

    #[test]
    fn test_normalize_table_names() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("my table");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("my table.csv"), "h\n").unwrap();
        fs::create_dir_all(temp.path().join("fine")).unwrap();

        let renames = normalize_table_names(temp.path(), false).unwrap();

        assert_eq!(renames.len(), 1);
        assert_eq!(renames[0].to, temp.path().join("my_table"));
        assert!(temp.path().join("my_table").join("my_table.csv").is_file());
        assert!(!dir.exists());
    }

    #[test]
    fn test_rename_conflict() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("a-b")).unwrap();
        fs::create_dir_all(temp.path().join("a_b")).unwrap();

        let err = normalize_table_names(temp.path(), false).unwrap_err();
        assert!(matches!(err, PrepError::RenameConflict { .. }));
        assert!(temp.path().join("a-b").is_dir());
    }

    #[test]
    fn test_clashing_names_rename_nothing() {
        let temp = TempDir::new().unwrap();
        for name in ["a b", "a-b"] {
            let dir = temp.path().join(name);
            fs::create_dir_all(&dir).unwrap();
            fs::write(dir.join(format!("{}.csv", name)), "h\n").unwrap();
        }

        let err = normalize_table_names(temp.path(), true).unwrap_err();
        assert!(matches!(err, PrepError::RenameConflict { .. }));

        let err = normalize_table_names(temp.path(), false).unwrap_err();
        match err {
            PrepError::RenameConflict { to, .. } => assert_eq!(to, temp.path().join("a_b")),
            other => panic!("unexpected error: {}", other),
        }

        let mut names: Vec<_> = fs::read_dir(temp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        assert_eq!(names, vec!["a b", "a-b"]);
        assert!(temp.path().join("a b").join("a b.csv").is_file());
    }

    #[test]
    fn test_non_ascii_names_clash_on_fallback() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("é")).unwrap();
        fs::create_dir_all(temp.path().join("ü")).unwrap();

        let err = normalize_table_names(temp.path(), false).unwrap_err();
        assert!(matches!(err, PrepError::RenameConflict { .. }));
        assert!(temp.path().join("é").is_dir());
        assert!(temp.path().join("ü").is_dir());
        assert!(!temp.path().join("table").exists());
    }

    #[test]
    fn test_dry_run_leaves_names() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("x y")).unwrap();

        let renames = normalize_table_names(temp.path(), true).unwrap();

        assert_eq!(renames.len(), 1);
        assert!(temp.path().join("x y").is_dir());
    }
}
