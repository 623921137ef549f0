//! End-to-end run over a small tables directory.

use std::fs;
use std::path::Path;

use csv_prep_core::{
    count_rows, normalize_table_names, prune_tables, trim_all, verify_row_count, PipelineConfig,
    PruneAction, PruneConfig,
};
use tempfile::TempDir;

fn add_table(root: &Path, name: &str, contents: &str) {
    let dir = root.join(name);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join(format!("{}.csv", name)), contents).unwrap();
}

fn rows(n: usize, multiline_every: usize) -> String {
    let mut out = String::from("id|comment\n");
    for i in 0..n {
        if multiline_every > 0 && i % multiline_every == 0 {
            out.push_str(&format!("{}|\"first part\nsecond \"\"quoted\"\" part\"\n", i));
        } else {
            out.push_str(&format!("{}|plain\n", i));
        }
    }
    out
}

#[test]
fn test_normalize_trim_prune() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    add_table(root, "Big Table", &rows(40, 4));
    add_table(root, "small", &rows(5, 0));
    add_table(root, "github_issues", &rows(40, 0));
    add_table(root, "metadata", "filename\n");

    let renames = normalize_table_names(root, false).unwrap();
    assert_eq!(renames.len(), 1);
    assert!(root.join("Big_Table").join("Big_Table.csv").is_file());

    let summary = trim_all(root, &PipelineConfig { max_rows: 16 }).unwrap();
    assert_eq!(summary.total_tables, 3);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.short_tables, 1);

    let big = root.join("Big_Table").join("Big_Table.csv");
    verify_row_count(&big, 16).unwrap();
    assert!(fs::read_to_string(&big).unwrap().starts_with("id|comment\n0|\"first part\n"));

    let config = PruneConfig {
        min_rows: 16,
        ..Default::default()
    };
    let report = prune_tables(root, &config).unwrap();
    assert_eq!(report.kept(), 1);
    assert_eq!(report.removed(), 2);
    assert!(matches!(
        report.decisions.iter().find(|d| d.name == "Big_Table").unwrap().action,
        PruneAction::Kept { rows: 16, .. }
    ));

    assert!(big.is_file());
    assert!(!root.join("small").exists());
    assert!(!root.join("github_issues").exists());
    assert!(root.join("metadata").is_dir());

    // A second pass changes nothing.
    let before = fs::read(&big).unwrap();
    trim_all(root, &PipelineConfig { max_rows: 16 }).unwrap();
    assert_eq!(fs::read(&big).unwrap(), before);
    assert_eq!(count_rows(&big).unwrap().rows, 16);
}
