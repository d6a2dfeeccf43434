//! The post-run PDF attribution validator (spec.md §9, invariant I2)
//! exercised against a directory of files, without a real PDF renderer —
//! `pdf-extract` fails cleanly on non-PDF bytes, which the validator must
//! report as `unreadable` rather than a silent pass.

use pdf_harvester::validator::{default_reference_pattern, validate_run};
use tempfile::TempDir;

#[tokio::test]
async fn unparseable_files_are_reported_as_unreadable_not_a_silent_pass() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("REF-1.pdf"), b"not actually a pdf").unwrap();
    std::fs::write(dir.path().join("REF-2.pdf"), b"also not a pdf").unwrap();

    let report = validate_run(dir.path(), &default_reference_pattern())
        .await
        .unwrap();

    assert_eq!(report.checked, 2);
    assert!(!report.is_clean());
    assert_eq!(report.unreadable.len(), 2);
    assert!(report.mismatches.is_empty());
}

#[tokio::test]
async fn an_empty_directory_is_a_clean_report() {
    let dir = TempDir::new().unwrap();
    let report = validate_run(dir.path(), &default_reference_pattern())
        .await
        .unwrap();

    assert_eq!(report.checked, 0);
    assert!(report.is_clean());
}

#[tokio::test]
async fn non_pdf_files_in_the_directory_are_ignored() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("notes.txt"), b"not a pdf at all").unwrap();
    let report = validate_run(dir.path(), &default_reference_pattern())
        .await
        .unwrap();

    assert_eq!(report.checked, 0);
}
