//! Post-run PDF attribution validator (spec.md §9, invariant I2).
//!
//! Not part of the core run loop — the PDF critical section (§4.4) is the
//! primary defense against swapped downloads. This is the second line of
//! defense: open every produced PDF, extract the reference embedded in its
//! content, and compare it against the filename. Invoked as the CLI's
//! `validate` subcommand, never from inside a worker.

use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Outcome of comparing one PDF's filename against its extracted content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub reference: String,
    pub path: PathBuf,
    pub extracted_reference: Option<String>,
    pub matched: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ValidationReport {
    pub checked: usize,
    pub mismatches: Vec<ValidationResult>,
    pub unreadable: Vec<ValidationResult>,
}

impl ValidationReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.mismatches.is_empty() && self.unreadable.is_empty()
    }

    #[must_use]
    pub fn summary_line(&self) -> String {
        format!(
            "{} checked, {} mismatches, {} unreadable",
            self.checked,
            self.mismatches.len(),
            self.unreadable.len()
        )
    }
}

/// Default extraction pattern: the longest run of 4+ digits in the
/// document, which is how the target site's reference numbers are
/// rendered on the generated PDF in practice. Callers with a
/// differently-shaped reference scheme should pass their own pattern.
pub fn default_reference_pattern() -> Regex {
    Regex::new(r"\d{4,}").expect("static pattern is valid regex")
}

/// Walk `pdfs_dir` for `<reference>.pdf` files and validate each one's
/// content against its filename using `reference_pattern` to locate the
/// embedded reference in the extracted text.
///
/// A file whose text cannot be extracted, or in which no match of
/// `reference_pattern` is found, counts as `unreadable` rather than a
/// silent pass — the validator must never report a false clean bill.
pub async fn validate_run(pdfs_dir: &Path, reference_pattern: &Regex) -> Result<ValidationReport> {
    let mut report = ValidationReport::default();

    let mut entries = tokio::fs::read_dir(pdfs_dir)
        .await
        .with_context(|| format!("reading PDF directory {}", pdfs_dir.display()))?;

    let mut paths = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) == Some("pdf") {
            paths.push(path);
        }
    }
    paths.sort();

    for path in paths {
        let reference = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();
        report.checked += 1;

        let result = validate_one(path, reference, reference_pattern).await;
        if !result.matched {
            if result.extracted_reference.is_none() {
                warn!(reference = %result.reference, "PDF text extraction found no reference-shaped content");
                report.unreadable.push(result);
            } else {
                warn!(
                    reference = %result.reference,
                    extracted = ?result.extracted_reference,
                    "PDF content reference does not match filename"
                );
                report.mismatches.push(result);
            }
        }
    }

    info!(summary = %report.summary_line(), "validation complete");
    Ok(report)
}

async fn validate_one(path: PathBuf, reference: String, pattern: &Regex) -> ValidationResult {
    let pattern = pattern.clone();
    let path_for_extract = path.clone();
    let extracted = tokio::task::spawn_blocking(move || extract_reference(&path_for_extract, &pattern))
        .await
        .ok()
        .flatten();

    let matched = extracted.as_deref() == Some(reference.as_str());
    ValidationResult {
        reference,
        path,
        extracted_reference: extracted,
        matched,
    }
}

/// Extract text from `path` and return the first match of `pattern`,
/// run on a blocking thread since `pdf_extract` is synchronous and CPU-bound.
fn extract_reference(path: &Path, pattern: &Regex) -> Option<String> {
    let text = pdf_extract::extract_text(path).ok()?;
    pattern.find(&text).map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_pattern_matches_digit_runs() {
        let pattern = default_reference_pattern();
        let m = pattern.find("Reference No: 2048193").unwrap();
        assert_eq!(m.as_str(), "2048193");
    }

    #[test]
    fn report_is_clean_with_no_findings() {
        let report = ValidationReport::default();
        assert!(report.is_clean());
    }

    #[test]
    fn report_is_not_clean_with_a_mismatch() {
        let mut report = ValidationReport::default();
        report.checked = 1;
        report.mismatches.push(ValidationResult {
            reference: "A".to_string(),
            path: PathBuf::from("A.pdf"),
            extracted_reference: Some("B".to_string()),
            matched: false,
        });
        assert!(!report.is_clean());
    }
}
