//! Reference store: reads the exported inventory CSV and yields the
//! ordered set of reference numbers to process.

use anyhow::{Context, Result, anyhow};
use std::path::Path;
use tracing::{debug, warn};

/// One row of the exported inventory. Only `reference` is used by the
/// engine; `extra` keeps the rest of the row around for diagnostics.
#[derive(Debug, Clone)]
pub struct InventoryRecord {
    pub reference: String,
}

/// Reads `reference_column` out of every row of a CSV file, preserving
/// file order and skipping rows with a blank reference.
pub fn read_inventory(csv_path: &Path, reference_column: &str) -> Result<Vec<InventoryRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(csv_path)
        .with_context(|| format!("opening inventory CSV at {}", csv_path.display()))?;

    let headers = reader.headers()?.clone();
    let column_index = headers
        .iter()
        .position(|h| h == reference_column)
        .ok_or_else(|| {
            anyhow!(
                "inventory CSV at {} has no column named '{reference_column}' (columns: {:?})",
                csv_path.display(),
                headers.iter().collect::<Vec<_>>()
            )
        })?;

    let mut records = Vec::new();
    for (row_index, result) in reader.records().enumerate() {
        let row = result.with_context(|| format!("reading row {row_index} of inventory CSV"))?;
        let Some(reference) = row.get(column_index) else {
            warn!(row_index, "inventory row missing reference column, skipping");
            continue;
        };
        let reference = reference.trim();
        if reference.is_empty() {
            warn!(row_index, "inventory row has blank reference, skipping");
            continue;
        }
        records.push(InventoryRecord {
            reference: reference.to_string(),
        });
    }

    debug!(count = records.len(), path = %csv_path.display(), "loaded inventory");
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;
    use std::io::Write;

    #[test]
    fn reads_references_in_file_order() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "title,reference,notes").unwrap();
        writeln!(file, "First,REF-001,a").unwrap();
        writeln!(file, "Second,REF-002,b").unwrap();
        file.flush().unwrap();

        let records = read_inventory(file.path(), "reference").unwrap();
        let refs: Vec<_> = records.iter().map(|r| r.reference.as_str()).collect();
        assert_eq!(refs, vec!["REF-001", "REF-002"]);
    }

    #[test]
    fn skips_blank_references() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "reference").unwrap();
        writeln!(file, "REF-001").unwrap();
        writeln!(file, "").unwrap();
        writeln!(file, "REF-002").unwrap();
        file.flush().unwrap();

        let records = read_inventory(file.path(), "reference").unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn missing_reference_column_is_an_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "title,notes").unwrap();
        writeln!(file, "First,a").unwrap();
        file.flush().unwrap();

        let err = read_inventory(file.path(), "reference").unwrap_err();
        assert!(err.to_string().contains("no column named"));
    }

    #[test]
    fn honors_configurable_reference_column_name() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "ref_no,title").unwrap();
        writeln!(file, "REF-900,Something").unwrap();
        file.flush().unwrap();

        let records = read_inventory(file.path(), "ref_no").unwrap();
        assert_eq!(records[0].reference, "REF-900");
    }
}
