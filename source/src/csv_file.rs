//! CSV loading.

use quarry_core::TableName;
use serde_json::Value as JsonValue;
use std::path::Path;

use crate::guess::RawTable;
use crate::{SourceError, SourceResult};

/// Read a CSV file with a header record. Every cell is kept as raw text;
/// short records are padded with nulls.
pub fn read_csv(path: &Path, name: TableName) -> SourceResult<RawTable> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(|e| SourceError::csv(path, e))?;

    let columns: Vec<String> = reader
        .headers()
        .map_err(|e| SourceError::csv(path, e))?
        .iter()
        .map(|header| header.trim().to_string())
        .collect();

    let mut records = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| SourceError::csv(path, e))?;
        records.push(
            (0..columns.len())
                .map(|index| {
                    record
                        .get(index)
                        .map(|cell| JsonValue::String(cell.to_string()))
                        .unwrap_or(JsonValue::Null)
                })
                .collect(),
        );
    }

    Ok(RawTable {
        name,
        columns,
        records,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;

    #[test]
    fn test_read_csv() {
        // GIVEN
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Artist.csv");
        fs::write(&path, "ArtistId, Name\n1,AC/DC\n2,\"Black, Sabbath\"\n3\n").unwrap();

        // WHEN
        let raw = read_csv(&path, TableName::single("Artist")).unwrap();

        // THEN
        assert_eq!(raw.columns, vec!["ArtistId", "Name"]);
        assert_eq!(raw.records.len(), 3);
        assert_eq!(raw.records[1], vec![json!("2"), json!("Black, Sabbath")]);
        assert_eq!(raw.records[2], vec![json!("3"), JsonValue::Null]);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = read_csv(&dir.path().join("nope.csv"), TableName::single("nope"));
        assert!(matches!(result, Err(SourceError::Csv { .. })));
    }
}
