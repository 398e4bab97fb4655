//! JSON loading.
//!
//! A JSON table file holds an array of objects. Nested objects are
//! flattened to dotted column names (`address.city`); arrays stay whole.

use quarry_core::TableName;
use serde_json::{Map, Value as JsonValue};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::guess::RawTable;
use crate::{SourceError, SourceResult};

/// Read a JSON array of records. Columns are the union of every record's
/// keys in order of first appearance; keys within one object come sorted.
pub fn read_json(path: &Path, name: TableName) -> SourceResult<RawTable> {
    let text = fs::read_to_string(path).map_err(|e| SourceError::io(path, e))?;
    let document: JsonValue = serde_json::from_str(&text).map_err(|e| SourceError::json(path, e))?;
    let JsonValue::Array(items) = document else {
        return Err(SourceError::json(path, "expected an array of records"));
    };

    let mut flat_records = Vec::with_capacity(items.len());
    for item in &items {
        let JsonValue::Object(object) = item else {
            return Err(SourceError::json(path, "every record must be an object"));
        };
        let mut flat = Vec::new();
        flatten(None, object, &mut flat);
        flat_records.push(flat);
    }

    let mut columns: Vec<String> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    for record in &flat_records {
        for (key, _) in record {
            if !positions.contains_key(key) {
                positions.insert(key.clone(), columns.len());
                columns.push(key.clone());
            }
        }
    }

    let records = flat_records
        .into_iter()
        .map(|record| {
            let mut cells = vec![JsonValue::Null; columns.len()];
            for (key, value) in record {
                if let Some(&index) = positions.get(&key) {
                    cells[index] = value;
                }
            }
            cells
        })
        .collect();

    Ok(RawTable {
        name,
        columns,
        records,
    })
}

fn flatten(prefix: Option<&str>, object: &Map<String, JsonValue>, out: &mut Vec<(String, JsonValue)>) {
    for (key, value) in object {
        let key = match prefix {
            Some(prefix) => format!("{}.{}", prefix, key),
            None => key.clone(),
        };
        match value {
            JsonValue::Object(nested) if !nested.is_empty() => flatten(Some(&key), nested, out),
            other => out.push((key, other.clone())),
        }
    }
}
