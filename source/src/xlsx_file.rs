//! Spreadsheet loading.
//!
//! Every sheet of a workbook is one table, named after the sheet. The first
//! row of a sheet holds the column names.

use calamine::{open_workbook_auto, Data, Reader};
use quarry_core::TableName;
use serde_json::Value as JsonValue;
use std::path::Path;
use tracing::debug;

use crate::guess::RawTable;
use crate::{SourceError, SourceResult};

/// Read every sheet of a workbook. Sheets without a header row are skipped,
/// as are columns with a blank header.
pub fn read_xlsx(path: &Path) -> SourceResult<Vec<RawTable>> {
    let mut workbook = open_workbook_auto(path).map_err(|e| SourceError::spreadsheet(path, e))?;
    let sheets = workbook.sheet_names().to_vec();

    let mut tables = Vec::with_capacity(sheets.len());
    for sheet in sheets {
        let range = workbook
            .worksheet_range(&sheet)
            .map_err(|e| SourceError::spreadsheet(path, e))?;
        let mut rows = range.rows();
        let Some(header) = rows.next() else {
            debug!(path = %path.display(), sheet = %sheet, "skipping empty sheet");
            continue;
        };

        let (indexes, columns): (Vec<usize>, Vec<String>) = header
            .iter()
            .enumerate()
            .map(|(index, cell)| (index, cell.to_string().trim().to_string()))
            .filter(|(_, name)| !name.is_empty())
            .unzip();
        let records = rows
            .filter(|row| row.iter().any(|cell| !matches!(cell, Data::Empty)))
            .map(|row| {
                indexes
                    .iter()
                    .map(|&index| row.get(index).map(cell_value).unwrap_or(JsonValue::Null))
                    .collect()
            })
            .collect();

        tables.push(RawTable {
            name: TableName::single(sheet),
            columns,
            records,
        });
    }
    Ok(tables)
}

/// Integral numbers come back as integers; dates as `YYYY-MM-DD HH:MM:SS`
/// text for type guessing to pick up.
fn cell_value(cell: &Data) -> JsonValue {
    match cell {
        Data::Empty | Data::Error(_) => JsonValue::Null,
        Data::Int(i) => JsonValue::from(*i),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
            JsonValue::from(*f as i64)
        }
        Data::Float(f) => serde_json::Number::from_f64(*f)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        Data::Bool(b) => JsonValue::Bool(*b),
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => {
            JsonValue::String(s.clone())
        }
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(|dt| JsonValue::String(dt.format("%Y-%m-%d %H:%M:%S").to_string()))
            .unwrap_or(JsonValue::Null),
    }
}
