//! Type and primary-key guessing for untyped tabular data.
//!
//! Loaders produce a [`RawTable`] of JSON cells (CSV cells are all strings).
//! Each column gets one scalar type from its non-null cells, then every
//! cell is converted to that type.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use quarry_core::{Row, TableName, Value};
use quarry_query::KeyPart;
use quarry_registry::{Column, TableSchema};
use serde_json::Value as JsonValue;
use std::collections::HashSet;

use crate::FileConfig;

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y"];

/// Untyped table as read from a file.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    pub name: TableName,
    /// Column names in file order.
    pub columns: Vec<String>,
    /// One cell per column per record.
    pub records: Vec<Vec<JsonValue>>,
}

/// Scalar type guessed for a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Number,
    Boolean,
    DateTime,
    String,
}

impl ColumnKind {
    pub fn type_name(self) -> &'static str {
        match self {
            ColumnKind::Number => "number",
            ColumnKind::Boolean => "boolean",
            ColumnKind::DateTime => "DateTime",
            ColumnKind::String => "string",
        }
    }

    /// Guess the kind of a column from its cells. Columns with no non-null
    /// cells, or with cells of different kinds, are strings.
    pub fn guess<'c>(cells: impl IntoIterator<Item = &'c JsonValue>, config: &FileConfig) -> Self {
        let mut guessed = None;
        for kind in cells.into_iter().filter_map(|cell| classify(cell, config)) {
            match guessed {
                None => guessed = Some(kind),
                Some(previous) if previous != kind => return ColumnKind::String,
                Some(_) => {}
            }
        }
        guessed.unwrap_or(ColumnKind::String)
    }
}

impl RawTable {
    /// Guess column types, convert every cell and guess a primary key.
    pub fn into_table(self, config: &FileConfig) -> (TableSchema, Vec<Row>) {
        let kinds: Vec<ColumnKind> = (0..self.columns.len())
            .map(|index| {
                ColumnKind::guess(self.records.iter().filter_map(|r| r.get(index)), config)
            })
            .collect();

        let rows: Vec<Row> = self
            .records
            .iter()
            .map(|record| {
                self.columns
                    .iter()
                    .zip(&kinds)
                    .enumerate()
                    .map(|(index, (name, kind))| {
                        let value = record
                            .get(index)
                            .map(|cell| convert(cell, *kind, config))
                            .unwrap_or_default();
                        (name.clone(), value)
                    })
                    .collect()
            })
            .collect();

        let mut schema = TableSchema::new(self.name);
        for (name, kind) in self.columns.iter().zip(&kinds) {
            let mut column = Column::new(name.clone(), kind.type_name());
            if rows.iter().any(|row| row.get(name).map_or(true, Value::is_null)) {
                column = column.nullable();
            }
            schema.columns.push(column);
        }
        schema.primary_key = guess_primary_key(&self.columns, &rows).map(|key| vec![key]);
        (schema, rows)
    }
}

fn classify(cell: &JsonValue, config: &FileConfig) -> Option<ColumnKind> {
    match cell {
        JsonValue::Null => None,
        JsonValue::Bool(_) => Some(ColumnKind::Boolean),
        JsonValue::Number(_) => Some(ColumnKind::Number),
        JsonValue::String(text) if config.is_null(text) => None,
        JsonValue::String(text) => Some(if config.booleans.parse(text).is_some() {
            ColumnKind::Boolean
        } else if parse_number(text).is_some() {
            ColumnKind::Number
        } else if parse_datetime(text).is_some() {
            ColumnKind::DateTime
        } else {
            ColumnKind::String
        }),
        JsonValue::Array(_) | JsonValue::Object(_) => Some(ColumnKind::String),
    }
}

fn convert(cell: &JsonValue, kind: ColumnKind, config: &FileConfig) -> Value {
    match cell {
        JsonValue::Null => return Value::Null,
        JsonValue::String(text) if config.is_null(text) => return Value::Null,
        _ => {}
    }

    match (kind, cell) {
        (ColumnKind::Number, JsonValue::Number(_)) => Value::from_json(cell),
        (ColumnKind::Number, JsonValue::String(text)) => parse_number(text).unwrap_or_default(),
        (ColumnKind::Boolean, JsonValue::Bool(b)) => Value::Bool(*b),
        (ColumnKind::Boolean, JsonValue::String(text)) => config.booleans.parse(text).into(),
        (ColumnKind::DateTime, JsonValue::String(text)) => parse_datetime(text)
            .map(|dt| Value::String(dt.to_rfc3339_opts(SecondsFormat::Millis, true)))
            .unwrap_or_default(),
        (_, JsonValue::String(text)) => Value::String(text.clone()),
        (_, other) => Value::String(other.to_string()),
    }
}

/// Integral text reads as `Int`, other numeric text as `Float`.
fn parse_number(text: &str) -> Option<Value> {
    let text = text.trim();
    if let Ok(i) = text.parse::<i64>() {
        return Some(Value::Int(i));
    }
    text.parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .map(Value::Float)
}

/// Parse a date or date-time. Values without an offset are taken as UTC.
pub fn parse_datetime(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return date.and_hms_opt(0, 0, 0).map(|naive| Utc.from_utc_datetime(&naive));
        }
    }
    None
}

/// The first column whose values are all present and pairwise distinct.
pub fn guess_primary_key(columns: &[String], rows: &[Row]) -> Option<String> {
    if rows.is_empty() {
        return None;
    }
    columns
        .iter()
        .find(|column| {
            let mut seen = HashSet::with_capacity(rows.len());
            rows.iter().all(|row| {
                row.get(column.as_str())
                    .and_then(KeyPart::from_value)
                    .is_some_and(|key| seen.insert(key))
            })
        })
        .cloned()
}
