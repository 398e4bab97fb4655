//! Data directory configuration.
//!
//! A data directory may carry a `config.json` describing how raw cells are
//! interpreted and how the guessed schema is corrected. Every key is optional.

use quarry_core::{Row, TableName, Value};
use quarry_registry::{Column, ForeignKey, Relationship, TableSchema};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::{SourceError, SourceResult};

/// Name of the configuration file inside a data directory.
pub const CONFIG_FILE: &str = "config.json";

/// Configuration of a data directory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Cell texts read as null, in addition to the empty string.
    pub nulls: Vec<String>,
    /// Cell texts read as booleans.
    pub booleans: BooleanLiterals,
    /// Schema corrections applied after guessing.
    pub schema: SchemaOverrides,
    /// Per table, per column: the type join key values are coerced to.
    pub coerce_foreign_keys: BTreeMap<String, BTreeMap<String, KeyCoercion>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BooleanLiterals {
    pub positive: Vec<String>,
    pub negative: Vec<String>,
}

impl Default for BooleanLiterals {
    fn default() -> Self {
        Self {
            positive: vec!["true".into()],
            negative: vec!["false".into()],
        }
    }
}

impl BooleanLiterals {
    pub fn parse(&self, text: &str) -> Option<bool> {
        if self.positive.iter().any(|p| p == text) {
            Some(true)
        } else if self.negative.iter().any(|n| n == text) {
            Some(false)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaOverrides {
    pub tables: Vec<TableOverride>,
}

/// Corrections for one table. Absent fields keep the guessed value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableOverride {
    pub name: TableName,
    #[serde(default)]
    pub columns: Vec<ColumnOverride>,
    #[serde(default)]
    pub primary_key: Option<Vec<String>>,
    #[serde(default)]
    pub foreign_keys: BTreeMap<String, ForeignKey>,
    #[serde(default)]
    pub relationships: BTreeMap<String, Relationship>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnOverride {
    pub name: String,
    #[serde(default, rename = "type")]
    pub type_name: Option<String>,
    #[serde(default)]
    pub nullable: Option<bool>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Target type of a coerced join key column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyCoercion {
    Integer,
    Float,
    String,
}

impl KeyCoercion {
    fn type_name(self) -> &'static str {
        match self {
            KeyCoercion::Integer => "integer",
            KeyCoercion::Float => "float",
            KeyCoercion::String => "string",
        }
    }

    /// Coerce one value. Values that cannot be read as the target type
    /// become null.
    pub fn apply(self, value: &Value) -> Value {
        match (self, value) {
            (_, Value::Null) => Value::Null,
            (KeyCoercion::Integer, Value::Int(i)) => Value::Int(*i),
            (KeyCoercion::Integer, Value::Float(f)) if f.is_finite() => Value::Int(f.trunc() as i64),
            (KeyCoercion::Integer, Value::String(s)) => {
                let s = s.trim();
                s.parse::<i64>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
                    .map(Value::Int)
                    .unwrap_or(Value::Null)
            }
            (KeyCoercion::Float, Value::Int(i)) => Value::Float(*i as f64),
            (KeyCoercion::Float, Value::Float(f)) => Value::Float(*f),
            (KeyCoercion::Float, Value::String(s)) => {
                s.trim().parse::<f64>().map(Value::Float).unwrap_or(Value::Null)
            }
            (KeyCoercion::String, Value::String(s)) => Value::String(s.clone()),
            (KeyCoercion::String, other) => Value::String(other.to_string()),
            _ => Value::Null,
        }
    }
}

impl FileConfig {
    /// Read a configuration file. A missing file yields the defaults.
    pub fn load(path: &Path) -> SourceResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path).map_err(|e| SourceError::io(path, e))?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> SourceResult<Self> {
        serde_json::from_str(text).map_err(|e| SourceError::config(e.to_string()))
    }

    /// Whether a cell text reads as null.
    pub fn is_null(&self, text: &str) -> bool {
        text.is_empty() || self.nulls.iter().any(|n| n == text)
    }

    /// Apply the schema overrides that name this table.
    pub fn apply_overrides(&self, schema: &mut TableSchema) {
        let name = schema.name.clone();
        for table in self
            .schema
            .tables
            .iter()
            .filter(|t| same_table(&t.name, &name))
        {
            table.apply(schema);
        }
    }

    /// Coerce the configured join key columns of a table, in place, and
    /// update their declared types.
    pub fn coerce_keys(&self, schema: &mut TableSchema, rows: &mut [Row]) {
        let Some(columns) = self.key_coercions(&schema.name) else {
            return;
        };
        for (name, coercion) in columns {
            if let Some(column) = schema
                .columns
                .iter_mut()
                .find(|c| c.name.eq_ignore_ascii_case(name))
            {
                column.type_name = coercion.type_name().to_string();
            }
        }
        self.coerce_row_keys(&schema.name, rows);
    }

    /// Coerce the configured join key values of rows fetched from a table.
    pub fn coerce_row_keys(&self, table: &TableName, rows: &mut [Row]) {
        let Some(columns) = self.key_coercions(table) else {
            return;
        };
        for row in rows.iter_mut() {
            for (column, value) in row.iter_mut() {
                if let Some((_, coercion)) = columns
                    .iter()
                    .find(|(name, _)| name.eq_ignore_ascii_case(column))
                {
                    *value = coercion.apply(value);
                }
            }
        }
    }

    fn key_coercions(&self, table: &TableName) -> Option<&BTreeMap<String, KeyCoercion>> {
        self.coerce_foreign_keys
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(table.base()))
            .map(|(_, columns)| columns)
    }
}

impl TableOverride {
    fn apply(&self, schema: &mut TableSchema) {
        for update in &self.columns {
            match schema
                .columns
                .iter_mut()
                .find(|c| c.name.eq_ignore_ascii_case(&update.name))
            {
                Some(column) => update.apply(column),
                None => {
                    let mut column = Column::new(update.name.clone(), "string");
                    update.apply(&mut column);
                    schema.columns.push(column);
                }
            }
        }
        if let Some(primary_key) = &self.primary_key {
            schema.primary_key = Some(primary_key.clone());
        }
        if !self.foreign_keys.is_empty() {
            schema.foreign_keys = self.foreign_keys.clone();
        }
        if !self.relationships.is_empty() {
            schema.relationships = self.relationships.clone();
        }
        if self.description.is_some() {
            schema.description = self.description.clone();
        }
    }
}

impl ColumnOverride {
    fn apply(&self, column: &mut Column) {
        if let Some(type_name) = &self.type_name {
            column.type_name = type_name.clone();
        }
        if let Some(nullable) = self.nullable {
            column.nullable = nullable;
        }
        if self.description.is_some() {
            column.description = self.description.clone();
        }
    }
}

/// Table names match segment-wise, ignoring ASCII case.
pub(crate) fn same_table(a: &TableName, b: &TableName) -> bool {
    a.segments().len() == b.segments().len()
        && a.segments()
            .iter()
            .zip(b.segments())
            .all(|(x, y)| x.eq_ignore_ascii_case(y))
}
