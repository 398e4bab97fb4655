//! Schema definition types.
//!
//! These mirror the data-connector schema wire format (snake_case keys), so a
//! schema can be loaded from JSON overrides or returned verbatim to callers.

use quarry_core::TableName;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Column definition within a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// Column name.
    pub name: String,
    /// Declared scalar type name (number, integer, float, string, boolean, DateTime).
    #[serde(rename = "type")]
    pub type_name: String,
    /// Whether this column can be null.
    #[serde(default)]
    pub nullable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Column {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            nullable: false,
            description: None,
        }
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Whether the declared type only admits numbers.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self.type_name.as_str(),
            "number" | "integer" | "int" | "float" | "double" | "long" | "decimal"
        )
    }

    /// Whether the declared type only admits integers.
    pub fn is_integer(&self) -> bool {
        matches!(self.type_name.as_str(), "integer" | "int" | "long")
    }
}

/// Relationship cardinality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationshipKind {
    /// At most one target row per source row.
    Object,
    /// Any number of target rows per source row.
    Array,
}

/// A named relationship from one table to another.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Relationship {
    pub target_table: TableName,
    pub relationship_type: RelationshipKind,
    /// Local column to target column. Never empty.
    pub column_mapping: BTreeMap<String, String>,
}

impl Relationship {
    pub fn new(
        target_table: impl Into<TableName>,
        relationship_type: RelationshipKind,
        column_mapping: impl IntoIterator<Item = (impl Into<String>, impl Into<String>)>,
    ) -> Self {
        Self {
            target_table: target_table.into(),
            relationship_type,
            column_mapping: column_mapping
                .into_iter()
                .map(|(local, target)| (local.into(), target.into()))
                .collect(),
        }
    }

    pub fn is_object(&self) -> bool {
        self.relationship_type == RelationshipKind::Object
    }

    /// Local (source table) join columns, in mapping order.
    pub fn local_columns(&self) -> impl Iterator<Item = &str> {
        self.column_mapping.keys().map(String::as_str)
    }

    /// Target table join columns, in mapping order.
    pub fn target_columns(&self) -> impl Iterator<Item = &str> {
        self.column_mapping.values().map(String::as_str)
    }
}

/// A foreign key constraint declared on a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    pub foreign_table: TableName,
    pub column_mapping: BTreeMap<String, String>,
}

/// Table definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    pub name: TableName,
    /// Columns in declaration order.
    #[serde(default)]
    pub columns: Vec<Column>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_key: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub foreign_keys: BTreeMap<String, ForeignKey>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub relationships: BTreeMap<String, Relationship>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl TableSchema {
    pub fn new(name: impl Into<TableName>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            primary_key: None,
            foreign_keys: BTreeMap::new(),
            relationships: BTreeMap::new(),
            description: None,
        }
    }

    /// Get a column by name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Get a declared relationship by name.
    pub fn relationship(&self, name: &str) -> Option<&Relationship> {
        self.relationships.get(name)
    }

    /// Columns that must always be fetched so joins can be performed: the
    /// primary key, then every local column of a foreign key or relationship.
    pub fn key_columns(&self) -> Vec<&str> {
        let primary = self.primary_key.iter().flatten().map(String::as_str);
        let foreign = self
            .foreign_keys
            .values()
            .flat_map(|fk| fk.column_mapping.keys().map(String::as_str));
        let related = self
            .relationships
            .values()
            .flat_map(|relationship| relationship.local_columns());

        let mut keys: Vec<&str> = Vec::new();
        for column in primary.chain(foreign).chain(related) {
            if !keys.contains(&column) {
                keys.push(column);
            }
        }
        keys
    }
}
