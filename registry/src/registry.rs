//! The Registry - immutable schema lookup.

use crate::{Relationship, TableSchema};
use quarry_core::TableName;
use std::collections::HashMap;

/// The Registry provides runtime lookup of table schemas.
/// It is immutable after construction and shared by all requests.
#[derive(Debug, Default)]
pub struct Registry {
    /// Table definitions by name.
    tables: HashMap<TableName, TableSchema>,
    /// Table names in registration order.
    order: Vec<TableName>,
}

impl Registry {
    /// Create a registry (use RegistryBuilder for construction).
    pub(crate) fn new(tables: HashMap<TableName, TableSchema>, order: Vec<TableName>) -> Self {
        Self { tables, order }
    }

    // ==================== Table Lookups ====================

    /// Get a table definition by name.
    pub fn get_table(&self, name: &TableName) -> Option<&TableSchema> {
        self.tables.get(name)
    }

    /// Check whether a table is registered.
    pub fn contains_table(&self, name: &TableName) -> bool {
        self.tables.contains_key(name)
    }

    /// Get all table definitions in registration order.
    pub fn all_tables(&self) -> impl Iterator<Item = &TableSchema> {
        self.order.iter().filter_map(|name| self.tables.get(name))
    }

    /// Get the number of tables.
    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    // ==================== Relationship Lookups ====================

    /// Get a relationship declared on a table.
    pub fn get_relationship(&self, table: &TableName, name: &str) -> Option<&Relationship> {
        self.tables.get(table).and_then(|t| t.relationship(name))
    }
}
