//! RegistryBuilder for constructing an immutable Registry.

use crate::{Column, Registry, Relationship, RelationshipKind, TableSchema};
use quarry_core::TableName;
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Errors that can occur during registry construction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Duplicate table name: {0}")]
    DuplicateTableName(TableName),

    #[error("Relationship {relationship} on {table} has an empty column mapping")]
    EmptyColumnMapping {
        table: TableName,
        relationship: String,
    },

    #[error("Relationship {relationship} on {table} targets unknown table {target}")]
    UnknownTargetTable {
        table: TableName,
        relationship: String,
        target: TableName,
    },

    #[error("Unknown column {column} on table {table}")]
    UnknownColumn { table: TableName, column: String },

    #[error("Relationship cycle detected involving table: {0}")]
    RelationshipCycle(TableName),
}

/// Builder for constructing an immutable Registry.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    /// Tables being built, in registration order.
    tables: Vec<TableSchema>,
    /// Reject relationship graphs containing cycles.
    deny_cycles: bool,
}

impl RegistryBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a table definition.
    pub fn add_table(&mut self, name: impl Into<TableName>) -> TableBuilder<'_> {
        TableBuilder {
            builder: self,
            schema: TableSchema::new(name),
        }
    }

    /// Add a fully formed table definition (e.g. loaded from a source).
    pub fn add_schema(&mut self, schema: TableSchema) -> &mut Self {
        self.tables.push(schema);
        self
    }

    /// Reject relationship graphs with cycles (A -> B -> A).
    pub fn deny_cycles(&mut self) -> &mut Self {
        self.deny_cycles = true;
        self
    }

    /// Build the immutable Registry.
    pub fn build(self) -> Result<Registry, RegistryError> {
        let mut tables = HashMap::new();
        let mut order = Vec::new();

        for schema in self.tables {
            if tables.contains_key(&schema.name) {
                return Err(RegistryError::DuplicateTableName(schema.name));
            }
            order.push(schema.name.clone());
            tables.insert(schema.name.clone(), schema);
        }

        for name in &order {
            let schema = &tables[name];
            validate_table(schema, &tables)?;
        }

        if self.deny_cycles {
            if let Some(table) = find_cycle(&order, &tables) {
                return Err(RegistryError::RelationshipCycle(table));
            }
        }

        Ok(Registry::new(tables, order))
    }
}

/// Check that the primary key and every relationship refer to known tables and
/// columns. Tables without declared columns are not column-checked.
fn validate_table(
    schema: &TableSchema,
    tables: &HashMap<TableName, TableSchema>,
) -> Result<(), RegistryError> {
    let check_column = |table: &TableSchema, column: &str| {
        if table.columns.is_empty() || table.column(column).is_some() {
            Ok(())
        } else {
            Err(RegistryError::UnknownColumn {
                table: table.name.clone(),
                column: column.to_string(),
            })
        }
    };

    for column in schema.primary_key.iter().flatten() {
        check_column(schema, column)?;
    }

    for (name, relationship) in &schema.relationships {
        if relationship.column_mapping.is_empty() {
            return Err(RegistryError::EmptyColumnMapping {
                table: schema.name.clone(),
                relationship: name.clone(),
            });
        }
        let target = tables.get(&relationship.target_table).ok_or_else(|| {
            RegistryError::UnknownTargetTable {
                table: schema.name.clone(),
                relationship: name.clone(),
                target: relationship.target_table.clone(),
            }
        })?;
        for (local, remote) in &relationship.column_mapping {
            check_column(schema, local)?;
            check_column(target, remote)?;
        }
    }

    Ok(())
}

/// Depth-first search over relationship edges; returns a table on a cycle.
fn find_cycle(order: &[TableName], tables: &HashMap<TableName, TableSchema>) -> Option<TableName> {
    fn visit<'a>(
        name: &'a TableName,
        tables: &'a HashMap<TableName, TableSchema>,
        on_stack: &mut HashSet<&'a TableName>,
        done: &mut HashSet<&'a TableName>,
    ) -> Option<TableName> {
        if on_stack.contains(name) {
            return Some(name.clone());
        }
        if !done.insert(name) {
            return None;
        }
        on_stack.insert(name);
        if let Some(schema) = tables.get(name) {
            for relationship in schema.relationships.values() {
                if let Some(found) = visit(&relationship.target_table, tables, on_stack, done) {
                    return Some(found);
                }
            }
        }
        on_stack.remove(name);
        None
    }

    let mut on_stack = HashSet::new();
    let mut done = HashSet::new();
    order
        .iter()
        .find_map(|name| visit(name, tables, &mut on_stack, &mut done))
}

/// Builder for a table definition.
pub struct TableBuilder<'a> {
    builder: &'a mut RegistryBuilder,
    schema: TableSchema,
}

impl<'a> TableBuilder<'a> {
    /// Add a column.
    pub fn column(mut self, column: Column) -> Self {
        self.schema.columns.push(column);
        self
    }

    /// Set the primary key.
    pub fn primary_key<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.schema.primary_key = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    /// Declare an object relationship on a single column pair.
    pub fn object_relationship(
        self,
        name: impl Into<String>,
        target: impl Into<TableName>,
        local: impl Into<String>,
        remote: impl Into<String>,
    ) -> Self {
        self.relationship(
            name,
            Relationship::new(target, RelationshipKind::Object, [(local.into(), remote.into())]),
        )
    }

    /// Declare an array relationship on a single column pair.
    pub fn array_relationship(
        self,
        name: impl Into<String>,
        target: impl Into<TableName>,
        local: impl Into<String>,
        remote: impl Into<String>,
    ) -> Self {
        self.relationship(
            name,
            Relationship::new(target, RelationshipKind::Array, [(local.into(), remote.into())]),
        )
    }

    /// Declare a relationship.
    pub fn relationship(mut self, name: impl Into<String>, relationship: Relationship) -> Self {
        self.schema.relationships.insert(name.into(), relationship);
        self
    }

    /// Finish building this table.
    pub fn done(self) -> &'a mut RegistryBuilder {
        self.builder.tables.push(self.schema);
        self.builder
    }
}
