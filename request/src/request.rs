//! Top-level query requests.

use crate::{Expression, Query};
use quarry_core::{TableName, Value};
use quarry_registry::Relationship;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A query against a root table, with the relationships it may traverse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub table: TableName,
    /// Relationships available to this request, per source table. These take
    /// precedence over relationships declared in the schema.
    #[serde(default)]
    pub table_relationships: Vec<TableRelationships>,
    pub query: Query,
    /// Run the query once per entry, each entry's column values ANDed onto
    /// the query filter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreach: Option<Vec<BTreeMap<String, ScalarValue>>>,
}

impl QueryRequest {
    pub fn new(table: impl Into<TableName>, query: Query) -> Self {
        Self {
            table: table.into(),
            table_relationships: Vec::new(),
            query,
            foreach: None,
        }
    }

    pub fn with_relationships(mut self, relationships: TableRelationships) -> Self {
        self.table_relationships.push(relationships);
        self
    }

    pub fn with_foreach(mut self, foreach: Vec<BTreeMap<String, ScalarValue>>) -> Self {
        self.foreach = Some(foreach);
        self
    }

    /// Look up a relationship supplied with the request.
    pub fn find_relationship(&self, table: &TableName, name: &str) -> Option<&Relationship> {
        self.table_relationships
            .iter()
            .find(|r| &r.source_table == table)
            .and_then(|r| r.relationships.get(name))
    }
}

/// The relationships declared for one source table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRelationships {
    pub source_table: TableName,
    pub relationships: BTreeMap<String, Relationship>,
}

/// A scalar tagged with its declared type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalarValue {
    pub value: Value,
    #[serde(default)]
    pub value_type: String,
}

impl ScalarValue {
    pub fn new(value: impl Into<Value>, value_type: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            value_type: value_type.into(),
        }
    }
}

/// Build the filter for one foreach entry: one equality per column, a single
/// comparison when there is exactly one column.
pub fn foreach_filter(entry: &BTreeMap<String, ScalarValue>) -> Expression {
    let mut expressions: Vec<Expression> = entry
        .iter()
        .map(|(column, scalar)| Expression::BinaryOp {
            column: crate::ComparisonColumn {
                path: None,
                name: column.clone(),
                column_type: Some(scalar.value_type.clone()),
            },
            operator: crate::BinaryComparisonOperator::Equal,
            value: crate::ComparisonValue::Scalar {
                value: scalar.value.clone(),
                value_type: Some(scalar.value_type.clone()),
            },
        })
        .collect();

    if expressions.len() == 1 {
        expressions.remove(0)
    } else {
        Expression::and(expressions)
    }
}
