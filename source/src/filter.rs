//! In-memory evaluation of filter expressions.

use quarry_core::{Row, Value};
use quarry_registry::{Relationship, TableSchema};
use quarry_request::{
    BinaryArrayComparisonOperator, BinaryComparisonOperator, ComparisonColumn, ComparisonValue,
    ExistsInTable, Expression, TableRelationships, UnaryComparisonOperator,
};
use std::cmp::Ordering;

use crate::memory::MemorySource;
use crate::{SourceError, SourceResult};

static NULL: Value = Value::Null;

/// Evaluates expressions against rows of a [`MemorySource`].
pub(crate) struct Filter<'s> {
    source: &'s MemorySource,
    /// Request-supplied relationships, consulted before the schema's.
    relationships: &'s [TableRelationships],
}

impl<'s> Filter<'s> {
    pub fn new(source: &'s MemorySource, relationships: &'s [TableRelationships]) -> Self {
        Self {
            source,
            relationships,
        }
    }

    /// Whether `row` of `table` satisfies `expression`. `root` is the row of
    /// the outermost table, addressed by the `["$"]` column path.
    pub fn matches(
        &self,
        table: &TableSchema,
        root: &Row,
        row: &Row,
        expression: &Expression,
    ) -> SourceResult<bool> {
        match expression {
            Expression::And { expressions } => {
                for expression in expressions {
                    if !self.matches(table, root, row, expression)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Expression::Or { expressions } => {
                for expression in expressions {
                    if self.matches(table, root, row, expression)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Expression::Not { expression } => Ok(!self.matches(table, root, row, expression)?),
            Expression::Exists { in_table, r#where } => {
                self.exists(table, root, row, in_table, r#where)
            }
            Expression::BinaryOp {
                column,
                operator,
                value,
            } => {
                let left = column_value(column, root, row);
                let right = match value {
                    ComparisonValue::Scalar { value, .. } => value,
                    ComparisonValue::Column { column } => column_value(column, root, row),
                };
                compare(operator, left, right)
            }
            Expression::BinaryArrayOp {
                column,
                operator,
                values,
                ..
            } => match operator {
                BinaryArrayComparisonOperator::In => {
                    let left = column_value(column, root, row);
                    Ok(values.iter().any(|value| left.loose_eq(value)))
                }
                BinaryArrayComparisonOperator::Other(name) => Err(SourceError::unknown_operator(name)),
            },
            Expression::UnaryOp { column, operator } => match operator {
                UnaryComparisonOperator::IsNull => Ok(column_value(column, root, row).is_null()),
                UnaryComparisonOperator::Other(name) => Err(SourceError::unknown_operator(name)),
            },
        }
    }

    fn exists(
        &self,
        table: &TableSchema,
        root: &Row,
        row: &Row,
        in_table: &ExistsInTable,
        predicate: &Expression,
    ) -> SourceResult<bool> {
        match in_table {
            ExistsInTable::Related { relationship } => {
                let relationship = self.relationship(table, relationship)?;
                let target = self.source.table(&relationship.target_table)?;
                for candidate in &target.rows {
                    let joined = relationship.column_mapping.iter().all(|(local, remote)| {
                        value(row, local).loose_eq(value(candidate, remote))
                    });
                    if joined && self.matches(&target.schema, root, candidate, predicate)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            ExistsInTable::Unrelated { table: name } => {
                let target = self.source.table(name)?;
                for candidate in &target.rows {
                    if self.matches(&target.schema, root, candidate, predicate)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
        }
    }

    fn relationship(&self, table: &TableSchema, name: &str) -> SourceResult<&'s Relationship> {
        self.relationships
            .iter()
            .find(|r| r.source_table == table.name)
            .and_then(|r| r.relationships.get(name))
            .or_else(|| {
                self.source
                    .table(&table.name)
                    .ok()
                    .and_then(|t| t.schema.relationship(name))
            })
            .ok_or_else(|| SourceError::unknown_relationship(&table.name, name))
    }
}

fn value<'r>(row: &'r Row, column: &str) -> &'r Value {
    row.get(column).unwrap_or(&NULL)
}

fn column_value<'r>(column: &ComparisonColumn, root: &'r Row, row: &'r Row) -> &'r Value {
    if column.is_root() {
        value(root, &column.name)
    } else {
        value(row, &column.name)
    }
}

/// Equality is numeric-aware; ordering comparisons only hold between values
/// of the same kind and never involve null.
fn compare(operator: &BinaryComparisonOperator, left: &Value, right: &Value) -> SourceResult<bool> {
    let ordering = || comparable(left, right).then(|| left.cmp_sortable(right));
    Ok(match operator {
        BinaryComparisonOperator::Equal => left.loose_eq(right),
        BinaryComparisonOperator::LessThan => ordering() == Some(Ordering::Less),
        BinaryComparisonOperator::LessThanOrEqual => {
            matches!(ordering(), Some(Ordering::Less | Ordering::Equal))
        }
        BinaryComparisonOperator::GreaterThan => ordering() == Some(Ordering::Greater),
        BinaryComparisonOperator::GreaterThanOrEqual => {
            matches!(ordering(), Some(Ordering::Greater | Ordering::Equal))
        }
        BinaryComparisonOperator::Other(name) => return Err(SourceError::unknown_operator(name)),
    })
}

fn comparable(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Bool(_), Value::Bool(_)) | (Value::String(_), Value::String(_)) => true,
        (a, b) => a.is_number() && b.is_number(),
    }
}
