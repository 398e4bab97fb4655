//! Rendering fetch requests as Spark SQL.
//!
//! The fetched table is aliased `t0`; each nested `EXISTS` introduces the
//! next alias. Columns with the `["$"]` path always resolve against `t0`.

use quarry_core::{TableName, Value};
use quarry_query::FetchRequest;
use quarry_registry::{Relationship, TableSchema};
use quarry_request::{
    BinaryArrayComparisonOperator, BinaryComparisonOperator, ComparisonColumn, ComparisonValue,
    ExistsInTable, Expression, OrderDirection, TableRelationships, UnaryComparisonOperator,
};

use crate::{LivyError, LivyResult};

/// Render a fetch as one `SELECT`. Pagination is left to the caller.
/// Requested columns the view does not have are not selected.
pub fn render_select(request: &FetchRequest, tables: &[TableSchema]) -> LivyResult<String> {
    let renderer = Renderer {
        tables,
        relationships: &request.relationships,
    };
    let table = renderer.table(&request.table)?;

    let columns: Vec<String> = request
        .columns
        .iter()
        .filter(|column| table.column(column).is_some())
        .map(|column| quote_identifier(column))
        .collect();
    let columns = if columns.is_empty() {
        "*".to_string()
    } else {
        columns.join(", ")
    };

    let mut sql = format!(
        "SELECT {} FROM {} AS t0",
        columns,
        quote_identifier(table.name.base())
    );
    if let Some(filter) = &request.filter {
        sql.push_str(" WHERE ");
        sql.push_str(&renderer.expression(table, 0, filter)?);
    }
    if !request.order_by.is_empty() {
        let keys: Vec<String> = request
            .order_by
            .iter()
            .map(|key| {
                let direction = match key.direction {
                    OrderDirection::Asc => "ASC",
                    OrderDirection::Desc => "DESC",
                };
                format!("{} {}", quote_identifier(&key.column), direction)
            })
            .collect();
        sql.push_str(" ORDER BY ");
        sql.push_str(&keys.join(", "));
    }
    Ok(sql)
}

struct Renderer<'a> {
    tables: &'a [TableSchema],
    relationships: &'a [TableRelationships],
}

impl<'a> Renderer<'a> {
    fn table(&self, name: &TableName) -> LivyResult<&'a TableSchema> {
        self.tables
            .iter()
            .find(|t| &t.name == name)
            .ok_or_else(|| LivyError::unknown_table(name))
    }

    fn relationship(&self, table: &'a TableSchema, name: &str) -> LivyResult<&'a Relationship> {
        self.relationships
            .iter()
            .find(|r| r.source_table == table.name)
            .and_then(|r| r.relationships.get(name))
            .or_else(|| table.relationship(name))
            .ok_or_else(|| LivyError::unknown_relationship(&table.name, name))
    }

    fn expression(&self, table: &'a TableSchema, alias: usize, expression: &Expression) -> LivyResult<String> {
        match expression {
            Expression::And { expressions } => self.connective(table, alias, expressions, "AND", "TRUE"),
            Expression::Or { expressions } => self.connective(table, alias, expressions, "OR", "FALSE"),
            Expression::Not { expression } => {
                Ok(format!("(NOT {})", self.expression(table, alias, expression)?))
            }
            Expression::Exists { in_table, r#where } => {
                let inner = alias + 1;
                let (target, join) = match in_table {
                    ExistsInTable::Related { relationship } => {
                        let relationship = self.relationship(table, relationship)?;
                        let join: Vec<String> = relationship
                            .column_mapping
                            .iter()
                            .map(|(local, remote)| {
                                format!(
                                    "t{}.{} = t{}.{}",
                                    inner,
                                    quote_identifier(remote),
                                    alias,
                                    quote_identifier(local)
                                )
                            })
                            .collect();
                        (self.table(&relationship.target_table)?, join)
                    }
                    ExistsInTable::Unrelated { table: name } => (self.table(name)?, Vec::new()),
                };

                let mut conditions = join;
                conditions.push(self.expression(target, inner, r#where)?);
                Ok(format!(
                    "EXISTS (SELECT 1 FROM {} AS t{} WHERE {})",
                    quote_identifier(target.name.base()),
                    inner,
                    conditions.join(" AND ")
                ))
            }
            Expression::BinaryOp {
                column,
                operator,
                value,
            } => {
                let operator = match operator {
                    BinaryComparisonOperator::LessThan => "<",
                    BinaryComparisonOperator::LessThanOrEqual => "<=",
                    BinaryComparisonOperator::GreaterThan => ">",
                    BinaryComparisonOperator::GreaterThanOrEqual => ">=",
                    BinaryComparisonOperator::Equal => "=",
                    BinaryComparisonOperator::Other(name) => {
                        return Err(LivyError::unknown_operator(name))
                    }
                };
                let right = match value {
                    ComparisonValue::Scalar { value, .. } => literal(value),
                    ComparisonValue::Column { column } => column_ref(column, alias),
                };
                Ok(format!("({} {} {})", column_ref(column, alias), operator, right))
            }
            Expression::BinaryArrayOp {
                column,
                operator,
                values,
                ..
            } => match operator {
                BinaryArrayComparisonOperator::In if values.is_empty() => Ok("FALSE".to_string()),
                BinaryArrayComparisonOperator::In => {
                    let values: Vec<String> = values.iter().map(literal).collect();
                    Ok(format!("({} IN ({}))", column_ref(column, alias), values.join(", ")))
                }
                BinaryArrayComparisonOperator::Other(name) => Err(LivyError::unknown_operator(name)),
            },
            Expression::UnaryOp { column, operator } => match operator {
                UnaryComparisonOperator::IsNull => Ok(format!("({} IS NULL)", column_ref(column, alias))),
                UnaryComparisonOperator::Other(name) => Err(LivyError::unknown_operator(name)),
            },
        }
    }

    fn connective(
        &self,
        table: &'a TableSchema,
        alias: usize,
        expressions: &[Expression],
        keyword: &str,
        empty: &str,
    ) -> LivyResult<String> {
        if expressions.is_empty() {
            return Ok(empty.to_string());
        }
        let parts = expressions
            .iter()
            .map(|e| self.expression(table, alias, e))
            .collect::<LivyResult<Vec<_>>>()?;
        Ok(format!("({})", parts.join(&format!(" {} ", keyword))))
    }
}

fn column_ref(column: &ComparisonColumn, alias: usize) -> String {
    let alias = if column.is_root() { 0 } else { alias };
    format!("t{}.{}", alias, quote_identifier(&column.name))
}

fn quote_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Scalar literal. Strings escape quotes with backslashes so the statement
/// can be embedded in a Scala raw string.
fn literal(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(true) => "TRUE".to_string(),
        Value::Bool(false) => "FALSE".to_string(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) if f.is_finite() => f.to_string(),
        Value::Float(_) => "NULL".to_string(),
        Value::String(s) => {
            let escaped = s
                .replace('\\', "\\\\")
                .replace('\'', "\\'")
                .replace('"', "\\\"");
            format!("'{}'", escaped)
        }
    }
}
