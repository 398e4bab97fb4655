//! Ordering through relationship paths.
//!
//! An order-by element whose target sits behind relationships is resolved by
//! building a synthetic query that follows the path, projecting it over every
//! row at once (so each hop is one batched fetch) and reading one scalar back
//! per row. Any hop yielding more than one row makes the ordering ambiguous.

use quarry_core::{Row, Value};
use quarry_registry::TableSchema;
use quarry_request::{
    Aggregate, Field, FieldValue, OrderBy, OrderByElement, OrderByRelation, OrderByTarget,
    OrderDirection, ProjectedRow, Query, QueryResponse,
};
use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::executor::QueryExecutor;
use crate::{QueryError, QueryResult};

/// Name of the aggregate carrying an aggregate sort target.
const ORDER_VALUE: &str = "order_value";

impl<'a> QueryExecutor<'a> {
    /// Stable in-memory sort of rows by every element of an order-by.
    pub(crate) async fn sort_rows(
        &self,
        schema: &TableSchema,
        order_by: &OrderBy,
        rows: &mut Vec<Row>,
    ) -> QueryResult<()> {
        let mut keys: Vec<Vec<Value>> = vec![Vec::with_capacity(order_by.elements.len()); rows.len()];
        for element in &order_by.elements {
            let values = self
                .resolve_element(schema, element, &order_by.relations, rows.as_slice())
                .await?;
            for (key, value) in keys.iter_mut().zip(values) {
                key.push(value);
            }
        }

        let mut keyed: Vec<(Vec<Value>, Row)> = keys.into_iter().zip(rows.drain(..)).collect();
        keyed.sort_by(|(a, _), (b, _)| compare_keys(a, b, &order_by.elements));
        rows.extend(keyed.into_iter().map(|(_, row)| row));
        Ok(())
    }

    /// The sort value of one element for every row.
    async fn resolve_element(
        &self,
        schema: &TableSchema,
        element: &OrderByElement,
        relations: &BTreeMap<String, OrderByRelation>,
        rows: &[Row],
    ) -> QueryResult<Vec<Value>> {
        let Some((first, rest)) = element.target_path.split_first() else {
            return match &element.target {
                OrderByTarget::Column { column } => Ok(rows
                    .iter()
                    .map(|row| row.get(column).cloned().unwrap_or_default())
                    .collect()),
                _ => Err(QueryError::invalid_request(
                    "aggregate order by targets require a relationship path",
                )),
            };
        };

        let mut fields = BTreeMap::new();
        fields.insert(
            first.clone(),
            Field::Relationship {
                relationship: first.clone(),
                query: path_query(rest, &element.target, relations.get(first)),
            },
        );
        let projected = self.project_rows(schema, &fields, rows).await?;
        projected
            .iter()
            .map(|row| extract(&element.target_path, &element.target_path, &element.target, row))
            .collect()
    }
}

/// Query for the remainder of a path below a relationship, carrying the
/// relationship's declared filter.
fn path_query(path: &[String], target: &OrderByTarget, relation: Option<&OrderByRelation>) -> Query {
    let mut query = match path.split_first() {
        None => leaf_query(target),
        Some((next, rest)) => {
            let subrelation = relation.and_then(|r| r.subrelations.get(next));
            Query::new().relationship(next.clone(), next.clone(), path_query(rest, target, subrelation))
        }
    };
    query.r#where = relation.and_then(|r| r.r#where.clone());
    query
}

fn leaf_query(target: &OrderByTarget) -> Query {
    match target {
        OrderByTarget::Column { column } => Query::new().column(column.clone()),
        OrderByTarget::SingleColumnAggregate {
            column,
            function,
            result_type,
        } => Query::new().aggregate(
            ORDER_VALUE,
            Aggregate::SingleColumn {
                column: column.clone(),
                function: function.clone(),
                result_type: result_type.clone(),
            },
        ),
        OrderByTarget::StarCountAggregate => Query::new().aggregate(ORDER_VALUE, Aggregate::StarCount),
    }
}

/// Walk a projected row down the path and read the sort value.
fn extract(
    path: &[String],
    full_path: &[String],
    target: &OrderByTarget,
    row: &ProjectedRow,
) -> QueryResult<Value> {
    let Some((segment, rest)) = path.split_first() else {
        return Err(QueryError::invalid_request("empty order by path"));
    };
    let Some(FieldValue::Relationship(response)) = row.get(segment) else {
        return Err(QueryError::invalid_request(format!(
            "order by path {:?} did not resolve to a relationship at {}",
            full_path, segment
        )));
    };

    if !rest.is_empty() {
        return match single_row(response, full_path)? {
            Some(next) => extract(rest, full_path, target, next),
            None => Ok(Value::Null),
        };
    }

    match target {
        OrderByTarget::Column { column } => Ok(single_row(response, full_path)?
            .and_then(|row| row.get(column))
            .and_then(FieldValue::as_value)
            .cloned()
            .unwrap_or_default()),
        _ => Ok(response.aggregate(ORDER_VALUE).cloned().unwrap_or_default()),
    }
}

fn single_row<'r>(response: &'r QueryResponse, path: &[String]) -> QueryResult<Option<&'r ProjectedRow>> {
    match response.rows() {
        [] => Ok(None),
        [row] => Ok(Some(row)),
        rows => Err(QueryError::AmbiguousOrderByTarget {
            path: path.to_vec(),
            rows: rows.len(),
        }),
    }
}

fn compare_keys(a: &[Value], b: &[Value], elements: &[OrderByElement]) -> Ordering {
    for ((x, y), element) in a.iter().zip(b).zip(elements) {
        let ordering = match element.order_direction {
            OrderDirection::Asc => x.cmp_sortable(y),
            OrderDirection::Desc => y.cmp_sortable(x),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}
