//! Query execution.

use futures::future::{try_join_all, BoxFuture, FutureExt};
use quarry_core::{Row, TableName};
use quarry_registry::{Registry, Relationship, TableSchema};
use quarry_request::{
    foreach_filter, Expression, Field, FieldValue, OrderByElement, OrderByTarget, ProjectedRow,
    Query, QueryRequest, QueryResponse, TableRelationships,
};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::aggregates::evaluate_all;
use crate::loader::{JoinBatch, JoinCache, JoinKey, KeyLookup};
use crate::source::{FetchRequest, RowSet, RowSource, SortKey};
use crate::{QueryError, QueryResult};

/// Offset and limit applied to a fetched row sequence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Window {
    pub offset: Option<usize>,
    pub limit: Option<usize>,
}

impl Window {
    pub fn new(offset: Option<usize>, limit: Option<usize>) -> Self {
        Self { offset, limit }
    }

    pub fn slice<'s, T>(&self, items: &'s [T]) -> &'s [T] {
        let start = self.offset.unwrap_or(0).min(items.len());
        let rest = &items[start..];
        let end = self.limit.map_or(rest.len(), |limit| limit.min(rest.len()));
        &rest[..end]
    }

    fn apply<T>(&self, mut items: Vec<T>) -> Vec<T> {
        let start = self.offset.unwrap_or(0).min(items.len());
        items.drain(..start);
        if let Some(limit) = self.limit {
            items.truncate(limit);
        }
        items
    }
}

/// Query executor.
///
/// One executor serves one request: it owns the request-scoped relationship
/// cache, so it must not be reused across requests.
pub struct QueryExecutor<'a> {
    registry: &'a Registry,
    source: &'a dyn RowSource,
    /// Relationships supplied with the request, consulted before the schema.
    relationships: &'a [TableRelationships],
    cache: JoinCache,
}

impl<'a> QueryExecutor<'a> {
    /// Create a new executor.
    pub fn new(registry: &'a Registry, source: &'a dyn RowSource) -> Self {
        Self {
            registry,
            source,
            relationships: &[],
            cache: JoinCache::default(),
        }
    }

    /// Make request-supplied relationships available.
    pub fn with_relationships(mut self, relationships: &'a [TableRelationships]) -> Self {
        self.relationships = relationships;
        self
    }

    pub(crate) fn cache(&self) -> &JoinCache {
        &self.cache
    }

    // ==================== Entry Points ====================

    /// Execute a request, once per foreach entry if it has any.
    ///
    /// Foreach results come back as `{rows: [{query: response}]}` in input
    /// order. All entries share this executor's relationship cache.
    pub async fn execute_request(&self, request: &QueryRequest) -> QueryResult<QueryResponse> {
        let Some(foreach) = &request.foreach else {
            return self.execute(&request.table, &request.query).await;
        };

        let runs = foreach.iter().map(|entry| {
            let mut query = request.query.clone();
            query.r#where = Some(Expression::conjoin(query.r#where.take(), foreach_filter(entry)));
            async move { self.execute(&request.table, &query).await }
        });
        let responses = try_join_all(runs).await?;

        Ok(QueryResponse {
            aggregates: None,
            rows: Some(
                responses
                    .into_iter()
                    .map(|response| {
                        let mut row = ProjectedRow::new();
                        row.insert("query".to_string(), FieldValue::Relationship(response));
                        row
                    })
                    .collect(),
            ),
        })
    }

    /// Execute a query against a table.
    pub async fn execute(&self, table: &TableName, query: &Query) -> QueryResult<QueryResponse> {
        let schema = self.table(table)?;
        if query.fields.is_none() && query.aggregates.is_none() {
            return Ok(QueryResponse::default());
        }
        if let Some(filter) = &query.r#where {
            debug!(table = %table, filter = %filter, "executing query");
        }

        let window = Window::new(query.offset, fetch_limit(query));
        let rows = self.select(schema, query, window, &[]).await?;

        // Aggregates and returned rows are bounded independently.
        let aggregates = match &query.aggregates {
            Some(requested) => Some(evaluate_all(
                requested,
                Window::new(None, query.aggregates_limit).slice(&rows),
            )?),
            None => None,
        };
        let rows = match &query.fields {
            Some(fields) => Some(
                self.project_rows(schema, fields, Window::new(None, query.limit).slice(&rows))
                    .await?,
            ),
            None => None,
        };

        Ok(QueryResponse { aggregates, rows })
    }

    // ==================== Lookups ====================

    pub(crate) fn table(&self, name: &TableName) -> QueryResult<&'a TableSchema> {
        self.registry
            .get_table(name)
            .ok_or_else(|| QueryError::unknown_table(name))
    }

    /// Find a relationship, preferring the ones supplied with the request.
    pub(crate) fn relationship(&self, table: &TableName, name: &str) -> QueryResult<&'a Relationship> {
        self.relationships
            .iter()
            .find(|r| &r.source_table == table)
            .and_then(|r| r.relationships.get(name))
            .or_else(|| self.registry.get_relationship(table, name))
            .ok_or_else(|| QueryError::unknown_relationship(table, name))
    }

    // ==================== Fetching ====================

    /// Fetch the raw rows of a query, ordered and windowed.
    ///
    /// Ordering is delegated to the source when every element is a plain
    /// column of this table; otherwise all matching rows are fetched, sorted
    /// here and windowed afterwards.
    pub(crate) async fn select(
        &self,
        schema: &TableSchema,
        query: &Query,
        window: Window,
        extra_columns: &[&str],
    ) -> QueryResult<Vec<Row>> {
        let mut request = FetchRequest::new(
            schema.name.clone(),
            self.fetch_columns(schema, query, extra_columns)?,
        );
        request.filter = query.r#where.clone();
        request.relationships = self.relationships.to_vec();

        let elements = query
            .order_by
            .as_ref()
            .map(|o| o.elements.as_slice())
            .unwrap_or_default();
        if elements.iter().all(OrderByElement::is_local_column) {
            request.order_by = elements.iter().filter_map(sort_key).collect();
            request.offset = window.offset;
            request.limit = window.limit;
            return Ok(self.fetch(request).await?.rows);
        }

        let mut rows = self.fetch(request).await?.rows;
        if let Some(order_by) = &query.order_by {
            self.sort_rows(schema, order_by, &mut rows).await?;
        }
        Ok(window.apply(rows))
    }

    async fn fetch(&self, request: FetchRequest) -> QueryResult<RowSet> {
        let table = request.table.clone();
        debug!(
            table = %table,
            columns = request.columns.len(),
            limit = ?request.limit,
            offset = ?request.offset,
            "fetching rows"
        );
        let rows = self.source.fetch_rows(request).await?;
        debug!(table = %table, rows = rows.rows.len(), total = rows.total, "fetched rows");
        Ok(rows)
    }

    /// Requested columns widened with everything joins, aggregates and
    /// ordering read: key columns, relationship join columns, aggregate
    /// columns and local sort columns.
    fn fetch_columns(
        &self,
        schema: &TableSchema,
        query: &Query,
        extra_columns: &[&str],
    ) -> QueryResult<Vec<String>> {
        let mut columns: Vec<String> = Vec::new();
        let mut push = |column: &str| {
            if !columns.iter().any(|c| c == column) {
                columns.push(column.to_string());
            }
        };

        schema.key_columns().into_iter().for_each(&mut push);
        extra_columns.iter().copied().for_each(&mut push);
        for field in query.fields.iter().flat_map(|f| f.values()) {
            match field {
                Field::Column { column, .. } => push(column),
                Field::Relationship { relationship, .. } => self
                    .relationship(&schema.name, relationship)?
                    .local_columns()
                    .for_each(&mut push),
            }
        }
        for aggregate in query.aggregates.iter().flat_map(|a| a.values()) {
            if let Some(column) = aggregate.column() {
                push(column);
            }
        }
        for element in query.order_by.iter().flat_map(|o| &o.elements) {
            match (element.target_path.first(), &element.target) {
                (None, OrderByTarget::Column { column }) => push(column),
                (Some(first), _) => self
                    .relationship(&schema.name, first)?
                    .local_columns()
                    .for_each(&mut push),
                (None, _) => {}
            }
        }
        Ok(columns)
    }

    // ==================== Projection ====================

    /// Project rows onto the requested fields. Relationship fields of all rows
    /// are resolved together through one batch.
    pub(crate) fn project_rows<'s>(
        &'s self,
        schema: &'s TableSchema,
        fields: &'s BTreeMap<String, Field>,
        rows: &'s [Row],
    ) -> BoxFuture<'s, QueryResult<Vec<ProjectedRow>>> {
        async move {
            let mut projected = vec![ProjectedRow::new(); rows.len()];
            let mut batch = JoinBatch::default();

            for (name, field) in fields {
                match field {
                    Field::Column { column, .. } => {
                        for (out, row) in projected.iter_mut().zip(rows) {
                            let value = row.get(column).cloned().unwrap_or_default();
                            out.insert(name.clone(), FieldValue::Column(value));
                        }
                    }
                    Field::Relationship {
                        relationship: relationship_name,
                        query,
                    } => {
                        let relationship = self.relationship(&schema.name, relationship_name)?;
                        let target = self.table(&relationship.target_table)?;
                        let group = batch.group(relationship, target, query)?;
                        for (index, row) in rows.iter().enumerate() {
                            let key = match JoinKey::for_parent(row, relationship, target) {
                                KeyLookup::Key(key) => Some(key),
                                KeyLookup::Null => None,
                                KeyLookup::Invalid(value) => {
                                    warn!(
                                        table = %schema.name,
                                        relationship = %relationship_name,
                                        value = %value,
                                        "join key cannot be compared; resolving to no match"
                                    );
                                    None
                                }
                            };
                            batch.enqueue(group, index, name, key);
                        }
                    }
                }
            }

            if !batch.is_empty() {
                for resolved in self.flush(batch).await? {
                    projected[resolved.row]
                        .insert(resolved.field, FieldValue::Relationship(resolved.response));
                }
            }
            Ok(projected)
        }
        .boxed()
    }
}

/// Rows to fetch for a query: enough for both the returned rows and the
/// aggregated rows, unbounded if either needs every row.
fn fetch_limit(query: &Query) -> Option<usize> {
    match (query.fields.is_some(), query.aggregates.is_some()) {
        (true, false) => query.limit,
        (false, true) => query.aggregates_limit,
        _ => match (query.limit, query.aggregates_limit) {
            (Some(limit), Some(aggregates_limit)) => Some(limit.max(aggregates_limit)),
            _ => None,
        },
    }
}

fn sort_key(element: &OrderByElement) -> Option<SortKey> {
    match &element.target {
        OrderByTarget::Column { column } => Some(SortKey {
            column: column.clone(),
            direction: element.order_direction,
        }),
        _ => None,
    }
}
