//! The row source capability a backend implements.

use async_trait::async_trait;
use quarry_core::{Row, TableName};
use quarry_registry::TableSchema;
use quarry_request::{Expression, OrderDirection, TableRelationships};
use std::sync::Arc;

use crate::QueryResult;

/// One native sort key: a column of the fetched table.
#[derive(Debug, Clone, PartialEq)]
pub struct SortKey {
    pub column: String,
    pub direction: OrderDirection,
}

/// Parameters of a single row fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    pub table: TableName,
    /// Columns to return. Sources may return more.
    pub columns: Vec<String>,
    pub filter: Option<Expression>,
    pub order_by: Vec<SortKey>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    /// Relationships supplied with the request, for sources that evaluate
    /// `exists` over related tables.
    pub relationships: Vec<TableRelationships>,
}

impl FetchRequest {
    /// An unfiltered, unordered, unpaginated fetch of the given columns.
    pub fn new(table: TableName, columns: Vec<String>) -> Self {
        Self {
            table,
            columns,
            filter: None,
            order_by: Vec::new(),
            limit: None,
            offset: None,
            relationships: Vec::new(),
        }
    }
}

/// Rows returned by a fetch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowSet {
    pub rows: Vec<Row>,
    /// Number of matching rows before pagination.
    pub total: usize,
}

/// A backend that can fetch raw rows and describe its tables.
///
/// Filter and sort translation into a native form is the source's concern;
/// the executor only passes the request through.
#[async_trait]
pub trait RowSource: Send + Sync {
    /// Fetch rows of one table.
    async fn fetch_rows(&self, request: FetchRequest) -> QueryResult<RowSet>;

    /// Describe every table this source serves. Called once at startup.
    async fn schema(&self) -> QueryResult<Vec<TableSchema>>;
}

#[async_trait]
impl<S: RowSource + ?Sized> RowSource for Arc<S> {
    async fn fetch_rows(&self, request: FetchRequest) -> QueryResult<RowSet> {
        (**self).fetch_rows(request).await
    }

    async fn schema(&self) -> QueryResult<Vec<TableSchema>> {
        (**self).schema().await
    }
}
