//! In-memory row source.

use async_trait::async_trait;
use quarry_core::{Row, TableName};
use quarry_query::{FetchRequest, QueryResult, RowSet, RowSource, SortKey};
use quarry_registry::TableSchema;
use quarry_request::OrderDirection;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::debug;

use crate::filter::Filter;
use crate::{SourceError, SourceResult};

pub(crate) struct MemoryTable {
    pub schema: TableSchema,
    pub rows: Vec<Row>,
}

/// Typed tables held in memory, in insertion order per table.
#[derive(Default)]
pub struct MemorySource {
    tables: BTreeMap<TableName, MemoryTable>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a table, replacing any table of the same name.
    pub fn add_table(&mut self, schema: TableSchema, rows: Vec<Row>) -> &mut Self {
        self.tables
            .insert(schema.name.clone(), MemoryTable { schema, rows });
        self
    }

    pub fn with_table(mut self, schema: TableSchema, rows: Vec<Row>) -> Self {
        self.add_table(schema, rows);
        self
    }

    pub fn table_names(&self) -> impl Iterator<Item = &TableName> {
        self.tables.keys()
    }

    pub fn row_count(&self, table: &TableName) -> Option<usize> {
        self.tables.get(table).map(|t| t.rows.len())
    }

    pub(crate) fn table(&self, name: &TableName) -> SourceResult<&MemoryTable> {
        self.tables
            .get(name)
            .ok_or_else(|| SourceError::unknown_table(name))
    }

    /// Filter, sort, window and project the rows of one table.
    pub fn select(&self, request: &FetchRequest) -> SourceResult<RowSet> {
        let table = self.table(&request.table)?;
        let filter = Filter::new(self, &request.relationships);

        let mut matched: Vec<&Row> = Vec::new();
        for row in &table.rows {
            let keep = match &request.filter {
                Some(expression) => filter.matches(&table.schema, row, row, expression)?,
                None => true,
            };
            if keep {
                matched.push(row);
            }
        }
        let total = matched.len();

        if !request.order_by.is_empty() {
            matched.sort_by(|a, b| compare_rows(a, b, &request.order_by));
        }

        let rows = matched
            .into_iter()
            .skip(request.offset.unwrap_or(0))
            .take(request.limit.unwrap_or(usize::MAX))
            .map(|row| project(row, &request.columns))
            .collect();

        Ok(RowSet { rows, total })
    }
}

fn compare_rows(a: &Row, b: &Row, keys: &[SortKey]) -> Ordering {
    for key in keys {
        let (x, y) = (a.get(&key.column), b.get(&key.column));
        let x = x.cloned().unwrap_or_default();
        let y = y.cloned().unwrap_or_default();
        let ordering = match key.direction {
            OrderDirection::Asc => x.cmp_sortable(&y),
            OrderDirection::Desc => y.cmp_sortable(&x),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

fn project(row: &Row, columns: &[String]) -> Row {
    columns
        .iter()
        .filter_map(|column| row.get(column).map(|value| (column.clone(), value.clone())))
        .collect()
}

#[async_trait]
impl RowSource for MemorySource {
    async fn fetch_rows(&self, request: FetchRequest) -> QueryResult<RowSet> {
        let result = self.select(&request)?;
        debug!(
            table = %request.table,
            returned = result.rows.len(),
            total = result.total,
            "selected rows in memory"
        );
        Ok(result)
    }

    async fn schema(&self) -> QueryResult<Vec<TableSchema>> {
        Ok(self.tables.values().map(|t| t.schema.clone()).collect())
    }
}
