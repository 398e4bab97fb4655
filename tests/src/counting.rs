//! A row source wrapper that records fetches.

use async_trait::async_trait;
use parking_lot::Mutex;
use quarry_query::{FetchRequest, QueryResult, RowSet, RowSource};
use quarry_registry::TableSchema;
use quarry_session::{Session, SessionResult};
use std::sync::Arc;

/// Forwards to an inner source and keeps every fetch request it saw.
pub struct CountingSource<S> {
    inner: S,
    fetches: Mutex<Vec<FetchRequest>>,
}

impl<S: RowSource> CountingSource<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            fetches: Mutex::new(Vec::new()),
        }
    }

    /// Every fetch so far, in call order.
    pub fn fetches(&self) -> Vec<FetchRequest> {
        self.fetches.lock().clone()
    }

    /// Fetches of one table, by base name.
    pub fn fetches_of(&self, table: &str) -> Vec<FetchRequest> {
        self.fetches
            .lock()
            .iter()
            .filter(|f| f.table.base() == table)
            .cloned()
            .collect()
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.lock().len()
    }

    pub fn reset(&self) {
        self.fetches.lock().clear();
    }
}

#[async_trait]
impl<S: RowSource> RowSource for CountingSource<S> {
    async fn fetch_rows(&self, request: FetchRequest) -> QueryResult<RowSet> {
        self.fetches.lock().push(request.clone());
        self.inner.fetch_rows(request).await
    }

    async fn schema(&self) -> QueryResult<Vec<TableSchema>> {
        self.inner.schema().await
    }
}

/// A session over a counting wrapper of `inner`, plus the wrapper itself.
/// Fetches made while reading the schema are not recorded.
pub async fn counted_session<S: RowSource + 'static>(
    inner: S,
) -> SessionResult<(Session, Arc<CountingSource<S>>)> {
    let source = Arc::new(CountingSource::new(inner));
    let session = Session::new(source.clone()).await?;
    source.reset();
    Ok((session, source))
}
