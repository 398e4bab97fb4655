//! A row source wrapper that suspends before every fetch.

use async_trait::async_trait;
use quarry_query::{FetchRequest, QueryResult, RowSet, RowSource};
use quarry_registry::TableSchema;

/// Yields to the runtime once before forwarding each fetch, the way a remote
/// source would. Concurrent executions then interleave at every fetch instead
/// of each running to completion on its first poll.
pub struct YieldingSource<S> {
    inner: S,
}

impl<S: RowSource> YieldingSource<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<S: RowSource> RowSource for YieldingSource<S> {
    async fn fetch_rows(&self, request: FetchRequest) -> QueryResult<RowSet> {
        tokio::task::yield_now().await;
        self.inner.fetch_rows(request).await
    }

    async fn schema(&self) -> QueryResult<Vec<TableSchema>> {
        self.inner.schema().await
    }
}
