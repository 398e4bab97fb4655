//! Session: a row source plus its registry.

use quarry_query::{QueryExecutor, RowSource};
use quarry_registry::{Registry, RegistryBuilder, TableSchema};
use quarry_request::{QueryRequest, QueryResponse};
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::SessionResult;

/// A query session.
///
/// Built once per process from a row source. The registry is read from the
/// source's schema at construction and never changes afterwards.
pub struct Session {
    source: Arc<dyn RowSource>,
    registry: Registry,
}

impl Session {
    /// Load the source's schema and build the registry.
    pub async fn new(source: Arc<dyn RowSource>) -> SessionResult<Self> {
        let tables = source.schema().await?;
        let mut builder = RegistryBuilder::new();
        for table in tables {
            builder.add_schema(table);
        }
        let registry = builder.build()?;
        info!(tables = registry.table_count(), "session ready");

        Ok(Self { source, registry })
    }

    /// Get the registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Every table, in the order the source reported them.
    pub fn schema(&self) -> Vec<TableSchema> {
        self.registry.all_tables().cloned().collect()
    }

    /// Execute a request, in foreach mode when it carries foreach entries.
    pub async fn execute(&self, request: &QueryRequest) -> SessionResult<QueryResponse> {
        debug!(table = %request.table, foreach = request.foreach.is_some(), "executing request");
        let executor = QueryExecutor::new(&self.registry, self.source.as_ref())
            .with_relationships(&request.table_relationships);
        Ok(executor.execute_request(request).await?)
    }

    /// Decode a JSON request and execute it.
    pub async fn execute_json(&self, request: &str) -> SessionResult<QueryResponse> {
        let request: QueryRequest = serde_json::from_str(request)?;
        self.execute(&request).await
    }
}
