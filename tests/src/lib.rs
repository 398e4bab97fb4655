//! Quarry integration test support.
//!
//! Provides a small music catalogue served from memory and a row source
//! wrapper that records every fetch, so tests can assert both results and
//! how many times each table was touched. A yielding wrapper makes the
//! in-memory source suspend like a remote one.

pub mod counting;
pub mod fixture;
pub mod yielding;

pub mod prelude {
    pub use crate::counting::{counted_session, CountingSource};
    pub use crate::fixture::{catalogue, catalogue_tables, nested, values, wide_catalogue};
    pub use crate::yielding::YieldingSource;
    pub use quarry_core::{row, Row, TableName, Value};
    pub use quarry_query::{QueryError, RowSource};
    pub use quarry_registry::{Column, Relationship, RelationshipKind, TableSchema};
    pub use quarry_request::{
        Aggregate, AggregateFunction, BinaryComparisonOperator, Expression, OrderBy,
        OrderByElement, OrderByRelation, OrderByTarget, OrderDirection, Query, QueryRequest,
        QueryResponse, ScalarValue,
    };
    pub use quarry_session::{Session, SessionError};
    pub use quarry_source::MemorySource;
    pub use std::sync::Arc;
}
