//! Quarry Query
//!
//! Execute nested relational queries against a row source.
//!
//! Responsibilities:
//! - Fetch the rows of a table, widened with the columns joins need
//! - Resolve relationship fields with one batched fetch per relationship
//! - Compute aggregates over a bounded row set
//! - Sort through relationship paths when the source cannot

mod aggregates;
mod error;
mod executor;
mod loader;
mod order_by;
mod source;

pub use aggregates::{evaluate, evaluate_all};
pub use error::{QueryError, QueryResult};
pub use executor::QueryExecutor;
pub use loader::{JoinKey, KeyPart};
pub use source::{FetchRequest, RowSet, RowSource, SortKey};
