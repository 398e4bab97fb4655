//! Query error types.

use quarry_core::TableName;
use thiserror::Error;

/// Result type for query operations.
pub type QueryResult<T> = Result<T, QueryError>;

/// Errors that abort a query request.
///
/// Cloneable so that one failed batch fetch can be reported to every
/// relationship field that was waiting on it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryError {
    #[error("Unknown table: {table}")]
    UnknownTable { table: TableName },

    #[error("No relationship named {relationship} found for table {table}")]
    UnknownRelationship {
        table: TableName,
        relationship: String,
    },

    #[error("Row source unavailable: {message}")]
    SourceUnavailable { message: String },

    #[error("{table} is not a valid table: {message}")]
    InvalidTable { table: TableName, message: String },

    #[error("Unexpected number of rows ({rows}) returned by order by element query on path {path:?}")]
    AmbiguousOrderByTarget { path: Vec<String>, rows: usize },

    #[error("Found non-comparable scalar values when computing {function}")]
    NonComparableValues { function: String },

    #[error("Found non-numeric scalar values when computing {function}")]
    NonNumericValues { function: String },

    #[error("Unknown aggregate function: {function}")]
    UnknownAggregateFunction { function: String },

    #[error("Unknown operator: {operator}")]
    UnknownOperator { operator: String },

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },
}

impl QueryError {
    pub fn unknown_table(table: &TableName) -> Self {
        Self::UnknownTable {
            table: table.clone(),
        }
    }

    pub fn unknown_relationship(table: &TableName, relationship: impl Into<String>) -> Self {
        Self::UnknownRelationship {
            table: table.clone(),
            relationship: relationship.into(),
        }
    }

    pub fn source_unavailable(message: impl Into<String>) -> Self {
        Self::SourceUnavailable {
            message: message.into(),
        }
    }

    pub fn invalid_table(table: &TableName, message: impl Into<String>) -> Self {
        Self::InvalidTable {
            table: table.clone(),
            message: message.into(),
        }
    }

    pub fn non_comparable(function: impl ToString) -> Self {
        Self::NonComparableValues {
            function: function.to_string(),
        }
    }

    pub fn non_numeric(function: impl ToString) -> Self {
        Self::NonNumericValues {
            function: function.to_string(),
        }
    }

    pub fn unknown_operator(operator: impl Into<String>) -> Self {
        Self::UnknownOperator {
            operator: operator.into(),
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for QueryError {
    fn from(e: serde_json::Error) -> Self {
        Self::invalid_request(e.to_string())
    }
}
