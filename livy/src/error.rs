//! Livy source error types.

use quarry_core::TableName;
use quarry_query::QueryError;
use quarry_source::SourceError;
use thiserror::Error;

/// Result type for Livy operations.
pub type LivyResult<T> = Result<T, LivyError>;

/// Errors raised while talking to Livy or translating requests for Spark.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LivyError {
    #[error("Livy request failed: {message}")]
    Http { message: String },

    #[error("Livy session {id} is dead")]
    SessionDead { id: u64 },

    #[error("Spark statement failed: {message}")]
    Statement { message: String },

    #[error("Unexpected Spark output: {message}")]
    MalformedOutput { message: String },

    #[error("Unknown table: {table}")]
    UnknownTable { table: TableName },

    #[error("No relationship named {relationship} found for table {table}")]
    UnknownRelationship {
        table: TableName,
        relationship: String,
    },

    #[error("Unknown operator: {operator}")]
    UnknownOperator { operator: String },

    #[error("configuration error: {0}")]
    Config(#[from] SourceError),

    #[error("Invalid Livy configuration: {message}")]
    InvalidConfig { message: String },
}

impl LivyError {
    pub fn statement(message: impl Into<String>) -> Self {
        Self::Statement {
            message: message.into(),
        }
    }

    pub fn malformed_output(message: impl Into<String>) -> Self {
        Self::MalformedOutput {
            message: message.into(),
        }
    }

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

    pub fn unknown_operator(operator: impl Into<String>) -> Self {
        Self::UnknownOperator {
            operator: operator.into(),
        }
    }

    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for LivyError {
    fn from(e: reqwest::Error) -> Self {
        Self::Http {
            message: e.to_string(),
        }
    }
}

impl From<LivyError> for QueryError {
    fn from(e: LivyError) -> Self {
        match e {
            LivyError::UnknownTable { table } => {
                QueryError::invalid_table(&table, "no Spark view is registered for this table")
            }
            LivyError::UnknownRelationship {
                table,
                relationship,
            } => QueryError::unknown_relationship(&table, relationship),
            LivyError::UnknownOperator { operator } => QueryError::unknown_operator(operator),
            LivyError::Config(source) => source.into(),
            other => QueryError::source_unavailable(other.to_string()),
        }
    }
}
