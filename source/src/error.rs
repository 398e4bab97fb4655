//! Source error types.

use quarry_core::TableName;
use quarry_query::QueryError;
use std::path::Path;
use thiserror::Error;

/// Result type for source operations.
pub type SourceResult<T> = Result<T, SourceError>;

/// Errors raised while loading or querying local data.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SourceError {
    #[error("Unknown table: {table}")]
    UnknownTable { table: TableName },

    #[error("No relationship named {relationship} found for table {table}")]
    UnknownRelationship {
        table: TableName,
        relationship: String,
    },

    #[error("Unknown operator: {operator}")]
    UnknownOperator { operator: String },

    #[error("Failed to read {path}: {message}")]
    Io { path: String, message: String },

    #[error("Malformed CSV file {path}: {message}")]
    Csv { path: String, message: String },

    #[error("Malformed JSON file {path}: {message}")]
    Json { path: String, message: String },

    #[error("Malformed spreadsheet {path}: {message}")]
    Spreadsheet { path: String, message: String },

    #[error("Invalid configuration: {message}")]
    Config { message: String },
}

impl SourceError {
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

    pub fn io(path: &Path, error: impl ToString) -> Self {
        Self::Io {
            path: path.display().to_string(),
            message: error.to_string(),
        }
    }

    pub fn csv(path: &Path, error: impl ToString) -> Self {
        Self::Csv {
            path: path.display().to_string(),
            message: error.to_string(),
        }
    }

    pub fn json(path: &Path, message: impl ToString) -> Self {
        Self::Json {
            path: path.display().to_string(),
            message: message.to_string(),
        }
    }

    pub fn spreadsheet(path: &Path, error: impl ToString) -> Self {
        Self::Spreadsheet {
            path: path.display().to_string(),
            message: error.to_string(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

impl From<SourceError> for QueryError {
    fn from(e: SourceError) -> Self {
        match e {
            SourceError::UnknownTable { table } => {
                QueryError::invalid_table(&table, "table is not loaded by this source")
            }
            SourceError::UnknownRelationship {
                table,
                relationship,
            } => QueryError::unknown_relationship(&table, relationship),
            SourceError::UnknownOperator { operator } => QueryError::unknown_operator(operator),
            other => QueryError::source_unavailable(other.to_string()),
        }
    }
}
