//! Table names.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Error raised when a table name has no segments.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("table name must have at least one segment")]
pub struct EmptyTableName;

/// A table name: a non-empty ordered sequence of name segments
/// (e.g. `["chinook", "Artist"]`). Compared structurally.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct TableName(Vec<String>);

impl TableName {
    /// Create a table name from its segments.
    pub fn new<I, S>(segments: I) -> Result<Self, EmptyTableName>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if segments.is_empty() {
            return Err(EmptyTableName);
        }
        Ok(Self(segments))
    }

    /// Create a single-segment table name.
    pub fn single(name: impl Into<String>) -> Self {
        Self(vec![name.into()])
    }

    /// All name segments.
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// The last segment, i.e. the unqualified table name.
    pub fn base(&self) -> &str {
        // Non-empty by construction.
        self.0.last().map(String::as_str).unwrap_or_default()
    }
}

impl TryFrom<Vec<String>> for TableName {
    type Error = EmptyTableName;

    fn try_from(segments: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(segments)
    }
}

impl From<TableName> for Vec<String> {
    fn from(name: TableName) -> Self {
        name.0
    }
}

impl From<&str> for TableName {
    fn from(name: &str) -> Self {
        Self::single(name)
    }
}

/// Renders each segment bracketed and dot-joined: `[chinook].[Artist]`.
impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            write!(f, "[{}]", segment)?;
        }
        Ok(())
    }
}
