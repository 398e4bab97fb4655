//! Query responses: a nested result tree matching the query shape.

use quarry_core::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The result of a query: aggregates and/or projected rows.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QueryResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregates: Option<BTreeMap<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rows: Option<Vec<ProjectedRow>>,
}

impl QueryResponse {
    /// Rows of the response, empty if none were requested.
    pub fn rows(&self) -> &[ProjectedRow] {
        self.rows.as_deref().unwrap_or_default()
    }

    /// Get an aggregate by name.
    pub fn aggregate(&self, name: &str) -> Option<&Value> {
        self.aggregates.as_ref().and_then(|a| a.get(name))
    }
}

/// A projected row: output field name to a scalar or a nested response.
pub type ProjectedRow = BTreeMap<String, FieldValue>;

/// The value of one projected field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Column(Value),
    Relationship(QueryResponse),
}

impl FieldValue {
    /// The scalar value, if this is a column field.
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            FieldValue::Column(v) => Some(v),
            FieldValue::Relationship(_) => None,
        }
    }

    /// The nested response, if this is a relationship field.
    pub fn as_response(&self) -> Option<&QueryResponse> {
        match self {
            FieldValue::Column(_) => None,
            FieldValue::Relationship(r) => Some(r),
        }
    }
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        FieldValue::Column(value)
    }
}
