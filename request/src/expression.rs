//! Filter expression algebra.

use quarry_core::{TableName, Value};
use serde::{Deserialize, Serialize};

/// A boolean filter expression over the rows of a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Expression {
    And {
        expressions: Vec<Expression>,
    },
    Or {
        expressions: Vec<Expression>,
    },
    Not {
        expression: Box<Expression>,
    },
    Exists {
        in_table: ExistsInTable,
        r#where: Box<Expression>,
    },
    BinaryOp {
        column: ComparisonColumn,
        operator: BinaryComparisonOperator,
        value: ComparisonValue,
    },
    #[serde(rename = "binary_arr_op")]
    BinaryArrayOp {
        column: ComparisonColumn,
        operator: BinaryArrayComparisonOperator,
        values: Vec<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value_type: Option<String>,
    },
    UnaryOp {
        column: ComparisonColumn,
        operator: UnaryComparisonOperator,
    },
}

impl Expression {
    /// Conjunction of the given expressions.
    pub fn and(expressions: Vec<Expression>) -> Self {
        Expression::And { expressions }
    }

    /// Disjunction of the given expressions.
    pub fn or(expressions: Vec<Expression>) -> Self {
        Expression::Or { expressions }
    }

    /// Negation.
    #[allow(clippy::should_implement_trait)]
    pub fn not(expression: Expression) -> Self {
        Expression::Not {
            expression: Box::new(expression),
        }
    }

    /// `column = value` against a scalar.
    pub fn equal(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, BinaryComparisonOperator::Equal, value)
    }

    /// `column <op> value` against a scalar.
    pub fn compare(
        column: impl Into<String>,
        operator: BinaryComparisonOperator,
        value: impl Into<Value>,
    ) -> Self {
        Expression::BinaryOp {
            column: ComparisonColumn::new(column),
            operator,
            value: ComparisonValue::Scalar {
                value: value.into(),
                value_type: None,
            },
        }
    }

    /// `column IN (values)`.
    pub fn is_in(column: impl Into<String>, values: Vec<Value>) -> Self {
        Expression::BinaryArrayOp {
            column: ComparisonColumn::new(column),
            operator: BinaryArrayComparisonOperator::In,
            values,
            value_type: None,
        }
    }

    /// `column IS NULL`.
    pub fn is_null(column: impl Into<String>) -> Self {
        Expression::UnaryOp {
            column: ComparisonColumn::new(column),
            operator: UnaryComparisonOperator::IsNull,
        }
    }

    /// AND `other` onto an optional existing filter.
    pub fn conjoin(base: Option<Expression>, other: Expression) -> Expression {
        match base {
            Some(base) => Expression::and(vec![other, base]),
            None => other,
        }
    }
}

/// The table an `exists` sub-expression ranges over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExistsInTable {
    /// Rows reachable from the current row through a relationship.
    Related { relationship: String },
    /// Any rows of another table.
    Unrelated { table: TableName },
}

/// A column referenced by a comparison.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ComparisonColumn {
    /// `["$"]` refers to the root table of the enclosing query; absent or
    /// empty refers to the current table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<String>>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_type: Option<String>,
}

impl ComparisonColumn {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            path: None,
            name: name.into(),
            column_type: None,
        }
    }

    /// Whether this column refers to the root table rather than the current one.
    pub fn is_root(&self) -> bool {
        matches!(self.path.as_deref(), Some([first, ..]) if first == "$")
    }
}

/// Right-hand side of a binary comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ComparisonValue {
    Scalar {
        value: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value_type: Option<String>,
    },
    Column {
        column: ComparisonColumn,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryComparisonOperator {
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    Equal,
    /// An operator this engine does not evaluate (e.g. a source-specific one).
    #[serde(untagged)]
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryArrayComparisonOperator {
    In,
    #[serde(untagged)]
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnaryComparisonOperator {
    IsNull,
    #[serde(untagged)]
    Other(String),
}
