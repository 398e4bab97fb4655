//! Human-readable rendering of filter expressions, used in logs.

use crate::{
    BinaryArrayComparisonOperator, BinaryComparisonOperator, ComparisonColumn, ComparisonValue,
    ExistsInTable, Expression, UnaryComparisonOperator,
};
use std::fmt;

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::And { expressions } if expressions.is_empty() => write!(f, "true"),
            Expression::And { expressions } => write_joined(f, expressions, " && "),
            Expression::Or { expressions } if expressions.is_empty() => write!(f, "false"),
            Expression::Or { expressions } => write_joined(f, expressions, " || "),
            Expression::Not { expression } => write!(f, "!({})", expression),
            Expression::Exists { in_table, r#where } => {
                write!(f, "(EXISTS IN {} WHERE ({}))", in_table, r#where)
            }
            Expression::BinaryOp {
                column,
                operator,
                value,
            } => write!(f, "({} {} {})", column, operator, value),
            Expression::BinaryArrayOp {
                column,
                operator,
                values,
                ..
            } => {
                write!(f, "({} {} (", column, operator)?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write_scalar(f, value)?;
                }
                write!(f, "))")
            }
            Expression::UnaryOp { column, operator } => write!(f, "({} {})", column, operator),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, expressions: &[Expression], sep: &str) -> fmt::Result {
    write!(f, "(")?;
    for (i, expression) in expressions.iter().enumerate() {
        if i > 0 {
            write!(f, "{}", sep)?;
        }
        write!(f, "{}", expression)?;
    }
    write!(f, ")")
}

fn write_scalar(f: &mut fmt::Formatter<'_>, value: &quarry_core::Value) -> fmt::Result {
    if value.is_null() {
        write!(f, "null")
    } else {
        write!(f, "{}", value)
    }
}

impl fmt::Display for ComparisonColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in self.path.iter().flatten() {
            write!(f, "[{}].", segment)?;
        }
        write!(f, "[{}]", self.name)
    }
}

impl fmt::Display for ComparisonValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComparisonValue::Column { column } => write!(f, "{}", column),
            ComparisonValue::Scalar { value, .. } => write_scalar(f, value),
        }
    }
}

impl fmt::Display for ExistsInTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExistsInTable::Related { relationship } => {
                write!(f, "RELATED TABLE VIA [{}]", relationship)
            }
            ExistsInTable::Unrelated { table } => write!(f, "UNRELATED TABLE {}", table),
        }
    }
}

impl fmt::Display for BinaryComparisonOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            BinaryComparisonOperator::LessThan => "<",
            BinaryComparisonOperator::LessThanOrEqual => "<=",
            BinaryComparisonOperator::GreaterThan => ">",
            BinaryComparisonOperator::GreaterThanOrEqual => ">=",
            BinaryComparisonOperator::Equal => "==",
            BinaryComparisonOperator::Other(name) => name,
        };
        write!(f, "{}", symbol)
    }
}

impl fmt::Display for BinaryArrayComparisonOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BinaryArrayComparisonOperator::In => write!(f, "IN"),
            BinaryArrayComparisonOperator::Other(name) => write!(f, "{}", name),
        }
    }
}

impl fmt::Display for UnaryComparisonOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnaryComparisonOperator::IsNull => write!(f, "IS NULL"),
            UnaryComparisonOperator::Other(name) => write!(f, "{}", name),
        }
    }
}
