//! Query shape: fields, aggregates, ordering and pagination.

use crate::Expression;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A nested query against one table.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Query {
    /// Requested columns and relationships, by output field name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<BTreeMap<String, Field>>,
    /// Requested aggregates, by output name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregates: Option<BTreeMap<String, Aggregate>>,
    /// Row bound applied only to aggregate computation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregates_limit: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub r#where: Option<Expression>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_by: Option<OrderBy>,
}

impl Query {
    /// Create an empty query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a column under its own name.
    pub fn column(self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.field(name.clone(), Field::column(name))
    }

    /// Request a relationship with a nested query.
    pub fn relationship(
        self,
        field_name: impl Into<String>,
        relationship: impl Into<String>,
        query: Query,
    ) -> Self {
        self.field(
            field_name,
            Field::Relationship {
                relationship: relationship.into(),
                query,
            },
        )
    }

    /// Add a field.
    pub fn field(mut self, name: impl Into<String>, field: Field) -> Self {
        self.fields
            .get_or_insert_with(BTreeMap::new)
            .insert(name.into(), field);
        self
    }

    /// Add an aggregate.
    pub fn aggregate(mut self, name: impl Into<String>, aggregate: Aggregate) -> Self {
        self.aggregates
            .get_or_insert_with(BTreeMap::new)
            .insert(name.into(), aggregate);
        self
    }

    pub fn with_where(mut self, expression: Expression) -> Self {
        self.r#where = Some(expression);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn with_aggregates_limit(mut self, limit: usize) -> Self {
        self.aggregates_limit = Some(limit);
        self
    }

    pub fn with_order_by(mut self, order_by: OrderBy) -> Self {
        self.order_by = Some(order_by);
        self
    }

    /// Whether any fields were requested.
    pub fn has_fields(&self) -> bool {
        self.fields.is_some()
    }

    /// Whether any aggregates were requested.
    pub fn has_aggregates(&self) -> bool {
        self.aggregates.is_some()
    }
}

/// A requested output field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Field {
    Column {
        column: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        column_type: Option<String>,
    },
    Relationship {
        relationship: String,
        query: Query,
    },
}

impl Field {
    pub fn column(name: impl Into<String>) -> Self {
        Field::Column {
            column: name.into(),
            column_type: None,
        }
    }
}

/// An aggregate over the rows of a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Aggregate {
    StarCount,
    ColumnCount {
        column: String,
        #[serde(default)]
        distinct: bool,
    },
    SingleColumn {
        column: String,
        function: AggregateFunction,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result_type: Option<String>,
    },
}

impl Aggregate {
    pub fn single_column(column: impl Into<String>, function: AggregateFunction) -> Self {
        Aggregate::SingleColumn {
            column: column.into(),
            function,
            result_type: None,
        }
    }

    /// The column this aggregate reads, if any.
    pub fn column(&self) -> Option<&str> {
        match self {
            Aggregate::StarCount => None,
            Aggregate::ColumnCount { column, .. } | Aggregate::SingleColumn { column, .. } => {
                Some(column)
            }
        }
    }
}

/// Single-column aggregate functions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateFunction {
    Avg,
    Max,
    Min,
    Sum,
    Longest,
    Shortest,
    Stddev,
    StddevPop,
    StddevSamp,
    Variance,
    VarPop,
    VarSamp,
    /// A function this engine does not compute.
    #[serde(untagged)]
    Other(String),
}

impl fmt::Display for AggregateFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AggregateFunction::Avg => "avg",
            AggregateFunction::Max => "max",
            AggregateFunction::Min => "min",
            AggregateFunction::Sum => "sum",
            AggregateFunction::Longest => "longest",
            AggregateFunction::Shortest => "shortest",
            AggregateFunction::Stddev => "stddev",
            AggregateFunction::StddevPop => "stddev_pop",
            AggregateFunction::StddevSamp => "stddev_samp",
            AggregateFunction::Variance => "variance",
            AggregateFunction::VarPop => "var_pop",
            AggregateFunction::VarSamp => "var_samp",
            AggregateFunction::Other(name) => name,
        };
        write!(f, "{}", name)
    }
}

// ==================== ORDER BY ====================

/// Ordering of a query's rows, possibly through relationships.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OrderBy {
    /// Relationships used by element target paths, with their filters.
    #[serde(default)]
    pub relations: BTreeMap<String, OrderByRelation>,
    pub elements: Vec<OrderByElement>,
}

impl OrderBy {
    /// Order by plain columns of the queried table.
    pub fn columns(elements: impl IntoIterator<Item = (impl Into<String>, OrderDirection)>) -> Self {
        Self {
            relations: BTreeMap::new(),
            elements: elements
                .into_iter()
                .map(|(column, direction)| OrderByElement::column(column, direction))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OrderByRelation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub r#where: Option<Expression>,
    #[serde(default)]
    pub subrelations: BTreeMap<String, OrderByRelation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderByElement {
    /// Relationship names leading from the queried table to the target.
    #[serde(default)]
    pub target_path: Vec<String>,
    pub target: OrderByTarget,
    pub order_direction: OrderDirection,
}

impl OrderByElement {
    pub fn column(column: impl Into<String>, direction: OrderDirection) -> Self {
        Self {
            target_path: Vec::new(),
            target: OrderByTarget::Column {
                column: column.into(),
            },
            order_direction: direction,
        }
    }

    /// Whether the source can sort by this element natively: a plain column
    /// of the queried table.
    pub fn is_local_column(&self) -> bool {
        self.target_path.is_empty() && matches!(self.target, OrderByTarget::Column { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderByTarget {
    Column {
        column: String,
    },
    SingleColumnAggregate {
        column: String,
        function: AggregateFunction,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result_type: Option<String>,
    },
    StarCountAggregate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderDirection {
    Asc,
    Desc,
}
