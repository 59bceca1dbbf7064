//! The abstract query: one collection, a selection tree, and modifiers.

use serde::{Deserialize, Serialize};

use crate::condition::{ConditionTarget, ConditionTree};
use crate::field::FieldNode;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    /// Ascending order.
    Asc,
    /// Descending order.
    Desc,
}

/// One sort entry: a target column (or function over one) and a direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortSpec {
    /// What to sort by.
    pub target: ConditionTarget,
    /// Sort direction.
    pub direction: SortDirection,
}

impl SortSpec {
    /// Sort ascending by a field.
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            target: ConditionTarget::Field(field.into()),
            direction: SortDirection::Asc,
        }
    }

    /// Sort descending by a field.
    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            target: ConditionTarget::Field(field.into()),
            direction: SortDirection::Desc,
        }
    }
}

/// Aggregate operations.
///
/// This enum is closed: an operation outside this list is unrepresentable
/// and therefore rejected before compilation begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AggregateOp {
    /// Count of non-null values.
    Count,
    /// Count of distinct values.
    CountDistinct,
    /// Count of rows.
    CountAll,
    /// Sum of values.
    Sum,
    /// Average of values.
    Avg,
    /// Minimum value.
    Min,
    /// Maximum value.
    Max,
}

impl AggregateOp {
    /// Name used in the deterministic output alias (`operation->field`).
    pub fn name(&self) -> &'static str {
        match self {
            AggregateOp::Count => "count",
            AggregateOp::CountDistinct => "countDistinct",
            AggregateOp::CountAll => "countAll",
            AggregateOp::Sum => "sum",
            AggregateOp::Avg => "avg",
            AggregateOp::Min => "min",
            AggregateOp::Max => "max",
        }
    }
}

/// One aggregate entry: an operation and the fields it applies to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateSpec {
    /// The aggregate operation.
    pub operation: AggregateOp,
    /// Target fields; empty for `CountAll`.
    pub fields: Vec<String>,
}

impl AggregateSpec {
    /// Create an aggregate over the given fields.
    pub fn new(operation: AggregateOp, fields: Vec<String>) -> Self {
        Self { operation, fields }
    }

    /// Create a COUNT(*) aggregate.
    pub fn count_all() -> Self {
        Self {
            operation: AggregateOp::CountAll,
            fields: vec![],
        }
    }
}

/// Modifiers attached to a query or to a nested relational sub-query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Modifiers {
    /// Row filter.
    pub filter: Option<ConditionTree>,
    /// Sort order.
    pub sort: Vec<SortSpec>,
    /// Maximum number of rows.
    pub limit: Option<u32>,
    /// Number of rows to skip.
    pub offset: Option<u32>,
    /// Aggregate operations; when non-empty the select list is replaced.
    pub aggregate: Vec<AggregateSpec>,
    /// Grouping fields for aggregates.
    pub group: Vec<String>,
}

impl Modifiers {
    /// Check if no modifier is set.
    pub fn is_empty(&self) -> bool {
        self.filter.is_none()
            && self.sort.is_empty()
            && self.limit.is_none()
            && self.offset.is_none()
            && self.aggregate.is_empty()
            && self.group.is_empty()
    }
}

/// A backend-neutral query against one collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbstractQuery {
    /// Optional store (database/schema namespace) qualifying the collection.
    pub store: Option<String>,
    /// Target collection.
    pub collection: String,
    /// Requested field nodes; non-empty for any query expecting output.
    pub nodes: Vec<FieldNode>,
    /// Query modifiers.
    pub modifiers: Modifiers,
}

impl AbstractQuery {
    /// Create a new query against a collection.
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            store: None,
            collection: collection.into(),
            nodes: vec![],
            modifiers: Modifiers::default(),
        }
    }

    /// Qualify the collection with a store.
    pub fn in_store(mut self, store: impl Into<String>) -> Self {
        self.store = Some(store.into());
        self
    }

    /// Add a field node.
    pub fn select(mut self, node: FieldNode) -> Self {
        self.nodes.push(node);
        self
    }

    /// Replace the field nodes.
    pub fn with_nodes(mut self, nodes: Vec<FieldNode>) -> Self {
        self.nodes = nodes;
        self
    }

    /// Set the filter.
    pub fn with_filter(mut self, filter: ConditionTree) -> Self {
        self.modifiers.filter = Some(filter);
        self
    }

    /// Add a sort entry.
    pub fn with_sort(mut self, sort: SortSpec) -> Self {
        self.modifiers.sort.push(sort);
        self
    }

    /// Set the limit.
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.modifiers.limit = Some(limit);
        self
    }

    /// Set the offset.
    pub fn with_offset(mut self, offset: u32) -> Self {
        self.modifiers.offset = Some(offset);
        self
    }

    /// Add an aggregate entry.
    pub fn with_aggregate(mut self, aggregate: AggregateSpec) -> Self {
        self.modifiers.aggregate.push(aggregate);
        self
    }

    /// Add a grouping field.
    pub fn group_by(mut self, field: impl Into<String>) -> Self {
        self.modifiers.group.push(field.into());
        self
    }
}
