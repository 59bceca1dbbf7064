//! Field nodes: the selection tree of an abstract query.

use serde::{Deserialize, Serialize};

use crate::query::Modifiers;
use crate::value::Value;

/// A named transform applied to a field in a selection or condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldFunction {
    /// Extract the year from a date/time field.
    Year,
    /// Extract the month.
    Month,
    /// Extract the ISO week.
    Week,
    /// Extract the day of month.
    Day,
    /// Extract the day of week.
    Weekday,
    /// Extract the hour.
    Hour,
    /// Extract the minute.
    Minute,
    /// Extract the second.
    Second,
    /// Count the elements of a JSON array field.
    Count,
    /// Project a JSON path out of a JSON field; the path is the first
    /// function argument.
    JsonPath,
}

impl FieldFunction {
    /// Lowercase name used in generated aliases and error messages.
    pub fn name(&self) -> &'static str {
        match self {
            FieldFunction::Year => "year",
            FieldFunction::Month => "month",
            FieldFunction::Week => "week",
            FieldFunction::Day => "day",
            FieldFunction::Weekday => "weekday",
            FieldFunction::Hour => "hour",
            FieldFunction::Minute => "minute",
            FieldFunction::Second => "second",
            FieldFunction::Count => "count",
            FieldFunction::JsonPath => "json",
        }
    }

    /// Check if this is a date-part extraction.
    pub fn is_date_part(&self) -> bool {
        !matches!(self, FieldFunction::Count | FieldFunction::JsonPath)
    }
}

/// A node in the requested-field tree.
///
/// Related nodes carry their own nested selection and modifiers, recursively,
/// so one tree describes the whole object graph a query produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldNode {
    /// A leaf column reference.
    Primitive {
        /// Column name.
        field: String,
        /// Optional output alias.
        alias: Option<String>,
    },
    /// A transform over a leaf column.
    Function {
        /// The transform.
        function: FieldFunction,
        /// Column the transform reads.
        field: String,
        /// Extra arguments, carried as values.
        args: Vec<Value>,
        /// Optional output alias.
        alias: Option<String>,
    },
    /// A hop through a declared relation into another collection.
    Related {
        /// Relation field on this collection.
        field: String,
        /// Target collection; required only for many-to-any hops.
        collection: Option<String>,
        /// Nested selection on the related collection.
        nodes: Vec<FieldNode>,
        /// Modifiers scoped to the nested query.
        modifiers: Modifiers,
        /// Optional output alias.
        alias: Option<String>,
    },
}

impl FieldNode {
    /// Create a primitive node.
    pub fn primitive(field: impl Into<String>) -> Self {
        FieldNode::Primitive {
            field: field.into(),
            alias: None,
        }
    }

    /// Create an aliased primitive node.
    pub fn aliased(field: impl Into<String>, alias: impl Into<String>) -> Self {
        FieldNode::Primitive {
            field: field.into(),
            alias: Some(alias.into()),
        }
    }

    /// Create a function node without extra arguments.
    pub fn function(function: FieldFunction, field: impl Into<String>) -> Self {
        FieldNode::Function {
            function,
            field: field.into(),
            args: vec![],
            alias: None,
        }
    }

    /// Create a function node with arguments.
    pub fn function_with_args(
        function: FieldFunction,
        field: impl Into<String>,
        args: Vec<Value>,
    ) -> Self {
        FieldNode::Function {
            function,
            field: field.into(),
            args,
            alias: None,
        }
    }

    /// Create a related node.
    pub fn related(field: impl Into<String>, nodes: Vec<FieldNode>) -> Self {
        FieldNode::Related {
            field: field.into(),
            collection: None,
            nodes,
            modifiers: Modifiers::default(),
            alias: None,
        }
    }

    /// Create a related node pinned to one branch of a many-to-any relation.
    pub fn related_any(
        field: impl Into<String>,
        collection: impl Into<String>,
        nodes: Vec<FieldNode>,
    ) -> Self {
        FieldNode::Related {
            field: field.into(),
            collection: Some(collection.into()),
            nodes,
            modifiers: Modifiers::default(),
            alias: None,
        }
    }

    /// Attach modifiers to a related node; no-op for leaf nodes.
    pub fn with_modifiers(mut self, new: Modifiers) -> Self {
        if let FieldNode::Related { modifiers, .. } = &mut self {
            *modifiers = new;
        }
        self
    }

    /// The field name this node reads.
    pub fn field_name(&self) -> &str {
        match self {
            FieldNode::Primitive { field, .. }
            | FieldNode::Function { field, .. }
            | FieldNode::Related { field, .. } => field,
        }
    }

    /// The name this node is emitted under: the alias if set, otherwise a
    /// name derived from the field (function nodes prepend the function).
    pub fn output_name(&self) -> String {
        match self {
            FieldNode::Primitive { field, alias } => {
                alias.clone().unwrap_or_else(|| field.clone())
            }
            FieldNode::Function {
                function,
                field,
                alias,
                ..
            } => alias
                .clone()
                .unwrap_or_else(|| format!("{}({})", function.name(), field)),
            FieldNode::Related { field, alias, .. } => {
                alias.clone().unwrap_or_else(|| field.clone())
            }
        }
    }

    /// Check if this is a relational hop.
    pub fn is_related(&self) -> bool {
        matches!(self, FieldNode::Related { .. })
    }
}
