//! Condition trees attached to queries and permission rules.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::field::FieldFunction;
use crate::value::Value;

/// Logical combinator for grouping conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogicalOp {
    /// All children must match.
    And,
    /// At least one child must match.
    Or,
}

/// Comparison operator for field-to-field comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    /// Equal.
    Eq,
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Gte,
    /// Less than.
    Lt,
    /// Less than or equal.
    Lte,
}

impl CompareOp {
    /// SQL operator spelling.
    pub fn sql(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Gt => ">",
            CompareOp::Gte => ">=",
            CompareOp::Lt => "<",
            CompareOp::Lte => "<=",
        }
    }
}

/// String predicates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StringPredicate {
    /// Exact equality.
    Eq(Value),
    /// Substring match.
    Contains(String),
    /// Case-insensitive substring match.
    IContains(String),
    /// Prefix match.
    StartsWith(String),
    /// Case-insensitive prefix match.
    IStartsWith(String),
    /// Suffix match.
    EndsWith(String),
    /// Case-insensitive suffix match.
    IEndsWith(String),
}

/// Numeric predicates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NumberPredicate {
    /// Equal.
    Eq(Value),
    /// Greater than.
    Gt(Value),
    /// Greater than or equal.
    Gte(Value),
    /// Less than.
    Lt(Value),
    /// Less than or equal.
    Lte(Value),
}

/// Set membership and range predicates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SetPredicate {
    /// Value is one of the listed values.
    In(Vec<Value>),
    /// Value lies between the two bounds (inclusive).
    Between(Value, Value),
}

/// Geometry predicates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GeoPredicate {
    /// Geometries intersect.
    Intersects(Value),
    /// Bounding boxes intersect.
    IntersectsBbox(Value),
}

/// The predicate applied by a single condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Predicate {
    /// String comparison.
    StringCmp(StringPredicate),
    /// Numeric comparison.
    NumberCmp(NumberPredicate),
    /// Set membership or range.
    SetCmp(SetPredicate),
    /// Geometry comparison.
    GeoCmp(GeoPredicate),
    /// IS NULL test (IS NOT NULL when negated).
    Null,
    /// Comparison against another field of the same collection.
    FieldCmp {
        /// Comparison operator.
        op: CompareOp,
        /// The other field's name.
        other: String,
    },
}

/// What a condition applies to: a plain column or a function over one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConditionTarget {
    /// A column reference.
    Field(String),
    /// A function applied to a column.
    Function {
        /// The transform to apply.
        function: FieldFunction,
        /// The column the function reads.
        field: String,
    },
}

impl ConditionTarget {
    /// The underlying column name.
    pub fn field_name(&self) -> &str {
        match self {
            ConditionTarget::Field(field) => field,
            ConditionTarget::Function { field, .. } => field,
        }
    }
}

/// A single condition: target, optional negation, and a predicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// What the predicate applies to.
    pub target: ConditionTarget,
    /// Invert the predicate.
    pub negate: bool,
    /// The predicate itself.
    pub predicate: Predicate,
}

impl Condition {
    /// Create a condition on a plain field.
    pub fn new(field: impl Into<String>, predicate: Predicate) -> Self {
        Self {
            target: ConditionTarget::Field(field.into()),
            negate: false,
            predicate,
        }
    }

    /// Create an equality condition, dispatching on the value kind.
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        let value = value.into();
        let predicate = match &value {
            Value::Int(_) | Value::Float(_) | Value::Decimal(_) => {
                Predicate::NumberCmp(NumberPredicate::Eq(value))
            }
            _ => Predicate::StringCmp(StringPredicate::Eq(value)),
        };
        Self::new(field, predicate)
    }

    /// Create a greater-than condition.
    pub fn gt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, Predicate::NumberCmp(NumberPredicate::Gt(value.into())))
    }

    /// Create a less-than condition.
    pub fn lt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, Predicate::NumberCmp(NumberPredicate::Lt(value.into())))
    }

    /// Create an IN condition.
    pub fn in_values(field: impl Into<String>, values: Vec<Value>) -> Self {
        Self::new(field, Predicate::SetCmp(SetPredicate::In(values)))
    }

    /// Create an IS NULL condition.
    pub fn is_null(field: impl Into<String>) -> Self {
        Self::new(field, Predicate::Null)
    }

    /// Create a substring-match condition.
    pub fn contains(field: impl Into<String>, needle: impl Into<String>) -> Self {
        Self::new(
            field,
            Predicate::StringCmp(StringPredicate::Contains(needle.into())),
        )
    }

    /// Negate this condition.
    pub fn negated(mut self) -> Self {
        self.negate = !self.negate;
        self
    }

    /// Visit every value in this condition.
    pub fn for_each_value<F: FnMut(&Value)>(&self, f: &mut F) {
        match &self.predicate {
            Predicate::StringCmp(StringPredicate::Eq(v))
            | Predicate::NumberCmp(
                NumberPredicate::Eq(v)
                | NumberPredicate::Gt(v)
                | NumberPredicate::Gte(v)
                | NumberPredicate::Lt(v)
                | NumberPredicate::Lte(v),
            )
            | Predicate::GeoCmp(GeoPredicate::Intersects(v) | GeoPredicate::IntersectsBbox(v)) => {
                f(v)
            }
            Predicate::SetCmp(SetPredicate::In(values)) => {
                for v in values {
                    f(v);
                }
            }
            Predicate::SetCmp(SetPredicate::Between(low, high)) => {
                f(low);
                f(high);
            }
            Predicate::StringCmp(_) | Predicate::Null | Predicate::FieldCmp { .. } => {}
        }
    }

    /// Visit every value in this condition mutably.
    pub fn for_each_value_mut<F: FnMut(&mut Value)>(&mut self, f: &mut F) {
        match &mut self.predicate {
            Predicate::StringCmp(StringPredicate::Eq(v))
            | Predicate::NumberCmp(
                NumberPredicate::Eq(v)
                | NumberPredicate::Gt(v)
                | NumberPredicate::Gte(v)
                | NumberPredicate::Lt(v)
                | NumberPredicate::Lte(v),
            )
            | Predicate::GeoCmp(GeoPredicate::Intersects(v) | GeoPredicate::IntersectsBbox(v)) => {
                f(v)
            }
            Predicate::SetCmp(SetPredicate::In(values)) => {
                for v in values {
                    f(v);
                }
            }
            Predicate::SetCmp(SetPredicate::Between(low, high)) => {
                f(low);
                f(high);
            }
            Predicate::StringCmp(_) | Predicate::Null | Predicate::FieldCmp { .. } => {}
        }
    }
}

/// A filter tree: logical groups of conditions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConditionTree {
    /// A logical combination of subtrees.
    Logical {
        /// How the children combine.
        op: LogicalOp,
        /// The subtrees.
        children: Vec<ConditionTree>,
    },
    /// A leaf condition.
    Condition(Condition),
}

impl ConditionTree {
    /// Combine subtrees with AND.
    pub fn and(children: Vec<ConditionTree>) -> Self {
        ConditionTree::Logical {
            op: LogicalOp::And,
            children,
        }
    }

    /// Combine subtrees with OR.
    pub fn or(children: Vec<ConditionTree>) -> Self {
        ConditionTree::Logical {
            op: LogicalOp::Or,
            children,
        }
    }

    /// Collect every field name referenced anywhere in the tree, including
    /// both sides of field-to-field comparisons.
    pub fn referenced_fields(&self) -> BTreeSet<String> {
        let mut fields = BTreeSet::new();
        self.collect_fields(&mut fields);
        fields
    }

    fn collect_fields(&self, fields: &mut BTreeSet<String>) {
        match self {
            ConditionTree::Logical { children, .. } => {
                for child in children {
                    child.collect_fields(fields);
                }
            }
            ConditionTree::Condition(condition) => {
                fields.insert(condition.target.field_name().to_string());
                if let Predicate::FieldCmp { other, .. } = &condition.predicate {
                    fields.insert(other.clone());
                }
            }
        }
    }

    /// Visit every value in the tree.
    pub fn for_each_value<F: FnMut(&Value)>(&self, f: &mut F) {
        match self {
            ConditionTree::Logical { children, .. } => {
                for child in children {
                    child.for_each_value(f);
                }
            }
            ConditionTree::Condition(condition) => condition.for_each_value(f),
        }
    }

    /// Visit every value in the tree mutably.
    pub fn for_each_value_mut<F: FnMut(&mut Value)>(&mut self, f: &mut F) {
        match self {
            ConditionTree::Logical { children, .. } => {
                for child in children {
                    child.for_each_value_mut(f);
                }
            }
            ConditionTree::Condition(condition) => condition.for_each_value_mut(f),
        }
    }
}

impl From<Condition> for ConditionTree {
    fn from(condition: Condition) -> Self {
        ConditionTree::Condition(condition)
    }
}
