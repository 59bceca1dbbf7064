//! SieveDB IR - Backend-neutral representation of collection queries.
//!
//! This crate defines the tree that the transport layer hands to the
//! compiler: a target collection, the requested field nodes, and the
//! modifiers (filter, sort, pagination, aggregation) attached to the query
//! and to every nested relational sub-query.

pub mod condition;
pub mod field;
pub mod query;
pub mod value;

pub use condition::{
    CompareOp, Condition, ConditionTarget, ConditionTree, GeoPredicate, LogicalOp,
    NumberPredicate, Predicate, SetPredicate, StringPredicate,
};
pub use field::{FieldFunction, FieldNode};
pub use query::{
    AbstractQuery, AggregateOp, AggregateSpec, Modifiers, SortDirection, SortSpec,
};
pub use value::Value;
