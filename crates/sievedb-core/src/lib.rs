//! SieveDB Core - Permission enforcement and dialect statement building.
//!
//! This crate turns a backend-neutral abstract query into a dialect-correct,
//! parameterized SQL statement, after rewriting it so it can never return
//! data the caller is not authorized to see. The pieces compose in a fixed
//! order: a [`permissions::RuleResolver`] fetches the applicable rules, a
//! [`permissions::PermissionRewriter`] enforces field coverage and conjoins
//! row filters, a [`sql::StatementBuilder`] lowers the rewritten tree, and
//! [`reshape::expand`] folds the flat result rows back into the nested
//! object graph.

pub mod compile;
pub mod error;
pub mod permissions;
pub mod reshape;
pub mod schema;
pub mod sql;

pub use compile::compile;
pub use error::Error;
pub use permissions::{
    dedupe_rules, required_context_fields, AccessContext, Action, MemoryRuleStore,
    PermissionError, PermissionRewriter, PermissionRule, RuleGroup, RuleResolver, RuleStore,
    ALL_FIELDS,
};
pub use reshape::{expand, flatten};
pub use schema::{
    CollectionDef, FieldDef, FieldType, JunctionDef, RelationDef, RelationKind, SchemaOverview,
};
pub use sql::{
    preprocess_bindings, validate_numeric_bounds, AliasPathMap, CompiledQuery, Dialect,
    ParamIndexer, Postgres, Sqlite, Statement, StatementBuilder,
};

/// Re-export the IR crate.
pub use sievedb_ir as ir;
