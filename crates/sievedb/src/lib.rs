//! SieveDB - Permission-aware query compilation for collection stores.
//!
//! SieveDB compiles a declarative, collection-oriented query (fields,
//! filters, aggregates, relational joins, sort, pagination) into a
//! dialect-correct, parameterized SQL statement, while rewriting the query
//! so it can never return data the caller is not authorized to see.
//!
//! ```
//! use sievedb::{
//!     compile, AccessContext, Action, CollectionDef, FieldDef, FieldType, MemoryRuleStore,
//!     PermissionRule, Postgres, SchemaOverview,
//! };
//! use sievedb::ir::{AbstractQuery, FieldNode};
//!
//! let schema = SchemaOverview::new().with_collection(
//!     CollectionDef::new("articles")
//!         .with_field(FieldDef::new("id", FieldType::Integer).primary())
//!         .with_field(FieldDef::new("title", FieldType::String)),
//! );
//! let store = MemoryRuleStore::with_rules(vec![
//!     PermissionRule::new("articles", Action::Read).with_fields(vec!["title".into()]),
//! ]);
//! let query = AbstractQuery::new("articles").select(FieldNode::primitive("title"));
//!
//! let compiled = compile(
//!     &schema,
//!     &store,
//!     &Postgres,
//!     &AccessContext::anonymous(),
//!     Action::Read,
//!     &query,
//! )
//! .unwrap();
//! assert_eq!(
//!     compiled.statement.sql(),
//!     "SELECT \"articles\".\"title\" AS \"title\" FROM \"articles\""
//! );
//! ```

pub use sievedb_core::{
    compile, dedupe_rules, expand, flatten, preprocess_bindings, required_context_fields,
    validate_numeric_bounds, AccessContext, Action, AliasPathMap, CollectionDef, CompiledQuery,
    Dialect, Error, FieldDef, FieldType, JunctionDef, MemoryRuleStore, ParamIndexer,
    PermissionError, PermissionRewriter, PermissionRule, Postgres, RelationDef, RelationKind,
    RuleGroup, RuleResolver, RuleStore, SchemaOverview, Sqlite, Statement, StatementBuilder,
    ALL_FIELDS,
};

/// The backend-neutral query IR.
pub use sievedb_ir as ir;
