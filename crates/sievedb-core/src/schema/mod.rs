//! Schema overview: collections, fields, and relations.
//!
//! This is the read-only catalog the rewriter and statement builder consult.
//! It is supplied by the surrounding system; nothing in this crate mutates it.

mod collection;
mod field;
mod overview;
mod relation;
mod types;

pub use collection::CollectionDef;
pub use field::FieldDef;
pub use overview::SchemaOverview;
pub use relation::{JunctionDef, RelationDef, RelationKind};
pub use types::FieldType;
