//! The schema overview: the read-only catalog consulted during compilation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::collection::CollectionDef;
use super::field::FieldDef;
use super::relation::RelationDef;

/// In-memory catalog of collections and relations.
///
/// Read-only for this subsystem; one overview serves a whole compile pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaOverview {
    /// Optional store (database/schema namespace) the collections live in.
    pub store: Option<String>,
    /// Collections by name.
    pub collections: BTreeMap<String, CollectionDef>,
    /// Declared relations.
    pub relations: Vec<RelationDef>,
}

impl SchemaOverview {
    /// Create an empty overview.
    pub fn new() -> Self {
        Self::default()
    }

    /// Qualify the overview with a store namespace.
    pub fn in_store(mut self, store: impl Into<String>) -> Self {
        self.store = Some(store.into());
        self
    }

    /// Add a collection.
    pub fn with_collection(mut self, collection: CollectionDef) -> Self {
        self.collections.insert(collection.name.clone(), collection);
        self
    }

    /// Add a relation.
    pub fn with_relation(mut self, relation: RelationDef) -> Self {
        self.relations.push(relation);
        self
    }

    /// Look up a collection by name.
    pub fn collection(&self, name: &str) -> Option<&CollectionDef> {
        self.collections.get(name)
    }

    /// Look up a field on a collection.
    pub fn field(&self, collection: &str, field: &str) -> Option<&FieldDef> {
        self.collection(collection).and_then(|c| c.field(field))
    }

    /// Look up the relation reached through `field` on `collection`.
    pub fn relation(&self, collection: &str, field: &str) -> Option<&RelationDef> {
        self.relations
            .iter()
            .find(|r| r.collection == collection && r.name == field)
    }
}
