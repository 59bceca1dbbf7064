//! Collection definitions.

use serde::{Deserialize, Serialize};

use super::field::FieldDef;

/// A collection (table) described by the schema overview.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionDef {
    /// Collection name.
    pub name: String,
    /// Field definitions.
    pub fields: Vec<FieldDef>,
    /// Primary key field name.
    pub primary_key: String,
}

impl CollectionDef {
    /// Create a collection with an `id` primary key placeholder.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: vec![],
            primary_key: "id".to_string(),
        }
    }

    /// Add a field; the first field marked primary becomes the primary key.
    pub fn with_field(mut self, field: FieldDef) -> Self {
        if field.primary_key {
            self.primary_key = field.name.clone();
        }
        self.fields.push(field);
        self
    }

    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Check if a field exists.
    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }
}
