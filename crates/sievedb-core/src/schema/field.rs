//! Field definitions for collections.

use serde::{Deserialize, Serialize};

use super::types::FieldType;

/// A field definition within a collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    /// Field name.
    pub name: String,
    /// Declared data type.
    pub field_type: FieldType,
    /// Whether the column accepts NULL.
    pub nullable: bool,
    /// Whether this field is the collection's primary key.
    pub primary_key: bool,
}

impl FieldDef {
    /// Create a non-nullable field.
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            nullable: false,
            primary_key: false,
        }
    }

    /// Create a nullable field.
    pub fn nullable(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            nullable: true,
            primary_key: false,
        }
    }

    /// Mark as the primary key.
    pub fn primary(mut self) -> Self {
        self.primary_key = true;
        self
    }
}
