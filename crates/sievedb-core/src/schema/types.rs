//! Field type definitions for the schema overview.

use serde::{Deserialize, Serialize};

/// Declared type of a collection field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldType {
    /// Short UTF-8 string.
    String,
    /// Long UTF-8 text.
    Text,
    /// 32-bit signed integer.
    Integer,
    /// 64-bit signed integer.
    BigInt,
    /// Floating point.
    Float,
    /// Fixed-precision decimal.
    Decimal {
        /// Total number of digits.
        precision: u8,
        /// Number of digits after the decimal point.
        scale: u8,
    },
    /// Boolean value.
    Boolean,
    /// Date and time.
    DateTime,
    /// Calendar date.
    Date,
    /// Time of day.
    Time,
    /// UUID.
    Uuid,
    /// JSON document.
    Json,
    /// Geometry column.
    Geometry,
    /// Virtual field (e.g. a reverse relation); never selectable.
    Alias,
}

impl FieldType {
    /// Check if this type is numeric.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            FieldType::Integer | FieldType::BigInt | FieldType::Float | FieldType::Decimal { .. }
        )
    }

    /// Check if this type carries a date or time component.
    pub fn is_datetime(&self) -> bool {
        matches!(self, FieldType::DateTime | FieldType::Date | FieldType::Time)
    }

    /// Check if this type is string-like.
    pub fn is_string(&self) -> bool {
        matches!(self, FieldType::String | FieldType::Text)
    }

    /// Check if this field can appear in a generated SELECT list.
    ///
    /// Alias fields are virtual; emitting one would reference a column that
    /// does not exist.
    pub fn is_selectable(&self) -> bool {
        !matches!(self, FieldType::Alias)
    }
}
