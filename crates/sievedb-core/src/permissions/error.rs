//! Permission-specific error types.

use thiserror::Error;

/// Access denial raised by the permission rewriter.
///
/// The message never explains why a rule did not match; callers only learn
/// what they were denied, and where in the query tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PermissionError {
    /// No rule at all grants access to the collection.
    #[error("no access to collection '{collection}' at '{path}'")]
    CollectionForbidden {
        /// The collection the caller tried to read.
        collection: String,
        /// Dotted path to the violating level; empty at the root.
        path: String,
    },

    /// Some rules exist, but the requested fields are not covered by any.
    #[error("no access to field(s) {} of collection '{collection}' at '{path}'", .fields.join(", "))]
    FieldsForbidden {
        /// The collection the fields belong to.
        collection: String,
        /// Dotted path to the violating level; empty at the root.
        path: String,
        /// The offending field names, sorted.
        fields: Vec<String>,
    },
}

impl PermissionError {
    /// The collection the denial applies to.
    pub fn collection(&self) -> &str {
        match self {
            PermissionError::CollectionForbidden { collection, .. }
            | PermissionError::FieldsForbidden { collection, .. } => collection,
        }
    }

    /// The query-tree path the denial applies to (empty at the root).
    pub fn path(&self) -> &str {
        match self {
            PermissionError::CollectionForbidden { path, .. }
            | PermissionError::FieldsForbidden { path, .. } => path,
        }
    }
}
