//! Core error types.

use thiserror::Error;

use crate::permissions::PermissionError;

/// Errors raised during query rewriting and statement building.
///
/// Everything here is raised synchronously and aborts the whole compile;
/// partial enforcement never produces partial results.
#[derive(Debug, Error)]
pub enum Error {
    /// Permission enforcement rejected the query.
    #[error(transparent)]
    Permission(#[from] PermissionError),

    /// The query references something the schema or type system rejects.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// A raw fragment could not be parsed or assembled.
    #[error("syntax error: {0}")]
    Syntax(String),
}

impl Error {
    /// Check if this is a permission failure.
    pub fn is_forbidden(&self) -> bool {
        matches!(self, Error::Permission(_))
    }
}
