//! Dialect statement building.
//!
//! Converts a permission-rewritten abstract query into an ordered list of
//! SQL clause fragments plus a positional parameter array. Identifiers go
//! through quoting, values through parameters; nothing is ever interpolated
//! into the statement text.

mod bindings;
mod builder;
mod conditions;
mod dialect;
mod joins;
mod numeric;
mod param;
mod select;
mod statement;

pub use bindings::preprocess_bindings;
pub use builder::StatementBuilder;
pub use dialect::{Dialect, Postgres, Sqlite};
pub use numeric::validate_numeric_bounds;
pub use param::ParamIndexer;
pub use statement::{AliasPathMap, CompiledQuery, Statement};
