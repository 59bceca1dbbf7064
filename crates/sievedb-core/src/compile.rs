//! The top-level compile pipeline: resolve, enforce, build.

use tracing::debug;

use sievedb_ir::AbstractQuery;

use crate::error::Error;
use crate::permissions::{AccessContext, Action, PermissionRewriter, RuleResolver, RuleStore};
use crate::schema::SchemaOverview;
use crate::sql::{CompiledQuery, Dialect, StatementBuilder};

/// Compile an abstract query into a permission-enforced statement.
///
/// One call is one request: a fresh resolver memoizes the rule set for the
/// duration of the rewrite so nested levels never observe half-updated
/// rules, and a fresh parameter sequence backs the statement. Everything is
/// synchronous and allocation-only; any error aborts the whole compile.
pub fn compile(
    schema: &SchemaOverview,
    store: &dyn RuleStore,
    dialect: &dyn Dialect,
    context: &AccessContext,
    action: Action,
    query: &AbstractQuery,
) -> Result<CompiledQuery, Error> {
    let resolver = RuleResolver::new(store, context);
    let rewriter = PermissionRewriter::new(schema, &resolver, context);
    let rewritten = rewriter.enforce(query, action)?;
    debug!(
        collection = %query.collection,
        action = action.name(),
        "permissions enforced"
    );

    let compiled = StatementBuilder::new(schema, dialect).compile(&rewritten)?;
    debug!(
        collection = %query.collection,
        dialect = dialect.name(),
        params = compiled.statement.params.len(),
        "statement built"
    );
    Ok(compiled)
}
