//! Join construction for relational hops.

use sievedb_ir::Value;

use super::dialect::Dialect;
use super::param::ParamIndexer;
use super::select::column_expr;
use crate::error::Error;
use crate::schema::{RelationDef, RelationKind, SchemaOverview};

/// Quote a table reference, optionally qualified by a store namespace.
pub(crate) fn table_ref(dialect: &dyn Dialect, store: Option<&str>, collection: &str) -> String {
    match store {
        Some(store) => format!(
            "{}.{}",
            dialect.quote_ident(store),
            dialect.quote_ident(collection)
        ),
        None => dialect.quote_ident(collection),
    }
}

/// Emit the LEFT JOIN fragment(s) for one relational hop.
///
/// The join alias is the traversal path with segments joined by `__`, so
/// repeated relations at different paths never collide; junction tables get
/// a `__junction` suffix on the same alias. Many-to-any hops additionally
/// pin the junction's discriminator column to the selected branch through a
/// bound parameter. Returns the fragments and the target collection name.
#[allow(clippy::too_many_arguments)]
pub(crate) fn build_join(
    dialect: &dyn Dialect,
    schema: &SchemaOverview,
    relation: &RelationDef,
    branch: Option<&str>,
    store: Option<&str>,
    parent_alias: &str,
    nested_alias: &str,
    params: &mut ParamIndexer,
) -> Result<(Vec<String>, String), Error> {
    match relation.kind {
        RelationKind::ManyToOne | RelationKind::OneToMany => {
            let target = relation.related_collection.clone().ok_or_else(|| {
                Error::InvalidQuery(format!(
                    "relation '{}' has no target collection",
                    relation.name
                ))
            })?;
            let join = format!(
                "LEFT JOIN {} AS {} ON {} = {}",
                table_ref(dialect, store, &target),
                dialect.quote_ident(nested_alias),
                column_expr(dialect, parent_alias, &relation.field),
                column_expr(dialect, nested_alias, &relation.related_field),
            );
            Ok((vec![join], target))
        }
        RelationKind::ManyToMany => {
            let junction = relation.junction.as_ref().ok_or_else(|| {
                Error::InvalidQuery(format!(
                    "many-to-many relation '{}' has no junction",
                    relation.name
                ))
            })?;
            let target = relation.related_collection.clone().ok_or_else(|| {
                Error::InvalidQuery(format!(
                    "relation '{}' has no target collection",
                    relation.name
                ))
            })?;
            let junction_alias = format!("{nested_alias}__junction");
            let junction_join = format!(
                "LEFT JOIN {} AS {} ON {} = {}",
                table_ref(dialect, store, &junction.collection),
                dialect.quote_ident(&junction_alias),
                column_expr(dialect, parent_alias, &relation.field),
                column_expr(dialect, &junction_alias, &junction.field),
            );
            let target_join = format!(
                "LEFT JOIN {} AS {} ON {} = {}",
                table_ref(dialect, store, &target),
                dialect.quote_ident(nested_alias),
                column_expr(dialect, &junction_alias, &junction.related_field),
                column_expr(dialect, nested_alias, &relation.related_field),
            );
            Ok((vec![junction_join, target_join], target))
        }
        RelationKind::ManyToAny => {
            let junction = relation.junction.as_ref().ok_or_else(|| {
                Error::InvalidQuery(format!(
                    "many-to-any relation '{}' has no junction",
                    relation.name
                ))
            })?;
            let discriminator = junction.collection_field.as_deref().ok_or_else(|| {
                Error::InvalidQuery(format!(
                    "many-to-any relation '{}' has no discriminator column",
                    relation.name
                ))
            })?;
            let branch = branch.ok_or_else(|| {
                Error::InvalidQuery(format!(
                    "relation '{}' is many-to-any; the query must name a target collection",
                    relation.name
                ))
            })?;
            let target_def = schema.collection(branch).ok_or_else(|| {
                Error::InvalidQuery(format!("unknown collection '{branch}'"))
            })?;

            let junction_alias = format!("{nested_alias}__junction");
            let index = params.bind(Value::String(branch.to_string()));
            let junction_join = format!(
                "LEFT JOIN {} AS {} ON {} = {} AND {} = {}",
                table_ref(dialect, store, &junction.collection),
                dialect.quote_ident(&junction_alias),
                column_expr(dialect, parent_alias, &relation.field),
                column_expr(dialect, &junction_alias, &junction.field),
                column_expr(dialect, &junction_alias, discriminator),
                dialect.placeholder(index),
            );
            let target_join = format!(
                "LEFT JOIN {} AS {} ON {} = {}",
                table_ref(dialect, store, branch),
                dialect.quote_ident(nested_alias),
                column_expr(dialect, &junction_alias, &junction.related_field),
                column_expr(dialect, nested_alias, &target_def.primary_key),
            );
            Ok((vec![junction_join, target_join], branch.to_string()))
        }
    }
}
