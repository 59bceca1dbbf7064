//! The dialect statement builder.

use sievedb_ir::{AbstractQuery, ConditionTarget, FieldNode, Modifiers, SortDirection, Value};

use super::conditions::{lower_tree, ConditionScope};
use super::dialect::Dialect;
use super::joins::{build_join, table_ref};
use super::param::ParamIndexer;
use super::select::{column_expr, function_expr, selectable_field, SelectList};
use super::statement::{CompiledQuery, Statement};
use crate::error::Error;
use crate::schema::{CollectionDef, RelationDef, SchemaOverview};

/// Compiles a (permission-rewritten) abstract query into a statement.
///
/// The builder expects its input to have passed the permission rewriter;
/// it still re-checks schema-level invariants (unknown fields, alias-typed
/// fields, numeric bounds) as defense in depth. One compile call allocates
/// one parameter sequence, and values are bound in clause order (select,
/// joins, where, pagination) so positional-placeholder dialects line up
/// without renumbering.
pub struct StatementBuilder<'a> {
    schema: &'a SchemaOverview,
    dialect: &'a dyn Dialect,
}

/// One collection level of the query tree, flattened in traversal order.
struct Level<'a, 'q> {
    collection: &'a CollectionDef,
    alias: String,
    path: Vec<String>,
    nodes: &'q [FieldNode],
    modifiers: &'q Modifiers,
    join: Option<JoinSite<'a, 'q>>,
}

/// How a non-root level is reached from its parent.
struct JoinSite<'a, 'q> {
    relation: &'a RelationDef,
    branch: Option<&'q str>,
    parent_alias: String,
}

impl<'a> StatementBuilder<'a> {
    /// Create a builder over a schema and dialect.
    pub fn new(schema: &'a SchemaOverview, dialect: &'a dyn Dialect) -> Self {
        Self { schema, dialect }
    }

    /// Compile a query into a statement and its alias map.
    pub fn compile(&self, query: &AbstractQuery) -> Result<CompiledQuery, Error> {
        let collection = self.schema.collection(&query.collection).ok_or_else(|| {
            Error::InvalidQuery(format!("unknown collection '{}'", query.collection))
        })?;
        let aggregating =
            !query.modifiers.aggregate.is_empty() || !query.modifiers.group.is_empty();
        if query.nodes.is_empty() && !aggregating {
            return Err(Error::InvalidQuery(format!(
                "query on '{}' requests no output",
                query.collection
            )));
        }
        if aggregating && !query.nodes.is_empty() {
            return Err(Error::InvalidQuery(
                "an aggregate replaces the select list; fields cannot also be requested".into(),
            ));
        }

        let store = query.store.as_deref().or(self.schema.store.as_deref());
        let mut levels: Vec<Level<'a, '_>> = Vec::new();
        self.collect_levels(
            &mut levels,
            collection,
            query.collection.clone(),
            vec![],
            &query.nodes,
            &query.modifiers,
            None,
        )?;
        let has_joins = levels.len() > 1;
        let mut params = ParamIndexer::new();

        // Select list first; its bound values (JSON paths) come first.
        let mut select = SelectList::default();
        for level in &levels {
            if level.join.is_none() && aggregating {
                select.add_aggregates(
                    self.dialect,
                    level.collection,
                    &level.alias,
                    &query.modifiers.aggregate,
                    &query.modifiers.group,
                    has_joins,
                )?;
                continue;
            }
            for node in level.nodes {
                match node {
                    FieldNode::Primitive { field, .. } => {
                        select.add_primitive(
                            self.dialect,
                            level.collection,
                            &level.alias,
                            &level.path,
                            field,
                            &node.output_name(),
                        )?;
                    }
                    FieldNode::Function {
                        function,
                        field,
                        args,
                        ..
                    } => {
                        select.add_function(
                            self.dialect,
                            level.collection,
                            &level.alias,
                            &level.path,
                            *function,
                            field,
                            args,
                            &node.output_name(),
                            &mut params,
                        )?;
                    }
                    // Related nodes were flattened into their own level.
                    FieldNode::Related { .. } => {}
                }
            }
        }

        // Joins; many-to-any discriminators bind here.
        let mut joins = Vec::new();
        for level in &levels {
            if let Some(site) = &level.join {
                let (fragments, _) = build_join(
                    self.dialect,
                    self.schema,
                    site.relation,
                    site.branch,
                    store,
                    &site.parent_alias,
                    &level.alias,
                    &mut params,
                )?;
                joins.extend(fragments);
            }
        }

        // Where: the root filter first, nested filters in traversal order.
        let mut where_parts = Vec::new();
        for level in &levels {
            if let Some(filter) = &level.modifiers.filter {
                let scope = ConditionScope {
                    dialect: self.dialect,
                    collection: level.collection,
                    table_alias: &level.alias,
                };
                where_parts.push(lower_tree(&scope, filter, &mut params)?);
            }
        }
        let where_clause = match where_parts.len() {
            0 => None,
            1 => where_parts.pop(),
            _ => Some(
                where_parts
                    .iter()
                    .map(|part| format!("({part})"))
                    .collect::<Vec<_>>()
                    .join(" AND "),
            ),
        };

        let mut order_by = Vec::new();
        for level in &levels {
            for sort in &level.modifiers.sort {
                let expr = match &sort.target {
                    ConditionTarget::Field(field) => {
                        selectable_field(level.collection, field)?;
                        column_expr(self.dialect, &level.alias, field)
                    }
                    ConditionTarget::Function { function, field } => {
                        let def = selectable_field(level.collection, field)?;
                        let column = column_expr(self.dialect, &level.alias, field);
                        function_expr(self.dialect, *function, def, &column, &[], &mut params)?
                    }
                };
                let direction = match sort.direction {
                    SortDirection::Asc => "ASC",
                    SortDirection::Desc => "DESC",
                };
                order_by.push(format!("{expr} {direction}"));
            }
        }

        let group_by = query
            .modifiers
            .group
            .iter()
            .map(|field| column_expr(self.dialect, &query.collection, field))
            .collect();

        let limit = query.modifiers.limit.map(|limit| {
            let index = params.bind(Value::Int(i64::from(limit)));
            self.dialect.placeholder(index)
        });
        let offset = query.modifiers.offset.map(|offset| {
            let index = params.bind(Value::Int(i64::from(offset)));
            self.dialect.placeholder(index)
        });

        let statement = Statement {
            select: select.fragments,
            from: table_ref(self.dialect, store, &query.collection),
            joins,
            where_clause,
            group_by,
            order_by,
            limit,
            offset,
            params: params.into_values(),
        };
        Ok(CompiledQuery {
            statement,
            alias_map: select.alias_map,
        })
    }

    /// Flatten the query tree into levels, depth-first, validating relation
    /// hops and nested-modifier constraints along the way.
    #[allow(clippy::too_many_arguments)]
    fn collect_levels<'q>(
        &self,
        levels: &mut Vec<Level<'a, 'q>>,
        collection: &'a CollectionDef,
        alias: String,
        path: Vec<String>,
        nodes: &'q [FieldNode],
        modifiers: &'q Modifiers,
        join: Option<JoinSite<'a, 'q>>,
    ) -> Result<(), Error> {
        if join.is_some() {
            if modifiers.limit.is_some() || modifiers.offset.is_some() {
                return Err(Error::InvalidQuery(
                    "pagination on a nested relation cannot be expressed in one statement".into(),
                ));
            }
            if !modifiers.aggregate.is_empty() || !modifiers.group.is_empty() {
                return Err(Error::InvalidQuery(
                    "aggregation on a nested relation cannot be expressed in one statement".into(),
                ));
            }
        }
        if levels.iter().any(|level| level.alias == alias) {
            return Err(Error::InvalidQuery(format!(
                "duplicate relation output name '{alias}'"
            )));
        }
        levels.push(Level {
            collection,
            alias: alias.clone(),
            path: path.clone(),
            nodes,
            modifiers,
            join,
        });

        for node in nodes {
            let FieldNode::Related {
                field,
                collection: branch,
                nodes: nested_nodes,
                modifiers: nested_modifiers,
                ..
            } = node
            else {
                continue;
            };
            let relation = self.schema.relation(&collection.name, field).ok_or_else(|| {
                Error::InvalidQuery(format!(
                    "unknown relation '{field}' on collection '{}'",
                    collection.name
                ))
            })?;
            let target = match (&relation.related_collection, branch.as_deref()) {
                (Some(target), _) => target.as_str(),
                (None, Some(branch)) => branch,
                (None, None) => {
                    return Err(Error::InvalidQuery(format!(
                        "relation '{field}' is many-to-any; the query must name a target collection"
                    )))
                }
            };
            let target_def = self.schema.collection(target).ok_or_else(|| {
                Error::InvalidQuery(format!("unknown collection '{target}'"))
            })?;
            let mut nested_path = path.clone();
            nested_path.push(node.output_name());
            let nested_alias = nested_path.join("__");
            self.collect_levels(
                levels,
                target_def,
                nested_alias,
                nested_path,
                nested_nodes,
                nested_modifiers,
                Some(JoinSite {
                    relation,
                    branch: branch.as_deref(),
                    parent_alias: alias.clone(),
                }),
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldDef, FieldType, RelationDef};
    use crate::sql::dialect::{Postgres, Sqlite};
    use sievedb_ir::{
        AggregateOp, AggregateSpec, Condition, FieldFunction, SortSpec,
    };

    fn schema() -> SchemaOverview {
        SchemaOverview::new()
            .with_collection(
                CollectionDef::new("articles")
                    .with_field(FieldDef::new("id", FieldType::Integer).primary())
                    .with_field(FieldDef::new("title", FieldType::String))
                    .with_field(FieldDef::new("status", FieldType::String))
                    .with_field(FieldDef::new(
                        "price",
                        FieldType::Decimal {
                            precision: 10,
                            scale: 2,
                        },
                    ))
                    .with_field(FieldDef::new("published_on", FieldType::DateTime))
                    .with_field(FieldDef::new("meta", FieldType::Json))
                    .with_field(FieldDef::new("author", FieldType::Uuid))
                    .with_field(FieldDef::new("editor", FieldType::Uuid)),
            )
            .with_collection(
                CollectionDef::new("users")
                    .with_field(FieldDef::new("id", FieldType::Uuid).primary())
                    .with_field(FieldDef::new("name", FieldType::String))
                    .with_field(FieldDef::new("organization", FieldType::Uuid)),
            )
            .with_collection(
                CollectionDef::new("organizations")
                    .with_field(FieldDef::new("id", FieldType::Uuid).primary())
                    .with_field(FieldDef::new("name", FieldType::String)),
            )
            .with_relation(RelationDef::many_to_one(
                "author", "articles", "author", "users", "id",
            ))
            .with_relation(RelationDef::many_to_one(
                "editor", "articles", "editor", "users", "id",
            ))
            .with_relation(RelationDef::many_to_one(
                "organization",
                "users",
                "organization",
                "organizations",
                "id",
            ))
    }

    #[test]
    fn test_simple_statement() {
        let schema = schema();
        let builder = StatementBuilder::new(&schema, &Postgres);
        let query = AbstractQuery::new("articles")
            .select(FieldNode::primitive("id"))
            .select(FieldNode::primitive("title"))
            .with_filter(Condition::eq("status", "published").into())
            .with_sort(SortSpec::desc("published_on"))
            .with_limit(25)
            .with_offset(50);

        let compiled = builder.compile(&query).unwrap();
        assert_eq!(
            compiled.statement.sql(),
            "SELECT \"articles\".\"id\" AS \"id\", \"articles\".\"title\" AS \"title\" \
             FROM \"articles\" WHERE \"articles\".\"status\" = $1 \
             ORDER BY \"articles\".\"published_on\" DESC LIMIT $2 OFFSET $3"
        );
        assert_eq!(
            compiled.statement.params,
            vec![
                Value::String("published".into()),
                Value::Int(25),
                Value::Int(50)
            ]
        );
        assert_eq!(compiled.alias_map.path("id").unwrap(), ["id".to_string()]);
    }

    #[test]
    fn test_store_qualified_from() {
        let schema = schema();
        let builder = StatementBuilder::new(&schema, &Postgres);
        let query = AbstractQuery::new("articles")
            .in_store("main")
            .select(FieldNode::primitive("id"));
        let compiled = builder.compile(&query).unwrap();
        assert!(compiled
            .statement
            .sql()
            .contains("FROM \"main\".\"articles\""));
    }

    #[test]
    fn test_nested_join_and_alias_paths() {
        let schema = schema();
        let builder = StatementBuilder::new(&schema, &Postgres);
        let query = AbstractQuery::new("articles")
            .select(FieldNode::primitive("title"))
            .select(FieldNode::related(
                "author",
                vec![
                    FieldNode::primitive("name"),
                    FieldNode::related("organization", vec![FieldNode::primitive("name")]),
                ],
            ));

        let compiled = builder.compile(&query).unwrap();
        let sql = compiled.statement.sql();
        assert!(sql.contains(
            "LEFT JOIN \"users\" AS \"author\" ON \"articles\".\"author\" = \"author\".\"id\""
        ));
        assert!(sql.contains(
            "LEFT JOIN \"organizations\" AS \"author__organization\" \
             ON \"author\".\"organization\" = \"author__organization\".\"id\""
        ));
        assert_eq!(
            compiled.alias_map.path("author__name").unwrap(),
            ["author".to_string(), "name".to_string()]
        );
        assert_eq!(
            compiled
                .alias_map
                .path("author__organization__name")
                .unwrap(),
            [
                "author".to_string(),
                "organization".to_string(),
                "name".to_string()
            ]
        );
    }

    #[test]
    fn test_repeated_relation_at_different_paths_gets_distinct_aliases() {
        let schema = schema();
        let builder = StatementBuilder::new(&schema, &Postgres);
        let query = AbstractQuery::new("articles")
            .select(FieldNode::related("author", vec![FieldNode::primitive("name")]))
            .select(FieldNode::related("editor", vec![FieldNode::primitive("name")]));

        let compiled = builder.compile(&query).unwrap();
        let sql = compiled.statement.sql();
        assert!(sql.contains("AS \"author\""));
        assert!(sql.contains("AS \"editor\""));
        assert!(compiled.alias_map.path("author__name").is_some());
        assert!(compiled.alias_map.path("editor__name").is_some());
    }

    #[test]
    fn test_nested_filter_lands_in_the_where_clause() {
        let schema = schema();
        let builder = StatementBuilder::new(&schema, &Postgres);
        let query = AbstractQuery::new("articles")
            .select(FieldNode::primitive("title"))
            .select(
                FieldNode::related("author", vec![FieldNode::primitive("name")]).with_modifiers(
                    Modifiers {
                        filter: Some(Condition::eq("name", "alice").into()),
                        ..Modifiers::default()
                    },
                ),
            )
            .with_filter(Condition::eq("status", "published").into());

        let compiled = builder.compile(&query).unwrap();
        assert_eq!(
            compiled.statement.where_clause.as_deref(),
            Some("(\"articles\".\"status\" = $1) AND (\"author\".\"name\" = $2)")
        );
    }

    #[test]
    fn test_binding_order_follows_clause_order() {
        // Positional dialects need select-list values bound before filter
        // values; the json path lands in the select, the status in the
        // where clause.
        let schema = schema();
        let builder = StatementBuilder::new(&schema, &Sqlite);
        let query = AbstractQuery::new("articles")
            .select(FieldNode::function_with_args(
                FieldFunction::JsonPath,
                "meta",
                vec![Value::String("$.tags[0]".into())],
            ))
            .with_filter(Condition::eq("status", "published").into());

        let compiled = builder.compile(&query).unwrap();
        assert_eq!(
            compiled.statement.params,
            vec![
                Value::String("$.tags[0]".into()),
                Value::String("published".into())
            ]
        );
        assert!(compiled.statement.sql().starts_with(
            "SELECT json_extract(\"articles\".\"meta\", ?) AS \"json(meta)\""
        ));
    }

    #[test]
    fn test_aggregate_statement() {
        let schema = schema();
        let builder = StatementBuilder::new(&schema, &Postgres);
        let query = AbstractQuery::new("articles")
            .with_aggregate(AggregateSpec::new(AggregateOp::Sum, vec!["price".into()]))
            .with_aggregate(AggregateSpec::count_all())
            .group_by("status");

        let compiled = builder.compile(&query).unwrap();
        assert_eq!(
            compiled.statement.sql(),
            "SELECT \"articles\".\"status\" AS \"status\", \
             SUM(\"articles\".\"price\") AS \"sum->price\", COUNT(*) AS \"countAll\" \
             FROM \"articles\" GROUP BY \"articles\".\"status\""
        );
    }

    #[test]
    fn test_aggregate_with_fields_is_rejected() {
        let schema = schema();
        let builder = StatementBuilder::new(&schema, &Postgres);
        let query = AbstractQuery::new("articles")
            .select(FieldNode::primitive("title"))
            .with_aggregate(AggregateSpec::count_all());
        assert!(matches!(
            builder.compile(&query).unwrap_err(),
            Error::InvalidQuery(_)
        ));
    }

    #[test]
    fn test_function_node_in_select() {
        let schema = schema();
        let builder = StatementBuilder::new(&schema, &Postgres);
        let query = AbstractQuery::new("articles")
            .select(FieldNode::function(FieldFunction::Year, "published_on"));

        let compiled = builder.compile(&query).unwrap();
        assert_eq!(
            compiled.statement.select,
            vec!["EXTRACT(YEAR FROM \"articles\".\"published_on\") AS \"year(published_on)\""]
        );
    }

    #[test]
    fn test_sort_by_function() {
        let schema = schema();
        let builder = StatementBuilder::new(&schema, &Sqlite);
        let query = AbstractQuery::new("articles")
            .select(FieldNode::primitive("id"))
            .with_sort(SortSpec {
                target: ConditionTarget::Function {
                    function: FieldFunction::Month,
                    field: "published_on".into(),
                },
                direction: SortDirection::Asc,
            });

        let compiled = builder.compile(&query).unwrap();
        assert_eq!(
            compiled.statement.order_by,
            vec!["CAST(strftime('%m', \"articles\".\"published_on\") AS INTEGER) ASC"]
        );
    }

    #[test]
    fn test_unknown_collection_and_field() {
        let schema = schema();
        let builder = StatementBuilder::new(&schema, &Postgres);

        let query = AbstractQuery::new("missing").select(FieldNode::primitive("id"));
        assert!(builder.compile(&query).is_err());

        let query = AbstractQuery::new("articles").select(FieldNode::primitive("missing"));
        assert!(builder.compile(&query).is_err());
    }

    #[test]
    fn test_empty_query_is_rejected() {
        let schema = schema();
        let builder = StatementBuilder::new(&schema, &Postgres);
        let query = AbstractQuery::new("articles");
        assert!(matches!(
            builder.compile(&query).unwrap_err(),
            Error::InvalidQuery(_)
        ));
    }

    #[test]
    fn test_nested_pagination_is_rejected() {
        let schema = schema();
        let builder = StatementBuilder::new(&schema, &Postgres);
        let query = AbstractQuery::new("articles").select(
            FieldNode::related("author", vec![FieldNode::primitive("name")]).with_modifiers(
                Modifiers {
                    limit: Some(5),
                    ..Modifiers::default()
                },
            ),
        );
        assert!(matches!(
            builder.compile(&query).unwrap_err(),
            Error::InvalidQuery(_)
        ));
    }

    #[test]
    fn test_sqlite_placeholders_stay_positional() {
        let schema = schema();
        let builder = StatementBuilder::new(&schema, &Sqlite);
        let query = AbstractQuery::new("articles")
            .select(FieldNode::primitive("id"))
            .with_filter(Condition::eq("status", "published").into())
            .with_limit(10);

        let compiled = builder.compile(&query).unwrap();
        assert_eq!(
            compiled.statement.sql(),
            "SELECT \"articles\".\"id\" AS \"id\" FROM \"articles\" \
             WHERE \"articles\".\"status\" = ? LIMIT ?"
        );
        assert_eq!(
            compiled.statement.params,
            vec![Value::String("published".into()), Value::Int(10)]
        );
    }
}
