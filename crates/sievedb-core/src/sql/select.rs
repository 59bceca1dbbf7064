//! Select-list building and function translation.

use sievedb_ir::{AggregateOp, AggregateSpec, FieldFunction, Value};

use super::dialect::Dialect;
use super::param::ParamIndexer;
use super::statement::AliasPathMap;
use crate::error::Error;
use crate::schema::{CollectionDef, FieldDef, FieldType};

/// Quote a `table.column` reference.
pub(crate) fn column_expr(dialect: &dyn Dialect, table_alias: &str, column: &str) -> String {
    format!(
        "{}.{}",
        dialect.quote_ident(table_alias),
        dialect.quote_ident(column)
    )
}

/// Look up a field on a collection, rejecting unknown and alias-typed ones.
///
/// Alias fields are virtual; this check also runs here as defense in depth
/// even though the permission rewriter sits in front of the builder.
pub(crate) fn selectable_field<'a>(
    collection: &'a CollectionDef,
    field: &str,
) -> Result<&'a FieldDef, Error> {
    let def = collection.field(field).ok_or_else(|| {
        Error::InvalidQuery(format!(
            "unknown field '{field}' on collection '{}'",
            collection.name
        ))
    })?;
    if !def.field_type.is_selectable() {
        return Err(Error::InvalidQuery(format!(
            "field '{field}' on collection '{}' is virtual and cannot be selected",
            collection.name
        )));
    }
    Ok(def)
}

/// Translate a field function into the dialect's native expression.
///
/// Fails with [`Error::InvalidQuery`] when the function does not apply to
/// the field's declared type, and with [`Error::Syntax`] when a JSON path
/// argument is missing or malformed. The path is bound as a parameter, never
/// spliced into the text.
pub(crate) fn function_expr(
    dialect: &dyn Dialect,
    function: FieldFunction,
    field: &FieldDef,
    column: &str,
    args: &[Value],
    params: &mut ParamIndexer,
) -> Result<String, Error> {
    match function {
        FieldFunction::Count => {
            if field.field_type != FieldType::Json {
                return Err(Error::InvalidQuery(format!(
                    "function 'count' is not valid for field '{}'",
                    field.name
                )));
            }
            Ok(dialect.json_array_length(column))
        }
        FieldFunction::JsonPath => {
            if field.field_type != FieldType::Json {
                return Err(Error::InvalidQuery(format!(
                    "function 'json' is not valid for field '{}'",
                    field.name
                )));
            }
            let path = match args.first() {
                Some(Value::String(path)) => path,
                _ => {
                    return Err(Error::Syntax(format!(
                        "json path projection on field '{}' requires a path argument",
                        field.name
                    )))
                }
            };
            if !path.starts_with('$') {
                return Err(Error::Syntax(format!(
                    "malformed json path '{path}' on field '{}'",
                    field.name
                )));
            }
            let index = params.bind(Value::String(path.clone()));
            Ok(dialect.json_path(column, &dialect.placeholder(index)))
        }
        date_part => {
            if !field.field_type.is_datetime() {
                return Err(Error::InvalidQuery(format!(
                    "function '{}' is not valid for field '{}'",
                    date_part.name(),
                    field.name
                )));
            }
            dialect.date_part(date_part, column).ok_or_else(|| {
                Error::InvalidQuery(format!(
                    "function '{}' has no date-part translation",
                    date_part.name()
                ))
            })
        }
    }
}

/// Accumulates select fragments and the alias map during one compile.
#[derive(Debug, Default)]
pub(crate) struct SelectList {
    pub fragments: Vec<String>,
    pub alias_map: AliasPathMap,
}

impl SelectList {
    /// Emit a plain column, rendering geometry as text.
    pub fn add_primitive(
        &mut self,
        dialect: &dyn Dialect,
        collection: &CollectionDef,
        table_alias: &str,
        path: &[String],
        field: &str,
        output: &str,
    ) -> Result<(), Error> {
        let def = selectable_field(collection, field)?;
        let column = column_expr(dialect, table_alias, field);
        let expr = if def.field_type == FieldType::Geometry {
            dialect.geometry_as_text(&column)
        } else {
            column
        };
        self.push(dialect, path, output, expr)
    }

    /// Emit a function expression over a column.
    #[allow(clippy::too_many_arguments)]
    pub fn add_function(
        &mut self,
        dialect: &dyn Dialect,
        collection: &CollectionDef,
        table_alias: &str,
        path: &[String],
        function: FieldFunction,
        field: &str,
        args: &[Value],
        output: &str,
        params: &mut ParamIndexer,
    ) -> Result<(), Error> {
        let def = selectable_field(collection, field)?;
        let column = column_expr(dialect, table_alias, field);
        let expr = function_expr(dialect, function, def, &column, args, params)?;
        self.push(dialect, path, output, expr)
    }

    /// Emit the aggregate select list: grouping columns plus one fragment
    /// per `operation->field` pair.
    ///
    /// `countDistinct` over the collection's primary key with no joins in
    /// the statement is rewritten to a plain `count`; the key is unique, so
    /// the distinct pass would only cost time.
    pub fn add_aggregates(
        &mut self,
        dialect: &dyn Dialect,
        collection: &CollectionDef,
        table_alias: &str,
        aggregates: &[AggregateSpec],
        group: &[String],
        has_joins: bool,
    ) -> Result<(), Error> {
        for field in group {
            selectable_field(collection, field)?;
            let expr = column_expr(dialect, table_alias, field);
            self.push(dialect, &[], field, expr)?;
        }

        for spec in aggregates {
            if spec.operation == AggregateOp::CountAll {
                self.push(dialect, &[], "countAll", "COUNT(*)".to_string())?;
                continue;
            }
            for field in &spec.fields {
                let def = selectable_field(collection, field)?;
                let column = column_expr(dialect, table_alias, field);
                let expr = match spec.operation {
                    AggregateOp::Count => format!("COUNT({column})"),
                    AggregateOp::CountDistinct => {
                        if field == &collection.primary_key && !has_joins {
                            format!("COUNT({column})")
                        } else {
                            format!("COUNT(DISTINCT {column})")
                        }
                    }
                    AggregateOp::Sum | AggregateOp::Avg => {
                        if !def.field_type.is_numeric() {
                            return Err(Error::InvalidQuery(format!(
                                "aggregate '{}' is not valid for field '{field}'",
                                spec.operation.name()
                            )));
                        }
                        format!("{}({column})", spec.operation.name().to_uppercase())
                    }
                    AggregateOp::Min => format!("MIN({column})"),
                    AggregateOp::Max => format!("MAX({column})"),
                    AggregateOp::CountAll => unreachable!("handled above"),
                };
                let alias = format!("{}->{field}", spec.operation.name());
                self.push_aggregate(dialect, spec.operation, field, &alias, expr)?;
            }
        }
        Ok(())
    }

    fn push(
        &mut self,
        dialect: &dyn Dialect,
        path: &[String],
        output: &str,
        expr: String,
    ) -> Result<(), Error> {
        let mut full_path: Vec<String> = path.to_vec();
        full_path.push(output.to_string());
        let alias = full_path.join("__");
        if !self.alias_map.insert(alias.clone(), full_path) {
            return Err(Error::InvalidQuery(format!(
                "duplicate output name '{alias}'"
            )));
        }
        self.fragments
            .push(format!("{expr} AS {}", dialect.quote_ident(&alias)));
        Ok(())
    }

    fn push_aggregate(
        &mut self,
        dialect: &dyn Dialect,
        operation: AggregateOp,
        field: &str,
        alias: &str,
        expr: String,
    ) -> Result<(), Error> {
        let path = vec![operation.name().to_string(), field.to_string()];
        if !self.alias_map.insert(alias, path) {
            return Err(Error::InvalidQuery(format!(
                "duplicate aggregate '{alias}'"
            )));
        }
        self.fragments
            .push(format!("{expr} AS {}", dialect.quote_ident(alias)));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::dialect::Postgres;

    fn articles() -> CollectionDef {
        CollectionDef::new("articles")
            .with_field(FieldDef::new("id", FieldType::Integer).primary())
            .with_field(FieldDef::new("title", FieldType::String))
            .with_field(FieldDef::new(
                "price",
                FieldType::Decimal {
                    precision: 10,
                    scale: 2,
                },
            ))
            .with_field(FieldDef::new("published_on", FieldType::DateTime))
            .with_field(FieldDef::new("meta", FieldType::Json))
            .with_field(FieldDef::new("location", FieldType::Geometry))
            .with_field(FieldDef::new("comments", FieldType::Alias))
    }

    #[test]
    fn test_primitive_selection() {
        let mut list = SelectList::default();
        list.add_primitive(&Postgres, &articles(), "articles", &[], "title", "title")
            .unwrap();
        assert_eq!(
            list.fragments,
            vec!["\"articles\".\"title\" AS \"title\""]
        );
        assert_eq!(list.alias_map.path("title").unwrap(), ["title".to_string()]);
    }

    #[test]
    fn test_geometry_renders_as_text() {
        let mut list = SelectList::default();
        list.add_primitive(&Postgres, &articles(), "articles", &[], "location", "location")
            .unwrap();
        assert_eq!(
            list.fragments,
            vec!["ST_AsText(\"articles\".\"location\") AS \"location\""]
        );
    }

    #[test]
    fn test_alias_field_is_rejected() {
        let mut list = SelectList::default();
        let err = list
            .add_primitive(&Postgres, &articles(), "articles", &[], "comments", "comments")
            .unwrap_err();
        assert!(matches!(err, Error::InvalidQuery(_)));
    }

    #[test]
    fn test_nested_path_builds_double_underscore_alias() {
        let mut list = SelectList::default();
        list.add_primitive(
            &Postgres,
            &articles(),
            "author",
            &["author".to_string()],
            "title",
            "title",
        )
        .unwrap();
        assert_eq!(
            list.alias_map.path("author__title").unwrap(),
            ["author".to_string(), "title".to_string()]
        );
    }

    #[test]
    fn test_date_part_requires_datetime_field() {
        let mut params = ParamIndexer::new();
        let collection = articles();
        let title = collection.field("title").unwrap();
        let err = function_expr(
            &Postgres,
            FieldFunction::Year,
            title,
            "\"articles\".\"title\"",
            &[],
            &mut params,
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidQuery(_)));
    }

    #[test]
    fn test_json_path_binds_the_path() {
        let mut params = ParamIndexer::new();
        let collection = articles();
        let meta = collection.field("meta").unwrap();
        let expr = function_expr(
            &Postgres,
            FieldFunction::JsonPath,
            meta,
            "\"articles\".\"meta\"",
            &[Value::String("$.tags[0]".into())],
            &mut params,
        )
        .unwrap();
        assert_eq!(
            expr,
            "jsonb_path_query_first(\"articles\".\"meta\"::jsonb, $1::jsonpath)"
        );
        assert_eq!(params.into_values(), vec![Value::String("$.tags[0]".into())]);
    }

    #[test]
    fn test_malformed_json_path_is_a_syntax_error() {
        let mut params = ParamIndexer::new();
        let collection = articles();
        let meta = collection.field("meta").unwrap();
        let err = function_expr(
            &Postgres,
            FieldFunction::JsonPath,
            meta,
            "m",
            &[Value::String("tags[0]".into())],
            &mut params,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Syntax(_)));

        let err =
            function_expr(&Postgres, FieldFunction::JsonPath, meta, "m", &[], &mut params)
                .unwrap_err();
        assert!(matches!(err, Error::Syntax(_)));
    }

    #[test]
    fn test_count_distinct_primary_key_rewrite() {
        let mut list = SelectList::default();
        list.add_aggregates(
            &Postgres,
            &articles(),
            "articles",
            &[AggregateSpec::new(
                AggregateOp::CountDistinct,
                vec!["id".into()],
            )],
            &[],
            false,
        )
        .unwrap();
        assert_eq!(
            list.fragments,
            vec!["COUNT(\"articles\".\"id\") AS \"countDistinct->id\""]
        );

        // With joins present the distinct pass stays.
        let mut list = SelectList::default();
        list.add_aggregates(
            &Postgres,
            &articles(),
            "articles",
            &[AggregateSpec::new(
                AggregateOp::CountDistinct,
                vec!["id".into()],
            )],
            &[],
            true,
        )
        .unwrap();
        assert_eq!(
            list.fragments,
            vec!["COUNT(DISTINCT \"articles\".\"id\") AS \"countDistinct->id\""]
        );
    }

    #[test]
    fn test_aggregate_aliases_and_grouping() {
        let mut list = SelectList::default();
        list.add_aggregates(
            &Postgres,
            &articles(),
            "articles",
            &[
                AggregateSpec::new(AggregateOp::Sum, vec!["price".into()]),
                AggregateSpec::count_all(),
            ],
            &["title".to_string()],
            false,
        )
        .unwrap();
        assert_eq!(
            list.fragments,
            vec![
                "\"articles\".\"title\" AS \"title\"",
                "SUM(\"articles\".\"price\") AS \"sum->price\"",
                "COUNT(*) AS \"countAll\"",
            ]
        );
        assert_eq!(
            list.alias_map.path("sum->price").unwrap(),
            ["sum".to_string(), "price".to_string()]
        );
        assert_eq!(
            list.alias_map.path("countAll").unwrap(),
            ["countAll".to_string()]
        );
    }

    #[test]
    fn test_sum_on_string_field_is_rejected() {
        let mut list = SelectList::default();
        let err = list
            .add_aggregates(
                &Postgres,
                &articles(),
                "articles",
                &[AggregateSpec::new(AggregateOp::Sum, vec!["title".into()])],
                &[],
                false,
            )
            .unwrap_err();
        assert!(matches!(err, Error::InvalidQuery(_)));
    }
}
