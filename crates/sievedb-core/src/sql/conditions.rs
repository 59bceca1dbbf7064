//! Lowering condition trees into parameterized SQL.

use sievedb_ir::{
    CompareOp, Condition, ConditionTarget, ConditionTree, GeoPredicate, LogicalOp,
    NumberPredicate, Predicate, SetPredicate, StringPredicate, Value,
};

use super::dialect::Dialect;
use super::numeric::validate_numeric_bounds;
use super::param::ParamIndexer;
use super::select::{column_expr, function_expr, selectable_field};
use crate::error::Error;
use crate::schema::{CollectionDef, FieldDef, FieldType};

/// One collection level's context for condition lowering.
pub(crate) struct ConditionScope<'a> {
    pub dialect: &'a dyn Dialect,
    pub collection: &'a CollectionDef,
    pub table_alias: &'a str,
}

/// Lower a condition tree into a SQL predicate string.
///
/// Every compare value is bound as a parameter; identifiers go through
/// quoting, never interpolation. An empty AND matches everything and an
/// empty OR matches nothing.
pub(crate) fn lower_tree(
    scope: &ConditionScope<'_>,
    tree: &ConditionTree,
    params: &mut ParamIndexer,
) -> Result<String, Error> {
    match tree {
        ConditionTree::Logical { op, children } => {
            if children.is_empty() {
                return Ok(match op {
                    LogicalOp::And => "1 = 1".to_string(),
                    LogicalOp::Or => "1 = 0".to_string(),
                });
            }
            let glue = match op {
                LogicalOp::And => " AND ",
                LogicalOp::Or => " OR ",
            };
            let parts: Vec<String> = children
                .iter()
                .map(|child| lower_tree(scope, child, params))
                .collect::<Result<_, _>>()?;
            Ok(format!("({})", parts.join(glue)))
        }
        ConditionTree::Condition(condition) => lower_condition(scope, condition, params),
    }
}

fn lower_condition(
    scope: &ConditionScope<'_>,
    condition: &Condition,
    params: &mut ParamIndexer,
) -> Result<String, Error> {
    let field_def = selectable_field(scope.collection, condition.target.field_name())?;
    let column = column_expr(scope.dialect, scope.table_alias, &field_def.name);
    let expr = match &condition.target {
        ConditionTarget::Field(_) => column,
        ConditionTarget::Function { function, .. } => {
            function_expr(scope.dialect, *function, field_def, &column, &[], params)?
        }
    };

    let negate = condition.negate;
    match &condition.predicate {
        Predicate::StringCmp(predicate) => {
            lower_string(scope, &expr, predicate, negate, params)
        }
        Predicate::NumberCmp(predicate) => {
            lower_number(scope, field_def, &expr, predicate, negate, params)
        }
        Predicate::SetCmp(predicate) => {
            lower_set(scope, field_def, &expr, predicate, negate, params)
        }
        Predicate::GeoCmp(predicate) => {
            lower_geo(scope, field_def, &expr, predicate, negate, params)
        }
        Predicate::Null => Ok(format!(
            "{expr} IS {}NULL",
            if negate { "NOT " } else { "" }
        )),
        Predicate::FieldCmp { op, other } => {
            let other_def = selectable_field(scope.collection, other)?;
            let other_expr = column_expr(scope.dialect, scope.table_alias, &other_def.name);
            Ok(format!("{expr} {} {other_expr}", compare_sql(*op, negate)))
        }
    }
}

fn lower_string(
    scope: &ConditionScope<'_>,
    expr: &str,
    predicate: &StringPredicate,
    negate: bool,
    params: &mut ParamIndexer,
) -> Result<String, Error> {
    let (needle, prefix, suffix, case_insensitive) = match predicate {
        StringPredicate::Eq(value) => {
            if value.is_null() {
                return Ok(format!(
                    "{expr} IS {}NULL",
                    if negate { "NOT " } else { "" }
                ));
            }
            let placeholder = bind(scope.dialect, params, value)?;
            let operator = if negate { "!=" } else { "=" };
            return Ok(format!("{expr} {operator} {placeholder}"));
        }
        StringPredicate::Contains(n) => (n, true, true, false),
        StringPredicate::IContains(n) => (n, true, true, true),
        StringPredicate::StartsWith(n) => (n, false, true, false),
        StringPredicate::IStartsWith(n) => (n, false, true, true),
        StringPredicate::EndsWith(n) => (n, true, false, false),
        StringPredicate::IEndsWith(n) => (n, true, false, true),
    };

    // Wildcards concatenate around the bound needle in SQL; the needle
    // itself never touches the statement text.
    let placeholder = bind(scope.dialect, params, &Value::String(needle.clone()))?;
    let mut pattern = placeholder;
    if prefix {
        pattern = format!("'%' || {pattern}");
    }
    if suffix {
        pattern = format!("{pattern} || '%'");
    }
    Ok(scope.dialect.like(expr, &pattern, negate, case_insensitive))
}

fn lower_number(
    scope: &ConditionScope<'_>,
    field: &FieldDef,
    expr: &str,
    predicate: &NumberPredicate,
    negate: bool,
    params: &mut ParamIndexer,
) -> Result<String, Error> {
    let (value, operator) = match predicate {
        NumberPredicate::Eq(v) => (v, if negate { "!=" } else { "=" }),
        NumberPredicate::Gt(v) => (v, if negate { "<=" } else { ">" }),
        NumberPredicate::Gte(v) => (v, if negate { "<" } else { ">=" }),
        NumberPredicate::Lt(v) => (v, if negate { ">=" } else { "<" }),
        NumberPredicate::Lte(v) => (v, if negate { ">" } else { "<=" }),
    };
    validate_numeric_bounds(&field.name, &field.field_type, value)?;
    let placeholder = bind(scope.dialect, params, value)?;
    Ok(format!("{expr} {operator} {placeholder}"))
}

fn lower_set(
    scope: &ConditionScope<'_>,
    field: &FieldDef,
    expr: &str,
    predicate: &SetPredicate,
    negate: bool,
    params: &mut ParamIndexer,
) -> Result<String, Error> {
    match predicate {
        SetPredicate::In(values) => {
            if values.is_empty() {
                // Nothing can be in an empty set.
                return Ok(if negate { "1 = 1" } else { "1 = 0" }.to_string());
            }
            let mut placeholders = Vec::with_capacity(values.len());
            for value in values {
                validate_numeric_bounds(&field.name, &field.field_type, value)?;
                placeholders.push(bind(scope.dialect, params, value)?);
            }
            Ok(format!(
                "{expr} {}IN ({})",
                if negate { "NOT " } else { "" },
                placeholders.join(", ")
            ))
        }
        SetPredicate::Between(low, high) => {
            validate_numeric_bounds(&field.name, &field.field_type, low)?;
            validate_numeric_bounds(&field.name, &field.field_type, high)?;
            let low = bind(scope.dialect, params, low)?;
            let high = bind(scope.dialect, params, high)?;
            Ok(format!(
                "{expr} {}BETWEEN {low} AND {high}",
                if negate { "NOT " } else { "" }
            ))
        }
    }
}

fn lower_geo(
    scope: &ConditionScope<'_>,
    field: &FieldDef,
    expr: &str,
    predicate: &GeoPredicate,
    negate: bool,
    params: &mut ParamIndexer,
) -> Result<String, Error> {
    if field.field_type != FieldType::Geometry {
        return Err(Error::InvalidQuery(format!(
            "geometry predicate on non-geometry field '{}'",
            field.name
        )));
    }
    let (value, bbox) = match predicate {
        GeoPredicate::Intersects(v) => (v, false),
        GeoPredicate::IntersectsBbox(v) => (v, true),
    };
    // The WKT text is bound and wrapped in the dialect's constructor; raw
    // geometry text never reaches the statement.
    let placeholder = bind(scope.dialect, params, value)?;
    let geometry = scope.dialect.geometry_from_text(&placeholder);
    let test = if bbox {
        scope.dialect.geo_intersects_bbox(expr, &geometry)
    } else {
        scope.dialect.geo_intersects(expr, &geometry)
    };
    Ok(if negate { format!("NOT ({test})") } else { test })
}

/// Bind a compare value, rejecting unresolved dynamic variables.
fn bind(dialect: &dyn Dialect, params: &mut ParamIndexer, value: &Value) -> Result<String, Error> {
    if let Value::Dynamic(name) = value {
        return Err(Error::InvalidQuery(format!(
            "unresolved dynamic variable '{name}' reached the statement builder"
        )));
    }
    let index = params.bind(value.clone());
    Ok(dialect.placeholder(index))
}

fn compare_sql(op: CompareOp, negate: bool) -> &'static str {
    if !negate {
        return op.sql();
    }
    match op {
        CompareOp::Eq => "!=",
        CompareOp::Gt => "<=",
        CompareOp::Gte => "<",
        CompareOp::Lt => ">=",
        CompareOp::Lte => ">",
    }
}
