//! SQL dialect abstraction.

use sievedb_ir::FieldFunction;

/// Dialect-specific SQL spellings.
///
/// Implementations translate identifier quoting, placeholder syntax, and the
/// function vocabulary (date parts, JSON access, geometry). Everything here
/// produces text only; values always travel through the binding array.
pub trait Dialect: Send + Sync {
    /// Dialect name for diagnostics.
    fn name(&self) -> &'static str;

    /// Whether the dialect numbers its placeholders (`$1`, `$2`, …).
    ///
    /// Positional-`?` dialects skip placeholder renumbering and value
    /// deduplication entirely.
    fn numbered_placeholders(&self) -> bool;

    /// Render the placeholder for a 1-based parameter index.
    fn placeholder(&self, index: usize) -> String;

    /// Quote an identifier, doubling embedded quote characters.
    fn quote_ident(&self, ident: &str) -> String {
        format!("\"{}\"", ident.replace('"', "\"\""))
    }

    /// Apply a date-part extraction to an expression.
    ///
    /// Returns `None` for functions that are not date parts.
    fn date_part(&self, part: FieldFunction, expr: &str) -> Option<String>;

    /// Project a JSON path (bound as `path`) out of a JSON expression.
    fn json_path(&self, expr: &str, path: &str) -> String;

    /// Length of a JSON array expression.
    fn json_array_length(&self, expr: &str) -> String;

    /// Render a geometry column as text.
    fn geometry_as_text(&self, expr: &str) -> String;

    /// Construct a geometry from a bound WKT parameter.
    fn geometry_from_text(&self, param: &str) -> String;

    /// Geometry intersection test.
    fn geo_intersects(&self, expr: &str, geom: &str) -> String;

    /// Bounding-box intersection test.
    fn geo_intersects_bbox(&self, expr: &str, geom: &str) -> String;

    /// LIKE comparison against a pattern expression.
    fn like(&self, expr: &str, pattern: &str, negate: bool, case_insensitive: bool) -> String;
}

/// PostgreSQL dialect (`$n` placeholders, PostGIS geometry functions).
#[derive(Debug, Clone, Copy, Default)]
pub struct Postgres;

impl Dialect for Postgres {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn numbered_placeholders(&self) -> bool {
        true
    }

    fn placeholder(&self, index: usize) -> String {
        format!("${index}")
    }

    fn date_part(&self, part: FieldFunction, expr: &str) -> Option<String> {
        let unit = match part {
            FieldFunction::Year => "YEAR",
            FieldFunction::Month => "MONTH",
            FieldFunction::Week => "WEEK",
            FieldFunction::Day => "DAY",
            FieldFunction::Weekday => "DOW",
            FieldFunction::Hour => "HOUR",
            FieldFunction::Minute => "MINUTE",
            FieldFunction::Second => "SECOND",
            FieldFunction::Count | FieldFunction::JsonPath => return None,
        };
        Some(format!("EXTRACT({unit} FROM {expr})"))
    }

    fn json_path(&self, expr: &str, path: &str) -> String {
        format!("jsonb_path_query_first({expr}::jsonb, {path}::jsonpath)")
    }

    fn json_array_length(&self, expr: &str) -> String {
        format!("jsonb_array_length({expr}::jsonb)")
    }

    fn geometry_as_text(&self, expr: &str) -> String {
        format!("ST_AsText({expr})")
    }

    fn geometry_from_text(&self, param: &str) -> String {
        format!("ST_GeomFromText({param}, 4326)")
    }

    fn geo_intersects(&self, expr: &str, geom: &str) -> String {
        format!("ST_Intersects({expr}, {geom})")
    }

    fn geo_intersects_bbox(&self, expr: &str, geom: &str) -> String {
        format!("({expr} && {geom})")
    }

    fn like(&self, expr: &str, pattern: &str, negate: bool, case_insensitive: bool) -> String {
        let operator = match (negate, case_insensitive) {
            (false, false) => "LIKE",
            (true, false) => "NOT LIKE",
            (false, true) => "ILIKE",
            (true, true) => "NOT ILIKE",
        };
        format!("{expr} {operator} {pattern}")
    }
}

/// SQLite dialect (positional `?` placeholders, SpatiaLite geometry).
#[derive(Debug, Clone, Copy, Default)]
pub struct Sqlite;

impl Dialect for Sqlite {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn numbered_placeholders(&self) -> bool {
        false
    }

    fn placeholder(&self, _index: usize) -> String {
        "?".to_string()
    }

    fn date_part(&self, part: FieldFunction, expr: &str) -> Option<String> {
        let format = match part {
            FieldFunction::Year => "%Y",
            FieldFunction::Month => "%m",
            FieldFunction::Week => "%W",
            FieldFunction::Day => "%d",
            FieldFunction::Weekday => "%w",
            FieldFunction::Hour => "%H",
            FieldFunction::Minute => "%M",
            FieldFunction::Second => "%S",
            FieldFunction::Count | FieldFunction::JsonPath => return None,
        };
        Some(format!("CAST(strftime('{format}', {expr}) AS INTEGER)"))
    }

    fn json_path(&self, expr: &str, path: &str) -> String {
        format!("json_extract({expr}, {path})")
    }

    fn json_array_length(&self, expr: &str) -> String {
        format!("json_array_length({expr})")
    }

    fn geometry_as_text(&self, expr: &str) -> String {
        format!("AsText({expr})")
    }

    fn geometry_from_text(&self, param: &str) -> String {
        format!("GeomFromText({param}, 4326)")
    }

    fn geo_intersects(&self, expr: &str, geom: &str) -> String {
        format!("Intersects({expr}, {geom})")
    }

    fn geo_intersects_bbox(&self, expr: &str, geom: &str) -> String {
        format!("MbrIntersects({expr}, {geom})")
    }

    fn like(&self, expr: &str, pattern: &str, negate: bool, case_insensitive: bool) -> String {
        let not = if negate { "NOT " } else { "" };
        if case_insensitive {
            format!("LOWER({expr}) {not}LIKE LOWER({pattern})")
        } else {
            format!("{expr} {not}LIKE {pattern}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quoting_doubles_embedded_quotes() {
        let pg = Postgres;
        assert_eq!(pg.quote_ident("title"), "\"title\"");
        assert_eq!(pg.quote_ident("odd\"name"), "\"odd\"\"name\"");
    }

    #[test]
    fn test_placeholders() {
        assert_eq!(Postgres.placeholder(3), "$3");
        assert_eq!(Sqlite.placeholder(3), "?");
        assert!(Postgres.numbered_placeholders());
        assert!(!Sqlite.numbered_placeholders());
    }

    #[test]
    fn test_date_parts() {
        assert_eq!(
            Postgres.date_part(FieldFunction::Year, "\"t\".\"c\"").unwrap(),
            "EXTRACT(YEAR FROM \"t\".\"c\")"
        );
        assert_eq!(
            Sqlite.date_part(FieldFunction::Year, "\"t\".\"c\"").unwrap(),
            "CAST(strftime('%Y', \"t\".\"c\") AS INTEGER)"
        );
        assert!(Postgres.date_part(FieldFunction::Count, "x").is_none());
        assert!(Sqlite.date_part(FieldFunction::JsonPath, "x").is_none());
    }

    #[test]
    fn test_like_variants() {
        assert_eq!(Postgres.like("c", "$1", false, false), "c LIKE $1");
        assert_eq!(Postgres.like("c", "$1", true, true), "c NOT ILIKE $1");
        assert_eq!(
            Sqlite.like("c", "?", false, true),
            "LOWER(c) LIKE LOWER(?)"
        );
        assert_eq!(Sqlite.like("c", "?", true, false), "c NOT LIKE ?");
    }
}
