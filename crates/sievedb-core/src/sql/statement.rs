//! Compiled statement types.

use std::collections::BTreeMap;

use sievedb_ir::Value;

/// An ordered list of SQL clause fragments plus the positional parameters.
///
/// Built once per abstract query, consumed exactly once by the execution
/// layer, then discarded. [`Statement::sql`] assembles the fragments in
/// clause order; nothing here re-parses or rewrites the text.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    /// Select-list fragments, already quoted and aliased.
    pub select: Vec<String>,
    /// FROM target (quoted, optionally store-qualified).
    pub from: String,
    /// LEFT JOIN fragments in traversal order.
    pub joins: Vec<String>,
    /// WHERE clause body, if any.
    pub where_clause: Option<String>,
    /// GROUP BY column fragments.
    pub group_by: Vec<String>,
    /// ORDER BY fragments.
    pub order_by: Vec<String>,
    /// LIMIT placeholder, if a limit was set.
    pub limit: Option<String>,
    /// OFFSET placeholder, if an offset was set.
    pub offset: Option<String>,
    /// Positional parameter array, in placeholder order.
    pub params: Vec<Value>,
}

impl Statement {
    /// Assemble the clause fragments into one SQL string.
    pub fn sql(&self) -> String {
        let mut sql = format!("SELECT {} FROM {}", self.select.join(", "), self.from);
        for join in &self.joins {
            sql.push(' ');
            sql.push_str(join);
        }
        if let Some(where_clause) = &self.where_clause {
            sql.push_str(" WHERE ");
            sql.push_str(where_clause);
        }
        if !self.group_by.is_empty() {
            sql.push_str(" GROUP BY ");
            sql.push_str(&self.group_by.join(", "));
        }
        if !self.order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&self.order_by.join(", "));
        }
        if let Some(limit) = &self.limit {
            sql.push_str(" LIMIT ");
            sql.push_str(limit);
        }
        if let Some(offset) = &self.offset {
            sql.push_str(" OFFSET ");
            sql.push_str(offset);
        }
        sql
    }
}

/// Map from output alias to the dot-decomposed path it belongs at.
///
/// Generated alongside the statement, consumed exactly once by the result
/// reshaper, then disposed. Aliases are unique; a duplicate insert is
/// reported so the builder can fail the compile.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AliasPathMap {
    entries: BTreeMap<String, Vec<String>>,
}

impl AliasPathMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an alias; returns `false` if the alias was already present.
    pub fn insert(&mut self, alias: impl Into<String>, path: Vec<String>) -> bool {
        use std::collections::btree_map::Entry;
        match self.entries.entry(alias.into()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(path);
                true
            }
        }
    }

    /// Look up the path for an alias.
    pub fn path(&self, alias: &str) -> Option<&[String]> {
        self.entries.get(alias).map(Vec::as_slice)
    }

    /// Number of aliases.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the map is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over `(alias, path)` entries in alias order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.entries.iter()
    }
}

/// The output of one compile pass: the statement and its alias map.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    /// The parameterized statement.
    pub statement: Statement,
    /// Alias map for reshaping the flat result rows.
    pub alias_map: AliasPathMap,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sql_assembly_order() {
        let statement = Statement {
            select: vec!["\"a\".\"x\" AS \"x\"".into(), "\"a\".\"y\" AS \"y\"".into()],
            from: "\"a\"".into(),
            joins: vec!["LEFT JOIN \"b\" AS \"r\" ON \"a\".\"b_id\" = \"r\".\"id\"".into()],
            where_clause: Some("\"a\".\"x\" = $1".into()),
            group_by: vec![],
            order_by: vec!["\"a\".\"y\" DESC".into()],
            limit: Some("$2".into()),
            offset: Some("$3".into()),
            params: vec![Value::Int(1), Value::Int(10), Value::Int(20)],
        };

        assert_eq!(
            statement.sql(),
            "SELECT \"a\".\"x\" AS \"x\", \"a\".\"y\" AS \"y\" FROM \"a\" \
             LEFT JOIN \"b\" AS \"r\" ON \"a\".\"b_id\" = \"r\".\"id\" \
             WHERE \"a\".\"x\" = $1 ORDER BY \"a\".\"y\" DESC LIMIT $2 OFFSET $3"
        );
    }

    #[test]
    fn test_alias_map_rejects_duplicates() {
        let mut map = AliasPathMap::new();
        assert!(map.insert("title", vec!["title".into()]));
        assert!(!map.insert("title", vec!["other".into()]));
        assert_eq!(map.path("title").unwrap(), ["title".to_string()]);
        assert_eq!(map.len(), 1);
        assert!(map.path("missing").is_none());
    }
}
