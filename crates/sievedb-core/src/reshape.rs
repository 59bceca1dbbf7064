//! Row reshaping: flat result rows back into the nested object graph.

use serde_json::{json, Map};

use sievedb_ir::Value;

use crate::error::Error;
use crate::sql::AliasPathMap;

/// Rebuild the nested object a flat row represents.
///
/// Pure per-row function; every output key comes from setting the alias's
/// dot-decomposed path on the result. A row column whose alias has no map
/// entry is a programmer error and fails loudly rather than being dropped.
pub fn expand(row: &[(String, Value)], alias_map: &AliasPathMap) -> Result<serde_json::Value, Error> {
    let mut result = serde_json::Value::Object(Map::new());
    for (alias, value) in row {
        let path = alias_map.path(alias).ok_or_else(|| {
            Error::InvalidQuery(format!("row column '{alias}' has no alias mapping"))
        })?;
        set_path(&mut result, path, value_to_json(value)?)?;
    }
    Ok(result)
}

/// Re-flatten a nested object by alias; the inverse of [`expand`].
pub fn flatten(
    object: &serde_json::Value,
    alias_map: &AliasPathMap,
) -> Result<Vec<(String, serde_json::Value)>, Error> {
    let mut row = Vec::with_capacity(alias_map.len());
    for (alias, path) in alias_map.iter() {
        let mut cursor = object;
        for segment in path {
            cursor = cursor.get(segment).ok_or_else(|| {
                Error::InvalidQuery(format!("object is missing path segment '{segment}'"))
            })?;
        }
        row.push((alias.clone(), cursor.clone()));
    }
    Ok(row)
}

/// Set a value at a dotted path, creating intermediate objects.
fn set_path(
    result: &mut serde_json::Value,
    path: &[String],
    value: serde_json::Value,
) -> Result<(), Error> {
    let mut cursor = result;
    let (last, parents) = path.split_last().ok_or_else(|| {
        Error::InvalidQuery("alias maps to an empty path".to_string())
    })?;
    for segment in parents {
        let map = cursor.as_object_mut().ok_or_else(|| {
            Error::InvalidQuery(format!("path segment '{segment}' collides with a scalar"))
        })?;
        cursor = map
            .entry(segment.clone())
            .or_insert_with(|| serde_json::Value::Object(Map::new()));
    }
    let map = cursor.as_object_mut().ok_or_else(|| {
        Error::InvalidQuery(format!("path segment '{last}' collides with a scalar"))
    })?;
    map.insert(last.clone(), value);
    Ok(())
}

/// Convert a backend value to its JSON output form.
fn value_to_json(value: &Value) -> Result<serde_json::Value, Error> {
    Ok(match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => json!(b),
        Value::Int(i) => json!(i),
        Value::Float(f) => serde_json::Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .ok_or_else(|| Error::InvalidQuery("non-finite float in result row".to_string()))?,
        Value::Decimal(s) | Value::Geometry(s) | Value::String(s) => json!(s),
        Value::Timestamp(micros) => json!(micros),
        Value::Uuid(bytes) => json!(format_uuid(bytes)),
        Value::Json(j) => j.clone(),
        Value::Dynamic(name) => {
            return Err(Error::InvalidQuery(format!(
                "unresolved dynamic variable '{name}' in result row"
            )))
        }
    })
}

/// Hyphenated lowercase hex form of a UUID.
fn format_uuid(bytes: &[u8; 16]) -> String {
    let hex = hex::encode(bytes);
    format!(
        "{}-{}-{}-{}-{}",
        &hex[0..8],
        &hex[8..12],
        &hex[12..16],
        &hex[16..20],
        &hex[20..32]
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alias_map(entries: &[(&str, &[&str])]) -> AliasPathMap {
        let mut map = AliasPathMap::new();
        for (alias, path) in entries {
            map.insert(
                alias.to_string(),
                path.iter().map(|s| s.to_string()).collect(),
            );
        }
        map
    }

    #[test]
    fn test_expand_builds_the_nested_graph() {
        let map = alias_map(&[
            ("title", &["title"]),
            ("author__name", &["author", "name"]),
            (
                "author__organization__name",
                &["author", "organization", "name"],
            ),
        ]);
        let row = vec![
            ("title".to_string(), Value::String("hello".into())),
            ("author__name".to_string(), Value::String("alice".into())),
            (
                "author__organization__name".to_string(),
                Value::String("acme".into()),
            ),
        ];

        let expanded = expand(&row, &map).unwrap();
        assert_eq!(
            expanded,
            json!({
                "title": "hello",
                "author": {
                    "name": "alice",
                    "organization": { "name": "acme" }
                }
            })
        );
    }

    #[test]
    fn test_unknown_alias_fails_loudly() {
        let map = alias_map(&[("title", &["title"])]);
        let row = vec![("surprise".to_string(), Value::Int(1))];
        assert!(matches!(
            expand(&row, &map).unwrap_err(),
            Error::InvalidQuery(_)
        ));
    }

    #[test]
    fn test_value_conversion() {
        let map = alias_map(&[
            ("id", &["id"]),
            ("price", &["price"]),
            ("meta", &["meta"]),
            ("owner", &["owner"]),
        ]);
        let row = vec![
            ("id".to_string(), Value::Int(7)),
            ("price".to_string(), Value::Decimal("19.99".into())),
            ("meta".to_string(), Value::Json(json!({"a": 1}))),
            ("owner".to_string(), Value::Uuid([0xab; 16])),
        ];

        let expanded = expand(&row, &map).unwrap();
        assert_eq!(expanded["id"], json!(7));
        assert_eq!(expanded["price"], json!("19.99"));
        assert_eq!(expanded["meta"], json!({"a": 1}));
        assert_eq!(
            expanded["owner"],
            json!("abababab-abab-abab-abab-abababababab")
        );
    }

    #[test]
    fn test_expand_then_flatten_round_trips() {
        let map = alias_map(&[
            ("title", &["title"]),
            ("author__name", &["author", "name"]),
            ("countAll", &["countAll"]),
        ]);
        let row = vec![
            ("title".to_string(), Value::String("t".into())),
            ("author__name".to_string(), Value::String("a".into())),
            ("countAll".to_string(), Value::Int(3)),
        ];

        let expanded = expand(&row, &map).unwrap();
        let mut flat = flatten(&expanded, &map).unwrap();
        flat.sort_by(|a, b| a.0.cmp(&b.0));
        assert_eq!(
            flat,
            vec![
                ("author__name".to_string(), json!("a")),
                ("countAll".to_string(), json!(3)),
                ("title".to_string(), json!("t")),
            ]
        );
    }

    #[test]
    fn test_null_related_row_keeps_the_nested_key() {
        let map = alias_map(&[("author__name", &["author", "name"])]);
        let row = vec![("author__name".to_string(), Value::Null)];
        let expanded = expand(&row, &map).unwrap();
        assert_eq!(expanded, json!({ "author": { "name": null } }));
    }
}
