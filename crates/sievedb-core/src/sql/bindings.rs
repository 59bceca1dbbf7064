//! Placeholder normalization for composed SQL fragments.

use std::collections::HashMap;

use sievedb_ir::Value;

use super::dialect::Dialect;
use crate::error::Error;

/// Rewrite positional `?` placeholders into the dialect's numbered form.
///
/// Composed sub-fragments arrive with `?`-style placeholders; this pre-pass
/// renumbers them (`$1`, `$2`, …) for dialects that want numbered parameters
/// and deduplicates repeated identical bound values, so the same literal
/// referenced twice reuses one slot. Escaped question marks stay untouched:
/// a `?` preceded by an odd run of backslashes is a literal, as is any `?`
/// inside a single-quoted string. Pure text/array transformation, no
/// connection involved.
///
/// Input that contains no `?` placeholder is returned unchanged, which makes
/// the pass idempotent: applying it to already-normalized SQL is a no-op.
pub fn preprocess_bindings(
    sql: &str,
    bindings: &[Value],
    dialect: &dyn Dialect,
) -> Result<(String, Vec<Value>), Error> {
    if !dialect.numbered_placeholders() {
        // `?` already is the native form; nothing to renumber or dedupe.
        return Ok((sql.to_string(), bindings.to_vec()));
    }

    let mut out = String::with_capacity(sql.len());
    let mut kept: Vec<Value> = Vec::new();
    let mut slot_by_fingerprint: HashMap<String, usize> = HashMap::new();
    let mut in_string = false;
    let mut backslashes = 0usize;
    let mut consumed = 0usize;

    for ch in sql.chars() {
        match ch {
            '\'' => {
                in_string = !in_string;
                backslashes = 0;
                out.push(ch);
            }
            '\\' => {
                backslashes += 1;
                out.push(ch);
            }
            '?' if !in_string && backslashes % 2 == 0 => {
                backslashes = 0;
                let value = bindings.get(consumed).ok_or_else(|| {
                    Error::Syntax(format!(
                        "fragment has more placeholders than bindings ({} provided)",
                        bindings.len()
                    ))
                })?;
                consumed += 1;
                let slot = dedupe_slot(value, &mut kept, &mut slot_by_fingerprint)?;
                out.push_str(&dialect.placeholder(slot));
            }
            other => {
                backslashes = 0;
                out.push(other);
            }
        }
    }

    if consumed == 0 {
        // Already-normalized input: no `?` found, hand everything back.
        return Ok((sql.to_string(), bindings.to_vec()));
    }
    if consumed != bindings.len() {
        return Err(Error::Syntax(format!(
            "fragment has {consumed} placeholders but {} bindings",
            bindings.len()
        )));
    }
    Ok((out, kept))
}

/// Find or allocate the parameter slot for a value.
fn dedupe_slot(
    value: &Value,
    kept: &mut Vec<Value>,
    slot_by_fingerprint: &mut HashMap<String, usize>,
) -> Result<usize, Error> {
    let fingerprint = serde_json::to_string(value)
        .map_err(|e| Error::Syntax(format!("unencodable binding value: {e}")))?;
    if let Some(&slot) = slot_by_fingerprint.get(&fingerprint) {
        return Ok(slot);
    }
    kept.push(value.clone());
    let slot = kept.len();
    slot_by_fingerprint.insert(fingerprint, slot);
    Ok(slot)
}
