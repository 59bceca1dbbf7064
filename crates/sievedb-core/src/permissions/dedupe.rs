//! Deduplication of structurally identical rule row-filters.

use std::collections::BTreeSet;
use std::collections::HashMap;

use sievedb_ir::ConditionTree;

use super::rule::{PermissionRule, ALL_FIELDS};

/// A group of rules sharing one structurally identical row filter.
///
/// Grouping lets the rewriter emit one filter conjunct per distinct filter
/// instead of one per rule row. Groups are built fresh per request and never
/// persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleGroup {
    /// The shared row filter; `None` means unconditional access.
    pub row_filter: Option<ConditionTree>,
    /// Union of the member rules' granted fields.
    pub fields: BTreeSet<String>,
}

impl RuleGroup {
    /// Check if this group grants every field.
    pub fn allows_all_fields(&self) -> bool {
        self.fields.contains(ALL_FIELDS)
    }
}

/// Merge rules whose row filters are structurally identical.
///
/// Identity is decided on the canonicalized JSON form of the filter, with
/// array ordering normalized, so `in [a, b]` and `in [b, a]` land in the
/// same group. Group order follows first appearance in the input.
pub fn dedupe_rules(rules: &[PermissionRule]) -> Vec<RuleGroup> {
    let mut groups: Vec<RuleGroup> = Vec::new();
    let mut index_by_hash: HashMap<String, usize> = HashMap::new();

    for rule in rules {
        let hash = filter_fingerprint(&rule.row_filter);
        let index = *index_by_hash.entry(hash).or_insert_with(|| {
            groups.push(RuleGroup {
                row_filter: rule.row_filter.clone(),
                fields: BTreeSet::new(),
            });
            groups.len() - 1
        });
        groups[index]
            .fields
            .extend(rule.fields.iter().cloned());
    }

    groups
}

/// Hash of the canonicalized JSON form of a row filter.
fn filter_fingerprint(filter: &Option<ConditionTree>) -> String {
    let mut json = match filter {
        None => serde_json::Value::Null,
        Some(tree) => serde_json::to_value(tree).unwrap_or(serde_json::Value::Null),
    };
    canonicalize(&mut json);
    let encoded = json.to_string();
    hex::encode(blake3::hash(encoded.as_bytes()).as_bytes())
}

/// Sort every array by its serialized form so ordering differences vanish.
fn canonicalize(value: &mut serde_json::Value) {
    match value {
        serde_json::Value::Array(items) => {
            for item in items.iter_mut() {
                canonicalize(item);
            }
            items.sort_by_key(|item| item.to_string());
        }
        serde_json::Value::Object(map) => {
            for item in map.values_mut() {
                canonicalize(item);
            }
        }
        _ => {}
    }
}
