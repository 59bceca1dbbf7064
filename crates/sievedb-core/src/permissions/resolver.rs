//! Permission rule resolution.

use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};

use tracing::debug;

use super::context::AccessContext;
use super::rule::{Action, PermissionRule};
use super::store::RuleStore;

/// Per-request rule resolver.
///
/// Wraps an injected [`RuleStore`] and memoizes lookups for the lifetime of
/// one resolver instance, so all levels of a single rewrite pass observe the
/// same rules even if the store is swapped mid-request. Create one resolver
/// per request; the memo is intentionally not shared across requests.
pub struct RuleResolver<'a> {
    store: &'a dyn RuleStore,
    context: &'a AccessContext,
    memo: RefCell<HashMap<(String, Action), Vec<PermissionRule>>>,
}

impl<'a> RuleResolver<'a> {
    /// Create a resolver for one request.
    pub fn new(store: &'a dyn RuleStore, context: &'a AccessContext) -> Self {
        Self {
            store,
            context,
            memo: RefCell::new(HashMap::new()),
        }
    }

    /// Resolve the applicable rules for a `(collection, action)` pair.
    ///
    /// Rules whose policy declares an IP allow-list that does not match the
    /// caller are dropped before any field/row logic runs. Returned rules
    /// still carry their `$CURRENT_*` placeholders; substitution happens at
    /// rewrite time. An empty result means "no access".
    pub fn resolve(&self, collection: &str, action: Action) -> Vec<PermissionRule> {
        let key = (collection.to_string(), action);
        if let Some(cached) = self.memo.borrow().get(&key) {
            return cached.clone();
        }

        let rules: Vec<PermissionRule> = self
            .store
            .rules_for(collection, action)
            .into_iter()
            .filter(|rule| rule.matches_ip(self.context.ip))
            .collect();
        debug!(
            collection,
            action = action.name(),
            rules = rules.len(),
            "resolved permission rules"
        );

        self.memo.borrow_mut().insert(key, rules.clone());
        rules
    }
}

/// Collect every dynamic-variable reference inside a rule set.
///
/// Walks row filters, presets, and validation trees, returning the minimal
/// set of `$CURRENT_*` variables the context must be able to answer; the
/// surrounding system uses this to avoid fetching unrelated user or role
/// attributes per request.
pub fn required_context_fields(rules: &[PermissionRule]) -> BTreeSet<String> {
    let mut vars = BTreeSet::new();
    for rule in rules {
        for tree in [&rule.row_filter, &rule.validation].into_iter().flatten() {
            tree.for_each_value(&mut |value| {
                if let sievedb_ir::Value::Dynamic(name) = value {
                    vars.insert(name.clone());
                }
            });
        }
        if let Some(presets) = &rule.presets {
            for value in presets.values() {
                collect_json_dynamics(value, &mut vars);
            }
        }
    }
    vars
}

fn collect_json_dynamics(value: &serde_json::Value, vars: &mut BTreeSet<String>) {
    match value {
        serde_json::Value::String(s) if s.starts_with("$CURRENT_") => {
            vars.insert(s.clone());
        }
        serde_json::Value::Array(items) => {
            for item in items {
                collect_json_dynamics(item, vars);
            }
        }
        serde_json::Value::Object(map) => {
            for item in map.values() {
                collect_json_dynamics(item, vars);
            }
        }
        _ => {}
    }
}
