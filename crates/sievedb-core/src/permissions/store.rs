//! Rule storage: the injected collaborator the resolver reads from.

use parking_lot::RwLock;

use super::rule::{Action, PermissionRule};

/// Source of permission rules.
///
/// Implementations may be backed by the catalog store or a cache; the
/// resolver treats them as read-only and memoizes per request, so a single
/// rewrite pass never observes a half-updated rule set.
pub trait RuleStore: Send + Sync {
    /// Fetch the rules declared for a `(collection, action)` pair.
    ///
    /// An empty result means no rule exists, which callers treat as
    /// "no access".
    fn rules_for(&self, collection: &str, action: Action) -> Vec<PermissionRule>;
}

/// In-memory rule store.
///
/// Invalidation contract: `replace_rules` swaps the whole rule set
/// atomically; readers started before the swap keep their memoized copy.
#[derive(Debug, Default)]
pub struct MemoryRuleStore {
    rules: RwLock<Vec<PermissionRule>>,
}

impl MemoryRuleStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with rules.
    pub fn with_rules(rules: Vec<PermissionRule>) -> Self {
        Self {
            rules: RwLock::new(rules),
        }
    }

    /// Add a rule.
    pub fn add_rule(&self, rule: PermissionRule) {
        self.rules.write().push(rule);
    }

    /// Replace the entire rule set.
    pub fn replace_rules(&self, rules: Vec<PermissionRule>) {
        *self.rules.write() = rules;
    }
}

impl RuleStore for MemoryRuleStore {
    fn rules_for(&self, collection: &str, action: Action) -> Vec<PermissionRule> {
        self.rules
            .read()
            .iter()
            .filter(|r| r.collection == collection && r.action == action)
            .cloned()
            .collect()
    }
}
