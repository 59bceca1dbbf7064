//! Permission rule definitions.

use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use sievedb_ir::ConditionTree;

/// Action a rule grants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    /// Read operations.
    Read,
    /// Create operations.
    Create,
    /// Update operations.
    Update,
    /// Delete operations.
    Delete,
}

impl Action {
    /// Lowercase name used in log output.
    pub fn name(&self) -> &'static str {
        match self {
            Action::Read => "read",
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
        }
    }
}

/// Field-set entry granting every field of the collection.
pub const ALL_FIELDS: &str = "*";

/// A single access-control rule for one `(collection, action)` pair.
///
/// An empty `fields` list denies every field for this rule; a `"*"` entry
/// grants all of them. Multiple rules for the same pair union their fields
/// and OR their row filters. Row filters, presets, and validation may carry
/// `$CURRENT_*` placeholders; they stay unresolved until rewrite time so a
/// rule set can be reused across a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermissionRule {
    /// Collection the rule applies to.
    pub collection: String,
    /// Action the rule grants.
    pub action: Action,
    /// Granted field names; `"*"` grants all, empty grants none.
    pub fields: Vec<String>,
    /// Row filter restricting which rows the rule grants; `None` grants all.
    pub row_filter: Option<ConditionTree>,
    /// Default values applied on create/update.
    pub presets: Option<serde_json::Map<String, serde_json::Value>>,
    /// Validation applied to submitted payloads.
    pub validation: Option<ConditionTree>,
    /// IP allow-list from the rule's policy; exact addresses or v4 CIDR.
    pub ip_allow_list: Option<Vec<String>>,
}

impl PermissionRule {
    /// Create a rule granting nothing yet.
    pub fn new(collection: impl Into<String>, action: Action) -> Self {
        Self {
            collection: collection.into(),
            action,
            fields: vec![],
            row_filter: None,
            presets: None,
            validation: None,
            ip_allow_list: None,
        }
    }

    /// Set the granted fields.
    pub fn with_fields(mut self, fields: Vec<String>) -> Self {
        self.fields = fields;
        self
    }

    /// Grant every field.
    pub fn allow_all_fields(mut self) -> Self {
        self.fields = vec![ALL_FIELDS.to_string()];
        self
    }

    /// Set the row filter.
    pub fn with_row_filter(mut self, filter: ConditionTree) -> Self {
        self.row_filter = Some(filter);
        self
    }

    /// Set the presets.
    pub fn with_presets(mut self, presets: serde_json::Map<String, serde_json::Value>) -> Self {
        self.presets = Some(presets);
        self
    }

    /// Set the validation tree.
    pub fn with_validation(mut self, validation: ConditionTree) -> Self {
        self.validation = Some(validation);
        self
    }

    /// Restrict the rule to an IP allow-list.
    pub fn with_ip_allow_list(mut self, entries: Vec<String>) -> Self {
        self.ip_allow_list = Some(entries);
        self
    }

    /// Check if this rule grants every field.
    pub fn allows_all_fields(&self) -> bool {
        self.fields.iter().any(|f| f == ALL_FIELDS)
    }

    /// Check the caller's address against the rule's allow-list.
    ///
    /// A rule without an allow-list matches any caller. A rule with one
    /// matches only callers whose address is listed; a caller with no
    /// known address never matches a listed rule.
    pub fn matches_ip(&self, ip: Option<IpAddr>) -> bool {
        let Some(entries) = &self.ip_allow_list else {
            return true;
        };
        let Some(ip) = ip else {
            return false;
        };
        entries.iter().any(|entry| ip_entry_matches(entry, ip))
    }
}

/// Match one allow-list entry: an exact address or an IPv4 CIDR range.
fn ip_entry_matches(entry: &str, ip: IpAddr) -> bool {
    if let Some((net, bits)) = entry.split_once('/') {
        let (Ok(net), Ok(bits)) = (net.parse::<IpAddr>(), bits.parse::<u32>()) else {
            return false;
        };
        match (net, ip) {
            (IpAddr::V4(net), IpAddr::V4(ip)) if bits <= 32 => {
                let mask = if bits == 0 { 0 } else { u32::MAX << (32 - bits) };
                (u32::from(net) & mask) == (u32::from(ip) & mask)
            }
            _ => false,
        }
    } else {
        entry.parse::<IpAddr>().map(|e| e == ip).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sievedb_ir::Condition;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn test_rule_builders() {
        let rule = PermissionRule::new("articles", Action::Read)
            .with_fields(vec!["title".into(), "body".into()])
            .with_row_filter(Condition::eq("status", "published").into());

        assert_eq!(rule.action.name(), "read");
        assert!(!rule.allows_all_fields());
        assert!(rule.row_filter.is_some());

        let rule = PermissionRule::new("articles", Action::Read).allow_all_fields();
        assert!(rule.allows_all_fields());
    }

    #[test]
    fn test_empty_fields_grant_nothing() {
        let rule = PermissionRule::new("articles", Action::Read);
        assert!(rule.fields.is_empty());
        assert!(!rule.allows_all_fields());
    }

    #[test]
    fn test_ip_matching_without_list() {
        let rule = PermissionRule::new("articles", Action::Read);
        assert!(rule.matches_ip(None));
        assert!(rule.matches_ip(Some(ip("10.0.0.1"))));
    }

    #[test]
    fn test_ip_exact_match() {
        let rule = PermissionRule::new("articles", Action::Read)
            .with_ip_allow_list(vec!["192.168.1.10".into()]);
        assert!(rule.matches_ip(Some(ip("192.168.1.10"))));
        assert!(!rule.matches_ip(Some(ip("192.168.1.11"))));
        assert!(!rule.matches_ip(None));
    }

    #[test]
    fn test_ip_cidr_match() {
        let rule = PermissionRule::new("articles", Action::Read)
            .with_ip_allow_list(vec!["10.1.0.0/16".into()]);
        assert!(rule.matches_ip(Some(ip("10.1.200.7"))));
        assert!(!rule.matches_ip(Some(ip("10.2.0.1"))));
    }

    #[test]
    fn test_malformed_ip_entry_never_matches() {
        let rule = PermissionRule::new("articles", Action::Read)
            .with_ip_allow_list(vec!["not-an-address".into(), "10.0.0.0/99".into()]);
        assert!(!rule.matches_ip(Some(ip("10.0.0.1"))));
    }
}
