//! Access context that flows through permission resolution and rewriting.

use std::collections::HashMap;
use std::net::IpAddr;

use sievedb_ir::Value;

/// Request-scoped identity used for access-control decisions.
///
/// The `attributes` map backs dotted dynamic variables: a rule referencing
/// `$CURRENT_USER.email` reads the attribute keyed `user.email`. The
/// resolver reports which attributes a rule set actually needs so the
/// surrounding system can fetch only those.
#[derive(Debug, Clone, Default)]
pub struct AccessContext {
    /// Authenticated user id; `None` for anonymous callers.
    pub user: Option<String>,
    /// Effective role ids, most specific first.
    pub roles: Vec<String>,
    /// Effective policy ids.
    pub policies: Vec<String>,
    /// Caller's source address.
    pub ip: Option<IpAddr>,
    /// Fetched identity attributes for dotted dynamic variables.
    pub attributes: HashMap<String, Value>,
}

impl AccessContext {
    /// Create an anonymous context.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Create a context for an authenticated user.
    pub fn for_user(user: impl Into<String>) -> Self {
        Self {
            user: Some(user.into()),
            ..Self::default()
        }
    }

    /// Add a role.
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.push(role.into());
        self
    }

    /// Add a policy.
    pub fn with_policy(mut self, policy: impl Into<String>) -> Self {
        self.policies.push(policy.into());
        self
    }

    /// Set the caller's source address.
    pub fn with_ip(mut self, ip: IpAddr) -> Self {
        self.ip = Some(ip);
        self
    }

    /// Set an identity attribute (keyed like `user.email`, `role.name`).
    pub fn with_attribute(mut self, name: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(name.into(), value);
        self
    }

    /// Resolve a dynamic variable to a single value.
    ///
    /// Absent identity data resolves to `Null` (which matches no row under
    /// equality), keeping substitution fail-closed. List-valued variables
    /// are rejected here; they only make sense inside IN lists.
    pub fn dynamic_scalar(&self, var: &str) -> Result<Value, String> {
        match var {
            "$CURRENT_USER" => Ok(self
                .user
                .clone()
                .map(Value::String)
                .unwrap_or(Value::Null)),
            "$CURRENT_ROLE" => Ok(self
                .roles
                .first()
                .cloned()
                .map(Value::String)
                .unwrap_or(Value::Null)),
            "$CURRENT_ROLES" | "$CURRENT_POLICIES" => Err(format!(
                "list-valued dynamic variable '{var}' used in a scalar position"
            )),
            other => match attribute_key(other) {
                Some(key) => Ok(self.attributes.get(&key).cloned().unwrap_or(Value::Null)),
                None => Err(format!("unknown dynamic variable '{other}'")),
            },
        }
    }

    /// Resolve a dynamic variable to a list of values for IN predicates.
    pub fn dynamic_list(&self, var: &str) -> Result<Vec<Value>, String> {
        match var {
            "$CURRENT_ROLES" => Ok(self.roles.iter().cloned().map(Value::String).collect()),
            "$CURRENT_POLICIES" => Ok(self.policies.iter().cloned().map(Value::String).collect()),
            other => self.dynamic_scalar(other).map(|v| vec![v]),
        }
    }
}

/// Map a dotted dynamic variable to its attribute key.
///
/// `$CURRENT_USER.email` → `user.email`; unknown prefixes return `None`.
pub(crate) fn attribute_key(var: &str) -> Option<String> {
    for (prefix, head) in [
        ("$CURRENT_USER.", "user"),
        ("$CURRENT_ROLE.", "role"),
        ("$CURRENT_ROLES.", "roles"),
        ("$CURRENT_POLICIES.", "policies"),
    ] {
        if let Some(rest) = var.strip_prefix(prefix) {
            if rest.is_empty() {
                return None;
            }
            return Some(format!("{head}.{rest}"));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_resolution() {
        let ctx = AccessContext::for_user("user-1")
            .with_role("editor")
            .with_attribute("user.email", Value::String("a@b.c".into()));

        assert_eq!(
            ctx.dynamic_scalar("$CURRENT_USER").unwrap(),
            Value::String("user-1".into())
        );
        assert_eq!(
            ctx.dynamic_scalar("$CURRENT_ROLE").unwrap(),
            Value::String("editor".into())
        );
        assert_eq!(
            ctx.dynamic_scalar("$CURRENT_USER.email").unwrap(),
            Value::String("a@b.c".into())
        );
    }

    #[test]
    fn test_absent_identity_resolves_to_null() {
        let ctx = AccessContext::anonymous();
        assert_eq!(ctx.dynamic_scalar("$CURRENT_USER").unwrap(), Value::Null);
        assert_eq!(
            ctx.dynamic_scalar("$CURRENT_USER.email").unwrap(),
            Value::Null
        );
    }

    #[test]
    fn test_list_variables() {
        let ctx = AccessContext::for_user("u")
            .with_role("a")
            .with_role("b")
            .with_policy("p1");

        assert_eq!(
            ctx.dynamic_list("$CURRENT_ROLES").unwrap(),
            vec![Value::String("a".into()), Value::String("b".into())]
        );
        assert_eq!(
            ctx.dynamic_list("$CURRENT_POLICIES").unwrap(),
            vec![Value::String("p1".into())]
        );
        // Scalar variables in list position wrap into a one-element list.
        assert_eq!(
            ctx.dynamic_list("$CURRENT_USER").unwrap(),
            vec![Value::String("u".into())]
        );
        assert!(ctx.dynamic_scalar("$CURRENT_ROLES").is_err());
    }

    #[test]
    fn test_unknown_variable_is_rejected() {
        let ctx = AccessContext::anonymous();
        assert!(ctx.dynamic_scalar("$SOMETHING_ELSE").is_err());
        assert!(ctx.dynamic_scalar("$CURRENT_USER.").is_err());
    }

    #[test]
    fn test_attribute_key_mapping() {
        assert_eq!(
            attribute_key("$CURRENT_USER.org_id").as_deref(),
            Some("user.org_id")
        );
        assert_eq!(
            attribute_key("$CURRENT_ROLE.name").as_deref(),
            Some("role.name")
        );
        assert_eq!(attribute_key("$NOT_A_VARIABLE"), None);
    }
}
