//! Permission enforcement over the abstract query tree.
//!
//! The rewriter walks the query depth-first and, for every collection level
//! it touches, verifies field coverage (failing closed) and conjoins the
//! applicable rules' row filters into the level's filter tree. It always
//! operates on a clone; the caller's query is never mutated, so logs and
//! retries can inspect the pre-rewrite tree.

use std::collections::BTreeSet;

use tracing::debug;

use sievedb_ir::{
    AbstractQuery, Condition, ConditionTree, FieldNode, Modifiers, Predicate, SetPredicate, Value,
};

use super::context::AccessContext;
use super::dedupe::{dedupe_rules, RuleGroup};
use super::error::PermissionError;
use super::resolver::RuleResolver;
use super::rule::Action;
use crate::error::Error;
use crate::schema::SchemaOverview;

/// Rewrites abstract queries so they can only return permitted data.
pub struct PermissionRewriter<'a> {
    schema: &'a SchemaOverview,
    resolver: &'a RuleResolver<'a>,
    context: &'a AccessContext,
}

impl<'a> PermissionRewriter<'a> {
    /// Create a rewriter for one request.
    pub fn new(
        schema: &'a SchemaOverview,
        resolver: &'a RuleResolver<'a>,
        context: &'a AccessContext,
    ) -> Self {
        Self {
            schema,
            resolver,
            context,
        }
    }

    /// Enforce permissions on a query, returning the rewritten clone.
    ///
    /// Fails with [`PermissionError`] when the collection has no applicable
    /// rule or a requested field is not covered by any rule. Nested
    /// relational hops enforce the `Read` action.
    pub fn enforce(&self, query: &AbstractQuery, action: Action) -> Result<AbstractQuery, Error> {
        let mut rewritten = query.clone();
        let collection = rewritten.collection.clone();
        let (nodes, modifiers) = (&mut rewritten.nodes, &mut rewritten.modifiers);
        self.enforce_level(&collection, nodes, modifiers, action, "")?;
        Ok(rewritten)
    }

    fn enforce_level(
        &self,
        collection: &str,
        nodes: &mut [FieldNode],
        modifiers: &mut Modifiers,
        action: Action,
        path: &str,
    ) -> Result<(), Error> {
        let rules = self.resolver.resolve(collection, action);
        let groups = dedupe_rules(&rules);
        if groups.is_empty() {
            return Err(PermissionError::CollectionForbidden {
                collection: collection.to_string(),
                path: path.to_string(),
            }
            .into());
        }

        self.check_field_coverage(collection, nodes, modifiers, &groups, path)?;
        self.merge_row_filters(&groups, modifiers)?;
        debug!(
            collection,
            action = action.name(),
            path,
            groups = groups.len(),
            "permission level enforced"
        );

        // Recurse into every relational hop.
        for node in nodes.iter_mut() {
            let FieldNode::Related {
                field,
                collection: branch,
                nodes: nested_nodes,
                modifiers: nested_modifiers,
                ..
            } = node
            else {
                continue;
            };

            let relation = self.schema.relation(collection, field).ok_or_else(|| {
                Error::InvalidQuery(format!(
                    "unknown relation '{field}' on collection '{collection}'"
                ))
            })?;
            let target = match (&relation.related_collection, branch.as_ref()) {
                (Some(target), _) => target.clone(),
                (None, Some(branch)) => branch.clone(),
                (None, None) => {
                    return Err(Error::InvalidQuery(format!(
                        "relation '{field}' is many-to-any; the query must name a target collection"
                    )))
                }
            };

            let nested_path = if path.is_empty() {
                field.clone()
            } else {
                format!("{path}.{field}")
            };
            self.enforce_level(
                &target,
                nested_nodes,
                nested_modifiers,
                Action::Read,
                &nested_path,
            )?;
        }

        Ok(())
    }

    /// Verify every field referenced at this level is covered by some rule.
    ///
    /// Fields referenced only in the filter, sort, aggregate, or grouping
    /// count too: a caller must not be able to filter on a field they
    /// cannot read.
    fn check_field_coverage(
        &self,
        collection: &str,
        nodes: &[FieldNode],
        modifiers: &Modifiers,
        groups: &[RuleGroup],
        path: &str,
    ) -> Result<(), Error> {
        if groups.iter().any(RuleGroup::allows_all_fields) {
            return Ok(());
        }
        let mut allowed: BTreeSet<&str> = BTreeSet::new();
        for group in groups {
            allowed.extend(group.fields.iter().map(String::as_str));
        }

        let mut requested: BTreeSet<String> = BTreeSet::new();
        for node in nodes {
            requested.insert(node.field_name().to_string());
        }
        if let Some(filter) = &modifiers.filter {
            requested.extend(filter.referenced_fields());
        }
        for sort in &modifiers.sort {
            requested.insert(sort.target.field_name().to_string());
        }
        for aggregate in &modifiers.aggregate {
            requested.extend(aggregate.fields.iter().cloned());
        }
        requested.extend(modifiers.group.iter().cloned());

        let violations: Vec<String> = requested
            .into_iter()
            .filter(|field| !allowed.contains(field.as_str()))
            .collect();
        if violations.is_empty() {
            Ok(())
        } else {
            Err(PermissionError::FieldsForbidden {
                collection: collection.to_string(),
                path: path.to_string(),
                fields: violations,
            }
            .into())
        }
    }

    /// Conjoin the rule groups' row filters into the level's filter.
    ///
    /// Groups OR together; a group without a filter grants unconditional
    /// row access and short-circuits the whole disjunction, so no conjunct
    /// is added at all.
    fn merge_row_filters(
        &self,
        groups: &[RuleGroup],
        modifiers: &mut Modifiers,
    ) -> Result<(), Error> {
        let mut filters = Vec::with_capacity(groups.len());
        for group in groups {
            match &group.row_filter {
                None => return Ok(()),
                Some(filter) => {
                    let mut filter = filter.clone();
                    self.substitute_dynamics(&mut filter)?;
                    filters.push(filter);
                }
            }
        }

        let rule_filter = if filters.len() == 1 {
            filters.pop().expect("one filter")
        } else {
            ConditionTree::or(filters)
        };
        modifiers.filter = Some(match modifiers.filter.take() {
            None => rule_filter,
            Some(existing) => ConditionTree::and(vec![existing, rule_filter]),
        });
        Ok(())
    }

    /// Replace every `$CURRENT_*` placeholder with context data.
    fn substitute_dynamics(&self, tree: &mut ConditionTree) -> Result<(), Error> {
        match tree {
            ConditionTree::Logical { children, .. } => {
                for child in children {
                    self.substitute_dynamics(child)?;
                }
                Ok(())
            }
            ConditionTree::Condition(condition) => self.substitute_condition(condition),
        }
    }

    fn substitute_condition(&self, condition: &mut Condition) -> Result<(), Error> {
        // IN lists expand list-valued variables in place; everything else
        // takes a single value.
        if let Predicate::SetCmp(SetPredicate::In(values)) = &mut condition.predicate {
            let mut expanded = Vec::with_capacity(values.len());
            for value in values.drain(..) {
                match value {
                    Value::Dynamic(name) => expanded.extend(
                        self.context
                            .dynamic_list(&name)
                            .map_err(Error::InvalidQuery)?,
                    ),
                    other => expanded.push(other),
                }
            }
            *values = expanded;
            return Ok(());
        }

        let mut failure: Option<String> = None;
        condition.for_each_value_mut(&mut |value| {
            if failure.is_some() {
                return;
            }
            if let Value::Dynamic(name) = value {
                match self.context.dynamic_scalar(name) {
                    Ok(resolved) => *value = resolved,
                    Err(message) => failure = Some(message),
                }
            }
        });
        match failure {
            Some(message) => Err(Error::InvalidQuery(message)),
            None => Ok(()),
        }
    }
}
