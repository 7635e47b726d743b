//! Convergence planner - groups desired records by scope

use crate::types::Grant;
use oid::Oid;
use std::collections::BTreeSet;

/// Desired records for one relationship scope
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopePlan {
    /// Object the records hang off (workspace, dataset, ...)
    pub scope: Oid,
    /// Records that should exist under `scope`, and nothing else
    pub desired: BTreeSet<Grant>,
}

/// A set of scopes to converge, in declaration order
#[derive(Debug, Clone, Default)]
pub struct ConvergencePlan {
    pub scopes: Vec<ScopePlan>,
}

impl ConvergencePlan {
    /// Create a new empty plan
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a scope with no records yet.
    ///
    /// Converging an empty scope deletes everything observed under it.
    pub fn add_scope(&mut self, scope: Oid) {
        self.scope_mut(scope);
    }

    /// Add a desired record under `scope`
    ///
    /// Declaring the same scope twice merges the records.
    pub fn add_grant(&mut self, scope: Oid, grant: Grant) {
        self.scope_mut(scope).desired.insert(grant);
    }

    fn scope_mut(&mut self, scope: Oid) -> &mut ScopePlan {
        let index = match self.scopes.iter().position(|p| p.scope == scope) {
            Some(index) => index,
            None => {
                self.scopes.push(ScopePlan {
                    scope,
                    desired: BTreeSet::new(),
                });
                self.scopes.len() - 1
            }
        };
        &mut self.scopes[index]
    }

    /// Filter plan to only include scopes matching a predicate
    pub fn filter<F>(self, predicate: F) -> Self
    where
        F: Fn(&ScopePlan) -> bool,
    {
        Self {
            scopes: self.scopes.into_iter().filter(|p| predicate(p)).collect(),
        }
    }

    /// Filter plan to only include scopes matching a target pattern
    ///
    /// Target format: "type" or "type.id"
    pub fn filter_by_target(self, target: Option<&str>) -> Self {
        match target {
            None => self,
            Some(t) => {
                let (kind, id) = parse_target(t);
                self.filter(|p| matches_filter(&p.scope, kind.as_deref(), id.as_deref()))
            }
        }
    }

    /// Total number of desired records in the plan
    pub fn total_grants(&self) -> usize {
        self.scopes.iter().map(|p| p.desired.len()).sum()
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    /// Check if plan is empty
    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }
}

/// Parse a target string like "type.id" into (type, id)
fn parse_target(target: &str) -> (Option<String>, Option<String>) {
    match target.split_once('.') {
        None => (Some(target.to_string()), None),
        Some((kind, id)) => (Some(kind.to_string()), Some(id.to_string())),
    }
}

fn matches_filter(scope: &Oid, kind: Option<&str>, id: Option<&str>) -> bool {
    if let Some(k) = kind
        && scope.kind().tag() != k
    {
        return false;
    }
    if let Some(i) = id
        && scope.id() != i
    {
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Role;

    fn grant(user: &str) -> Grant {
        Grant::new(Oid::user(user).unwrap(), Role::Viewer, None)
    }

    fn sample_plan() -> ConvergencePlan {
        let mut plan = ConvergencePlan::new();
        plan.add_grant(Oid::workspace("1").unwrap(), grant("a"));
        plan.add_grant(Oid::workspace("2").unwrap(), grant("b"));
        plan.add_grant(Oid::dataset("9", None).unwrap(), grant("c"));
        plan
    }

    #[test]
    fn test_parse_target() {
        assert_eq!(parse_target("workspace"), (Some("workspace".to_string()), None));
        assert_eq!(
            parse_target("workspace.41"),
            (Some("workspace".to_string()), Some("41".to_string()))
        );
    }

    #[test]
    fn test_repeated_scope_merges() {
        let mut plan = sample_plan();
        plan.add_grant(Oid::workspace("1").unwrap(), grant("d"));
        plan.add_grant(Oid::workspace("1").unwrap(), grant("a"));
        assert_eq!(plan.len(), 3);
        assert_eq!(plan.scopes[0].desired.len(), 2);
        assert_eq!(plan.total_grants(), 4);
    }

    #[test]
    fn test_empty_scope_is_kept() {
        let mut plan = ConvergencePlan::new();
        plan.add_scope(Oid::workspace("1").unwrap());
        assert_eq!(plan.len(), 1);
        assert!(plan.scopes[0].desired.is_empty());
    }

    #[test]
    fn test_filter_by_target() {
        assert_eq!(sample_plan().filter_by_target(None).len(), 3);
        assert_eq!(sample_plan().filter_by_target(Some("workspace")).len(), 2);

        let plan = sample_plan().filter_by_target(Some("workspace.2"));
        assert_eq!(plan.len(), 1);
        assert_eq!(plan.scopes[0].scope, Oid::workspace("2").unwrap());

        assert!(sample_plan().filter_by_target(Some("folder")).is_empty());
    }
}
