//! Core types for relationship reconciliation

use crate::error::{Error, Result};
use oid::{Oid, ResourceType, TypeRegistry};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Types a grant subject may reference
pub const SUBJECT_TYPES: [ResourceType; 2] = [ResourceType::User, ResourceType::RbacGroup];

/// Role granted to a subject
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Viewer,
    Editor,
    Manager,
    Owner,
    Ingester,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::Viewer,
        Role::Editor,
        Role::Manager,
        Role::Owner,
        Role::Ingester,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Viewer => "viewer",
            Role::Editor => "editor",
            Role::Manager => "manager",
            Role::Owner => "owner",
            Role::Ingester => "ingester",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| s.to_string())
    }
}

/// A relationship record: `subject` holds `role`, optionally on `qualifier`.
///
/// Records have no server-issued id; the tuple itself is the identity.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Grant {
    pub subject: Oid,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qualifier: Option<Oid>,
}

impl Grant {
    pub fn new(subject: Oid, role: Role, qualifier: Option<Oid>) -> Self {
        Self {
            subject,
            role,
            qualifier,
        }
    }

    /// Whether `other` grants something to the same subject on the same object.
    pub fn same_target(&self, other: &Self) -> bool {
        self.subject == other.subject && self.qualifier == other.qualifier
    }
}

impl fmt::Display for Grant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.subject, self.role)?;
        if let Some(q) = &self.qualifier {
            write!(f, " on {q}")?;
        }
        Ok(())
    }
}

/// Wire shape of a grant: reference strings and a lowercase role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantSpec {
    pub subject: String,
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qualifier: Option<String>,
}

impl GrantSpec {
    /// Resolve into a typed grant.
    ///
    /// `field` prefixes every diagnostic (e.g. `scope[0].grant[3]`).
    pub fn resolve(&self, registry: &TypeRegistry, field: &str) -> Result<Grant> {
        let subject = Oid::parse_field(
            registry,
            &format!("{field}.subject"),
            &self.subject,
            &SUBJECT_TYPES,
        )?;
        let role = self.role.parse().map_err(|role| Error::UnknownRole {
            field: format!("{field}.role"),
            role,
        })?;
        let qualifier = self
            .qualifier
            .as_deref()
            .map(|q| Oid::parse_field(registry, &format!("{field}.qualifier"), q, &[]))
            .transpose()?;
        Ok(Grant::new(subject, role, qualifier))
    }
}

impl From<&Grant> for GrantSpec {
    fn from(grant: &Grant) -> Self {
        Self {
            subject: grant.subject.to_string(),
            role: grant.role.to_string(),
            qualifier: grant.qualifier.as_ref().map(ToString::to_string),
        }
    }
}

/// Creates and deletes needed to move observed state to desired state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Delta {
    pub to_create: BTreeSet<Grant>,
    pub to_delete: BTreeSet<Grant>,
}

impl Delta {
    pub fn is_empty(&self) -> bool {
        self.to_create.is_empty() && self.to_delete.is_empty()
    }

    /// Total number of operations
    pub fn len(&self) -> usize {
        self.to_create.len() + self.to_delete.len()
    }

    /// Pairs `(old, new)` where a subject's role on an object changed.
    ///
    /// Each create pairs with at most one delete.
    pub fn replacements(&self) -> Vec<(&Grant, &Grant)> {
        let mut unmatched: Vec<&Grant> = self.to_create.iter().collect();
        self.to_delete
            .iter()
            .filter_map(|old| {
                let pos = unmatched.iter().position(|new| new.same_target(old))?;
                Some((old, unmatched.remove(pos)))
            })
            .collect()
    }

    /// What is left of this delta once `applied` has gone through
    pub fn remaining_after(&self, applied: &Applied) -> Self {
        Self {
            to_create: self
                .to_create
                .iter()
                .filter(|g| !applied.created.contains(g))
                .cloned()
                .collect(),
            to_delete: self
                .to_delete
                .iter()
                .filter(|g| !applied.deleted.contains(g))
                .cloned()
                .collect(),
        }
    }
}

/// Operations a backend confirmed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Applied {
    pub created: Vec<Grant>,
    pub deleted: Vec<Grant>,
}

impl Applied {
    pub fn is_empty(&self) -> bool {
        self.created.is_empty() && self.deleted.is_empty()
    }

    pub fn len(&self) -> usize {
        self.created.len() + self.deleted.len()
    }

    /// Merge another batch into this one
    pub fn merge(&mut self, other: Applied) {
        self.created.extend(other.created);
        self.deleted.extend(other.deleted);
    }
}

impl fmt::Display for Applied {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} created, {} deleted",
            self.created.len(),
            self.deleted.len()
        )
    }
}

/// Exponential backoff settings for transient backend failures
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the first)
    pub max_attempts: u32,
    /// Delay before the first retry
    pub base_delay: Duration,
    /// Multiplier for exponential backoff
    pub backoff_factor: f64,
    /// Maximum delay between retries
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            backoff_factor: 2.0,
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryConfig {
    /// Calculate the delay for a given attempt number (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = self.base_delay.as_secs_f64() * self.backoff_factor.powi(attempt as i32);
        let capped = delay.min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(capped)
    }

    /// Create a config that never retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }
}

/// Options for convergence
#[derive(Debug, Clone)]
pub struct ConvergeOptions {
    /// Compute deltas without mutating
    pub dry_run: bool,
    /// Number of scopes converged in parallel
    pub jobs: usize,
    /// Retry policy for transient failures
    pub retry: RetryConfig,
}

impl Default for ConvergeOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            jobs: 4,
            retry: RetryConfig::default(),
        }
    }
}

/// Outcome of converging one scope
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ScopeOutcome {
    /// Observed state already matched
    NoChange,
    /// Dry run: this delta would be applied
    Planned(Delta),
    /// Changes were applied, possibly across several attempts
    Applied { applied: Applied, attempts: u32 },
    /// Not applied because the run was declined
    Skipped { reason: String },
    /// Convergence failed; `resumable` failures can be retried later
    Failed {
        error: String,
        applied: Applied,
        resumable: bool,
    },
}

impl ScopeOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }
}

/// Result for a single scope
#[derive(Debug, Clone, Serialize)]
pub struct ScopeResult {
    pub scope: Oid,
    pub outcome: ScopeOutcome,
}

/// Summary of a convergence run
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConvergeSummary {
    pub created: usize,
    pub deleted: usize,
    pub planned: usize,
    pub no_change: usize,
    pub skipped: usize,
    pub failed: usize,
    pub scopes: Vec<ScopeResult>,
}

impl ConvergeSummary {
    /// Total number of record changes made
    pub fn total_changes(&self) -> usize {
        self.created + self.deleted
    }

    /// Check if every scope converged (or was planned)
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// Record the outcome for a scope
    pub fn add(&mut self, scope: Oid, outcome: ScopeOutcome) {
        match &outcome {
            ScopeOutcome::NoChange => self.no_change += 1,
            ScopeOutcome::Planned(delta) => self.planned += delta.len(),
            ScopeOutcome::Applied { applied, .. } => {
                self.created += applied.created.len();
                self.deleted += applied.deleted.len();
            }
            ScopeOutcome::Skipped { .. } => self.skipped += 1,
            ScopeOutcome::Failed { applied, .. } => {
                self.failed += 1;
                self.created += applied.created.len();
                self.deleted += applied.deleted.len();
            }
        }
        self.scopes.push(ScopeResult { scope, outcome });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> TypeRegistry {
        TypeRegistry::standard()
    }

    fn grant(user: &str, role: Role) -> Grant {
        Grant::new(Oid::user(user).unwrap(), role, None)
    }

    #[test]
    fn test_role_parse() {
        assert_eq!("viewer".parse::<Role>(), Ok(Role::Viewer));
        assert_eq!("Viewer".parse::<Role>(), Err("Viewer".to_string()));
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>(), Ok(role));
        }
    }

    #[test]
    fn test_resolve_grant_spec() {
        let spec = GrantSpec {
            subject: "o:user:7".to_string(),
            role: "editor".to_string(),
            qualifier: Some("o:dataset:42:3".to_string()),
        };
        let grant = spec.resolve(&registry(), "grant[0]").unwrap();
        assert_eq!(grant.subject, Oid::user("7").unwrap());
        assert_eq!(grant.role, Role::Editor);
        assert_eq!(grant.qualifier, Some(Oid::dataset("42", Some("3")).unwrap()));
        assert_eq!(GrantSpec::from(&grant), spec);
    }

    #[test]
    fn test_resolve_points_at_field() {
        let spec = GrantSpec {
            subject: "o:dataset:7".to_string(),
            role: "editor".to_string(),
            qualifier: None,
        };
        let err = spec.resolve(&registry(), "scope[1].grant[2]").unwrap_err();
        assert!(err.to_string().contains("scope[1].grant[2].subject"));

        let spec = GrantSpec {
            subject: "o:user:7".to_string(),
            role: "superuser".to_string(),
            qualifier: None,
        };
        let err = spec.resolve(&registry(), "grant[0]").unwrap_err();
        assert!(matches!(err, Error::UnknownRole { .. }));
        assert!(err.to_string().contains("grant[0].role"));
    }

    #[test]
    fn test_delta_replacements() {
        let delta = Delta {
            to_create: [grant("a", Role::Viewer), grant("b", Role::Owner)].into(),
            to_delete: [grant("a", Role::Editor), grant("c", Role::Viewer)].into(),
        };
        let replacements = delta.replacements();
        assert_eq!(replacements.len(), 1);
        assert_eq!(replacements[0].0.role, Role::Editor);
        assert_eq!(replacements[0].1.role, Role::Viewer);
    }

    #[test]
    fn test_replacements_pair_one_to_one() {
        let delta = Delta {
            to_create: [grant("a", Role::Viewer)].into(),
            to_delete: [grant("a", Role::Editor), grant("a", Role::Owner)].into(),
        };
        let replacements = delta.replacements();
        assert_eq!(replacements.len(), 1);
        assert_eq!(replacements[0].1.role, Role::Viewer);
    }

    #[test]
    fn test_remaining_after() {
        let delta = Delta {
            to_create: [grant("a", Role::Viewer), grant("b", Role::Owner)].into(),
            to_delete: [grant("c", Role::Viewer)].into(),
        };
        let applied = Applied {
            created: vec![grant("a", Role::Viewer)],
            deleted: vec![],
        };
        let remaining = delta.remaining_after(&applied);
        assert_eq!(remaining.to_create, [grant("b", Role::Owner)].into());
        assert_eq!(remaining.to_delete, delta.to_delete);
    }

    #[test]
    fn test_retry_delay_calculation() {
        let config = RetryConfig {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
            backoff_factor: 2.0,
            max_delay: Duration::from_secs(5),
        };
        assert_eq!(config.delay_for_attempt(0), Duration::from_secs(1));
        assert_eq!(config.delay_for_attempt(1), Duration::from_secs(2));
        assert_eq!(config.delay_for_attempt(2), Duration::from_secs(4));
        assert_eq!(config.delay_for_attempt(3), Duration::from_secs(5));
    }

    #[test]
    fn test_summary_counts() {
        let mut summary = ConvergeSummary::default();
        let scope = Oid::workspace("1").unwrap();
        summary.add(scope.clone(), ScopeOutcome::NoChange);
        summary.add(
            scope.clone(),
            ScopeOutcome::Applied {
                applied: Applied {
                    created: vec![grant("a", Role::Viewer)],
                    deleted: vec![grant("a", Role::Editor)],
                },
                attempts: 1,
            },
        );
        summary.add(
            scope,
            ScopeOutcome::Failed {
                error: "down".to_string(),
                applied: Applied::default(),
                resumable: true,
            },
        );
        assert_eq!(summary.total_changes(), 2);
        assert_eq!(summary.no_change, 1);
        assert!(!summary.is_success());
        assert_eq!(summary.scopes.len(), 3);
    }
}
