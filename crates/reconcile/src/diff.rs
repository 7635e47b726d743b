//! Delta computation for relationship sets

use crate::types::{Delta, Grant};
use oid::Oid;
use std::collections::{BTreeMap, BTreeSet};

/// Compute the creates and deletes that turn `observed` into `desired`.
///
/// Records are compared by content. A record whose role changed shows up as
/// a delete of the old record plus a create of the new one; there is no
/// in-place update.
///
/// # Example
///
/// ```
/// use oid::Oid;
/// use reconcile::{Grant, Role, reconcile};
/// use std::collections::BTreeSet;
///
/// let user = Oid::user("17")?;
/// let desired = BTreeSet::from([Grant::new(user.clone(), Role::Viewer, None)]);
/// let observed = BTreeSet::from([Grant::new(user.clone(), Role::Editor, None)]);
///
/// let delta = reconcile(&desired, &observed);
/// assert_eq!(delta.to_create, desired);
/// assert_eq!(delta.to_delete, observed);
/// assert!(reconcile(&desired, &desired).is_empty());
/// # Ok::<(), oid::Error>(())
/// ```
pub fn reconcile(desired: &BTreeSet<Grant>, observed: &BTreeSet<Grant>) -> Delta {
    Delta {
        to_create: desired.difference(observed).cloned().collect(),
        to_delete: observed.difference(desired).cloned().collect(),
    }
}

/// Delta summary statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeltaSummary {
    /// Records to create that do not replace an existing one
    pub additions: usize,
    /// Records to delete that are not being replaced
    pub removals: usize,
    /// Subjects whose role on an object changes
    pub replacements: usize,
}

impl DeltaSummary {
    /// Create a summary from a delta
    pub fn from_delta(delta: &Delta) -> Self {
        let replacements = delta.replacements().len();
        Self {
            additions: delta.to_create.len() - replacements,
            removals: delta.to_delete.len() - replacements,
            replacements,
        }
    }
}

/// Creates and deletes of a delta grouped by subject
pub fn group_by_subject(delta: &Delta) -> BTreeMap<&Oid, (Vec<&Grant>, Vec<&Grant>)> {
    let mut groups: BTreeMap<&Oid, (Vec<&Grant>, Vec<&Grant>)> = BTreeMap::new();
    for grant in &delta.to_create {
        groups.entry(&grant.subject).or_default().0.push(grant);
    }
    for grant in &delta.to_delete {
        groups.entry(&grant.subject).or_default().1.push(grant);
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Role;

    fn grant(user: &str, role: Role, dataset: Option<&str>) -> Grant {
        Grant::new(
            Oid::user(user).unwrap(),
            role,
            dataset.map(|d| Oid::dataset(d, None).unwrap()),
        )
    }

    fn sample_sets() -> Vec<(BTreeSet<Grant>, BTreeSet<Grant>)> {
        let a = grant("a", Role::Viewer, None);
        let b = grant("b", Role::Editor, Some("1"));
        let c = grant("c", Role::Owner, Some("2"));
        let a2 = grant("a", Role::Editor, None);
        vec![
            (BTreeSet::new(), BTreeSet::new()),
            ([a.clone()].into(), BTreeSet::new()),
            (BTreeSet::new(), [a.clone()].into()),
            ([a.clone(), b.clone()].into(), [b.clone(), c.clone()].into()),
            ([a.clone()].into(), [a2.clone()].into()),
            ([a, b, c].into(), [a2].into()),
        ]
    }

    #[test]
    fn test_role_change_is_replace() {
        let desired = [grant("a", Role::Viewer, None)].into();
        let observed = [grant("a", Role::Editor, None)].into();
        let delta = reconcile(&desired, &observed);
        assert_eq!(delta.to_create, desired);
        assert_eq!(delta.to_delete, observed);
        assert_eq!(
            DeltaSummary::from_delta(&delta),
            DeltaSummary {
                additions: 0,
                removals: 0,
                replacements: 1,
            }
        );
    }

    #[test]
    fn test_summary_with_two_observed_roles() {
        let desired = [grant("a", Role::Viewer, None)].into();
        let observed = [
            grant("a", Role::Editor, None),
            grant("a", Role::Owner, None),
        ]
        .into();
        let delta = reconcile(&desired, &observed);
        assert_eq!(
            DeltaSummary::from_delta(&delta),
            DeltaSummary {
                additions: 0,
                removals: 1,
                replacements: 1,
            }
        );
    }

    #[test]
    fn test_creates_and_deletes_are_disjoint() {
        for (desired, observed) in sample_sets() {
            let delta = reconcile(&desired, &observed);
            assert!(delta.to_create.is_disjoint(&delta.to_delete));
        }
    }

    #[test]
    fn test_applying_delta_reaches_desired() {
        for (desired, observed) in sample_sets() {
            let delta = reconcile(&desired, &observed);
            let result: BTreeSet<Grant> = observed
                .union(&delta.to_create)
                .filter(|g| !delta.to_delete.contains(g))
                .cloned()
                .collect();
            assert_eq!(result, desired);
        }
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        for (desired, _) in sample_sets() {
            assert!(reconcile(&desired, &desired).is_empty());
        }
    }

    #[test]
    fn test_unchanged_records_untouched() {
        let keep = grant("b", Role::Editor, Some("1"));
        let desired = [keep.clone(), grant("a", Role::Viewer, None)].into();
        let observed = [keep.clone(), grant("c", Role::Owner, None)].into();
        let delta = reconcile(&desired, &observed);
        assert!(!delta.to_create.contains(&keep));
        assert!(!delta.to_delete.contains(&keep));
        assert_eq!(delta.len(), 2);
    }

    #[test]
    fn test_qualifier_is_part_of_identity() {
        let desired = [grant("a", Role::Viewer, Some("1"))].into();
        let observed = [grant("a", Role::Viewer, Some("2"))].into();
        let delta = reconcile(&desired, &observed);
        assert_eq!(delta.len(), 2);
        assert!(delta.replacements().is_empty());
    }

    #[test]
    fn test_group_by_subject() {
        let desired = [grant("a", Role::Viewer, None), grant("b", Role::Owner, None)].into();
        let observed = [grant("a", Role::Editor, None)].into();
        let delta = reconcile(&desired, &observed);
        let groups = group_by_subject(&delta);
        assert_eq!(groups.len(), 2);
        let (creates, deletes) = &groups[&Oid::user("a").unwrap()];
        assert_eq!(creates.len(), 1);
        assert_eq!(deletes.len(), 1);
    }
}
