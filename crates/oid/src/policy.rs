//! Change-detection policy for reference fields.
//!
//! Two questions come up whenever declared configuration is compared against
//! stored state:
//!
//! - Did a reference field really change, or did only the version of the
//!   object it points at advance? ([`is_insignificant`])
//! - Does a derived object have to be rebuilt because one of its inputs was
//!   republished since it was last materialized? ([`RecomputePolicy`])

use crate::reference::Oid;
use crate::registry::TypeRegistry;
use std::cmp::Ordering;

/// Whether a change from `old` to `new` in a reference field can be ignored.
///
/// Both sides that parse and share type and id are equivalent whatever their
/// fourth segment (version or scope) holds. If either side fails to parse,
/// the raw strings must match exactly.
pub fn is_insignificant(registry: &TypeRegistry, old: &str, new: &str) -> bool {
    match (Oid::parse(registry, old), Oid::parse(registry, new)) {
        (Ok(a), Ok(b)) => {
            let same = a.same_object(&b);
            if same && old != new {
                log::debug!("Suppressing change to the same object {old} -> {new}");
            }
            same
        }
        _ => old == new,
    }
}

/// Compare two version strings.
///
/// Versions are unsigned sequence numbers. Anything else has no ordering and
/// yields `None`.
pub fn compare_versions(a: &str, b: &str) -> Option<Ordering> {
    let a: u64 = a.parse().ok()?;
    let b: u64 = b.parse().ok()?;
    Some(a.cmp(&b))
}

/// Whether `candidate` is strictly newer than `current`.
///
/// An unparseable version on either side is never newer.
pub fn is_newer(candidate: &str, current: &str) -> bool {
    compare_versions(candidate, current) == Some(Ordering::Greater)
}

/// Decides whether a derived object must be recomputed.
#[derive(Debug, Clone, Default)]
pub struct RecomputePolicy {
    reference_keys: Vec<String>,
}

impl RecomputePolicy {
    /// Policy treating the named keys as reference fields.
    pub fn new<I, S>(reference_keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            reference_keys: reference_keys.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether `key` names a reference field.
    ///
    /// Nested keys (`inputs.main`, `inputs.%`) count as the field they sit
    /// under.
    pub fn is_reference_key(&self, key: &str) -> bool {
        let root = key.split('.').next().unwrap_or(key);
        self.reference_keys.iter().any(|k| k == key || k == root)
    }

    /// Whether the derived object has to be rebuilt.
    ///
    /// Any changed non-reference key forces a rebuild. Otherwise a rebuild
    /// is needed only when an input version is strictly newer than
    /// `current_version`. Inputs without a version, and versions that cannot
    /// be compared, never force a rebuild.
    pub fn recompute_required<K: AsRef<str>>(
        &self,
        changed_keys: &[K],
        current_version: Option<&str>,
        input_versions: &[Option<&str>],
    ) -> bool {
        if let Some(key) = changed_keys
            .iter()
            .map(AsRef::as_ref)
            .find(|k| !self.is_reference_key(k))
        {
            log::debug!("Recompute required: non-reference key {key} changed");
            return true;
        }
        !stale_inputs(current_version, input_versions).is_empty()
    }
}

/// Indexes of inputs whose version is newer than `current_version`.
pub fn stale_inputs(
    current_version: Option<&str>,
    input_versions: &[Option<&str>],
) -> Vec<usize> {
    let Some(current) = current_version else {
        return Vec::new();
    };
    input_versions
        .iter()
        .enumerate()
        .filter_map(|(i, v)| match v {
            Some(v) if is_newer(v, current) => {
                log::debug!("Input {i} at version {v} is newer than {current}");
                Some(i)
            }
            _ => None,
        })
        .collect()
}
