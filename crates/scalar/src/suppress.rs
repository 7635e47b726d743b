//! Diff suppressors for value-typed configuration fields.
//!
//! Each function answers "is the change from `old` to `new` only a difference
//! in spelling?" Unparseable input is never equivalent to anything but
//! itself.

use crate::text::parse_duration;

/// Same duration written differently (`"90s"` vs `"1m30s"`).
pub fn durations_equivalent(old: &str, new: &str) -> bool {
    if old == new {
        return true;
    }
    match (parse_duration(old), parse_duration(new)) {
        (Ok(a), Ok(b)) => {
            let same = a == b;
            if same {
                log::debug!("Suppressing duration respelling {old:?} -> {new:?}");
            }
            same
        }
        _ => false,
    }
}

/// Semantically equal JSON documents (whitespace and key order ignored).
pub fn json_equivalent(old: &str, new: &str) -> bool {
    if old == new {
        return true;
    }
    match (
        serde_json::from_str::<serde_json::Value>(old),
        serde_json::from_str::<serde_json::Value>(new),
    ) {
        (Ok(a), Ok(b)) => {
            let same = a == b;
            if same {
                log::debug!("Suppressing JSON reformatting of {} bytes", new.len());
            }
            same
        }
        _ => false,
    }
}

/// Enum values compared without regard to ASCII case.
pub fn enums_equivalent(old: &str, new: &str) -> bool {
    old.eq_ignore_ascii_case(new)
}
