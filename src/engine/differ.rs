//! Delta display

use colored::Colorize;
use oid::Oid;
use reconcile::{Delta, DeltaSummary, Grant, group_by_subject};

use crate::ui;

/// One line per change, grouped by subject.
///
/// A role change on the same object is shown as a single `~` line even
/// though it is applied as a create followed by a delete.
pub fn delta_lines(delta: &Delta) -> Vec<String> {
    let mut lines = Vec::with_capacity(delta.len());

    for (subject, (creates, deletes)) in group_by_subject(delta) {
        let subject = ui::reference(subject);
        let mut deletes: Vec<&Grant> = deletes;

        for new in creates {
            if let Some(pos) = deletes.iter().position(|old| old.same_target(new)) {
                let old = deletes.remove(pos);
                lines.push(format!(
                    "{} {:<30} {} → {}{}",
                    "~".yellow(),
                    subject,
                    old.role.to_string().dimmed(),
                    new.role,
                    qualifier_suffix(new)
                ));
            } else {
                lines.push(format!(
                    "{} {:<30} {}{}",
                    "+".green(),
                    subject,
                    new.role,
                    qualifier_suffix(new)
                ));
            }
        }

        for old in deletes {
            lines.push(format!(
                "{} {:<30} {}{}",
                "-".red(),
                subject,
                old.role,
                qualifier_suffix(old)
            ));
        }
    }
    lines
}

fn qualifier_suffix(grant: &Grant) -> String {
    grant
        .qualifier
        .as_ref()
        .map(|q| format!(" on {}", ui::reference(q)))
        .unwrap_or_default()
}

/// Display the delta for one scope
pub fn display_scope_delta(scope: &Oid, delta: &Delta) {
    if delta.is_empty() {
        println!("  {} {} {}", "✓".green(), ui::reference(scope), "(in sync)".dimmed());
        return;
    }

    let summary = DeltaSummary::from_delta(delta);
    println!();
    println!(
        "┌─ {} {}",
        ui::reference(scope).bold(),
        format!("({})", describe(&summary)).dimmed()
    );
    for line in delta_lines(delta) {
        println!("│   {line}");
    }
    println!("└─");
}

/// Human summary such as "2 to add, 1 to change"
pub fn describe(summary: &DeltaSummary) -> String {
    let mut parts = Vec::new();
    if summary.additions > 0 {
        parts.push(format!("{} to add", summary.additions));
    }
    if summary.replacements > 0 {
        parts.push(format!("{} to change", summary.replacements));
    }
    if summary.removals > 0 {
        parts.push(format!("{} to remove", summary.removals));
    }
    if parts.is_empty() {
        "no changes".to_string()
    } else {
        parts.join(", ")
    }
}
