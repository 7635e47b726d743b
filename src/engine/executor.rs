//! Terminal integration for convergence runs

use anyhow::Result;
use colored::Colorize;
use oid::Oid;
use reconcile::{ConfirmCallback, ConvergeSummary, Delta, ProgressCallback, ScopeOutcome};

use super::differ::display_scope_delta;
use crate::ui;

/// Prints each scope's delta as it is planned and its outcome when done
pub struct ConsoleProgress {
    /// Also print scopes that are already in sync
    pub show_unchanged: bool,
}

impl ProgressCallback for ConsoleProgress {
    fn on_scope_planned(&mut self, scope: &Oid, delta: &Delta) {
        if self.show_unchanged || !delta.is_empty() {
            display_scope_delta(scope, delta);
        }
    }

    fn on_scope_complete(&mut self, scope: &Oid, outcome: &ScopeOutcome) {
        match outcome {
            ScopeOutcome::NoChange | ScopeOutcome::Planned(_) => {}
            ScopeOutcome::Applied { applied, attempts } => {
                let retried = if *attempts > 1 {
                    format!(" after {attempts} attempts").dimmed().to_string()
                } else {
                    String::new()
                };
                println!("  {} {} {}{}", "✓".green(), scope, applied, retried);
            }
            ScopeOutcome::Skipped { reason } => {
                println!("  {} {} {}", "⊘".dimmed(), scope, reason.dimmed());
            }
            ScopeOutcome::Failed {
                error,
                applied,
                resumable,
            } => {
                println!("  {} {} {}", "✗".red(), scope, error);
                if !applied.is_empty() {
                    println!("      {}", format!("kept: {applied}").dimmed());
                }
                if *resumable {
                    println!("      {}", "run again to apply the remaining changes".dimmed());
                }
            }
        }
    }
}

/// Asks on the terminal unless `--yes` was given
pub struct TerminalConfirm {
    pub yes: bool,
}

impl ConfirmCallback for TerminalConfirm {
    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        if self.yes {
            return Ok(true);
        }
        println!();
        let confirmed = dialoguer::Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()?;
        if !confirmed {
            ui::error("Aborted");
        }
        Ok(confirmed)
    }
}

/// Print final summary
pub fn print_summary(summary: &ConvergeSummary, dry_run: bool) {
    println!();
    if dry_run {
        if summary.planned > 0 {
            println!(
                "  {} Dry run - {} changes planned, none made",
                "ℹ".blue(),
                summary.planned
            );
        } else {
            println!("  {} Everything is in sync", "✓".green());
        }
        if summary.failed > 0 {
            println!("    • {} {} could not be read", summary.failed, "scopes".red());
        }
        return;
    }

    if summary.is_success() && summary.total_changes() == 0 && summary.skipped == 0 {
        println!("  {} Everything is in sync", "✓".green());
        return;
    }

    if summary.is_success() {
        println!("  {} Grants converged", "✓".green().bold());
    } else {
        println!("  {} Grants converged with errors", "⚠".yellow().bold());
    }

    if summary.created > 0 {
        println!("    • {} records created", summary.created);
    }
    if summary.deleted > 0 {
        println!("    • {} records deleted", summary.deleted);
    }
    if summary.no_change > 0 {
        println!("    • {} scopes already in sync", summary.no_change);
    }
    if summary.skipped > 0 {
        println!("    • {} scopes skipped", summary.skipped);
    }
    if summary.failed > 0 {
        println!("    • {} {} failed", summary.failed, "scopes".red());
    }
}
