//! Convergence engine - plans, applies and retries relationship deltas

use crate::backend::RelationshipBackend;
use crate::context::{CancelToken, ConfirmCallback, ProgressCallback};
use crate::diff::reconcile;
use crate::error::{Error, Result};
use crate::planner::{ConvergencePlan, ScopePlan};
use crate::retry::{LogCallback, with_retry};
use crate::types::{Applied, ConvergeOptions, ConvergeSummary, Delta, Grant, ScopeOutcome};
use oid::Oid;
use rayon::prelude::*;
use std::collections::BTreeSet;

/// Result of a successful convergence
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Convergence {
    /// Delta computed from the first read of observed state
    pub initial: Delta,
    /// Everything applied, across all attempts
    pub applied: Applied,
    /// Number of attempts made (1 when nothing failed)
    pub attempts: u32,
}

/// Read observed state under `scope` and compute the delta towards `desired`
pub fn plan(
    backend: &dyn RelationshipBackend,
    scope: &Oid,
    desired: &BTreeSet<Grant>,
    cancel: &CancelToken,
) -> Result<Delta> {
    let observed: BTreeSet<Grant> = backend
        .list(scope, cancel)
        .map_err(|source| Error::BackendUnavailable { source })?
        .into_iter()
        .collect();
    let delta = reconcile(desired, &observed);
    log::debug!(
        "{scope}: {} observed, {} to create, {} to delete",
        observed.len(),
        delta.to_create.len(),
        delta.to_delete.len()
    );
    Ok(delta)
}

/// Issue `delta` as one mutation batch, creates first.
///
/// Nothing is rolled back on failure. If the backend applied part of the
/// batch, the error is [`Error::PartialApplication`] and carries both what
/// went through and what is still pending.
pub fn apply(
    backend: &dyn RelationshipBackend,
    scope: &Oid,
    delta: &Delta,
    cancel: &CancelToken,
) -> Result<Applied> {
    if delta.is_empty() {
        return Ok(Applied::default());
    }

    let creates: Vec<Grant> = delta.to_create.iter().cloned().collect();
    let deletes: Vec<Grant> = delta.to_delete.iter().cloned().collect();
    let outcome = backend.mutate_batch(scope, &creates, &deletes, cancel);

    match outcome.error {
        None => {
            log::info!("{scope}: {}", outcome.applied);
            Ok(outcome.applied)
        }
        Some(source) if outcome.applied.is_empty() => Err(Error::BackendUnavailable { source }),
        Some(source) => {
            let pending = delta.remaining_after(&outcome.applied);
            log::warn!(
                "{scope}: batch stopped after {} ({} pending): {source}",
                outcome.applied,
                pending.len()
            );
            Err(Error::PartialApplication {
                applied: outcome.applied,
                pending,
                source,
            })
        }
    }
}

/// Bring `scope` to `desired`: list, reconcile, apply.
///
/// Retryable failures are retried per `opts.retry`. Every attempt re-reads
/// observed state, so a retry after partial application only issues what
/// is still missing. In dry-run mode the delta is computed and nothing is
/// mutated.
///
/// A failure after earlier attempts applied something is reported as
/// [`Error::PartialApplication`] with the total applied so far.
pub fn converge(
    backend: &dyn RelationshipBackend,
    scope: &Oid,
    desired: &BTreeSet<Grant>,
    opts: &ConvergeOptions,
    cancel: &CancelToken,
) -> Result<Convergence> {
    let mut initial: Option<Delta> = None;
    let mut applied = Applied::default();
    let mut pending = Delta::default();
    let mut attempts = 0;

    let result = with_retry(&opts.retry, Some(&LogCallback), cancel, || {
        attempts += 1;
        let delta = plan(backend, scope, desired, cancel)?;
        if initial.is_none() {
            initial = Some(delta.clone());
        }
        if opts.dry_run || delta.is_empty() {
            return Ok(());
        }

        match apply(backend, scope, &delta, cancel) {
            Ok(batch) => {
                applied.merge(batch);
                Ok(())
            }
            Err(e) => {
                pending = match &e {
                    Error::PartialApplication { pending, .. } => pending.clone(),
                    _ => delta,
                };
                if let Some(batch) = e.applied() {
                    applied.merge(batch.clone());
                }
                Err(e)
            }
        }
    });

    match result {
        Ok(()) => Ok(Convergence {
            initial: initial.unwrap_or_default(),
            applied,
            attempts,
        }),
        Err(e) => {
            log::debug!("{scope}: giving up after {attempts} attempt(s)");
            Err(with_total_applied(e, applied, pending))
        }
    }
}

fn with_total_applied(err: Error, applied: Applied, last_pending: Delta) -> Error {
    match err {
        Error::PartialApplication {
            pending, source, ..
        } => Error::PartialApplication {
            applied,
            pending,
            source,
        },
        Error::BackendUnavailable { source } if !applied.is_empty() => Error::PartialApplication {
            applied,
            pending: last_pending,
            source,
        },
        other => other,
    }
}

/// Converge every scope in `plan`
///
/// Every scope is planned first and reported to `progress`. Unless this is
/// a dry run, `confirm` is asked once for the whole run; the confirmed
/// scopes are then converged on a pool of `opts.jobs` threads. A failure in
/// one scope never stops the others.
///
/// # Returns
/// Summary of per-scope outcomes, in plan order
pub fn converge_all<P, C>(
    backend: &dyn RelationshipBackend,
    plan: &ConvergencePlan,
    opts: &ConvergeOptions,
    cancel: &CancelToken,
    progress: &mut P,
    confirm: &mut C,
) -> anyhow::Result<ConvergeSummary>
where
    P: ProgressCallback,
    C: ConfirmCallback,
{
    let mut outcomes: Vec<Option<ScopeOutcome>> = vec![None; plan.len()];
    let mut pending: Vec<usize> = Vec::new();
    let mut total_changes = 0;

    for (index, scope_plan) in plan.scopes.iter().enumerate() {
        let planned = with_retry(&opts.retry, Some(&LogCallback), cancel, || {
            self::plan(backend, &scope_plan.scope, &scope_plan.desired, cancel)
        });
        match planned {
            Ok(delta) => {
                progress.on_scope_planned(&scope_plan.scope, &delta);
                if delta.is_empty() {
                    outcomes[index] = Some(ScopeOutcome::NoChange);
                } else if opts.dry_run {
                    outcomes[index] = Some(ScopeOutcome::Planned(delta));
                } else {
                    total_changes += delta.len();
                    pending.push(index);
                }
            }
            Err(e) => outcomes[index] = Some(failed(&e)),
        }
    }

    if !pending.is_empty() && !confirm.confirm(&format!("Apply {total_changes} changes?"))? {
        for index in pending.drain(..) {
            outcomes[index] = Some(ScopeOutcome::Skipped {
                reason: "declined".to_string(),
            });
        }
    }

    let scopes: Vec<(usize, &ScopePlan)> = pending.iter().map(|&i| (i, &plan.scopes[i])).collect();
    for (index, outcome) in converge_batch(backend, &scopes, opts, cancel)? {
        outcomes[index] = Some(outcome);
    }

    let mut summary = ConvergeSummary::default();
    for (scope_plan, outcome) in plan.scopes.iter().zip(outcomes) {
        let outcome = outcome.unwrap_or(ScopeOutcome::NoChange);
        progress.on_scope_complete(&scope_plan.scope, &outcome);
        summary.add(scope_plan.scope.clone(), outcome);
    }
    Ok(summary)
}

/// Converge a batch of scopes
fn converge_batch(
    backend: &dyn RelationshipBackend,
    scopes: &[(usize, &ScopePlan)],
    opts: &ConvergeOptions,
    cancel: &CancelToken,
) -> anyhow::Result<Vec<(usize, ScopeOutcome)>> {
    let run = |&(index, scope_plan): &(usize, &ScopePlan)| {
        let outcome = converge_scope(backend, scope_plan, opts, cancel);
        (index, outcome)
    };

    if opts.jobs <= 1 || scopes.len() <= 1 {
        return Ok(scopes.iter().map(run).collect());
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(opts.jobs)
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to create thread pool: {}", e))?;

    Ok(pool.install(|| scopes.par_iter().map(run).collect()))
}

/// Converge a single scope
fn converge_scope(
    backend: &dyn RelationshipBackend,
    scope_plan: &ScopePlan,
    opts: &ConvergeOptions,
    cancel: &CancelToken,
) -> ScopeOutcome {
    match converge(backend, &scope_plan.scope, &scope_plan.desired, opts, cancel) {
        Ok(c) if c.applied.is_empty() => ScopeOutcome::NoChange,
        Ok(c) => ScopeOutcome::Applied {
            applied: c.applied,
            attempts: c.attempts,
        },
        Err(e) => failed(&e),
    }
}

fn failed(error: &Error) -> ScopeOutcome {
    ScopeOutcome::Failed {
        error: error.to_string(),
        applied: error.applied().cloned().unwrap_or_default(),
        resumable: error.is_retryable(),
    }
}
