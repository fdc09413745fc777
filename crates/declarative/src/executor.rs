//! Execution engine - applies diffs stage by stage with parallelism and retries

use crate::context::{
    ApplyContext, AutoConfirm, ConfirmCallback, NoProgress, ProgressCallback, Provider,
};
use crate::diff::{ChangeAction, ResourceDiff, compute_diffs};
use crate::error::ProviderError;
use crate::planner::ExecutionPlan;
use crate::resource::{Resource, ResourceExt};
use crate::retry::{LogCallback, with_retry};
use crate::types::{ApplyResult, ExecuteOptions, ExecuteSummary, RecordedResource, Snapshot};
use anyhow::Result;
use rayon::prelude::*;
use std::collections::HashMap;

/// Execute a plan against recorded state
///
/// Teardown runs first: orphaned resources and the old instances of replaced
/// resources are deleted deepest stage first. Then every stage is applied in
/// order, in parallel on a pool of `opts.jobs` threads. The snapshot is
/// updated as resources are realized; after a stage with failures the
/// remaining changes are skipped.
///
/// # Type Parameters
/// * `V` - Provider type
/// * `P` - Progress callback type
/// * `C` - Confirm callback type
pub fn execute<V, P, C>(
    plan: &ExecutionPlan,
    snapshot: &mut Snapshot,
    opts: &ExecuteOptions,
    provider: &V,
    progress: &mut P,
    confirm: &mut C,
) -> Result<ExecuteSummary>
where
    V: Provider,
    P: ProgressCallback,
    C: ConfirmCallback,
{
    let diffs = compute_diffs(plan, snapshot);
    let unchanged = plan.total_resources() - diffs.iter().filter(|d| !d.is_removal()).count();

    if diffs.is_empty() {
        return Ok(ExecuteSummary {
            no_change: unchanged,
            ..Default::default()
        });
    }

    if !confirm.confirm("Apply changes?")? {
        return Ok(ExecuteSummary {
            skipped: diffs.len(),
            no_change: unchanged,
            ..Default::default()
        });
    }

    let mut summary = ExecuteSummary {
        no_change: unchanged,
        ..Default::default()
    };

    let changes: Vec<&ResourceDiff> = diffs.iter().filter(|d| !d.is_removal()).collect();
    let actions: HashMap<&str, ChangeAction> = changes
        .iter()
        .map(|d| (d.resource_id.as_str(), d.action))
        .collect();

    let mut teardown: Vec<&ResourceDiff> = diffs
        .iter()
        .filter(|d| d.is_removal() || d.is_replacement())
        .collect();
    teardown.sort_by(|a, b| {
        b.stage
            .cmp(&a.stage)
            .then_with(|| a.resource_id.cmp(&b.resource_id))
    });

    if !teardown.is_empty() {
        let removals = teardown.iter().filter(|d| d.is_removal()).count();
        progress.on_stage_start(0, removals);
        let mut failed: Option<&str> = None;
        for diff in &teardown {
            let address = diff.resource_id.as_str();
            if failed.is_some() {
                if diff.is_removal() {
                    summary.add_result(address, &skipped());
                }
                continue;
            }

            if diff.is_removal() {
                progress.on_resource_start(address, &diff.description);
            }
            let result = delete_recorded(address, snapshot, opts, provider);
            if !result.is_success() {
                failed = Some(address);
            }
            // Replacements are counted once recreated
            if diff.is_removal() || !result.is_success() {
                progress.on_resource_complete(address, &result);
                summary.add_result(address, &result);
            } else {
                log::debug!("{address}: removed old instance before replacing");
            }
        }
        progress.on_stage_complete();

        if let Some(failed) = failed {
            for diff in &changes {
                if diff.resource_id != failed {
                    summary.add_result(&diff.resource_id, &skipped());
                }
            }
            return Ok(summary);
        }
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(opts.jobs.max(1))
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to create thread pool: {}", e))?;

    let mut aborted = false;
    for (stage, resources) in plan.stages.iter().enumerate() {
        let pending: Vec<(&dyn Resource, ChangeAction)> = resources
            .iter()
            .filter_map(|r| actions.get(r.id().as_str()).map(|a| (&**r, *a)))
            .collect();

        if pending.is_empty() {
            continue;
        }

        if aborted {
            for (resource, _) in &pending {
                summary.add_result(&resource.id(), &skipped());
            }
            continue;
        }

        progress.on_stage_start(stage, pending.len());
        let outcomes = run_stage(&pending, stage, snapshot, opts, provider, &pool, progress);

        for (address, result, record) in outcomes {
            if let Some(record) = record {
                snapshot.insert(address.clone(), record);
            }
            aborted |= !result.is_success();
            summary.add_result(&address, &result);
        }
        progress.on_stage_complete();
    }

    Ok(summary)
}

type Outcome = (String, ApplyResult, Option<RecordedResource>);

/// Apply one stage, sequentially or on the pool
fn run_stage<V: Provider, P: ProgressCallback>(
    pending: &[(&dyn Resource, ChangeAction)],
    stage: usize,
    snapshot: &Snapshot,
    opts: &ExecuteOptions,
    provider: &V,
    pool: &rayon::ThreadPool,
    progress: &mut P,
) -> Vec<Outcome> {
    let sequential = opts.jobs <= 1 || pending.len() == 1;

    if sequential {
        return pending
            .iter()
            .map(|(resource, action)| {
                progress.on_resource_start(&resource.id(), &resource.description());
                let outcome = apply_resource(*resource, *action, stage, snapshot, opts, provider);
                progress.on_resource_complete(&outcome.0, &outcome.1);
                outcome
            })
            .collect();
    }

    // The progress callback is not thread-safe; report once the stage is done
    let outcomes: Vec<Outcome> = pool.install(|| {
        pending
            .par_iter()
            .map(|(resource, action)| apply_resource(*resource, *action, stage, snapshot, opts, provider))
            .collect()
    });

    for (address, result, _) in &outcomes {
        progress.on_resource_complete(address, result);
    }
    outcomes
}

/// Apply a single resource and build its new record
fn apply_resource<V: Provider>(
    resource: &dyn Resource,
    action: ChangeAction,
    stage: usize,
    snapshot: &Snapshot,
    opts: &ExecuteOptions,
    provider: &V,
) -> Outcome {
    let address = resource.id();
    let ctx = ApplyContext::new(snapshot);
    let callback = LogCallback { address: &address };

    let outcome = ctx
        .resolve(&resource.attributes())
        .map_err(ProviderError::from)
        .and_then(|resolved| match (action, snapshot.get(&address)) {
            (ChangeAction::Update, Some(current)) => with_retry(&opts.retry, &callback, || {
                provider.update(resource, &resolved, current, &ctx)
            })
            .map(|computed| (ApplyResult::Modified, computed)),
            // The old instance went in the teardown pass
            (ChangeAction::Replace, _) => {
                with_retry(&opts.retry, &callback, || provider.create(resource, &resolved, &ctx))
                    .map(|computed| (ApplyResult::Replaced, computed))
            }
            _ => with_retry(&opts.retry, &callback, || provider.create(resource, &resolved, &ctx))
                .map(|computed| (ApplyResult::Created, computed)),
        });

    match outcome {
        Ok((result, computed)) => {
            log::debug!("{}: {:?}", address, result);
            let record = RecordedResource {
                resource_type: resource.resource_type().to_string(),
                stage,
                attributes: resource.sealed_attributes(&snapshot.seal_key),
                computed,
            };
            (address, result, Some(record))
        }
        Err(e) => {
            log::error!("{}: {}", address, e);
            (
                address,
                ApplyResult::Failed {
                    error: e.to_string(),
                },
                None,
            )
        }
    }
}

/// Delete a recorded resource and forget it
fn delete_recorded<V: Provider>(
    address: &str,
    snapshot: &mut Snapshot,
    opts: &ExecuteOptions,
    provider: &V,
) -> ApplyResult {
    let Some(current) = snapshot.get(address).cloned() else {
        return ApplyResult::NoChange;
    };

    let callback = LogCallback { address };
    match with_retry(&opts.retry, &callback, || provider.delete(address, &current)) {
        Ok(()) => {
            snapshot.remove(address);
            ApplyResult::Removed
        }
        Err(e) => ApplyResult::Failed {
            error: e.to_string(),
        },
    }
}

fn skipped() -> ApplyResult {
    ApplyResult::Skipped {
        reason: "earlier failure".into(),
    }
}

/// Simple execution without callbacks
///
/// For basic use cases where you don't need progress or confirmation.
pub fn execute_simple<V: Provider>(
    plan: &ExecutionPlan,
    snapshot: &mut Snapshot,
    opts: &ExecuteOptions,
    provider: &V,
) -> Result<ExecuteSummary> {
    execute(plan, snapshot, opts, provider, &mut NoProgress, &mut AutoConfirm)
}
