//! One-shot reconciliation of every declared record.

use clap::Args;
use hub_steward_core::{Controller, ReconcileOutcome, ReconcileSummary, ResourceDriver, ResourceKind};
use tracing::{error, info, instrument};

use super::{selected_kinds, KindFilter};
use crate::{auth, config::AppConfig, errors::Error, workspace::Workspace};

#[cfg(test)]
#[path = "reconcile_cmd_tests.rs"]
mod tests;

#[derive(Args, Debug)]
pub struct ReconcileArgs {
    /// Only reconcile these kinds; may be repeated
    #[arg(long = "kind", value_enum)]
    pub kinds: Vec<KindFilter>,
}

/// The outcome of reconciling every record of one kind.
#[derive(Debug)]
pub struct KindSummary {
    pub kind: ResourceKind,
    pub summary: ReconcileSummary,
}

/// Authenticates, reconciles the selected kinds and prints a summary.
///
/// # Errors
///
/// [`Error::ReconcileFailed`] when any record failed, or the error that stopped the run.
pub async fn execute(args: &ReconcileArgs, config: &AppConfig) -> Result<(), Error> {
    let client = auth::connect(&config.github).await?;
    let workspace = Workspace::new(
        &config.reconciler.records_dir,
        config.reconciler.controller_settings(),
        crate::workspace::Clients::from_shared(client),
    );

    let summaries = reconcile(&workspace, &selected_kinds(&args.kinds)).await?;
    print_summaries(&summaries);

    let failed: usize = summaries.iter().map(|s| s.summary.failed.len()).sum();
    if failed > 0 {
        return Err(Error::ReconcileFailed(failed));
    }
    Ok(())
}

/// Reconciles every record of each kind in turn. Records of one kind converge concurrently.
pub async fn reconcile(
    workspace: &Workspace,
    kinds: &[ResourceKind],
) -> Result<Vec<KindSummary>, Error> {
    let mut summaries = Vec::with_capacity(kinds.len());
    for kind in kinds {
        let summary = match kind {
            ResourceKind::Organization => reconcile_kind(workspace.organizations()).await?,
            ResourceKind::Repository => reconcile_kind(workspace.repositories()).await?,
            ResourceKind::Team => reconcile_kind(workspace.teams()).await?,
            ResourceKind::BranchProtectionRule => {
                reconcile_kind(workspace.branch_protection_rules()).await?
            }
        };
        summaries.push(KindSummary {
            kind: *kind,
            summary,
        });
    }
    Ok(summaries)
}

#[instrument(skip(controller), fields(kind = %D::KIND))]
async fn reconcile_kind<D: ResourceDriver>(
    controller: Controller<D>,
) -> Result<ReconcileSummary, Error> {
    let keys = controller.reconciler().store().keys().await?;
    info!(records = keys.len(), "Reconciling records");

    let summary = controller.reconcile_all(keys).await;
    for (key, e) in &summary.failed {
        error!(key = %key, error = %e, "Record failed to reconcile");
    }
    info!(
        succeeded = summary.succeeded.len(),
        failed = summary.failed.len(),
        "Reconciled records"
    );
    Ok(summary)
}

fn print_summaries(summaries: &[KindSummary]) {
    for KindSummary { kind, summary } in summaries {
        for (key, outcome) in &summary.succeeded {
            println!("{} {}: {}", kind, key, describe_outcome(outcome));
        }
        for (key, e) in &summary.failed {
            println!("{} {}: failed: {}", kind, key, e);
        }
    }
}

fn describe_outcome(outcome: &ReconcileOutcome) -> String {
    match outcome {
        ReconcileOutcome::Converged {
            created,
            updated_fields,
            ..
        } => match (created, updated_fields.is_empty()) {
            (true, true) => "created".to_string(),
            (true, false) => format!("created, updated {}", updated_fields.join(", ")),
            (false, true) => "in sync".to_string(),
            (false, false) => format!("updated {}", updated_fields.join(", ")),
        },
        ReconcileOutcome::Deleted {
            remote_deleted: true,
        } => "deleted".to_string(),
        ReconcileOutcome::Deleted {
            remote_deleted: false,
        } => "forgotten, remote left in place".to_string(),
        ReconcileOutcome::RecordMissing => "no longer declared".to_string(),
    }
}
