//! Continuous reconciliation.
//!
//! Every selected kind gets its own [`Controller`]. A resync loop lists the declared records
//! on a fixed interval and feeds their keys to the controller, which retries transient
//! failures in between. Interrupting the process stops the resync loops and lets passes
//! already in flight finish.

use std::{future::Future, time::Duration};

use clap::Args;
use hub_steward_core::{Controller, ResourceDriver, ResourceKind};
use tokio::{
    sync::{mpsc, watch as signal},
    task::JoinSet,
};
use tracing::{debug, error, info};

use super::{selected_kinds, KindFilter};
use crate::{
    auth,
    config::AppConfig,
    errors::Error,
    workspace::{Clients, Workspace},
};

#[cfg(test)]
#[path = "watch_cmd_tests.rs"]
mod tests;

#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Only watch these kinds; may be repeated
    #[arg(long = "kind", value_enum)]
    pub kinds: Vec<KindFilter>,

    /// Seconds between full resyncs; overrides the configuration
    #[arg(long)]
    pub interval: Option<u64>,
}

/// Authenticates and reconciles until Ctrl-C is received.
pub async fn execute(args: &WatchArgs, config: &AppConfig) -> Result<(), Error> {
    let interval = match args.interval {
        Some(0) => {
            return Err(Error::InvalidArguments(
                "--interval must be greater than zero".to_string(),
            ))
        }
        Some(secs) => Duration::from_secs(secs),
        None => config.reconciler.resync_interval(),
    };

    let client = auth::connect(&config.github).await?;
    let workspace = Workspace::new(
        &config.reconciler.records_dir,
        config.reconciler.controller_settings(),
        Clients::from_shared(client),
    );

    watch(&workspace, &selected_kinds(&args.kinds), interval, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl-C");
        }
    })
    .await;
    Ok(())
}

/// Reconciles the records of `kinds` every `interval` until `shutdown` completes.
pub async fn watch<F>(workspace: &Workspace, kinds: &[ResourceKind], interval: Duration, shutdown: F)
where
    F: Future<Output = ()>,
{
    let (stop, stopped) = signal::channel(false);
    let mut watchers = JoinSet::new();
    for kind in kinds {
        let stopped = stopped.clone();
        match kind {
            ResourceKind::Organization => {
                watchers.spawn(watch_kind(workspace.organizations(), interval, stopped))
            }
            ResourceKind::Repository => {
                watchers.spawn(watch_kind(workspace.repositories(), interval, stopped))
            }
            ResourceKind::Team => watchers.spawn(watch_kind(workspace.teams(), interval, stopped)),
            ResourceKind::BranchProtectionRule => watchers.spawn(watch_kind(
                workspace.branch_protection_rules(),
                interval,
                stopped,
            )),
        };
    }
    info!(kinds = kinds.len(), interval_secs = interval.as_secs(), "Watching records");

    shutdown.await;
    info!("Shutting down, waiting for running passes");
    let _ = stop.send(true);
    while let Some(joined) = watchers.join_next().await {
        if let Err(e) = joined {
            error!(error = %e, "Watcher task panicked");
        }
    }
    info!("Stopped watching records");
}

async fn watch_kind<D: ResourceDriver>(
    controller: Controller<D>,
    interval: Duration,
    mut stopped: signal::Receiver<bool>,
) {
    let store = controller.reconciler().store().clone();
    let (triggers, receiver) = mpsc::unbounded_channel();

    let resync = async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => match store.keys().await {
                    Ok(keys) => {
                        debug!(kind = %D::KIND, records = keys.len(), "Resync");
                        for key in keys {
                            if triggers.send(key).is_err() {
                                return;
                            }
                        }
                    }
                    Err(e) => error!(kind = %D::KIND, error = %e, "Failed to list records"),
                },
                _ = stopped.changed() => break,
            }
        }
    };

    tokio::join!(controller.run(receiver), resync);
}
