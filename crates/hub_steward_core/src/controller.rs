//! Trigger handling around the reconcile engine.
//!
//! The [`Controller`] turns a stream of record keys into bounded reconcile passes. Passes for
//! different records run concurrently on the tokio runtime; passes for the same record are
//! serialized. A pass that outlives its time limit is dropped, which cancels every remote call
//! still in flight, and the record's status stays as it was.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::{RecordKey, ReconcileError, ReconcileOutcome, Reconciler, ResourceDriver};

#[cfg(test)]
#[path = "controller_tests.rs"]
mod tests;

/// Default upper bound for a single pass.
pub const DEFAULT_PASS_TIMEOUT: Duration = Duration::from_secs(120);

/// Default delay before a failed pass is attempted again.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(30);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ControllerSettings {
    /// Upper bound for one pass, remote calls included
    pub pass_timeout: Duration,
    /// Delay before a failed pass is queued again
    pub retry_delay: Duration,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            pass_timeout: DEFAULT_PASS_TIMEOUT,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

/// The result of reconciling a batch of records.
#[derive(Debug, Default)]
pub struct ReconcileSummary {
    /// Completed passes, ordered by key
    pub succeeded: Vec<(RecordKey, ReconcileOutcome)>,
    /// Failed passes, ordered by key
    pub failed: Vec<(RecordKey, ReconcileError)>,
}

impl ReconcileSummary {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Runs reconcile passes for one resource kind.
pub struct Controller<D: ResourceDriver> {
    reconciler: Arc<Reconciler<D>>,
    settings: ControllerSettings,
}

impl<D: ResourceDriver> Controller<D> {
    pub fn new(reconciler: Reconciler<D>, settings: ControllerSettings) -> Self {
        Self {
            reconciler: Arc::new(reconciler),
            settings,
        }
    }

    pub fn reconciler(&self) -> &Reconciler<D> {
        &self.reconciler
    }

    pub fn settings(&self) -> ControllerSettings {
        self.settings
    }

    /// Runs a single pass bounded by the configured timeout.
    ///
    /// # Errors
    ///
    /// The pass's own error, or [`ReconcileError::Timeout`] when it was abandoned.
    pub async fn reconcile_once(&self, key: &RecordKey) -> Result<ReconcileOutcome, ReconcileError> {
        run_pass(self.reconciler.clone(), key.clone(), self.settings.pass_timeout).await
    }

    /// Runs one bounded pass per distinct key, concurrently, and collects the results.
    pub async fn reconcile_all(&self, keys: impl IntoIterator<Item = RecordKey>) -> ReconcileSummary {
        let mut passes = JoinSet::new();
        for key in keys.into_iter().collect::<BTreeSet<_>>() {
            let reconciler = self.reconciler.clone();
            let limit = self.settings.pass_timeout;
            passes.spawn(async move {
                let result = run_pass(reconciler, key.clone(), limit).await;
                (key, result)
            });
        }

        let mut summary = ReconcileSummary::default();
        while let Some(joined) = passes.join_next().await {
            match joined {
                Ok((key, Ok(outcome))) => summary.succeeded.push((key, outcome)),
                Ok((key, Err(e))) => summary.failed.push((key, e)),
                Err(e) => error!(kind = %D::KIND, error = %e, "Reconcile task panicked"),
            }
        }
        summary.succeeded.sort_by(|a, b| a.0.cmp(&b.0));
        summary.failed.sort_by(|a, b| a.0.cmp(&b.0));
        summary
    }

    /// Reconciles every key received on `triggers` until the channel closes and the passes
    /// already started have finished.
    ///
    /// Failed passes whose error may be transient are queued again after the retry delay.
    /// Retries still waiting once the channel has closed and every pass has finished are
    /// dropped.
    pub async fn run(&self, mut triggers: mpsc::UnboundedReceiver<RecordKey>) {
        let (retry_tx, mut retry_rx) = mpsc::unbounded_channel::<RecordKey>();
        let mut passes: JoinSet<(RecordKey, Result<ReconcileOutcome, ReconcileError>)> =
            JoinSet::new();
        let mut locks = KeyLocks::default();
        let mut accepting = true;

        info!(kind = %D::KIND, "Controller started");
        loop {
            tokio::select! {
                trigger = triggers.recv(), if accepting => match trigger {
                    Some(key) => self.spawn_pass(&mut passes, &mut locks, key),
                    None => {
                        info!(kind = %D::KIND, "Trigger source closed, draining passes");
                        accepting = false;
                    }
                },
                Some(key) = retry_rx.recv() => self.spawn_pass(&mut passes, &mut locks, key),
                Some(joined) = passes.join_next(), if !passes.is_empty() => match joined {
                    Ok((key, result)) => {
                        locks.release(&key);
                        self.report(key, result, &retry_tx);
                    }
                    Err(e) => error!(kind = %D::KIND, error = %e, "Reconcile task panicked"),
                },
            }

            if !accepting && passes.is_empty() {
                break;
            }
        }
        info!(kind = %D::KIND, "Controller stopped");
    }

    fn report(
        &self,
        key: RecordKey,
        result: Result<ReconcileOutcome, ReconcileError>,
        retry_tx: &mpsc::UnboundedSender<RecordKey>,
    ) {
        match result {
            Ok(_) => info!(kind = %D::KIND, key = %key, "Pass completed"),
            Err(e) if e.is_transient() => {
                warn!(kind = %D::KIND, key = %key, error = %e, "Pass failed, will retry");
                schedule_retry(retry_tx.downgrade(), key, self.settings.retry_delay);
            }
            Err(e) => error!(
                kind = %D::KIND,
                key = %key,
                error = %e,
                "Pass failed, waiting for the record to change"
            ),
        }
    }

    fn spawn_pass(
        &self,
        passes: &mut JoinSet<(RecordKey, Result<ReconcileOutcome, ReconcileError>)>,
        locks: &mut KeyLocks,
        key: RecordKey,
    ) {
        let lock = locks.acquire(&key);
        let reconciler = self.reconciler.clone();
        let limit = self.settings.pass_timeout;
        passes.spawn(async move {
            let _serialized = lock.lock().await;
            let result = run_pass(reconciler, key.clone(), limit).await;
            (key, result)
        });
    }
}

/// One mutex per key with a pass queued or running.
#[derive(Default)]
struct KeyLocks {
    locks: HashMap<RecordKey, Arc<Mutex<()>>>,
}

impl KeyLocks {
    fn acquire(&mut self, key: &RecordKey) -> Arc<Mutex<()>> {
        self.locks.entry(key.clone()).or_default().clone()
    }

    /// Drops the entry for `key` once no pass holds it any more.
    fn release(&mut self, key: &RecordKey) {
        if self
            .locks
            .get(key)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            self.locks.remove(key);
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks.len()
    }
}

async fn run_pass<D: ResourceDriver>(
    reconciler: Arc<Reconciler<D>>,
    key: RecordKey,
    limit: Duration,
) -> Result<ReconcileOutcome, ReconcileError> {
    let span = info_span!("pass", pass_id = %Uuid::new_v4());
    async move {
        match tokio::time::timeout(limit, reconciler.reconcile(&key)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(kind = %D::KIND, key = %key, timeout = ?limit, "Pass timed out");
                Err(ReconcileError::Timeout(limit))
            }
        }
    }
    .instrument(span)
    .await
}

fn schedule_retry(sender: mpsc::WeakUnboundedSender<RecordKey>, key: RecordKey, delay: Duration) {
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        if let Some(sender) = sender.upgrade() {
            let _ = sender.send(key);
        }
    });
}
