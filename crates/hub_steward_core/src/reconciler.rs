//! The generic convergence engine.
//!
//! [`Reconciler`] drives one record per invocation through lookup, binding, diffing, update
//! and deletion. Everything specific to a GitHub entity kind lives behind the
//! [`ResourceDriver`] trait.

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, instrument};

use crate::differ::describe_fields;
use crate::lifecycle::{
    deletion_action, lifecycle_state, requires_initial_update, DeletionAction, LifecycleState,
};
use crate::{
    DeletionGuard, DesiredStateRecord, Diff, RecordKey, RecordStore, ReconcileError,
    ResourceKind, StatusWriter, StoreError,
};

#[cfg(test)]
#[path = "reconciler_tests.rs"]
mod tests;

/// Kind-specific remote operations and comparisons.
///
/// Drivers return [`ReconcileError::Remote`] wrapping `github_client::Error::NotFound` when
/// the remote entity does not exist; the engine relies on that to choose between binding,
/// creating and skipping.
#[async_trait]
pub trait ResourceDriver: Send + Sync + 'static {
    /// The declared configuration
    type Spec: Clone + Debug + Send + Sync + 'static;
    /// The remote snapshot mirrored into the status
    type Observed: Clone + Debug + Send + Sync + 'static;
    /// The partial update sent to the remote system
    type ChangeSet: Default + Debug + Send + Sync;

    const KIND: ResourceKind;

    /// Rejects declarations that can never converge.
    fn validate(&self, _spec: &Self::Spec) -> Result<(), ReconcileError> {
        Ok(())
    }

    /// Human-readable remote identity for logs.
    fn remote_id(&self, observed: &Self::Observed) -> String;

    /// Re-reads the counterpart bound in a previous pass by its stable remote ID.
    async fn fetch_bound(
        &self,
        spec: &Self::Spec,
        bound: &Self::Observed,
    ) -> Result<Self::Observed, ReconcileError>;

    /// Looks the counterpart up by the secondary key declared in `spec`.
    async fn fetch_by_key(&self, spec: &Self::Spec) -> Result<Self::Observed, ReconcileError>;

    async fn create(&self, spec: &Self::Spec) -> Result<Self::Observed, ReconcileError>;

    /// Checks that `observed` really is the entity `spec` declares, e.g. that its owner has
    /// not changed. Returns the reason when it is not.
    fn check_binding(&self, spec: &Self::Spec, observed: &Self::Observed) -> Result<(), String>;

    /// Computes the change set converging `observed` toward `spec`.
    async fn diff(
        &self,
        spec: &Self::Spec,
        observed: &Self::Observed,
    ) -> Result<Diff<Self::ChangeSet>, ReconcileError>;

    async fn update(
        &self,
        spec: &Self::Spec,
        observed: &Self::Observed,
        change_set: &Self::ChangeSet,
    ) -> Result<Self::Observed, ReconcileError>;

    async fn delete(&self, spec: &Self::Spec, observed: &Self::Observed)
        -> Result<(), ReconcileError>;
}

/// What a completed pass did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The record is converged; `status_written` is `false` if the status write was swallowed.
    Converged {
        created: bool,
        updated_fields: Vec<&'static str>,
        initial_update: bool,
        status_written: bool,
    },
    /// The record was removed from storage.
    Deleted { remote_deleted: bool },
    /// The record no longer exists; nothing to do.
    RecordMissing,
}

/// Converges records of one kind.
pub struct Reconciler<D: ResourceDriver> {
    driver: D,
    store: Arc<dyn RecordStore<D::Spec, D::Observed>>,
    status: StatusWriter<D::Spec, D::Observed>,
}

impl<D: ResourceDriver> Reconciler<D> {
    pub fn new(driver: D, store: Arc<dyn RecordStore<D::Spec, D::Observed>>) -> Self {
        let status = StatusWriter::new(D::KIND, store.clone());
        Self {
            driver,
            store,
            status,
        }
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn store(&self) -> &Arc<dyn RecordStore<D::Spec, D::Observed>> {
        &self.store
    }

    /// Runs one pass over the record stored under `key`.
    ///
    /// The pass is idempotent: with no external change, a second pass sends nothing. Remote
    /// failures abort the pass before the status is touched.
    ///
    /// # Errors
    ///
    /// Any [`ReconcileError`] other than a swallowed status write. "Not found" answers from
    /// the remote system are handled inside the pass and never surface.
    #[instrument(skip(self, key), fields(kind = %D::KIND, key = %key))]
    pub async fn reconcile(&self, key: &RecordKey) -> Result<ReconcileOutcome, ReconcileError> {
        let record = match self.store.get(key).await {
            Ok(record) => record,
            Err(StoreError::NotFound(_)) => {
                debug!("Record no longer exists");
                return Ok(ReconcileOutcome::RecordMissing);
            }
            Err(e) => return Err(e.into()),
        };

        let state = lifecycle_state(&record);
        debug!(state = %state, "Starting pass");

        match state {
            LifecycleState::Deleting => self.finalize(&record).await,
            _ => self.converge(&record).await,
        }
    }

    async fn converge(
        &self,
        record: &DesiredStateRecord<D::Spec, D::Observed>,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let key = &record.key;
        let spec = &record.spec;
        self.driver.validate(spec)?;

        let (observed, created) = self.resolve_observed(record).await?;

        self.driver
            .check_binding(spec, &observed)
            .map_err(|reason| ReconcileError::InvariantViolation {
                kind: D::KIND,
                key: key.clone(),
                reason,
            })?;

        if !record.guard.is_present() {
            self.store.set_guard(key, DeletionGuard::Present).await?;
            info!(
                remote_id = self.driver.remote_id(&observed).as_str(),
                "Bound to remote counterpart"
            );
        }

        let diff = self.driver.diff(spec, &observed).await?;
        let initial_update = !diff.needs_update() && requires_initial_update(&record.status, created);

        let observed = if diff.needs_update() || initial_update {
            info!(
                remote_id = self.driver.remote_id(&observed).as_str(),
                fields = describe_fields(&diff).as_str(),
                initial_update,
                "Updating remote counterpart"
            );
            self.driver.update(spec, &observed, &diff.change_set).await?
        } else {
            debug!("Remote counterpart already converged");
            observed
        };

        let status_written = self.status.write(key, observed).await;
        Ok(ReconcileOutcome::Converged {
            created,
            updated_fields: diff.changed_fields,
            initial_update,
            status_written,
        })
    }

    /// Finds the remote counterpart: by the bound ID first, then by secondary key, and
    /// finally by creating it. Returns the snapshot and whether it was created.
    async fn resolve_observed(
        &self,
        record: &DesiredStateRecord<D::Spec, D::Observed>,
    ) -> Result<(D::Observed, bool), ReconcileError> {
        let spec = &record.spec;

        if let Some(bound) = record.status.snapshot() {
            match self.driver.fetch_bound(spec, bound).await {
                Ok(observed) => return Ok((observed, false)),
                Err(e) if e.is_not_found() => {
                    info!(
                        remote_id = self.driver.remote_id(bound).as_str(),
                        "Bound counterpart not found by ID, falling back to lookup by key"
                    );
                }
                Err(e) => return Err(e),
            }
        }

        match self.driver.fetch_by_key(spec).await {
            Ok(observed) => Ok((observed, false)),
            Err(e) if e.is_not_found() => {
                let observed = self.driver.create(spec).await?;
                info!(
                    remote_id = self.driver.remote_id(&observed).as_str(),
                    "Created remote counterpart"
                );
                Ok((observed, true))
            }
            Err(e) => Err(e),
        }
    }

    async fn finalize(
        &self,
        record: &DesiredStateRecord<D::Spec, D::Observed>,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let key = &record.key;

        let remote_deleted = match deletion_action(record) {
            DeletionAction::Skip(reason) => {
                info!(reason = %reason, "Leaving remote counterpart untouched");
                false
            }
            DeletionAction::DeleteRemote(bound) => {
                self.delete_bound(&record.spec, bound).await?;
                true
            }
        };

        if record.guard.is_present() {
            self.store.set_guard(key, DeletionGuard::Absent).await?;
        }
        self.store.remove(key).await?;
        info!(state = %LifecycleState::Terminal, "Removed record");

        Ok(ReconcileOutcome::Deleted { remote_deleted })
    }

    /// Deletes the counterpart bound to the record.
    ///
    /// The counterpart is re-read by its stable ID first so that an out-of-band rename does
    /// not turn the delete into a lookup miss. "Not found" at either step means it is gone.
    async fn delete_bound(&self, spec: &D::Spec, bound: &D::Observed) -> Result<(), ReconcileError> {
        let current = match self.driver.fetch_bound(spec, bound).await {
            Ok(current) => current,
            Err(e) if e.is_not_found() => {
                info!(
                    remote_id = self.driver.remote_id(bound).as_str(),
                    "Remote counterpart already gone"
                );
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        let remote_id = self.driver.remote_id(&current);
        match self.driver.delete(spec, &current).await {
            Ok(()) => info!(remote_id = remote_id.as_str(), "Deleted remote counterpart"),
            Err(e) if e.is_not_found() => {
                info!(remote_id = remote_id.as_str(), "Remote counterpart already gone")
            }
            Err(e) => return Err(e),
        }
        Ok(())
    }
}
