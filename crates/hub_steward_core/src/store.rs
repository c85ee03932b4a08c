//! The storage substrate consumed by the reconcile engine.
//!
//! The engine only needs to read a record, persist its deletion guard and status, and remove
//! it once deletion has completed. Delivering triggers is the substrate's business; the
//! [`InMemoryRecordStore`] does so through unbounded channels handed out by
//! [`InMemoryRecordStore::subscribe`].

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};
use tracing::debug;

use crate::{DeletionGuard, DesiredStateRecord, RecordKey, ResourceStatus, StoreError};

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;

/// Persistence for the records of one resource kind.
#[async_trait]
pub trait RecordStore<S, O>: Send + Sync
where
    S: Send + Sync,
    O: Send + Sync,
{
    /// Lists the keys of every stored record, including those pending deletion.
    async fn keys(&self) -> Result<Vec<RecordKey>, StoreError>;

    /// Fetches a record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if no record is stored under `key`.
    async fn get(&self, key: &RecordKey) -> Result<DesiredStateRecord<S, O>, StoreError>;

    async fn set_guard(&self, key: &RecordKey, guard: DeletionGuard) -> Result<(), StoreError>;

    /// Replaces the status of a record. The spec and deletion intent are left alone.
    async fn write_status(&self, key: &RecordKey, status: ResourceStatus<O>)
        -> Result<(), StoreError>;

    /// Removes the record. Removing an absent record succeeds.
    async fn remove(&self, key: &RecordKey) -> Result<(), StoreError>;
}

/// A process-local record store.
///
/// Every call to [`apply`](Self::apply) or [`request_deletion`](Self::request_deletion)
/// sends the affected key to all subscribers. Status and guard writes made by the engine do
/// not, so a pass never re-triggers itself.
pub struct InMemoryRecordStore<S, O> {
    records: Mutex<BTreeMap<RecordKey, DesiredStateRecord<S, O>>>,
    subscribers: Mutex<Vec<mpsc::UnboundedSender<RecordKey>>>,
}

impl<S, O> InMemoryRecordStore<S, O>
where
    S: Clone + Send + Sync,
    O: Clone + Send + Sync,
{
    pub fn new() -> Self {
        Self {
            records: Mutex::new(BTreeMap::new()),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Declares or re-declares the desired state of `key`.
    ///
    /// An existing record keeps its status and guard; only the spec is replaced.
    pub async fn apply(&self, key: RecordKey, spec: S) {
        {
            let mut records = self.records.lock().await;
            match records.get_mut(&key) {
                Some(record) => record.spec = spec,
                None => {
                    records.insert(key.clone(), DesiredStateRecord::new(key.clone(), spec));
                }
            }
        }
        self.notify(key).await;
    }

    /// Marks the record for deletion.
    pub async fn request_deletion(&self, key: &RecordKey) -> Result<(), StoreError> {
        {
            let mut records = self.records.lock().await;
            let record = records
                .get_mut(key)
                .ok_or_else(|| StoreError::NotFound(key.clone()))?;
            record.deletion_requested = true;
        }
        self.notify(key.clone()).await;
        Ok(())
    }

    /// Returns a copy of the record, if present.
    pub async fn snapshot(&self, key: &RecordKey) -> Option<DesiredStateRecord<S, O>> {
        self.records.lock().await.get(key).cloned()
    }

    /// Returns a receiver that yields the key of every record declared or marked for
    /// deletion from now on.
    pub async fn subscribe(&self) -> mpsc::UnboundedReceiver<RecordKey> {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.subscribers.lock().await.push(sender);
        receiver
    }

    async fn notify(&self, key: RecordKey) {
        let mut subscribers = self.subscribers.lock().await;
        subscribers.retain(|subscriber| subscriber.send(key.clone()).is_ok());
        debug!(key = %key, subscribers = subscribers.len(), "Delivered record trigger");
    }
}

impl<S, O> Default for InMemoryRecordStore<S, O>
where
    S: Clone + Send + Sync,
    O: Clone + Send + Sync,
{
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<S, O> RecordStore<S, O> for InMemoryRecordStore<S, O>
where
    S: Clone + Send + Sync,
    O: Clone + Send + Sync,
{
    async fn keys(&self) -> Result<Vec<RecordKey>, StoreError> {
        Ok(self.records.lock().await.keys().cloned().collect())
    }

    async fn get(&self, key: &RecordKey) -> Result<DesiredStateRecord<S, O>, StoreError> {
        self.records
            .lock()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.clone()))
    }

    async fn set_guard(&self, key: &RecordKey, guard: DeletionGuard) -> Result<(), StoreError> {
        let mut records = self.records.lock().await;
        let record = records
            .get_mut(key)
            .ok_or_else(|| StoreError::NotFound(key.clone()))?;
        record.guard = guard;
        Ok(())
    }

    async fn write_status(
        &self,
        key: &RecordKey,
        status: ResourceStatus<O>,
    ) -> Result<(), StoreError> {
        let mut records = self.records.lock().await;
        let record = records
            .get_mut(key)
            .ok_or_else(|| StoreError::NotFound(key.clone()))?;
        record.status = status;
        Ok(())
    }

    async fn remove(&self, key: &RecordKey) -> Result<(), StoreError> {
        self.records.lock().await.remove(key);
        Ok(())
    }
}
