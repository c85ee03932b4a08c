//! Persists observed state back onto records.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};

use crate::{RecordKey, RecordStore, ResourceKind, ResourceStatus};

#[cfg(test)]
#[path = "status_writer_tests.rs"]
mod tests;

/// Writes the status of records of one kind.
///
/// A failed write is logged and swallowed: the remote change it describes has already been
/// applied, and failing the pass would only re-apply it. The next successful pass repairs the
/// status.
pub struct StatusWriter<S, O> {
    kind: ResourceKind,
    store: Arc<dyn RecordStore<S, O>>,
}

impl<S, O> StatusWriter<S, O>
where
    S: Send + Sync,
    O: Send + Sync,
{
    pub fn new(kind: ResourceKind, store: Arc<dyn RecordStore<S, O>>) -> Self {
        Self { kind, store }
    }

    /// Records `observed` as the state of `key` as of now. Returns whether the write
    /// succeeded.
    pub async fn write(&self, key: &RecordKey, observed: O) -> bool {
        let status = ResourceStatus::observed(observed, Utc::now());
        match self.store.write_status(key, status).await {
            Ok(()) => {
                debug!(kind = %self.kind, key = %key, "Wrote status");
                true
            }
            Err(e) => {
                warn!(
                    kind = %self.kind,
                    key = %key,
                    error = %e,
                    "Failed to write status; the remote change stands and the next pass will retry"
                );
                false
            }
        }
    }
}
