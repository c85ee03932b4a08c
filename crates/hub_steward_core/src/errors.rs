//! Error types for reconcile passes and record stores.

use std::time::Duration;

use github_client::ActorKind;
use thiserror::Error;

use crate::{RecordKey, ResourceKind};

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

/// Errors raised by a [`crate::RecordStore`].
#[derive(Error, Debug)]
pub enum StoreError {
    /// No record is stored under the key.
    #[error("Record '{0}' not found")]
    NotFound(RecordKey),

    /// The backing storage could not be read or written.
    #[error("Record storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// A stored record could not be encoded or decoded.
    #[error("Failed to (de)serialize record '{key}': {message}")]
    Serialization { key: RecordKey, message: String },
}

impl StoreError {
    /// Returns `true` if repeating the operation later may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Io(_))
    }
}

/// Errors that abort a reconcile pass.
///
/// A failed pass leaves the record's status untouched; callers re-invoke the pass later when
/// [`ReconcileError::is_transient`] says that may help.
#[derive(Error, Debug)]
pub enum ReconcileError {
    /// A remote call failed with something other than "not found".
    #[error("GitHub operation failed: {0}")]
    Remote(#[from] github_client::Error),

    /// The record store failed.
    #[error("Record store operation failed: {0}")]
    Store(#[from] StoreError),

    /// The bound remote entity contradicts the declared identity, e.g. its owner changed.
    #[error("{kind} '{key}' violates its binding: {reason}")]
    InvariantViolation {
        kind: ResourceKind,
        key: RecordKey,
        reason: String,
    },

    /// The declared configuration cannot be applied as written.
    #[error("Invalid desired state: {0}")]
    InvalidSpec(String),

    /// A principal named in an actor list could not be resolved to its node ID.
    #[error("Failed to resolve {kind} '{name}': {source}")]
    ActorResolution {
        kind: ActorKind,
        name: String,
        source: github_client::Error,
    },

    /// The pass did not finish within the allotted time and was abandoned.
    #[error("Reconcile pass exceeded its {0:?} time limit")]
    Timeout(Duration),
}

impl ReconcileError {
    /// Returns `true` if the error wraps a remote "not found".
    pub fn is_not_found(&self) -> bool {
        matches!(self, ReconcileError::Remote(e) if e.is_not_found())
    }

    /// Returns `true` if re-running the pass later may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            ReconcileError::Remote(e) => e.is_transient(),
            ReconcileError::Store(e) => e.is_transient(),
            ReconcileError::ActorResolution { source, .. } => source.is_transient(),
            ReconcileError::Timeout(_) => true,
            ReconcileError::InvariantViolation { .. } | ReconcileError::InvalidSpec(_) => false,
        }
    }
}
