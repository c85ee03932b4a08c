//! Lifecycle decisions for a single record.
//!
//! ```text
//! Unbound ──bind or create──▶ Bound ──deletion intent──▶ Deleting ──▶ Terminal
//!    └──────────────deletion intent──────────────────────────┘
//! ```
//!
//! These functions only decide; the reconciler carries the decisions out.

use std::fmt;

use crate::{DesiredStateRecord, ResourceStatus};

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;

/// Where a record stands in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LifecycleState {
    /// No remote counterpart is known to this engine
    Unbound,
    /// Bound to a remote counterpart and guarded
    Bound,
    /// Deletion intent observed
    Deleting,
    /// Removed from storage
    Terminal,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleState::Unbound => write!(f, "unbound"),
            LifecycleState::Bound => write!(f, "bound"),
            LifecycleState::Deleting => write!(f, "deleting"),
            LifecycleState::Terminal => write!(f, "terminal"),
        }
    }
}

/// Classifies a stored record.
pub fn lifecycle_state<S, O>(record: &DesiredStateRecord<S, O>) -> LifecycleState {
    if record.deletion_requested {
        LifecycleState::Deleting
    } else if record.guard.is_present() {
        LifecycleState::Bound
    } else {
        LifecycleState::Unbound
    }
}

/// Why a deletion leaves the remote system alone.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    /// The record never bound to a remote counterpart
    GuardAbsent,
    /// Bound, but no pass ever converged the counterpart, so this engine may not own it
    NeverConverged,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::GuardAbsent => write!(f, "deletion guard absent"),
            SkipReason::NeverConverged => write!(f, "never converged"),
        }
    }
}

/// What deleting a record does remotely.
#[derive(Debug, PartialEq)]
pub enum DeletionAction<'a, O> {
    /// Leave the remote system untouched
    Skip(SkipReason),
    /// Delete the bound counterpart
    DeleteRemote(&'a O),
}

/// Decides whether deleting `record` may touch its remote counterpart.
///
/// Only a guarded record whose status proves at least one converged pass is deleted remotely.
pub fn deletion_action<S, O>(record: &DesiredStateRecord<S, O>) -> DeletionAction<'_, O> {
    if !record.guard.is_present() {
        return DeletionAction::Skip(SkipReason::GuardAbsent);
    }
    match (record.status.has_converged(), record.status.snapshot()) {
        (true, Some(observed)) => DeletionAction::DeleteRemote(observed),
        _ => DeletionAction::Skip(SkipReason::NeverConverged),
    }
}

/// Returns `true` if a pass with nothing to change must still issue an update so the status
/// gets its first write.
///
/// A counterpart created in the same pass already carries the creation result.
pub fn requires_initial_update<O>(status: &ResourceStatus<O>, created: bool) -> bool {
    !created && !status.has_converged()
}
