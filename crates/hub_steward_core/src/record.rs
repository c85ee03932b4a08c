//! Desired-state records and the status mirrored back onto them.
//!
//! A [`DesiredStateRecord`] pairs the user-declared configuration of one managed GitHub entity
//! with the last snapshot observed remotely, an explicit deletion guard and the deletion intent
//! set by the storage substrate.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[cfg(test)]
#[path = "record_tests.rs"]
mod tests;

/// The kinds of GitHub entity this engine converges.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Organization,
    Repository,
    Team,
    BranchProtectionRule,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 4] = [
        ResourceKind::Organization,
        ResourceKind::Repository,
        ResourceKind::Team,
        ResourceKind::BranchProtectionRule,
    ];

    /// Directory name used for records of this kind by file based stores.
    pub fn plural(&self) -> &'static str {
        match self {
            ResourceKind::Organization => "organizations",
            ResourceKind::Repository => "repositories",
            ResourceKind::Team => "teams",
            ResourceKind::BranchProtectionRule => "branch_protection_rules",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Organization => write!(f, "organization"),
            ResourceKind::Repository => write!(f, "repository"),
            ResourceKind::Team => write!(f, "team"),
            ResourceKind::BranchProtectionRule => write!(f, "branch_protection_rule"),
        }
    }
}

/// Stable local identity of a record: `namespace/name`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordKey {
    pub namespace: String,
    pub name: String,
}

impl RecordKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Marks a record whose remote counterpart this engine has bound to.
///
/// Remote deletes are only ever issued for records carrying [`DeletionGuard::Present`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeletionGuard {
    #[default]
    Absent,
    Present,
}

impl DeletionGuard {
    pub fn is_present(&self) -> bool {
        matches!(self, DeletionGuard::Present)
    }
}

/// The last observed remote state of a record.
///
/// A status can only be built from a snapshot returned by the remote system through
/// [`ResourceStatus::observed`]; there is no way to derive one from the desired state. An
/// empty status (the default) means the record has never converged.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResourceStatus<O> {
    observed: Option<O>,
    last_updated: Option<DateTime<Utc>>,
}

impl<O> ResourceStatus<O> {
    /// Records `snapshot` as the state observed at `at`.
    pub fn observed(snapshot: O, at: DateTime<Utc>) -> Self {
        Self {
            observed: Some(snapshot),
            last_updated: Some(at),
        }
    }

    /// The bound remote snapshot, if any.
    pub fn snapshot(&self) -> Option<&O> {
        self.observed.as_ref()
    }

    /// When the record last converged successfully.
    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.last_updated
    }

    /// Returns `true` once at least one pass has written the status.
    pub fn has_converged(&self) -> bool {
        self.last_updated.is_some()
    }
}

impl<O> Default for ResourceStatus<O> {
    fn default() -> Self {
        Self {
            observed: None,
            last_updated: None,
        }
    }
}

/// One managed entity: its declared configuration and everything known about its remote
/// counterpart.
#[derive(Clone, Debug, PartialEq)]
pub struct DesiredStateRecord<S, O> {
    pub key: RecordKey,
    pub spec: S,
    pub status: ResourceStatus<O>,
    pub guard: DeletionGuard,
    /// Set by the storage substrate when the user removes the declaration
    pub deletion_requested: bool,
}

impl<S, O> DesiredStateRecord<S, O> {
    /// Creates a freshly declared record: no status, no guard, no deletion intent.
    pub fn new(key: RecordKey, spec: S) -> Self {
        Self {
            key,
            spec,
            status: ResourceStatus::default(),
            guard: DeletionGuard::Absent,
            deletion_requested: false,
        }
    }
}
