//! # HubSteward Core
//!
//! Converges GitHub organizations, repositories, teams and branch protection rules toward
//! declared desired-state records.
//!
//! ## Overview
//!
//! A record pairs a desired configuration (the *spec*) with the last observed remote state
//! (the *status*) and a deletion guard. Each reconcile pass:
//! 1. Finds the remote counterpart by its bound ID, then by secondary key, and creates it if
//!    neither finds anything
//! 2. Persists the deletion guard as soon as a counterpart is bound
//! 3. Diffs the managed fields and sends one partial update when anything differs
//! 4. Mirrors the resulting remote state into the status
//!
//! Deletion intent deletes the remote counterpart only when this engine bound it and has
//! converged it at least once; a "not found" answer counts as already deleted.
//!
//! ## Architecture
//!
//! - [`Reconciler`] is the kind-independent engine; [`ResourceDriver`] implementations
//!   ([`OrganizationDriver`], [`RepositoryDriver`], [`TeamDriver`],
//!   [`BranchProtectionDriver`]) supply the kind-specific remote calls and comparisons
//! - [`RecordStore`] abstracts record persistence; [`InMemoryRecordStore`] is provided
//! - [`Controller`] turns record-change triggers into bounded, concurrent passes
//!
//! ## Examples
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use github_client::{create_token_client, GitHubClient, Repository};
//! use hub_steward_core::{
//!     InMemoryRecordStore, RecordKey, Reconciler, RepositoryDriver, RepositorySpec,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Arc::new(GitHubClient::new(create_token_client("token", None)?));
//! let store: Arc<InMemoryRecordStore<RepositorySpec, Repository>> =
//!     Arc::new(InMemoryRecordStore::new());
//!
//! let key = RecordKey::new("platform", "service-a");
//! let mut spec = RepositorySpec::new("my-org", "service-a");
//! spec.has_wiki = Some(false);
//! store.apply(key.clone(), spec).await;
//!
//! let reconciler = Reconciler::new(RepositoryDriver::new(client), store);
//! let outcome = reconciler.reconcile(&key).await?;
//! println!("{outcome:?}");
//! # Ok(())
//! # }
//! ```

pub mod actor_set;
pub mod branch_protection;
pub mod controller;
pub mod differ;
pub mod errors;
pub mod lifecycle;
pub mod organization;
pub mod reconciler;
pub mod record;
pub mod repository;
pub mod status_writer;
pub mod store;
pub mod team;

pub use actor_set::{plan_actor_set, resolve_replacement_ids, ActorSelection, ActorSetPlan};
pub use branch_protection::{BranchProtectionDriver, BranchProtectionSpec, ObservedBranchProtection};
pub use controller::{Controller, ControllerSettings, ReconcileSummary};
pub use differ::{Diff, FieldDiffer};
pub use errors::{ReconcileError, StoreError};
pub use lifecycle::{DeletionAction, LifecycleState, SkipReason};
pub use organization::{OrganizationDriver, OrganizationSpec};
pub use reconciler::{ReconcileOutcome, Reconciler, ResourceDriver};
pub use record::{
    DeletionGuard, DesiredStateRecord, RecordKey, ResourceKind, ResourceStatus,
};
pub use repository::{RepositoryDriver, RepositorySpec};
pub use status_writer::StatusWriter;
pub use store::{InMemoryRecordStore, RecordStore};
pub use team::{TeamDriver, TeamSpec};
