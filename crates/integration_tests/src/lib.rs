//! Integration testing library for HubSteward.
//!
//! Scenarios run the real reconcile engine and drivers against the in-memory
//! [`FakeGitHub`], with records held in [`InMemoryRecordStore`]s, one per resource kind.

use std::{future::Future, sync::Arc, time::Duration};

use github_client::{ActorKind, ActorRef, Organization, Repository, Team};
use hub_steward_core::{
    BranchProtectionDriver, BranchProtectionSpec, Controller, ControllerSettings,
    InMemoryRecordStore, ObservedBranchProtection, OrganizationDriver, OrganizationSpec,
    Reconciler, RepositoryDriver, RepositorySpec, TeamDriver, TeamSpec,
};
use test_utils::{organization_fixture, FakeGitHub};

pub use test_utils::{Operation, RemoteKind};

/// Login of the organization every scenario starts with.
pub const ORG: &str = "acme";

/// Initialize logging for tests; `RUST_LOG` selects the level.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_test_writer()
        .try_init();
}

/// A fake GitHub holding the [`ORG`] organization, plus an empty record store per kind.
pub struct Scenario {
    pub github: Arc<FakeGitHub>,
    pub organizations: Arc<InMemoryRecordStore<OrganizationSpec, Organization>>,
    pub repositories: Arc<InMemoryRecordStore<RepositorySpec, Repository>>,
    pub teams: Arc<InMemoryRecordStore<TeamSpec, Team>>,
    pub rules: Arc<InMemoryRecordStore<BranchProtectionSpec, ObservedBranchProtection>>,
}

impl Scenario {
    pub fn new() -> Self {
        Self::with_github(FakeGitHub::new())
    }

    pub fn with_github(github: FakeGitHub) -> Self {
        init_test_logging();
        github.insert_organization(organization_fixture(1, ORG));
        Self {
            github: Arc::new(github),
            organizations: Arc::new(InMemoryRecordStore::new()),
            repositories: Arc::new(InMemoryRecordStore::new()),
            teams: Arc::new(InMemoryRecordStore::new()),
            rules: Arc::new(InMemoryRecordStore::new()),
        }
    }

    pub fn organization_reconciler(&self) -> Reconciler<OrganizationDriver> {
        Reconciler::new(
            OrganizationDriver::new(self.github.clone()),
            self.organizations.clone(),
        )
    }

    pub fn repository_reconciler(&self) -> Reconciler<RepositoryDriver> {
        Reconciler::new(
            RepositoryDriver::new(self.github.clone()),
            self.repositories.clone(),
        )
    }

    pub fn team_reconciler(&self) -> Reconciler<TeamDriver> {
        Reconciler::new(TeamDriver::new(self.github.clone()), self.teams.clone())
    }

    pub fn rule_reconciler(&self) -> Reconciler<BranchProtectionDriver> {
        Reconciler::new(
            BranchProtectionDriver::new(self.github.clone(), self.github.clone()),
            self.rules.clone(),
        )
    }

    pub fn repository_controller(&self, settings: ControllerSettings) -> Controller<RepositoryDriver> {
        Controller::new(self.repository_reconciler(), settings)
    }

    /// Mutations of `kind` sent so far.
    pub fn mutations_of(&self, kind: RemoteKind) -> usize {
        self.github
            .calls()
            .iter()
            .filter(|call| call.kind == kind && call.operation.is_mutation())
            .count()
    }
}

impl Default for Scenario {
    fn default() -> Self {
        Self::new()
    }
}

/// Registers a user on the fake and returns its reference.
pub fn user(github: &FakeGitHub, login: &str, node_id: &str) -> ActorRef {
    github.add_principal(ActorKind::User, login, node_id);
    ActorRef::new(ActorKind::User, node_id, login)
}

/// Registers an app on the fake and returns its reference.
pub fn app(github: &FakeGitHub, slug: &str, node_id: &str) -> ActorRef {
    github.add_principal(ActorKind::App, slug, node_id);
    ActorRef::new(ActorKind::App, node_id, slug)
}

pub fn names(names: &[&str]) -> Option<Vec<String>> {
    Some(names.iter().map(|n| n.to_string()).collect())
}

/// Polls `condition` until it holds or `limit` elapses.
pub async fn eventually<F, Fut>(limit: Duration, mut condition: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + limit;
    while tokio::time::Instant::now() < deadline {
        if condition().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition().await
}
