//! Wires record files, GitHub clients and controller settings together for each resource kind.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use github_client::{BranchProtectionClient, OrganizationClient, RepositoryClient, TeamClient};
use hub_steward_core::{
    BranchProtectionDriver, Controller, ControllerSettings, OrganizationDriver, RecordStore,
    Reconciler, RepositoryDriver, ResourceDriver, TeamDriver,
};
use serde::{de::DeserializeOwned, Serialize};

use crate::file_store::FileRecordStore;

/// The remote clients the drivers talk to.
#[derive(Clone)]
pub struct Clients {
    pub organizations: Arc<dyn OrganizationClient>,
    pub repositories: Arc<dyn RepositoryClient>,
    pub teams: Arc<dyn TeamClient>,
    pub branch_protection: Arc<dyn BranchProtectionClient>,
}

impl Clients {
    /// Uses one client implementing every operation, such as `GitHubClient`.
    pub fn from_shared<C>(client: Arc<C>) -> Self
    where
        C: OrganizationClient + RepositoryClient + TeamClient + BranchProtectionClient + 'static,
    {
        Self {
            organizations: client.clone(),
            repositories: client.clone(),
            teams: client.clone(),
            branch_protection: client,
        }
    }
}

/// Everything needed to build a [`Controller`] for any resource kind.
pub struct Workspace {
    records_dir: PathBuf,
    settings: ControllerSettings,
    clients: Clients,
}

impl Workspace {
    pub fn new(records_dir: impl Into<PathBuf>, settings: ControllerSettings, clients: Clients) -> Self {
        Self {
            records_dir: records_dir.into(),
            settings,
            clients,
        }
    }

    pub fn records_dir(&self) -> &Path {
        &self.records_dir
    }

    pub fn organizations(&self) -> Controller<OrganizationDriver> {
        self.controller(OrganizationDriver::new(self.clients.organizations.clone()))
    }

    pub fn repositories(&self) -> Controller<RepositoryDriver> {
        self.controller(RepositoryDriver::new(self.clients.repositories.clone()))
    }

    pub fn teams(&self) -> Controller<TeamDriver> {
        self.controller(TeamDriver::new(self.clients.teams.clone()))
    }

    pub fn branch_protection_rules(&self) -> Controller<BranchProtectionDriver> {
        self.controller(BranchProtectionDriver::new(
            self.clients.branch_protection.clone(),
            self.clients.repositories.clone(),
        ))
    }

    fn controller<D>(&self, driver: D) -> Controller<D>
    where
        D: ResourceDriver,
        D::Spec: DeserializeOwned,
        D::Observed: Serialize + DeserializeOwned,
    {
        let store: Arc<dyn RecordStore<D::Spec, D::Observed>> =
            Arc::new(FileRecordStore::new(&self.records_dir, D::KIND));
        Controller::new(Reconciler::new(driver, store), self.settings)
    }
}
