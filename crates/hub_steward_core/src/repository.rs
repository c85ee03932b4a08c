//! Repository records.

use std::sync::Arc;

use async_trait::async_trait;
use github_client::{
    Repository, RepositoryClient, RepositoryCreatePayload, RepositorySettingsUpdate,
};
use serde::{Deserialize, Serialize};

use crate::{Diff, FieldDiffer, ReconcileError, ResourceDriver, ResourceKind};

#[cfg(test)]
#[path = "repository_tests.rs"]
mod tests;

/// Desired state of a repository owned by an organization.
///
/// `owner` and `name` identify the repository; every other field is unmanaged while `None`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RepositorySpec {
    pub owner: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub homepage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private: Option<bool>,
    /// `public`, `private` or `internal`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_issues: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_projects: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_wiki: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_template: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archived: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_squash_merge: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_merge_commit: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_rebase_merge: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_auto_merge: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete_branch_on_merge: Option<bool>,
}

impl RepositorySpec {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    /// Settings accepted at creation time. `archived` and `default_branch` need an existing
    /// repository and converge through the update that follows.
    fn create_payload(&self) -> RepositoryCreatePayload {
        RepositoryCreatePayload {
            name: self.name.clone(),
            description: self.description.clone(),
            homepage: self.homepage.clone(),
            private: self.private,
            visibility: self.visibility.clone(),
            has_issues: self.has_issues,
            has_projects: self.has_projects,
            has_wiki: self.has_wiki,
            is_template: self.is_template,
            allow_squash_merge: self.allow_squash_merge,
            allow_merge_commit: self.allow_merge_commit,
            allow_rebase_merge: self.allow_rebase_merge,
            allow_auto_merge: self.allow_auto_merge,
            delete_branch_on_merge: self.delete_branch_on_merge,
        }
    }
}

/// Drives repositories through the REST API.
pub struct RepositoryDriver {
    client: Arc<dyn RepositoryClient>,
}

impl RepositoryDriver {
    pub fn new(client: Arc<dyn RepositoryClient>) -> Self {
        Self { client }
    }
}

/// The owner and name to address `observed` by; falls back to the declared owner when
/// GitHub omitted it.
fn address<'a>(spec: &'a RepositorySpec, observed: &'a Repository) -> (&'a str, &'a str) {
    (
        observed.owner_login().unwrap_or(spec.owner.as_str()),
        observed.name.as_str(),
    )
}

#[async_trait]
impl ResourceDriver for RepositoryDriver {
    type Spec = RepositorySpec;
    type Observed = Repository;
    type ChangeSet = RepositorySettingsUpdate;

    const KIND: ResourceKind = ResourceKind::Repository;

    fn validate(&self, spec: &RepositorySpec) -> Result<(), ReconcileError> {
        if spec.owner.trim().is_empty() || spec.name.trim().is_empty() {
            return Err(ReconcileError::InvalidSpec(
                "repository owner and name must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    fn remote_id(&self, observed: &Repository) -> String {
        observed.id.to_string()
    }

    async fn fetch_bound(
        &self,
        _spec: &RepositorySpec,
        bound: &Repository,
    ) -> Result<Repository, ReconcileError> {
        Ok(self.client.get_repository_by_id(bound.id).await?)
    }

    async fn fetch_by_key(&self, spec: &RepositorySpec) -> Result<Repository, ReconcileError> {
        Ok(self.client.get_repository(&spec.owner, &spec.name).await?)
    }

    async fn create(&self, spec: &RepositorySpec) -> Result<Repository, ReconcileError> {
        Ok(self
            .client
            .create_repository(&spec.owner, &spec.create_payload())
            .await?)
    }

    fn check_binding(&self, spec: &RepositorySpec, observed: &Repository) -> Result<(), String> {
        match &observed.owner {
            Some(owner) if !owner.is(&spec.owner) => Err(format!(
                "repository {} is owned by '{}', expected '{}'",
                observed.id, owner.login, spec.owner
            )),
            _ => Ok(()),
        }
    }

    async fn diff(
        &self,
        spec: &RepositorySpec,
        observed: &Repository,
    ) -> Result<Diff<RepositorySettingsUpdate>, ReconcileError> {
        let mut differ = FieldDiffer::<RepositorySettingsUpdate>::new();
        differ
            .required("name", &spec.name, &observed.name, |c, v| c.name = Some(v))
            .optional(
                "description",
                &spec.description,
                observed.description.as_ref(),
                |c, v| c.description = Some(v),
            )
            .optional("homepage", &spec.homepage, observed.homepage.as_ref(), |c, v| {
                c.homepage = Some(v)
            })
            .optional("private", &spec.private, Some(&observed.private), |c, v| {
                c.private = Some(v)
            })
            .optional(
                "visibility",
                &spec.visibility,
                observed.visibility.as_ref(),
                |c, v| c.visibility = Some(v),
            )
            .optional("has_issues", &spec.has_issues, Some(&observed.has_issues), |c, v| {
                c.has_issues = Some(v)
            })
            .optional(
                "has_projects",
                &spec.has_projects,
                Some(&observed.has_projects),
                |c, v| c.has_projects = Some(v),
            )
            .optional("has_wiki", &spec.has_wiki, Some(&observed.has_wiki), |c, v| {
                c.has_wiki = Some(v)
            })
            .optional(
                "is_template",
                &spec.is_template,
                Some(&observed.is_template),
                |c, v| c.is_template = Some(v),
            )
            .optional("archived", &spec.archived, Some(&observed.archived), |c, v| {
                c.archived = Some(v)
            })
            .optional(
                "default_branch",
                &spec.default_branch,
                observed.default_branch.as_ref(),
                |c, v| c.default_branch = Some(v),
            )
            .optional(
                "allow_squash_merge",
                &spec.allow_squash_merge,
                observed.allow_squash_merge.as_ref(),
                |c, v| c.allow_squash_merge = Some(v),
            )
            .optional(
                "allow_merge_commit",
                &spec.allow_merge_commit,
                observed.allow_merge_commit.as_ref(),
                |c, v| c.allow_merge_commit = Some(v),
            )
            .optional(
                "allow_rebase_merge",
                &spec.allow_rebase_merge,
                observed.allow_rebase_merge.as_ref(),
                |c, v| c.allow_rebase_merge = Some(v),
            )
            .optional(
                "allow_auto_merge",
                &spec.allow_auto_merge,
                observed.allow_auto_merge.as_ref(),
                |c, v| c.allow_auto_merge = Some(v),
            )
            .optional(
                "delete_branch_on_merge",
                &spec.delete_branch_on_merge,
                observed.delete_branch_on_merge.as_ref(),
                |c, v| c.delete_branch_on_merge = Some(v),
            );
        Ok(differ.finish())
    }

    async fn update(
        &self,
        spec: &RepositorySpec,
        observed: &Repository,
        change_set: &RepositorySettingsUpdate,
    ) -> Result<Repository, ReconcileError> {
        let (owner, name) = address(spec, observed);
        Ok(self.client.update_repository(owner, name, change_set).await?)
    }

    async fn delete(&self, spec: &RepositorySpec, observed: &Repository) -> Result<(), ReconcileError> {
        let (owner, name) = address(spec, observed);
        Ok(self.client.delete_repository(owner, name).await?)
    }
}
