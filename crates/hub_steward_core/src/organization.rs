//! Organization records.

use std::sync::Arc;

use async_trait::async_trait;
use github_client::{
    Organization, OrganizationClient, OrganizationCreatePayload, OrganizationSettingsUpdate,
};
use serde::{Deserialize, Serialize};

use crate::{Diff, FieldDiffer, ReconcileError, ResourceDriver, ResourceKind};

#[cfg(test)]
#[path = "organization_tests.rs"]
mod tests;

/// Desired state of an organization, identified by its login.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OrganizationSpec {
    pub login: String,
    /// Login of the first owner. Only used, and then required, when the organization has to be
    /// created (GitHub Enterprise Server).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin: Option<String>,
    /// Display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blog: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub billing_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub twitter_username: Option<String>,
    /// `read`, `write`, `admin` or `none`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_repository_permission: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub members_can_create_repositories: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_organization_projects: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_repository_projects: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_commit_signoff_required: Option<bool>,
}

impl OrganizationSpec {
    pub fn new(login: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            ..Default::default()
        }
    }
}

/// Drives organizations through the REST API.
pub struct OrganizationDriver {
    client: Arc<dyn OrganizationClient>,
}

impl OrganizationDriver {
    pub fn new(client: Arc<dyn OrganizationClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ResourceDriver for OrganizationDriver {
    type Spec = OrganizationSpec;
    type Observed = Organization;
    type ChangeSet = OrganizationSettingsUpdate;

    const KIND: ResourceKind = ResourceKind::Organization;

    fn validate(&self, spec: &OrganizationSpec) -> Result<(), ReconcileError> {
        if spec.login.trim().is_empty() {
            return Err(ReconcileError::InvalidSpec(
                "organization login must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    fn remote_id(&self, observed: &Organization) -> String {
        observed.id.to_string()
    }

    async fn fetch_bound(
        &self,
        _spec: &OrganizationSpec,
        bound: &Organization,
    ) -> Result<Organization, ReconcileError> {
        Ok(self.client.get_organization_by_id(bound.id).await?)
    }

    async fn fetch_by_key(&self, spec: &OrganizationSpec) -> Result<Organization, ReconcileError> {
        Ok(self.client.get_organization(&spec.login).await?)
    }

    async fn create(&self, spec: &OrganizationSpec) -> Result<Organization, ReconcileError> {
        let admin = spec.admin.clone().ok_or_else(|| {
            ReconcileError::InvalidSpec(format!(
                "organization '{}' does not exist and no admin is declared to create it",
                spec.login
            ))
        })?;
        let payload = OrganizationCreatePayload {
            login: spec.login.clone(),
            admin,
            profile_name: spec.name.clone(),
        };
        Ok(self.client.create_organization(&payload).await?)
    }

    fn check_binding(&self, spec: &OrganizationSpec, observed: &Organization) -> Result<(), String> {
        if observed.login.eq_ignore_ascii_case(&spec.login) {
            Ok(())
        } else {
            Err(format!(
                "organization {} has login '{}', expected '{}'",
                observed.id, observed.login, spec.login
            ))
        }
    }

    async fn diff(
        &self,
        spec: &OrganizationSpec,
        observed: &Organization,
    ) -> Result<Diff<OrganizationSettingsUpdate>, ReconcileError> {
        let mut differ = FieldDiffer::<OrganizationSettingsUpdate>::new();
        differ
            .optional("name", &spec.name, observed.name.as_ref(), |c, v| {
                c.name = Some(v)
            })
            .optional(
                "description",
                &spec.description,
                observed.description.as_ref(),
                |c, v| c.description = Some(v),
            )
            .optional("company", &spec.company, observed.company.as_ref(), |c, v| {
                c.company = Some(v)
            })
            .optional("blog", &spec.blog, observed.blog.as_ref(), |c, v| {
                c.blog = Some(v)
            })
            .optional("location", &spec.location, observed.location.as_ref(), |c, v| {
                c.location = Some(v)
            })
            .optional("email", &spec.email, observed.email.as_ref(), |c, v| {
                c.email = Some(v)
            })
            .optional(
                "billing_email",
                &spec.billing_email,
                observed.billing_email.as_ref(),
                |c, v| c.billing_email = Some(v),
            )
            .optional(
                "twitter_username",
                &spec.twitter_username,
                observed.twitter_username.as_ref(),
                |c, v| c.twitter_username = Some(v),
            )
            .optional(
                "default_repository_permission",
                &spec.default_repository_permission,
                observed.default_repository_permission.as_ref(),
                |c, v| c.default_repository_permission = Some(v),
            )
            .optional(
                "members_can_create_repositories",
                &spec.members_can_create_repositories,
                observed.members_can_create_repositories.as_ref(),
                |c, v| c.members_can_create_repositories = Some(v),
            )
            .optional(
                "has_organization_projects",
                &spec.has_organization_projects,
                observed.has_organization_projects.as_ref(),
                |c, v| c.has_organization_projects = Some(v),
            )
            .optional(
                "has_repository_projects",
                &spec.has_repository_projects,
                observed.has_repository_projects.as_ref(),
                |c, v| c.has_repository_projects = Some(v),
            )
            .optional(
                "web_commit_signoff_required",
                &spec.web_commit_signoff_required,
                observed.web_commit_signoff_required.as_ref(),
                |c, v| c.web_commit_signoff_required = Some(v),
            );
        Ok(differ.finish())
    }

    async fn update(
        &self,
        _spec: &OrganizationSpec,
        observed: &Organization,
        change_set: &OrganizationSettingsUpdate,
    ) -> Result<Organization, ReconcileError> {
        Ok(self
            .client
            .update_organization(&observed.login, change_set)
            .await?)
    }

    async fn delete(
        &self,
        _spec: &OrganizationSpec,
        observed: &Organization,
    ) -> Result<(), ReconcileError> {
        Ok(self.client.delete_organization(&observed.login).await?)
    }
}
