//! Team records.

use std::sync::Arc;

use async_trait::async_trait;
use github_client::{team_slug, Team, TeamClient, TeamCreatePayload, TeamSettingsUpdate};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Diff, FieldDiffer, ReconcileError, ResourceDriver, ResourceKind};

#[cfg(test)]
#[path = "team_tests.rs"]
mod tests;

/// Desired state of a team within an organization.
///
/// The team is looked up by the slug GitHub derives from `name`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamSpec {
    pub organization: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// `secret` or `closed`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub privacy: Option<String>,
    /// `notifications_enabled` or `notifications_disabled`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification_setting: Option<String>,
    /// Slug of the parent team
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_team: Option<String>,
}

impl TeamSpec {
    pub fn new(organization: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            organization: organization.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn slug(&self) -> String {
        team_slug(&self.name)
    }
}

/// Drives teams through the REST API.
pub struct TeamDriver {
    client: Arc<dyn TeamClient>,
}

impl TeamDriver {
    pub fn new(client: Arc<dyn TeamClient>) -> Self {
        Self { client }
    }

    async fn parent_team_id(&self, organization: &str, slug: &str) -> Result<u64, ReconcileError> {
        let parent = self.client.get_team(organization, slug).await.map_err(|e| {
            if e.is_not_found() {
                ReconcileError::InvalidSpec(format!(
                    "parent team '{}' does not exist in '{}'",
                    slug, organization
                ))
            } else {
                e.into()
            }
        })?;
        debug!(parent = slug, parent_id = parent.id, "Resolved parent team");
        Ok(parent.id)
    }
}

#[async_trait]
impl ResourceDriver for TeamDriver {
    type Spec = TeamSpec;
    type Observed = Team;
    type ChangeSet = TeamSettingsUpdate;

    const KIND: ResourceKind = ResourceKind::Team;

    fn validate(&self, spec: &TeamSpec) -> Result<(), ReconcileError> {
        if spec.organization.trim().is_empty() || spec.slug().is_empty() {
            return Err(ReconcileError::InvalidSpec(
                "team organization and name must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    fn remote_id(&self, observed: &Team) -> String {
        observed.id.to_string()
    }

    async fn fetch_bound(&self, spec: &TeamSpec, bound: &Team) -> Result<Team, ReconcileError> {
        let team = match &bound.organization {
            Some(org) => self.client.get_team_by_id(org.id, bound.id).await?,
            None => self.client.get_team(&spec.organization, &bound.slug).await?,
        };
        Ok(team)
    }

    async fn fetch_by_key(&self, spec: &TeamSpec) -> Result<Team, ReconcileError> {
        Ok(self.client.get_team(&spec.organization, &spec.slug()).await?)
    }

    async fn create(&self, spec: &TeamSpec) -> Result<Team, ReconcileError> {
        let parent_team_id = match &spec.parent_team {
            Some(parent) => Some(self.parent_team_id(&spec.organization, parent).await?),
            None => None,
        };
        let payload = TeamCreatePayload {
            name: spec.name.clone(),
            description: spec.description.clone(),
            privacy: spec.privacy.clone(),
            notification_setting: spec.notification_setting.clone(),
            parent_team_id,
        };
        Ok(self.client.create_team(&spec.organization, &payload).await?)
    }

    fn check_binding(&self, spec: &TeamSpec, observed: &Team) -> Result<(), String> {
        match &observed.organization {
            Some(org) if !org.is(&spec.organization) => Err(format!(
                "team {} belongs to '{}', expected '{}'",
                observed.id, org.login, spec.organization
            )),
            _ => Ok(()),
        }
    }

    async fn diff(
        &self,
        spec: &TeamSpec,
        observed: &Team,
    ) -> Result<Diff<TeamSettingsUpdate>, ReconcileError> {
        let mut differ = FieldDiffer::<TeamSettingsUpdate>::new();
        differ
            .required("name", &spec.name, &observed.name, |c, v| c.name = Some(v))
            .optional(
                "description",
                &spec.description,
                observed.description.as_ref(),
                |c, v| c.description = Some(v),
            )
            .optional("privacy", &spec.privacy, observed.privacy.as_ref(), |c, v| {
                c.privacy = Some(v)
            })
            .optional(
                "notification_setting",
                &spec.notification_setting,
                observed.notification_setting.as_ref(),
                |c, v| c.notification_setting = Some(v),
            );

        if let Some(parent) = &spec.parent_team {
            let current = observed.parent_slug();
            if !current.is_some_and(|slug| slug.eq_ignore_ascii_case(parent)) {
                let parent_id = self.parent_team_id(&spec.organization, parent).await?;
                differ.mark("parent_team", |c| c.parent_team_id = Some(parent_id));
            }
        }

        Ok(differ.finish())
    }

    async fn update(
        &self,
        spec: &TeamSpec,
        observed: &Team,
        change_set: &TeamSettingsUpdate,
    ) -> Result<Team, ReconcileError> {
        Ok(self
            .client
            .update_team(&spec.organization, &observed.slug, change_set)
            .await?)
    }

    async fn delete(&self, spec: &TeamSpec, observed: &Team) -> Result<(), ReconcileError> {
        Ok(self
            .client
            .delete_team(&spec.organization, &observed.slug)
            .await?)
    }
}
