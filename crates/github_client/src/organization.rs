//! Organization domain types.
//!
//! This module contains the remote representation of a GitHub organization and the payloads
//! used to create (GitHub Enterprise Server only) and update one.

use serde::{Deserialize, Serialize};

#[cfg(test)]
#[path = "organization_tests.rs"]
mod tests;

/// Represents a GitHub organization as returned by `GET /orgs/{org}`.
///
/// `billing_email` and the member policy flags are only reported to organization owners,
/// so they are optional.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    /// The numeric REST ID of the organization
    pub id: u64,
    /// The GraphQL node ID of the organization
    #[serde(default)]
    pub node_id: String,
    /// The login (URL slug) of the organization
    pub login: String,
    /// The display name of the organization
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub blog: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub billing_email: Option<String>,
    #[serde(default)]
    pub twitter_username: Option<String>,
    #[serde(default)]
    pub default_repository_permission: Option<String>,
    #[serde(default)]
    pub members_can_create_repositories: Option<bool>,
    #[serde(default)]
    pub has_organization_projects: Option<bool>,
    #[serde(default)]
    pub has_repository_projects: Option<bool>,
    #[serde(default)]
    pub web_commit_signoff_required: Option<bool>,
}

/// Payload for `POST /admin/organizations`.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct OrganizationCreatePayload {
    pub login: String,
    /// Login of the user who becomes the first owner of the organization
    pub admin: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_name: Option<String>,
}

/// Represents the settings that can be updated for an organization.
#[derive(Serialize, Default, Debug, Clone, PartialEq)]
pub struct OrganizationSettingsUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub blog: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub billing_email: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub twitter_username: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_repository_permission: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub members_can_create_repositories: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_organization_projects: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_repository_projects: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub web_commit_signoff_required: Option<bool>,
}
