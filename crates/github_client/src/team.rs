//! Team domain types.
//!
//! This module contains the remote representation of a GitHub team and the payloads used to
//! create and update one.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::models::AccountRef;

#[cfg(test)]
#[path = "team_tests.rs"]
mod tests;

/// Represents a GitHub team as returned by `GET /orgs/{org}/teams/{team_slug}`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Team {
    /// The numeric REST ID of the team
    pub id: u64,
    /// The GraphQL node ID of the team
    #[serde(default)]
    pub node_id: String,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: Option<String>,
    /// `secret` or `closed`
    #[serde(default)]
    pub privacy: Option<String>,
    /// `notifications_enabled` or `notifications_disabled`
    #[serde(default)]
    pub notification_setting: Option<String>,
    /// The parent team, if this team is nested
    #[serde(default)]
    pub parent: Option<TeamParent>,
    /// The organization owning the team
    #[serde(default)]
    pub organization: Option<AccountRef>,
}

impl Team {
    /// Returns the slug of the parent team, if any.
    pub fn parent_slug(&self) -> Option<&str> {
        self.parent.as_ref().map(|p| p.slug.as_str())
    }
}

/// The abbreviated parent team embedded in a [`Team`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamParent {
    pub id: u64,
    pub slug: String,
}

/// Payload for `POST /orgs/{org}/teams`.
#[derive(Serialize, Default, Debug, Clone, PartialEq)]
pub struct TeamCreatePayload {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub privacy: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification_setting: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_team_id: Option<u64>,
}

/// Represents the settings that can be updated for a team.
#[derive(Serialize, Default, Debug, Clone, PartialEq)]
pub struct TeamSettingsUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub privacy: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification_setting: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_team_id: Option<u64>,
}

static SLUG_SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("static regex is valid"));

/// Derives the slug GitHub assigns to a team name.
///
/// GitHub lowercases the name and collapses every run of characters that are not ASCII
/// letters or digits into a single `-`, trimming leading and trailing separators.
///
/// # Examples
///
/// ```rust
/// use github_client::team_slug;
///
/// assert_eq!(team_slug("Platform Engineers"), "platform-engineers");
/// assert_eq!(team_slug("  SRE / On-Call "), "sre-on-call");
/// ```
pub fn team_slug(name: &str) -> String {
    let lowered = name.to_ascii_lowercase();
    SLUG_SEPARATORS
        .replace_all(&lowered, "-")
        .trim_matches('-')
        .to_string()
}
