//! Branch protection domain types.
//!
//! Branch protection rules are managed through the GraphQL API because only that API gives a
//! rule a stable identity (its node ID) independent of the branch name pattern. Several rule
//! settings are not scalars but lists of principals ("actors"): users, GitHub Apps and teams,
//! each addressed remotely by an opaque node ID while humans refer to them by login or slug.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

#[cfg(test)]
#[path = "branch_protection_tests.rs"]
mod tests;

/// The kind of principal referenced by an actor allowance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActorKind {
    /// An individual account, named by login
    User,
    /// A GitHub App (integration), named by slug
    App,
    /// An organization team, named by slug
    Team,
}

impl ActorKind {
    /// All kinds, in the order they are concatenated into a replacement ID list.
    pub const ALL: [ActorKind; 3] = [ActorKind::User, ActorKind::App, ActorKind::Team];
}

impl fmt::Display for ActorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActorKind::User => write!(f, "user"),
            ActorKind::App => write!(f, "app"),
            ActorKind::Team => write!(f, "team"),
        }
    }
}

/// One principal as observed in an actor allowance collection.
///
/// # Examples
///
/// ```rust
/// use github_client::{ActorKind, ActorRef};
///
/// let actor = ActorRef::new(ActorKind::Team, "T_kwDOAB", "release-managers");
/// assert_eq!(actor.kind, ActorKind::Team);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActorRef {
    pub kind: ActorKind,
    /// The opaque GraphQL node ID of the principal
    pub id: String,
    /// The login (users) or slug (apps and teams) of the principal
    pub name: String,
}

impl ActorRef {
    pub fn new(kind: ActorKind, id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
            name: name.into(),
        }
    }
}

/// A permission grouping backed by one actor allowance collection on a rule.
///
/// The API accepts exactly one combined replacement ID list per grouping, regardless of how
/// many kinds of principal it contains.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorGrouping {
    /// Actors allowed to force push despite the rule
    BypassForcePush,
    /// Actors allowed to bypass required pull requests
    BypassPullRequest,
    /// Actors allowed to push when pushes are restricted
    PushAllowance,
    /// Actors allowed to dismiss reviews
    ReviewDismissal,
}

impl ActorGrouping {
    pub const ALL: [ActorGrouping; 4] = [
        ActorGrouping::BypassForcePush,
        ActorGrouping::BypassPullRequest,
        ActorGrouping::PushAllowance,
        ActorGrouping::ReviewDismissal,
    ];

    /// The GraphQL connection on `BranchProtectionRule` that lists this grouping.
    pub fn connection_field(&self) -> &'static str {
        match self {
            ActorGrouping::BypassForcePush => "bypassForcePushAllowances",
            ActorGrouping::BypassPullRequest => "bypassPullRequestAllowances",
            ActorGrouping::PushAllowance => "pushAllowances",
            ActorGrouping::ReviewDismissal => "reviewDismissalAllowances",
        }
    }
}

impl fmt::Display for ActorGrouping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActorGrouping::BypassForcePush => write!(f, "bypass_force_push"),
            ActorGrouping::BypassPullRequest => write!(f, "bypass_pull_request"),
            ActorGrouping::PushAllowance => write!(f, "push_allowances"),
            ActorGrouping::ReviewDismissal => write!(f, "review_dismissals"),
        }
    }
}

/// The fully drained actor allowance collections of one rule.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorCollections {
    #[serde(default)]
    pub bypass_force_push: Vec<ActorRef>,
    #[serde(default)]
    pub bypass_pull_request: Vec<ActorRef>,
    #[serde(default)]
    pub push_allowances: Vec<ActorRef>,
    #[serde(default)]
    pub review_dismissals: Vec<ActorRef>,
}

impl ActorCollections {
    pub fn get(&self, grouping: ActorGrouping) -> &[ActorRef] {
        match grouping {
            ActorGrouping::BypassForcePush => &self.bypass_force_push,
            ActorGrouping::BypassPullRequest => &self.bypass_pull_request,
            ActorGrouping::PushAllowance => &self.push_allowances,
            ActorGrouping::ReviewDismissal => &self.review_dismissals,
        }
    }

    pub fn set(&mut self, grouping: ActorGrouping, actors: Vec<ActorRef>) {
        match grouping {
            ActorGrouping::BypassForcePush => self.bypass_force_push = actors,
            ActorGrouping::BypassPullRequest => self.bypass_pull_request = actors,
            ActorGrouping::PushAllowance => self.push_allowances = actors,
            ActorGrouping::ReviewDismissal => self.review_dismissals = actors,
        }
    }
}

/// The repository a rule belongs to, as embedded in the rule's GraphQL representation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleRepository {
    /// GraphQL node ID of the repository
    pub id: String,
    pub name: String,
    pub owner: RuleRepositoryOwner,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleRepositoryOwner {
    pub login: String,
}

/// Represents a branch protection rule as returned by the GraphQL API.
///
/// Actor allowance collections are not part of this type; they are paginated separately
/// (see [`crate::BranchProtectionClient::list_actor_collections`]).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchProtectionRule {
    /// GraphQL node ID of the rule
    pub id: String,
    pub pattern: String,
    #[serde(default)]
    pub repository: Option<RuleRepository>,
    #[serde(default)]
    pub allows_deletions: bool,
    #[serde(default)]
    pub allows_force_pushes: bool,
    #[serde(default)]
    pub blocks_creations: bool,
    #[serde(default)]
    pub dismisses_stale_reviews: bool,
    #[serde(default)]
    pub is_admin_enforced: bool,
    #[serde(default)]
    pub lock_allows_fetch_and_merge: bool,
    #[serde(default)]
    pub lock_branch: bool,
    #[serde(default)]
    pub require_last_push_approval: bool,
    /// Minimum number of approving reviews; GitHub reports null when reviews are not required
    #[serde(default)]
    pub required_approving_review_count: Option<u32>,
    /// GitHub reports null instead of an empty list when no checks are required
    #[serde(default, deserialize_with = "null_as_empty")]
    pub required_status_check_contexts: Vec<String>,
    #[serde(default)]
    pub requires_approving_reviews: bool,
    #[serde(default)]
    pub requires_code_owner_reviews: bool,
    #[serde(default)]
    pub requires_commit_signatures: bool,
    #[serde(default)]
    pub requires_conversation_resolution: bool,
    #[serde(default)]
    pub requires_linear_history: bool,
    #[serde(default)]
    pub requires_status_checks: bool,
    #[serde(default)]
    pub requires_strict_status_checks: bool,
    #[serde(default)]
    pub restricts_pushes: bool,
    #[serde(default)]
    pub restricts_review_dismissals: bool,
}

/// Input for the `createBranchProtectionRule` and `updateBranchProtectionRule` mutations.
///
/// Every field is optional; unset fields are omitted from the mutation and left untouched by
/// GitHub. Actor ID lists replace the whole grouping when present.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchProtectionRuleInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allows_deletions: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allows_force_pushes: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocks_creations: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dismisses_stale_reviews: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_admin_enforced: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lock_allows_fetch_and_merge: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lock_branch: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub require_last_push_approval: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_approving_review_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_status_check_contexts: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requires_approving_reviews: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requires_code_owner_reviews: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requires_commit_signatures: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requires_conversation_resolution: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requires_linear_history: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requires_status_checks: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requires_strict_status_checks: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restricts_pushes: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restricts_review_dismissals: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bypass_force_push_actor_ids: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bypass_pull_request_actor_ids: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub push_actor_ids: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review_dismissal_actor_ids: Option<Vec<String>>,
}

impl BranchProtectionRuleInput {
    /// Sets the replacement ID list for one grouping.
    pub fn set_actor_ids(&mut self, grouping: ActorGrouping, ids: Vec<String>) {
        let slot = match grouping {
            ActorGrouping::BypassForcePush => &mut self.bypass_force_push_actor_ids,
            ActorGrouping::BypassPullRequest => &mut self.bypass_pull_request_actor_ids,
            ActorGrouping::PushAllowance => &mut self.push_actor_ids,
            ActorGrouping::ReviewDismissal => &mut self.review_dismissal_actor_ids,
        };
        *slot = Some(ids);
    }

    /// Returns the replacement ID list staged for one grouping, if any.
    pub fn actor_ids(&self, grouping: ActorGrouping) -> Option<&[String]> {
        match grouping {
            ActorGrouping::BypassForcePush => self.bypass_force_push_actor_ids.as_deref(),
            ActorGrouping::BypassPullRequest => self.bypass_pull_request_actor_ids.as_deref(),
            ActorGrouping::PushAllowance => self.push_actor_ids.as_deref(),
            ActorGrouping::ReviewDismissal => self.review_dismissal_actor_ids.as_deref(),
        }
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}
