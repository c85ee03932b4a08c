//! GraphQL documents and response envelopes used for branch protection rules.

use serde::Deserialize;

use crate::{ActorGrouping, ActorKind, ActorRef, BranchProtectionRule, Error, Page, PAGE_SIZE};

#[cfg(test)]
#[path = "graphql_tests.rs"]
mod tests;

const RULE_FIELDS: &str = "id pattern \
    repository { id name owner { login } } \
    allowsDeletions allowsForcePushes blocksCreations dismissesStaleReviews isAdminEnforced \
    lockAllowsFetchAndMerge lockBranch requireLastPushApproval requiredApprovingReviewCount \
    requiredStatusCheckContexts requiresApprovingReviews requiresCodeOwnerReviews \
    requiresCommitSignatures requiresConversationResolution requiresLinearHistory \
    requiresStatusChecks requiresStrictStatusChecks restrictsPushes restrictsReviewDismissals";

const ACTOR_FIELDS: &str = "actor { __typename \
    ... on User { id login } \
    ... on App { id slug } \
    ... on Team { id slug } }";

pub(crate) fn rule_by_id_query() -> String {
    format!(
        "query($id: ID!) {{ node(id: $id) {{ ... on BranchProtectionRule {{ {RULE_FIELDS} }} }} }}"
    )
}

pub(crate) fn rules_page_query() -> String {
    format!(
        "query($owner: String!, $name: String!, $cursor: String) {{ \
         repository(owner: $owner, name: $name) {{ \
         branchProtectionRules(first: {PAGE_SIZE}, after: $cursor) {{ \
         nodes {{ {RULE_FIELDS} }} pageInfo {{ hasNextPage endCursor }} }} }} }}"
    )
}

/// The connection is aliased to `allowances` so one response type serves every grouping.
pub(crate) fn actor_page_query(grouping: ActorGrouping) -> String {
    format!(
        "query($id: ID!, $cursor: String) {{ node(id: $id) {{ ... on BranchProtectionRule {{ \
         allowances: {field}(first: {PAGE_SIZE}, after: $cursor) {{ \
         nodes {{ {ACTOR_FIELDS} }} pageInfo {{ hasNextPage endCursor }} }} }} }} }}",
        field = grouping.connection_field()
    )
}

pub(crate) fn create_rule_mutation() -> String {
    format!(
        "mutation($input: CreateBranchProtectionRuleInput!) {{ \
         createBranchProtectionRule(input: $input) {{ branchProtectionRule {{ {RULE_FIELDS} }} }} }}"
    )
}

pub(crate) fn update_rule_mutation() -> String {
    format!(
        "mutation($input: UpdateBranchProtectionRuleInput!) {{ \
         updateBranchProtectionRule(input: $input) {{ branchProtectionRule {{ {RULE_FIELDS} }} }} }}"
    )
}

pub(crate) const DELETE_RULE_MUTATION: &str =
    "mutation($input: DeleteBranchProtectionRuleInput!) { \
     deleteBranchProtectionRule(input: $input) { clientMutationId } }";

/// The top-level GraphQL response. GitHub answers HTTP 200 even when the query failed, so
/// errors have to be inspected here.
#[derive(Debug, Deserialize)]
pub(crate) struct GraphQlResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GraphQlError {
    pub message: String,
    #[serde(rename = "type", default)]
    pub error_type: Option<String>,
}

impl<T> GraphQlResponse<T> {
    pub(crate) fn into_data(self) -> Result<T, Error> {
        if !self.errors.is_empty() {
            let has_type = |t: &str| {
                self.errors
                    .iter()
                    .any(|e| e.error_type.as_deref() == Some(t))
            };
            if has_type("NOT_FOUND") {
                return Err(Error::NotFound);
            }
            if has_type("RATE_LIMITED") {
                return Err(Error::RateLimitExceeded);
            }
            let messages: Vec<&str> = self.errors.iter().map(|e| e.message.as_str()).collect();
            return Err(Error::GraphQl(messages.join("; ")));
        }

        self.data
            .ok_or_else(|| Error::InvalidResponse("GraphQL response carried no data".to_string()))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PageInfo {
    pub has_next_page: bool,
    pub end_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Connection<T> {
    #[serde(default = "Vec::new")]
    pub nodes: Vec<Option<T>>,
    pub page_info: PageInfo,
}

impl<T> Connection<T> {
    /// Converts the connection into a page, dropping null nodes.
    pub(crate) fn into_page(self) -> Page<T> {
        Page {
            nodes: self.nodes.into_iter().flatten().collect(),
            has_next_page: self.page_info.has_next_page,
            end_cursor: self.page_info.end_cursor,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct NodeData<T> {
    pub node: Option<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RepositoryRules {
    pub branch_protection_rules: Connection<BranchProtectionRule>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RepositoryRulesData {
    pub repository: Option<RepositoryRules>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ActorAllowances {
    pub allowances: Connection<ActorAllowanceNode>,
}

/// An allowance node; the actor is null when the principal has since been deleted.
#[derive(Debug, Deserialize)]
pub(crate) struct ActorAllowanceNode {
    pub actor: Option<GraphQlActor>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "__typename")]
pub(crate) enum GraphQlActor {
    User { id: String, login: String },
    App { id: String, slug: String },
    Team { id: String, slug: String },
    #[serde(other)]
    Unsupported,
}

impl GraphQlActor {
    pub(crate) fn into_actor(self) -> Option<ActorRef> {
        match self {
            GraphQlActor::User { id, login } => Some(ActorRef::new(ActorKind::User, id, login)),
            GraphQlActor::App { id, slug } => Some(ActorRef::new(ActorKind::App, id, slug)),
            GraphQlActor::Team { id, slug } => Some(ActorRef::new(ActorKind::Team, id, slug)),
            GraphQlActor::Unsupported => None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RuleMutationPayload {
    pub branch_protection_rule: Option<BranchProtectionRule>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateRuleData {
    pub create_branch_protection_rule: Option<RuleMutationPayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UpdateRuleData {
    pub update_branch_protection_rule: Option<RuleMutationPayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DeleteRuleData {
    #[allow(dead_code)]
    pub delete_branch_protection_rule: Option<serde_json::Value>,
}
