//! Branch protection rule records.
//!
//! Rules are the one kind with actor allowance lists. The observed snapshot always carries
//! every allowance collection fully drained, so diffs never see a partial collection.

use std::sync::Arc;

use async_trait::async_trait;
use github_client::{
    ActorCollections, ActorGrouping, BranchProtectionClient, BranchProtectionRule,
    BranchProtectionRuleInput, RepositoryClient,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::actor_set::{plan_actor_set, resolve_replacement_ids, ActorSelection};
use crate::{Diff, FieldDiffer, ReconcileError, ResourceDriver, ResourceKind};

#[cfg(test)]
#[path = "branch_protection_tests.rs"]
mod tests;

/// Desired state of a branch protection rule, identified by repository and pattern.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BranchProtectionSpec {
    pub owner: String,
    pub repository: String,
    pub pattern: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allows_deletions: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allows_force_pushes: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocks_creations: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dismisses_stale_reviews: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_admin_enforced: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lock_allows_fetch_and_merge: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lock_branch: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub require_last_push_approval: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_approving_review_count: Option<u32>,
    /// Compared as an ordered list
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_status_check_contexts: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires_approving_reviews: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires_code_owner_reviews: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires_commit_signatures: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires_conversation_resolution: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires_linear_history: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires_status_checks: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires_strict_status_checks: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restricts_pushes: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restricts_review_dismissals: Option<bool>,
    #[serde(default)]
    pub bypass_force_push: ActorSelection,
    #[serde(default)]
    pub bypass_pull_request: ActorSelection,
    #[serde(default)]
    pub push_allowances: ActorSelection,
    #[serde(default)]
    pub review_dismissals: ActorSelection,
}

impl BranchProtectionSpec {
    pub fn new(
        owner: impl Into<String>,
        repository: impl Into<String>,
        pattern: impl Into<String>,
    ) -> Self {
        Self {
            owner: owner.into(),
            repository: repository.into(),
            pattern: pattern.into(),
            ..Default::default()
        }
    }

    pub fn actors(&self, grouping: ActorGrouping) -> &ActorSelection {
        match grouping {
            ActorGrouping::BypassForcePush => &self.bypass_force_push,
            ActorGrouping::BypassPullRequest => &self.bypass_pull_request,
            ActorGrouping::PushAllowance => &self.push_allowances,
            ActorGrouping::ReviewDismissal => &self.review_dismissals,
        }
    }

    /// The scalar settings, for creating a rule. Actor lists converge through the update
    /// that follows creation, once their names are resolved.
    fn create_input(&self) -> BranchProtectionRuleInput {
        BranchProtectionRuleInput {
            pattern: Some(self.pattern.clone()),
            allows_deletions: self.allows_deletions,
            allows_force_pushes: self.allows_force_pushes,
            blocks_creations: self.blocks_creations,
            dismisses_stale_reviews: self.dismisses_stale_reviews,
            is_admin_enforced: self.is_admin_enforced,
            lock_allows_fetch_and_merge: self.lock_allows_fetch_and_merge,
            lock_branch: self.lock_branch,
            require_last_push_approval: self.require_last_push_approval,
            required_approving_review_count: self.required_approving_review_count,
            required_status_check_contexts: self.required_status_check_contexts.clone(),
            requires_approving_reviews: self.requires_approving_reviews,
            requires_code_owner_reviews: self.requires_code_owner_reviews,
            requires_commit_signatures: self.requires_commit_signatures,
            requires_conversation_resolution: self.requires_conversation_resolution,
            requires_linear_history: self.requires_linear_history,
            requires_status_checks: self.requires_status_checks,
            requires_strict_status_checks: self.requires_strict_status_checks,
            restricts_pushes: self.restricts_pushes,
            restricts_review_dismissals: self.restricts_review_dismissals,
            ..Default::default()
        }
    }
}

/// A rule together with its fully drained actor allowance collections.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ObservedBranchProtection {
    pub rule: BranchProtectionRule,
    pub actors: ActorCollections,
}

/// Drives branch protection rules through the GraphQL API.
pub struct BranchProtectionDriver {
    rules: Arc<dyn BranchProtectionClient>,
    repositories: Arc<dyn RepositoryClient>,
}

impl BranchProtectionDriver {
    pub fn new(
        rules: Arc<dyn BranchProtectionClient>,
        repositories: Arc<dyn RepositoryClient>,
    ) -> Self {
        Self {
            rules,
            repositories,
        }
    }

    async fn observe(
        &self,
        rule: BranchProtectionRule,
    ) -> Result<ObservedBranchProtection, ReconcileError> {
        let actors = self.rules.list_actor_collections(&rule.id).await?;
        Ok(ObservedBranchProtection { rule, actors })
    }
}

/// Compares the boolean settings of a rule, which all follow the same rule.
macro_rules! diff_flags {
    ($differ:ident, $spec:ident, $rule:ident, [$($field:ident),+ $(,)?]) => {
        $(
            $differ.optional(
                stringify!($field),
                &$spec.$field,
                Some(&$rule.$field),
                |c, v| c.$field = Some(v),
            );
        )+
    };
}

#[async_trait]
impl ResourceDriver for BranchProtectionDriver {
    type Spec = BranchProtectionSpec;
    type Observed = ObservedBranchProtection;
    type ChangeSet = BranchProtectionRuleInput;

    const KIND: ResourceKind = ResourceKind::BranchProtectionRule;

    fn validate(&self, spec: &BranchProtectionSpec) -> Result<(), ReconcileError> {
        if spec.owner.trim().is_empty()
            || spec.repository.trim().is_empty()
            || spec.pattern.is_empty()
        {
            return Err(ReconcileError::InvalidSpec(
                "rule owner, repository and pattern must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    fn remote_id(&self, observed: &ObservedBranchProtection) -> String {
        observed.rule.id.clone()
    }

    async fn fetch_bound(
        &self,
        _spec: &BranchProtectionSpec,
        bound: &ObservedBranchProtection,
    ) -> Result<ObservedBranchProtection, ReconcileError> {
        let rule = self.rules.get_branch_protection_rule(&bound.rule.id).await?;
        self.observe(rule).await
    }

    async fn fetch_by_key(
        &self,
        spec: &BranchProtectionSpec,
    ) -> Result<ObservedBranchProtection, ReconcileError> {
        let rule = self
            .rules
            .find_branch_protection_rule(&spec.owner, &spec.repository, &spec.pattern)
            .await?;
        self.observe(rule).await
    }

    async fn create(
        &self,
        spec: &BranchProtectionSpec,
    ) -> Result<ObservedBranchProtection, ReconcileError> {
        let repository = self
            .repositories
            .get_repository(&spec.owner, &spec.repository)
            .await
            .map_err(|e| {
                if e.is_not_found() {
                    ReconcileError::InvalidSpec(format!(
                        "repository {}/{} does not exist",
                        spec.owner, spec.repository
                    ))
                } else {
                    e.into()
                }
            })?;
        let rule = self
            .rules
            .create_branch_protection_rule(&repository.node_id, &spec.create_input())
            .await?;
        Ok(ObservedBranchProtection {
            rule,
            actors: ActorCollections::default(),
        })
    }

    fn check_binding(
        &self,
        spec: &BranchProtectionSpec,
        observed: &ObservedBranchProtection,
    ) -> Result<(), String> {
        let Some(repository) = &observed.rule.repository else {
            return Ok(());
        };
        if repository.owner.login.eq_ignore_ascii_case(&spec.owner)
            && repository.name.eq_ignore_ascii_case(&spec.repository)
        {
            Ok(())
        } else {
            Err(format!(
                "rule {} protects {}/{}, expected {}/{}",
                observed.rule.id,
                repository.owner.login,
                repository.name,
                spec.owner,
                spec.repository
            ))
        }
    }

    async fn diff(
        &self,
        spec: &BranchProtectionSpec,
        observed: &ObservedBranchProtection,
    ) -> Result<Diff<BranchProtectionRuleInput>, ReconcileError> {
        let rule = &observed.rule;
        let mut differ = FieldDiffer::<BranchProtectionRuleInput>::new();

        differ.required("pattern", &spec.pattern, &rule.pattern, |c, v| {
            c.pattern = Some(v)
        });
        diff_flags!(
            differ,
            spec,
            rule,
            [
                allows_deletions,
                allows_force_pushes,
                blocks_creations,
                dismisses_stale_reviews,
                is_admin_enforced,
                lock_allows_fetch_and_merge,
                lock_branch,
                require_last_push_approval,
                requires_approving_reviews,
                requires_code_owner_reviews,
                requires_commit_signatures,
                requires_conversation_resolution,
                requires_linear_history,
                requires_status_checks,
                requires_strict_status_checks,
                restricts_pushes,
                restricts_review_dismissals,
            ]
        );
        differ
            .count(
                "required_approving_review_count",
                spec.required_approving_review_count,
                rule.required_approving_review_count,
                |c, v| c.required_approving_review_count = Some(v),
            )
            .optional(
                "required_status_check_contexts",
                &spec.required_status_check_contexts,
                Some(&rule.required_status_check_contexts),
                |c, v| c.required_status_check_contexts = Some(v),
            );

        for grouping in ActorGrouping::ALL {
            let plan = plan_actor_set(grouping, spec.actors(grouping), observed.actors.get(grouping));
            if !plan.needs_update {
                continue;
            }
            debug!(
                grouping = %grouping,
                retained = plan.retained.len(),
                additions = plan.additions.len(),
                removals = plan.removals.len(),
                "Actor allowances differ"
            );
            let ids = resolve_replacement_ids(self.rules.as_ref(), &spec.owner, &plan).await?;
            differ.mark(grouping_field(grouping), |c| c.set_actor_ids(grouping, ids));
        }

        Ok(differ.finish())
    }

    async fn update(
        &self,
        _spec: &BranchProtectionSpec,
        observed: &ObservedBranchProtection,
        change_set: &BranchProtectionRuleInput,
    ) -> Result<ObservedBranchProtection, ReconcileError> {
        let rule = self
            .rules
            .update_branch_protection_rule(&observed.rule.id, change_set)
            .await?;
        self.observe(rule).await
    }

    async fn delete(
        &self,
        _spec: &BranchProtectionSpec,
        observed: &ObservedBranchProtection,
    ) -> Result<(), ReconcileError> {
        Ok(self
            .rules
            .delete_branch_protection_rule(&observed.rule.id)
            .await?)
    }
}

fn grouping_field(grouping: ActorGrouping) -> &'static str {
    match grouping {
        ActorGrouping::BypassForcePush => "bypass_force_push",
        ActorGrouping::BypassPullRequest => "bypass_pull_request",
        ActorGrouping::PushAllowance => "push_allowances",
        ActorGrouping::ReviewDismissal => "review_dismissals",
    }
}
