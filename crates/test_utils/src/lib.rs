//! Test utilities for engine and integration tests.
//!
//! [`FakeGitHub`] is an in-memory stand-in for every GitHub client trait. Each test builds its
//! own instance, seeds it with fixtures, and afterwards inspects both the remote state and the
//! list of calls the code under test made. Failures and latency can be injected per kind and
//! operation.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use github_client::models::AccountRef;
use github_client::{
    team_slug, ActorCollections, ActorGrouping, ActorKind, ActorRef, BranchProtectionClient,
    BranchProtectionRule, BranchProtectionRuleInput, Error, Organization, OrganizationClient,
    OrganizationCreatePayload, OrganizationSettingsUpdate, Page, Repository, RepositoryClient,
    RepositoryCreatePayload, RepositorySettingsUpdate, RuleRepository, RuleRepositoryOwner, Team,
    TeamClient, TeamCreatePayload, TeamParent, TeamSettingsUpdate, PAGE_SIZE,
};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;

/// The remote entity kind a call addressed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RemoteKind {
    Organization,
    Repository,
    Team,
    BranchProtectionRule,
    /// Principals referenced by actor allowances
    Actor,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    GetById,
    GetByKey,
    Create,
    Update,
    Delete,
    ListActorPage,
    Resolve,
}

impl Operation {
    /// Returns `true` for operations that change remote state.
    pub fn is_mutation(&self) -> bool {
        matches!(self, Operation::Create | Operation::Update | Operation::Delete)
    }
}

/// One recorded client call.
#[derive(Clone, Debug, PartialEq)]
pub struct RemoteCall {
    pub kind: RemoteKind,
    pub operation: Operation,
    /// The addressed entity, e.g. `acme/widgets` or a node ID
    pub target: String,
    /// The serialized payload of create and update calls
    pub payload: Option<Value>,
}

struct Failure {
    kind: RemoteKind,
    operation: Operation,
    remaining: Option<usize>,
    make: fn() -> Error,
}

#[derive(Clone, Debug, Default)]
struct StoredRule {
    rule: BranchProtectionRule,
    actors: ActorCollections,
}

#[derive(Default)]
struct State {
    next_id: u64,
    organizations: BTreeMap<u64, Organization>,
    repositories: BTreeMap<u64, Repository>,
    teams: BTreeMap<u64, Team>,
    rules: BTreeMap<String, StoredRule>,
    principals: HashMap<(ActorKind, String), ActorRef>,
    calls: Vec<RemoteCall>,
    failures: Vec<Failure>,
    latency: Option<Duration>,
}

impl State {
    fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        1000 + self.next_id
    }

    fn organization_by_login(&self, login: &str) -> Option<&Organization> {
        self.organizations
            .values()
            .find(|org| org.login.eq_ignore_ascii_case(login))
    }

    fn repository_id(&self, owner: &str, name: &str) -> Option<u64> {
        self.repositories
            .values()
            .find(|repo| {
                repo.owner_login()
                    .is_some_and(|login| login.eq_ignore_ascii_case(owner))
                    && repo.name.eq_ignore_ascii_case(name)
            })
            .map(|repo| repo.id)
    }

    fn team_id(&self, org: &str, slug: &str) -> Option<u64> {
        self.teams
            .values()
            .find(|team| {
                team.organization.as_ref().is_some_and(|o| o.is(org))
                    && team.slug.eq_ignore_ascii_case(slug)
            })
            .map(|team| team.id)
    }

    fn account(&self, login: &str) -> AccountRef {
        AccountRef {
            id: self.organization_by_login(login).map_or(0, |org| org.id),
            login: login.to_string(),
        }
    }

    fn actor_by_id(&self, node_id: &str) -> Option<ActorRef> {
        if let Some(actor) = self.principals.values().find(|a| a.id == node_id) {
            return Some(actor.clone());
        }
        self.teams
            .values()
            .find(|team| team.node_id == node_id)
            .map(|team| ActorRef::new(ActorKind::Team, &team.node_id, &team.slug))
    }

    /// Applies a rule input, resolving actor node IDs back to principals the way GitHub does.
    fn apply_rule_input(
        &self,
        stored: &mut StoredRule,
        input: &BranchProtectionRuleInput,
    ) -> Result<(), Error> {
        let rule = &mut stored.rule;
        macro_rules! assign {
            ($($field:ident),+ $(,)?) => {
                $(if let Some(value) = &input.$field { rule.$field = value.clone(); })+
            };
        }
        assign!(
            pattern,
            allows_deletions,
            allows_force_pushes,
            blocks_creations,
            dismisses_stale_reviews,
            is_admin_enforced,
            lock_allows_fetch_and_merge,
            lock_branch,
            require_last_push_approval,
            required_status_check_contexts,
            requires_approving_reviews,
            requires_code_owner_reviews,
            requires_commit_signatures,
            requires_conversation_resolution,
            requires_linear_history,
            requires_status_checks,
            requires_strict_status_checks,
            restricts_pushes,
            restricts_review_dismissals,
        );
        if let Some(count) = input.required_approving_review_count {
            rule.required_approving_review_count = Some(count);
        }

        for grouping in ActorGrouping::ALL {
            if let Some(ids) = input.actor_ids(grouping) {
                let actors = ids
                    .iter()
                    .map(|id| {
                        self.actor_by_id(id).ok_or_else(|| {
                            Error::GraphQl(format!("Could not resolve to a node with the global id of '{id}'"))
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                stored.actors.set(grouping, actors);
            }
        }
        Ok(())
    }
}

/// An in-memory GitHub.
///
/// # Examples
///
/// ```rust
/// use github_client::RepositoryClient;
/// use test_utils::{repository_fixture, FakeGitHub, Operation, RemoteKind};
///
/// # async fn example() {
/// let fake = FakeGitHub::new();
/// fake.insert_repository(repository_fixture(1, "acme", "widgets"));
///
/// let repo = fake.get_repository("acme", "widgets").await.unwrap();
///
/// assert_eq!(repo.id, 1);
/// assert_eq!(fake.calls_of(RemoteKind::Repository, Operation::GetByKey).len(), 1);
/// # }
/// ```
pub struct FakeGitHub {
    state: Mutex<State>,
    page_size: usize,
}

impl FakeGitHub {
    pub fn new() -> Self {
        Self::with_page_size(PAGE_SIZE as usize)
    }

    /// Creates a fake that splits actor collections into pages of `page_size` nodes.
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            state: Mutex::new(State::default()),
            page_size: page_size.max(1),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // Fixtures

    pub fn insert_organization(&self, organization: Organization) {
        self.state()
            .organizations
            .insert(organization.id, organization);
    }

    pub fn insert_repository(&self, repository: Repository) {
        self.state().repositories.insert(repository.id, repository);
    }

    pub fn insert_team(&self, team: Team) {
        self.state().teams.insert(team.id, team);
    }

    pub fn insert_rule(&self, rule: BranchProtectionRule, actors: ActorCollections) {
        self.state()
            .rules
            .insert(rule.id.clone(), StoredRule { rule, actors });
    }

    /// Registers a principal that `resolve_actor` can find and rule updates can reference.
    pub fn add_principal(&self, kind: ActorKind, name: &str, node_id: &str) {
        self.state().principals.insert(
            (kind, name.to_ascii_lowercase()),
            ActorRef::new(kind, node_id, name),
        );
    }

    // Remote state

    pub fn organization(&self, id: u64) -> Option<Organization> {
        self.state().organizations.get(&id).cloned()
    }

    pub fn repository(&self, id: u64) -> Option<Repository> {
        self.state().repositories.get(&id).cloned()
    }

    pub fn find_repository(&self, owner: &str, name: &str) -> Option<Repository> {
        let state = self.state();
        state
            .repository_id(owner, name)
            .and_then(|id| state.repositories.get(&id).cloned())
    }

    pub fn repository_count(&self) -> usize {
        self.state().repositories.len()
    }

    pub fn team(&self, id: u64) -> Option<Team> {
        self.state().teams.get(&id).cloned()
    }

    pub fn find_team(&self, org: &str, slug: &str) -> Option<Team> {
        let state = self.state();
        state
            .team_id(org, slug)
            .and_then(|id| state.teams.get(&id).cloned())
    }

    pub fn rule(&self, id: &str) -> Option<BranchProtectionRule> {
        self.state().rules.get(id).map(|stored| stored.rule.clone())
    }

    pub fn rule_actors(&self, id: &str) -> Option<ActorCollections> {
        self.state().rules.get(id).map(|stored| stored.actors.clone())
    }

    pub fn rule_count(&self) -> usize {
        self.state().rules.len()
    }

    /// Removes an entity behind the engine's back, as another administrator would.
    pub fn remove_repository(&self, id: u64) -> Option<Repository> {
        self.state().repositories.remove(&id)
    }

    /// Edits a repository behind the engine's back.
    pub fn modify_repository(&self, id: u64, edit: impl FnOnce(&mut Repository)) {
        if let Some(repo) = self.state().repositories.get_mut(&id) {
            edit(repo);
        }
    }

    // Calls

    pub fn calls(&self) -> Vec<RemoteCall> {
        self.state().calls.clone()
    }

    pub fn calls_of(&self, kind: RemoteKind, operation: Operation) -> Vec<RemoteCall> {
        self.state()
            .calls
            .iter()
            .filter(|call| call.kind == kind && call.operation == operation)
            .cloned()
            .collect()
    }

    /// Number of create, update and delete calls made so far.
    pub fn mutation_count(&self) -> usize {
        self.state()
            .calls
            .iter()
            .filter(|call| call.operation.is_mutation())
            .count()
    }

    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    // Fault injection

    /// Makes every matching call fail with the error built by `make` until cleared.
    pub fn fail(&self, kind: RemoteKind, operation: Operation, make: fn() -> Error) {
        self.state().failures.push(Failure {
            kind,
            operation,
            remaining: None,
            make,
        });
    }

    /// Makes the next `times` matching calls fail.
    pub fn fail_times(&self, kind: RemoteKind, operation: Operation, times: usize, make: fn() -> Error) {
        self.state().failures.push(Failure {
            kind,
            operation,
            remaining: Some(times),
            make,
        });
    }

    pub fn clear_failures(&self) {
        self.state().failures.clear();
    }

    /// Delays every subsequent call by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        self.state().latency = Some(latency);
    }

    pub fn clear_latency(&self) {
        self.state().latency = None;
    }

    /// Records a call and applies injected latency and failures.
    async fn begin(
        &self,
        kind: RemoteKind,
        operation: Operation,
        target: String,
        payload: Option<Value>,
    ) -> Result<(), Error> {
        let (latency, failure) = {
            let mut state = self.state();
            debug!(?kind, ?operation, target = target.as_str(), "Fake GitHub call");
            state.calls.push(RemoteCall {
                kind,
                operation,
                target,
                payload,
            });

            let mut failure = None;
            for entry in state.failures.iter_mut() {
                if entry.kind != kind || entry.operation != operation {
                    continue;
                }
                if let Some(remaining) = entry.remaining.as_mut() {
                    if *remaining == 0 {
                        continue;
                    }
                    *remaining -= 1;
                }
                failure = Some(entry.make);
                break;
            }
            (state.latency, failure)
        };

        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        match failure {
            Some(make) => Err(make()),
            None => Ok(()),
        }
    }
}

impl Default for FakeGitHub {
    fn default() -> Self {
        Self::new()
    }
}

fn payload<T: Serialize>(value: &T) -> Option<Value> {
    serde_json::to_value(value).ok()
}

fn already_exists(what: &str) -> Error {
    Error::Api {
        status: 422,
        message: format!("{what} already exists"),
    }
}

#[async_trait]
impl OrganizationClient for FakeGitHub {
    async fn get_organization_by_id(&self, id: u64) -> Result<Organization, Error> {
        self.begin(RemoteKind::Organization, Operation::GetById, id.to_string(), None)
            .await?;
        self.state()
            .organizations
            .get(&id)
            .cloned()
            .ok_or(Error::NotFound)
    }

    async fn get_organization(&self, login: &str) -> Result<Organization, Error> {
        self.begin(RemoteKind::Organization, Operation::GetByKey, login.to_string(), None)
            .await?;
        self.state()
            .organization_by_login(login)
            .cloned()
            .ok_or(Error::NotFound)
    }

    async fn create_organization(
        &self,
        payload_in: &OrganizationCreatePayload,
    ) -> Result<Organization, Error> {
        self.begin(
            RemoteKind::Organization,
            Operation::Create,
            payload_in.login.clone(),
            payload(payload_in),
        )
        .await?;
        let mut state = self.state();
        if state.organization_by_login(&payload_in.login).is_some() {
            return Err(already_exists("Organization"));
        }
        let id = state.allocate_id();
        let organization = Organization {
            id,
            node_id: format!("O_{id}"),
            login: payload_in.login.clone(),
            name: payload_in.profile_name.clone(),
            default_repository_permission: Some("read".to_string()),
            members_can_create_repositories: Some(true),
            has_organization_projects: Some(true),
            has_repository_projects: Some(true),
            web_commit_signoff_required: Some(false),
            ..Default::default()
        };
        state.organizations.insert(id, organization.clone());
        Ok(organization)
    }

    async fn update_organization(
        &self,
        login: &str,
        update: &OrganizationSettingsUpdate,
    ) -> Result<Organization, Error> {
        self.begin(
            RemoteKind::Organization,
            Operation::Update,
            login.to_string(),
            payload(update),
        )
        .await?;
        let mut state = self.state();
        let id = state
            .organization_by_login(login)
            .map(|org| org.id)
            .ok_or(Error::NotFound)?;
        let org = state.organizations.get_mut(&id).ok_or(Error::NotFound)?;
        macro_rules! assign {
            ($($field:ident),+ $(,)?) => {
                $(if let Some(value) = &update.$field { org.$field = Some(value.clone()); })+
            };
        }
        assign!(
            name,
            description,
            company,
            blog,
            location,
            email,
            billing_email,
            twitter_username,
            default_repository_permission,
            members_can_create_repositories,
            has_organization_projects,
            has_repository_projects,
            web_commit_signoff_required,
        );
        Ok(org.clone())
    }

    async fn delete_organization(&self, login: &str) -> Result<(), Error> {
        self.begin(RemoteKind::Organization, Operation::Delete, login.to_string(), None)
            .await?;
        let mut state = self.state();
        let id = state
            .organization_by_login(login)
            .map(|org| org.id)
            .ok_or(Error::NotFound)?;
        state.organizations.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl RepositoryClient for FakeGitHub {
    async fn get_repository_by_id(&self, id: u64) -> Result<Repository, Error> {
        self.begin(RemoteKind::Repository, Operation::GetById, id.to_string(), None)
            .await?;
        self.state()
            .repositories
            .get(&id)
            .cloned()
            .ok_or(Error::NotFound)
    }

    async fn get_repository(&self, owner: &str, repo: &str) -> Result<Repository, Error> {
        self.begin(
            RemoteKind::Repository,
            Operation::GetByKey,
            format!("{owner}/{repo}"),
            None,
        )
        .await?;
        let state = self.state();
        state
            .repository_id(owner, repo)
            .and_then(|id| state.repositories.get(&id).cloned())
            .ok_or(Error::NotFound)
    }

    async fn create_repository(
        &self,
        owner: &str,
        payload_in: &RepositoryCreatePayload,
    ) -> Result<Repository, Error> {
        self.begin(
            RemoteKind::Repository,
            Operation::Create,
            format!("{owner}/{}", payload_in.name),
            payload(payload_in),
        )
        .await?;
        let mut state = self.state();
        if state.repository_id(owner, &payload_in.name).is_some() {
            return Err(already_exists("Repository"));
        }
        let id = state.allocate_id();
        let private = payload_in.private.unwrap_or(false);
        let repository = Repository {
            id,
            node_id: format!("R_{id}"),
            name: payload_in.name.clone(),
            full_name: format!("{owner}/{}", payload_in.name),
            owner: Some(state.account(owner)),
            description: payload_in.description.clone(),
            homepage: payload_in.homepage.clone(),
            private,
            visibility: Some(payload_in.visibility.clone().unwrap_or_else(|| {
                let default = if private { "private" } else { "public" };
                default.to_string()
            })),
            has_issues: payload_in.has_issues.unwrap_or(true),
            has_projects: payload_in.has_projects.unwrap_or(true),
            has_wiki: payload_in.has_wiki.unwrap_or(true),
            is_template: payload_in.is_template.unwrap_or(false),
            archived: false,
            default_branch: Some("main".to_string()),
            allow_squash_merge: Some(payload_in.allow_squash_merge.unwrap_or(true)),
            allow_merge_commit: Some(payload_in.allow_merge_commit.unwrap_or(true)),
            allow_rebase_merge: Some(payload_in.allow_rebase_merge.unwrap_or(true)),
            allow_auto_merge: Some(payload_in.allow_auto_merge.unwrap_or(false)),
            delete_branch_on_merge: Some(payload_in.delete_branch_on_merge.unwrap_or(false)),
        };
        state.repositories.insert(id, repository.clone());
        Ok(repository)
    }

    async fn update_repository(
        &self,
        owner: &str,
        repo: &str,
        update: &RepositorySettingsUpdate,
    ) -> Result<Repository, Error> {
        self.begin(
            RemoteKind::Repository,
            Operation::Update,
            format!("{owner}/{repo}"),
            payload(update),
        )
        .await?;
        let mut state = self.state();
        let id = state.repository_id(owner, repo).ok_or(Error::NotFound)?;
        let repository = state.repositories.get_mut(&id).ok_or(Error::NotFound)?;
        macro_rules! assign {
            ($($field:ident),+ $(,)?) => {
                $(if let Some(value) = &update.$field { repository.$field = value.clone(); })+
            };
        }
        macro_rules! assign_optional {
            ($($field:ident),+ $(,)?) => {
                $(if let Some(value) = &update.$field { repository.$field = Some(value.clone()); })+
            };
        }
        assign!(name, private, has_issues, has_projects, has_wiki, is_template, archived);
        assign_optional!(
            description,
            homepage,
            visibility,
            default_branch,
            allow_squash_merge,
            allow_merge_commit,
            allow_rebase_merge,
            allow_auto_merge,
            delete_branch_on_merge,
        );
        repository.full_name = format!("{owner}/{}", repository.name);
        Ok(repository.clone())
    }

    async fn delete_repository(&self, owner: &str, repo: &str) -> Result<(), Error> {
        self.begin(
            RemoteKind::Repository,
            Operation::Delete,
            format!("{owner}/{repo}"),
            None,
        )
        .await?;
        let mut state = self.state();
        let id = state.repository_id(owner, repo).ok_or(Error::NotFound)?;
        state.repositories.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl TeamClient for FakeGitHub {
    async fn get_team_by_id(&self, org_id: u64, team_id: u64) -> Result<Team, Error> {
        self.begin(
            RemoteKind::Team,
            Operation::GetById,
            format!("{org_id}/{team_id}"),
            None,
        )
        .await?;
        self.state()
            .teams
            .get(&team_id)
            .filter(|team| team.organization.as_ref().is_some_and(|o| o.id == org_id))
            .cloned()
            .ok_or(Error::NotFound)
    }

    async fn get_team(&self, org: &str, slug: &str) -> Result<Team, Error> {
        self.begin(RemoteKind::Team, Operation::GetByKey, format!("{org}/{slug}"), None)
            .await?;
        let state = self.state();
        state
            .team_id(org, slug)
            .and_then(|id| state.teams.get(&id).cloned())
            .ok_or(Error::NotFound)
    }

    async fn create_team(&self, org: &str, payload_in: &TeamCreatePayload) -> Result<Team, Error> {
        let slug = team_slug(&payload_in.name);
        self.begin(
            RemoteKind::Team,
            Operation::Create,
            format!("{org}/{slug}"),
            payload(payload_in),
        )
        .await?;
        let mut state = self.state();
        if state.team_id(org, &slug).is_some() {
            return Err(already_exists("Team"));
        }
        let parent = match payload_in.parent_team_id {
            Some(parent_id) => {
                let parent = state.teams.get(&parent_id).ok_or_else(|| Error::Api {
                    status: 422,
                    message: format!("Parent team {parent_id} does not exist"),
                })?;
                Some(TeamParent {
                    id: parent.id,
                    slug: parent.slug.clone(),
                })
            }
            None => None,
        };
        let id = state.allocate_id();
        let team = Team {
            id,
            node_id: format!("T_{id}"),
            name: payload_in.name.clone(),
            slug,
            description: payload_in.description.clone(),
            privacy: Some(
                payload_in
                    .privacy
                    .clone()
                    .unwrap_or_else(|| "secret".to_string()),
            ),
            notification_setting: Some(
                payload_in
                    .notification_setting
                    .clone()
                    .unwrap_or_else(|| "notifications_enabled".to_string()),
            ),
            parent,
            organization: Some(state.account(org)),
        };
        state.teams.insert(id, team.clone());
        Ok(team)
    }

    async fn update_team(
        &self,
        org: &str,
        slug: &str,
        update: &TeamSettingsUpdate,
    ) -> Result<Team, Error> {
        self.begin(
            RemoteKind::Team,
            Operation::Update,
            format!("{org}/{slug}"),
            payload(update),
        )
        .await?;
        let mut state = self.state();
        let id = state.team_id(org, slug).ok_or(Error::NotFound)?;
        let parent = match update.parent_team_id {
            Some(parent_id) => {
                let parent = state.teams.get(&parent_id).ok_or(Error::Api {
                    status: 422,
                    message: format!("Parent team {parent_id} does not exist"),
                })?;
                Some(TeamParent {
                    id: parent.id,
                    slug: parent.slug.clone(),
                })
            }
            None => None,
        };
        let team = state.teams.get_mut(&id).ok_or(Error::NotFound)?;
        if let Some(name) = &update.name {
            team.name = name.clone();
            team.slug = team_slug(name);
        }
        if let Some(description) = &update.description {
            team.description = Some(description.clone());
        }
        if let Some(privacy) = &update.privacy {
            team.privacy = Some(privacy.clone());
        }
        if let Some(setting) = &update.notification_setting {
            team.notification_setting = Some(setting.clone());
        }
        if parent.is_some() {
            team.parent = parent;
        }
        Ok(team.clone())
    }

    async fn delete_team(&self, org: &str, slug: &str) -> Result<(), Error> {
        self.begin(RemoteKind::Team, Operation::Delete, format!("{org}/{slug}"), None)
            .await?;
        let mut state = self.state();
        let id = state.team_id(org, slug).ok_or(Error::NotFound)?;
        state.teams.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl BranchProtectionClient for FakeGitHub {
    async fn get_branch_protection_rule(&self, rule_id: &str) -> Result<BranchProtectionRule, Error> {
        self.begin(
            RemoteKind::BranchProtectionRule,
            Operation::GetById,
            rule_id.to_string(),
            None,
        )
        .await?;
        self.rule(rule_id).ok_or(Error::NotFound)
    }

    async fn find_branch_protection_rule(
        &self,
        owner: &str,
        repo: &str,
        pattern: &str,
    ) -> Result<BranchProtectionRule, Error> {
        self.begin(
            RemoteKind::BranchProtectionRule,
            Operation::GetByKey,
            format!("{owner}/{repo}:{pattern}"),
            None,
        )
        .await?;
        let state = self.state();
        let repo_id = state.repository_id(owner, repo).ok_or(Error::NotFound)?;
        let node_id = state
            .repositories
            .get(&repo_id)
            .map(|r| r.node_id.clone())
            .ok_or(Error::NotFound)?;
        state
            .rules
            .values()
            .map(|stored| &stored.rule)
            .find(|rule| {
                rule.repository.as_ref().is_some_and(|r| r.id == node_id) && rule.pattern == pattern
            })
            .cloned()
            .ok_or(Error::NotFound)
    }

    async fn create_branch_protection_rule(
        &self,
        repository_id: &str,
        input: &BranchProtectionRuleInput,
    ) -> Result<BranchProtectionRule, Error> {
        self.begin(
            RemoteKind::BranchProtectionRule,
            Operation::Create,
            repository_id.to_string(),
            payload(input),
        )
        .await?;
        let mut state = self.state();
        let repository = state
            .repositories
            .values()
            .find(|r| r.node_id == repository_id)
            .cloned()
            .ok_or(Error::NotFound)?;
        let pattern = input
            .pattern
            .clone()
            .ok_or_else(|| Error::GraphQl("pattern is required".to_string()))?;
        let duplicate = state.rules.values().any(|stored| {
            stored.rule.pattern == pattern
                && stored
                    .rule
                    .repository
                    .as_ref()
                    .is_some_and(|r| r.id == repository_id)
        });
        if duplicate {
            return Err(Error::GraphQl(format!(
                "Name already protected: {pattern}"
            )));
        }

        let id = format!("BPR_{}", state.allocate_id());
        let mut stored = StoredRule {
            rule: BranchProtectionRule {
                id: id.clone(),
                pattern,
                repository: Some(RuleRepository {
                    id: repository.node_id.clone(),
                    name: repository.name.clone(),
                    owner: RuleRepositoryOwner {
                        login: repository.owner_login().unwrap_or_default().to_string(),
                    },
                }),
                ..Default::default()
            },
            actors: ActorCollections::default(),
        };
        state.apply_rule_input(&mut stored, input)?;
        let rule = stored.rule.clone();
        state.rules.insert(id, stored);
        Ok(rule)
    }

    async fn update_branch_protection_rule(
        &self,
        rule_id: &str,
        input: &BranchProtectionRuleInput,
    ) -> Result<BranchProtectionRule, Error> {
        self.begin(
            RemoteKind::BranchProtectionRule,
            Operation::Update,
            rule_id.to_string(),
            payload(input),
        )
        .await?;
        let mut state = self.state();
        let mut stored = state.rules.get(rule_id).cloned().ok_or(Error::NotFound)?;
        state.apply_rule_input(&mut stored, input)?;
        let rule = stored.rule.clone();
        state.rules.insert(rule_id.to_string(), stored);
        Ok(rule)
    }

    async fn delete_branch_protection_rule(&self, rule_id: &str) -> Result<(), Error> {
        self.begin(
            RemoteKind::BranchProtectionRule,
            Operation::Delete,
            rule_id.to_string(),
            None,
        )
        .await?;
        self.state()
            .rules
            .remove(rule_id)
            .map(|_| ())
            .ok_or(Error::NotFound)
    }

    async fn list_actor_collection_page(
        &self,
        rule_id: &str,
        grouping: ActorGrouping,
        cursor: Option<String>,
    ) -> Result<Page<ActorRef>, Error> {
        self.begin(
            RemoteKind::BranchProtectionRule,
            Operation::ListActorPage,
            format!("{rule_id}:{grouping}:{}", cursor.as_deref().unwrap_or("")),
            None,
        )
        .await?;
        let state = self.state();
        let stored = state.rules.get(rule_id).ok_or(Error::NotFound)?;
        let actors = stored.actors.get(grouping);

        let start = match cursor {
            Some(cursor) => cursor
                .parse::<usize>()
                .map_err(|_| Error::GraphQl(format!("invalid cursor '{cursor}'")))?,
            None => 0,
        };
        let end = (start + self.page_size).min(actors.len());
        let nodes = actors.get(start..end).unwrap_or_default().to_vec();
        Ok(if end < actors.len() {
            Page::with_next(nodes, end.to_string())
        } else {
            Page::last(nodes)
        })
    }

    async fn resolve_actor(&self, org: &str, kind: ActorKind, name: &str) -> Result<String, Error> {
        self.begin(
            RemoteKind::Actor,
            Operation::Resolve,
            format!("{kind}:{name}"),
            None,
        )
        .await?;
        let state = self.state();
        if let Some(actor) = state.principals.get(&(kind, name.to_ascii_lowercase())) {
            return Ok(actor.id.clone());
        }
        if kind == ActorKind::Team {
            if let Some(team) = state.team_id(org, name).and_then(|id| state.teams.get(&id)) {
                return Ok(team.node_id.clone());
            }
        }
        Err(Error::NotFound)
    }
}

// Fixture builders

pub fn organization_fixture(id: u64, login: &str) -> Organization {
    Organization {
        id,
        node_id: format!("O_{id}"),
        login: login.to_string(),
        ..Default::default()
    }
}

/// A public repository with GitHub's default settings.
pub fn repository_fixture(id: u64, owner: &str, name: &str) -> Repository {
    Repository {
        id,
        node_id: format!("R_{id}"),
        name: name.to_string(),
        full_name: format!("{owner}/{name}"),
        owner: Some(AccountRef {
            id: 0,
            login: owner.to_string(),
        }),
        visibility: Some("public".to_string()),
        has_issues: true,
        has_projects: true,
        has_wiki: true,
        default_branch: Some("main".to_string()),
        ..Default::default()
    }
}

pub fn team_fixture(id: u64, organization: &Organization, name: &str) -> Team {
    Team {
        id,
        node_id: format!("T_{id}"),
        name: name.to_string(),
        slug: team_slug(name),
        privacy: Some("secret".to_string()),
        notification_setting: Some("notifications_enabled".to_string()),
        organization: Some(AccountRef {
            id: organization.id,
            login: organization.login.clone(),
        }),
        ..Default::default()
    }
}

/// An unrestricted rule on `repository`.
pub fn rule_fixture(id: &str, repository: &Repository, pattern: &str) -> BranchProtectionRule {
    BranchProtectionRule {
        id: id.to_string(),
        pattern: pattern.to_string(),
        repository: Some(RuleRepository {
            id: repository.node_id.clone(),
            name: repository.name.clone(),
            owner: RuleRepositoryOwner {
                login: repository.owner_login().unwrap_or_default().to_string(),
            },
        }),
        ..Default::default()
    }
}
