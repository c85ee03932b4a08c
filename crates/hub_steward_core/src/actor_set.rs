//! Actor allowance reconciliation for branch protection rules.
//!
//! A rule grants several permissions (bypassing force-push protection, bypassing required
//! pull requests, pushing to a restricted branch, dismissing reviews) to a mixed list of
//! principals. The desired side names them per kind (user logins, app slugs, team slugs); the
//! remote side reports one ID-addressed collection per grouping and only accepts a single
//! combined replacement list of node IDs. Planning therefore works on the unified
//! `(kind, name)` / [`ActorRef`] view and only touches the remote system to resolve the node
//! IDs of newly added principals.

use std::collections::BTreeSet;

use github_client::{ActorGrouping, ActorKind, ActorRef, BranchProtectionClient};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ReconcileError;

#[cfg(test)]
#[path = "actor_set_tests.rs"]
mod tests;

/// The principals declared for one grouping.
///
/// Each list is independently optional: `None` leaves principals of that kind unmanaged and
/// they are carried over untouched, `Some(vec![])` removes all of them.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorSelection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub users: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apps: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teams: Option<Vec<String>>,
}

impl ActorSelection {
    pub fn names(&self, kind: ActorKind) -> Option<&[String]> {
        match kind {
            ActorKind::User => self.users.as_deref(),
            ActorKind::App => self.apps.as_deref(),
            ActorKind::Team => self.teams.as_deref(),
        }
    }

    /// Returns `true` if no kind is managed.
    pub fn is_unmanaged(&self) -> bool {
        ActorKind::ALL.iter().all(|kind| self.names(*kind).is_none())
    }
}

/// What converging one grouping requires.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActorSetPlan {
    pub grouping: ActorGrouping,
    /// Whether any managed kind differs from the observed principals as a set
    pub needs_update: bool,
    /// Observed principals that stay, by kind then observed order
    pub retained: Vec<ActorRef>,
    /// Desired principals absent remotely, still to be resolved to node IDs
    pub additions: Vec<(ActorKind, String)>,
    /// Observed principals of managed kinds that are no longer desired
    pub removals: Vec<ActorRef>,
}

/// Case-insensitive key; GitHub logins and slugs are case-insensitive.
fn name_key(name: &str) -> String {
    name.to_ascii_lowercase()
}

/// Compares the desired principals of `grouping` against its fully drained observed
/// collection.
///
/// Desired and observed names are de-duplicated before the set comparison, so a declaration
/// that repeats a name does not cause a perpetual update.
pub fn plan_actor_set(
    grouping: ActorGrouping,
    desired: &ActorSelection,
    observed: &[ActorRef],
) -> ActorSetPlan {
    let mut plan = ActorSetPlan {
        grouping,
        needs_update: false,
        retained: Vec::new(),
        additions: Vec::new(),
        removals: Vec::new(),
    };

    for kind in ActorKind::ALL {
        let mut seen = BTreeSet::new();
        let current: Vec<&ActorRef> = observed
            .iter()
            .filter(|actor| actor.kind == kind)
            .filter(|actor| seen.insert(name_key(&actor.name)))
            .collect();

        let Some(names) = desired.names(kind) else {
            plan.retained.extend(current.into_iter().cloned());
            continue;
        };

        let mut wanted_keys = BTreeSet::new();
        let wanted: Vec<&String> = names
            .iter()
            .filter(|name| wanted_keys.insert(name_key(name)))
            .collect();

        if wanted_keys != seen {
            plan.needs_update = true;
        }

        for actor in current {
            if wanted_keys.contains(&name_key(&actor.name)) {
                plan.retained.push(actor.clone());
            } else {
                plan.removals.push(actor.clone());
            }
        }

        plan.additions.extend(
            wanted
                .into_iter()
                .filter(|name| !seen.contains(&name_key(name)))
                .map(|name| (kind, name.clone())),
        );
    }

    plan
}

/// Assembles the replacement ID list for a plan: retained IDs followed by the node IDs of
/// the additions, resolved one by one.
///
/// `organization` scopes team slugs.
///
/// # Errors
///
/// Returns [`ReconcileError::ActorResolution`] for the first addition that cannot be
/// resolved. No principal is ever silently dropped.
pub async fn resolve_replacement_ids(
    client: &dyn BranchProtectionClient,
    organization: &str,
    plan: &ActorSetPlan,
) -> Result<Vec<String>, ReconcileError> {
    let mut ids: Vec<String> = plan.retained.iter().map(|actor| actor.id.clone()).collect();

    for (kind, name) in &plan.additions {
        let id = client
            .resolve_actor(organization, *kind, name)
            .await
            .map_err(|source| ReconcileError::ActorResolution {
                kind: *kind,
                name: name.clone(),
                source,
            })?;
        debug!(
            grouping = %plan.grouping,
            kind = %kind,
            name = name.as_str(),
            node_id = id.as_str(),
            "Resolved actor"
        );
        ids.push(id);
    }

    Ok(ids)
}
