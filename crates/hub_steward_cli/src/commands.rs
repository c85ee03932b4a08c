//! Command modules for the HubSteward CLI.
//!
//! - `reconcile_cmd`: converges every declared record once and reports the outcome
//! - `watch_cmd`: keeps converging records on a resync interval until interrupted

use clap::ValueEnum;
use hub_steward_core::ResourceKind;

pub mod reconcile_cmd;
pub mod watch_cmd;

/// Resource kinds selectable on the command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum KindFilter {
    Organizations,
    Repositories,
    Teams,
    BranchProtectionRules,
}

impl From<KindFilter> for ResourceKind {
    fn from(filter: KindFilter) -> Self {
        match filter {
            KindFilter::Organizations => ResourceKind::Organization,
            KindFilter::Repositories => ResourceKind::Repository,
            KindFilter::Teams => ResourceKind::Team,
            KindFilter::BranchProtectionRules => ResourceKind::BranchProtectionRule,
        }
    }
}

/// The kinds to process, in dependency order. No filter selects every kind.
///
/// Organizations come before the repositories and teams they own, and repositories before
/// their branch protection rules.
pub fn selected_kinds(filters: &[KindFilter]) -> Vec<ResourceKind> {
    ResourceKind::ALL
        .into_iter()
        .filter(|kind| filters.is_empty() || filters.iter().any(|f| ResourceKind::from(*f) == *kind))
        .collect()
}

#[cfg(test)]
#[path = "commands_tests.rs"]
mod tests;
