use super::*;
use test_utils::{FakeGitHub, Operation, RemoteKind};

fn user(id: &str, login: &str) -> ActorRef {
    ActorRef::new(ActorKind::User, id, login)
}

fn app(id: &str, slug: &str) -> ActorRef {
    ActorRef::new(ActorKind::App, id, slug)
}

fn team(id: &str, slug: &str) -> ActorRef {
    ActorRef::new(ActorKind::Team, id, slug)
}

fn names(values: &[&str]) -> Option<Vec<String>> {
    Some(values.iter().map(|v| v.to_string()).collect())
}

#[test]
fn test_user_swap_flags_update() {
    // observed users={A,B}, apps={X}, teams={}; desired users={A,C}, apps={X}, teams={}
    let observed = vec![user("U_A", "A"), user("U_B", "B"), app("A_X", "X")];
    let desired = ActorSelection {
        users: names(&["A", "C"]),
        apps: names(&["X"]),
        teams: names(&[]),
    };

    let plan = plan_actor_set(ActorGrouping::PushAllowance, &desired, &observed);

    assert!(plan.needs_update);
    assert_eq!(plan.retained, vec![user("U_A", "A"), app("A_X", "X")]);
    assert_eq!(plan.removals, vec![user("U_B", "B")]);
    assert_eq!(plan.additions, vec![(ActorKind::User, "C".to_string())]);
}

#[test]
fn test_set_comparison_ignores_order_duplicates_and_case() {
    let observed = vec![team("T_1", "release"), user("U_A", "alice"), user("U_B", "bob")];
    let desired = ActorSelection {
        users: names(&["Bob", "alice", "bob"]),
        apps: None,
        teams: names(&["release"]),
    };

    let plan = plan_actor_set(ActorGrouping::ReviewDismissal, &desired, &observed);

    assert!(!plan.needs_update);
    assert!(plan.additions.is_empty());
    assert!(plan.removals.is_empty());
}

#[test]
fn test_unmanaged_kind_is_carried_over() {
    let observed = vec![user("U_A", "alice"), app("A_X", "deployer"), team("T_1", "ops")];
    let desired = ActorSelection {
        users: None,
        apps: names(&[]),
        teams: None,
    };

    let plan = plan_actor_set(ActorGrouping::BypassForcePush, &desired, &observed);

    assert!(plan.needs_update);
    assert_eq!(plan.retained, vec![user("U_A", "alice"), team("T_1", "ops")]);
    assert_eq!(plan.removals, vec![app("A_X", "deployer")]);
}

#[test]
fn test_fully_unmanaged_selection_never_updates() {
    let observed = vec![user("U_A", "alice")];
    let desired = ActorSelection::default();

    let plan = plan_actor_set(ActorGrouping::BypassPullRequest, &desired, &observed);

    assert!(desired.is_unmanaged());
    assert!(!plan.needs_update);
    assert_eq!(plan.retained, observed);
}

#[test]
fn test_duplicate_observed_entries_do_not_force_updates() {
    let observed = vec![user("U_A", "alice"), user("U_A", "alice")];
    let desired = ActorSelection {
        users: names(&["alice"]),
        ..Default::default()
    };

    let plan = plan_actor_set(ActorGrouping::PushAllowance, &desired, &observed);

    assert!(!plan.needs_update);
    assert_eq!(plan.retained, vec![user("U_A", "alice")]);
}

#[tokio::test]
async fn test_user_swap_sends_retained_then_resolved_ids() {
    let fake = FakeGitHub::new();
    fake.add_principal(ActorKind::User, "C", "U_C");
    let observed = vec![user("U_A", "A"), user("U_B", "B"), app("A_X", "X")];
    let desired = ActorSelection {
        users: names(&["A", "C"]),
        apps: names(&["X"]),
        teams: names(&[]),
    };
    let plan = plan_actor_set(ActorGrouping::PushAllowance, &desired, &observed);

    let ids = resolve_replacement_ids(&fake, "acme", &plan)
        .await
        .expect("C resolves");

    assert_eq!(ids, vec!["U_A", "A_X", "U_C"]);
    assert_eq!(
        fake.calls_of(RemoteKind::Actor, Operation::Resolve).len(),
        1
    );
}

#[tokio::test]
async fn test_unresolvable_addition_aborts() {
    let fake = FakeGitHub::new();
    let desired = ActorSelection {
        teams: names(&["ghosts"]),
        ..Default::default()
    };
    let plan = plan_actor_set(ActorGrouping::ReviewDismissal, &desired, &[]);

    let result = resolve_replacement_ids(&fake, "acme", &plan).await;

    match result {
        Err(ReconcileError::ActorResolution { kind, name, source }) => {
            assert_eq!(kind, ActorKind::Team);
            assert_eq!(name, "ghosts");
            assert!(source.is_not_found());
        }
        other => panic!("expected ActorResolution, got {other:?}"),
    }
}
