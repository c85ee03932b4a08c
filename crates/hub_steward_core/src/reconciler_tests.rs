use super::*;
use crate::{InMemoryRecordStore, RepositoryDriver, RepositorySpec, ResourceStatus};
use chrono::Utc;
use github_client::{Error, Repository};
use test_utils::{repository_fixture, FakeGitHub, Operation, RemoteKind};
use tracing_test::traced_test;

type Store = InMemoryRecordStore<RepositorySpec, Repository>;

struct Harness {
    fake: Arc<FakeGitHub>,
    store: Arc<Store>,
    reconciler: Reconciler<RepositoryDriver>,
    key: RecordKey,
}

async fn harness(spec: RepositorySpec) -> Harness {
    let fake = Arc::new(FakeGitHub::new());
    let store = Arc::new(Store::new());
    let key = RecordKey::new("platform", "r1");
    store.apply(key.clone(), spec).await;
    let reconciler = Reconciler::new(RepositoryDriver::new(fake.clone()), store.clone());
    Harness {
        fake,
        store,
        reconciler,
        key,
    }
}

fn spec() -> RepositorySpec {
    RepositorySpec::new("acme", "r1")
}

/// Delegates to an in-memory store but rejects every status write.
struct StatusRejectingStore {
    inner: Arc<Store>,
}

#[async_trait]
impl RecordStore<RepositorySpec, Repository> for StatusRejectingStore {
    async fn keys(&self) -> Result<Vec<RecordKey>, StoreError> {
        self.inner.keys().await
    }

    async fn get(
        &self,
        key: &RecordKey,
    ) -> Result<DesiredStateRecord<RepositorySpec, Repository>, StoreError> {
        self.inner.get(key).await
    }

    async fn set_guard(&self, key: &RecordKey, guard: DeletionGuard) -> Result<(), StoreError> {
        self.inner.set_guard(key, guard).await
    }

    async fn write_status(
        &self,
        _key: &RecordKey,
        _status: ResourceStatus<Repository>,
    ) -> Result<(), StoreError> {
        Err(StoreError::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "conflict",
        )))
    }

    async fn remove(&self, key: &RecordKey) -> Result<(), StoreError> {
        self.inner.remove(key).await
    }
}

#[tokio::test]
async fn test_absent_counterpart_is_created_and_guarded() {
    let h = harness(spec()).await;

    let outcome = h.reconciler.reconcile(&h.key).await.expect("pass succeeds");

    assert_eq!(
        outcome,
        ReconcileOutcome::Converged {
            created: true,
            updated_fields: vec![],
            initial_update: false,
            status_written: true,
        }
    );
    let record = h.store.snapshot(&h.key).await.expect("record kept");
    assert_eq!(record.guard, DeletionGuard::Present);
    let observed = record.status.snapshot().expect("status written");
    assert_eq!(h.fake.repository(observed.id).map(|r| r.name), Some("r1".to_string()));
    assert_eq!(h.fake.calls_of(RemoteKind::Repository, Operation::Create).len(), 1);
    assert_eq!(h.fake.calls_of(RemoteKind::Repository, Operation::Update).len(), 0);
}

#[tokio::test]
async fn test_create_then_update_settings_not_accepted_at_creation() {
    let mut desired = spec();
    desired.archived = Some(true);
    let h = harness(desired).await;

    let outcome = h.reconciler.reconcile(&h.key).await.expect("pass succeeds");

    match outcome {
        ReconcileOutcome::Converged {
            created,
            updated_fields,
            ..
        } => {
            assert!(created);
            assert_eq!(updated_fields, vec!["archived"]);
        }
        other => panic!("unexpected outcome {other:?}"),
    }
    let updates = h.fake.calls_of(RemoteKind::Repository, Operation::Update);
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].payload, Some(serde_json::json!({ "archived": true })));
    let record = h.store.snapshot(&h.key).await.expect("record kept");
    assert!(record.status.snapshot().is_some_and(|r| r.archived));
}

#[tokio::test]
async fn test_binding_existing_counterpart_forces_initial_update() {
    let h = harness(spec()).await;
    h.fake.insert_repository(repository_fixture(7, "acme", "r1"));

    let outcome = h.reconciler.reconcile(&h.key).await.expect("pass succeeds");

    assert_eq!(
        outcome,
        ReconcileOutcome::Converged {
            created: false,
            updated_fields: vec![],
            initial_update: true,
            status_written: true,
        }
    );
    assert_eq!(h.fake.calls_of(RemoteKind::Repository, Operation::Create).len(), 0);
    let updates = h.fake.calls_of(RemoteKind::Repository, Operation::Update);
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].payload, Some(serde_json::json!({})));
}

#[tokio::test]
async fn test_second_pass_is_idempotent_and_uses_bound_id() {
    let mut desired = spec();
    desired.has_wiki = Some(false);
    let h = harness(desired).await;
    h.reconciler.reconcile(&h.key).await.expect("first pass");
    let mutations = h.fake.mutation_count();
    h.fake.clear_calls();

    let outcome = h.reconciler.reconcile(&h.key).await.expect("second pass");

    assert_eq!(
        outcome,
        ReconcileOutcome::Converged {
            created: false,
            updated_fields: vec![],
            initial_update: false,
            status_written: true,
        }
    );
    assert_eq!(h.fake.mutation_count(), 0);
    assert!(mutations > 0);
    assert_eq!(h.fake.calls_of(RemoteKind::Repository, Operation::GetById).len(), 1);
    assert_eq!(h.fake.calls_of(RemoteKind::Repository, Operation::GetByKey).len(), 0);
}

#[tokio::test]
async fn test_renamed_counterpart_is_found_by_id_and_renamed_back() {
    let h = harness(spec()).await;
    h.reconciler.reconcile(&h.key).await.expect("first pass");
    let id = h
        .store
        .snapshot(&h.key)
        .await
        .and_then(|r| r.status.snapshot().map(|o| o.id))
        .expect("bound");
    h.fake.modify_repository(id, |repo| repo.name = "renamed".to_string());

    let outcome = h.reconciler.reconcile(&h.key).await.expect("second pass");

    assert!(matches!(
        outcome,
        ReconcileOutcome::Converged { created: false, ref updated_fields, .. }
            if updated_fields == &vec!["name"]
    ));
    assert_eq!(h.fake.repository(id).map(|r| r.name), Some("r1".to_string()));
    assert_eq!(h.fake.repository_count(), 1);
}

#[tokio::test]
async fn test_vanished_bound_counterpart_falls_back_to_create() {
    let h = harness(spec()).await;
    h.reconciler.reconcile(&h.key).await.expect("first pass");
    let first_id = h
        .store
        .snapshot(&h.key)
        .await
        .and_then(|r| r.status.snapshot().map(|o| o.id))
        .expect("bound");
    h.fake.remove_repository(first_id);

    let outcome = h.reconciler.reconcile(&h.key).await.expect("second pass");

    assert!(matches!(outcome, ReconcileOutcome::Converged { created: true, .. }));
    let second_id = h
        .store
        .snapshot(&h.key)
        .await
        .and_then(|r| r.status.snapshot().map(|o| o.id))
        .expect("rebound");
    assert_ne!(first_id, second_id);
}

#[tokio::test]
async fn test_owner_change_is_an_invariant_violation() {
    let h = harness(spec()).await;
    h.reconciler.reconcile(&h.key).await.expect("first pass");
    let before = h.store.snapshot(&h.key).await.expect("record kept");
    let id = before.status.snapshot().map(|o| o.id).expect("bound");
    h.fake.modify_repository(id, |repo| {
        if let Some(owner) = repo.owner.as_mut() {
            owner.login = "someone-else".to_string();
        }
    });

    let result = h.reconciler.reconcile(&h.key).await;

    assert!(matches!(
        result,
        Err(ReconcileError::InvariantViolation { kind: ResourceKind::Repository, .. })
    ));
    let after = h.store.snapshot(&h.key).await.expect("record kept");
    assert_eq!(after.status, before.status);
}

#[tokio::test]
async fn test_failed_update_keeps_guard_and_leaves_status_unwritten() {
    let mut desired = spec();
    desired.description = Some("widgets".to_string());
    let h = harness(desired).await;
    h.fake.insert_repository(repository_fixture(7, "acme", "r1"));
    h.fake.fail(RemoteKind::Repository, Operation::Update, || Error::Api {
        status: 502,
        message: "Bad Gateway".to_string(),
    });

    let result = h.reconciler.reconcile(&h.key).await;

    let error = result.expect_err("update fails");
    assert!(error.is_transient());
    let record = h.store.snapshot(&h.key).await.expect("record kept");
    assert_eq!(record.guard, DeletionGuard::Present);
    assert!(!record.status.has_converged());
}

#[tokio::test]
#[traced_test]
async fn test_status_write_failure_is_swallowed() {
    let fake = Arc::new(FakeGitHub::new());
    let inner = Arc::new(Store::new());
    let key = RecordKey::new("platform", "r1");
    inner.apply(key.clone(), spec()).await;
    let store = Arc::new(StatusRejectingStore {
        inner: inner.clone(),
    });
    let reconciler = Reconciler::new(RepositoryDriver::new(fake.clone()), store);

    let outcome = reconciler.reconcile(&key).await.expect("pass succeeds");

    assert!(matches!(
        outcome,
        ReconcileOutcome::Converged {
            status_written: false,
            ..
        }
    ));
    assert_eq!(fake.repository_count(), 1);
    assert!(logs_contain("Failed to write status"));
    let record = inner.snapshot(&key).await.expect("record kept");
    assert_eq!(record.guard, DeletionGuard::Present);
}

#[tokio::test]
async fn test_invalid_spec_makes_no_remote_calls() {
    let h = harness(RepositorySpec::new("acme", " ")).await;

    let result = h.reconciler.reconcile(&h.key).await;

    assert!(matches!(result, Err(ReconcileError::InvalidSpec(_))));
    assert!(h.fake.calls().is_empty());
}

#[tokio::test]
async fn test_missing_record_is_a_no_op() {
    let h = harness(spec()).await;
    let other = RecordKey::new("platform", "gone");

    let outcome = h.reconciler.reconcile(&other).await.expect("pass succeeds");

    assert_eq!(outcome, ReconcileOutcome::RecordMissing);
    assert!(h.fake.calls().is_empty());
}

#[tokio::test]
async fn test_deletion_of_converged_record_deletes_remote() {
    let h = harness(spec()).await;
    h.reconciler.reconcile(&h.key).await.expect("first pass");
    h.store.request_deletion(&h.key).await.expect("deletion requested");

    let outcome = h.reconciler.reconcile(&h.key).await.expect("deletion pass");

    assert_eq!(outcome, ReconcileOutcome::Deleted { remote_deleted: true });
    assert_eq!(h.fake.repository_count(), 0);
    assert!(h.store.snapshot(&h.key).await.is_none());
}

#[tokio::test]
async fn test_deletion_without_guard_leaves_remote_alone() {
    let h = harness(spec()).await;
    h.fake.insert_repository(repository_fixture(7, "acme", "r1"));
    h.store
        .write_status(
            &h.key,
            ResourceStatus::observed(repository_fixture(7, "acme", "r1"), Utc::now()),
        )
        .await
        .expect("status written");
    h.store.request_deletion(&h.key).await.expect("deletion requested");

    let outcome = h.reconciler.reconcile(&h.key).await.expect("deletion pass");

    assert_eq!(outcome, ReconcileOutcome::Deleted { remote_deleted: false });
    assert!(h.fake.calls_of(RemoteKind::Repository, Operation::Delete).is_empty());
    assert_eq!(h.fake.repository_count(), 1);
    assert!(h.store.snapshot(&h.key).await.is_none());
}

#[tokio::test]
async fn test_deletion_of_never_converged_record_leaves_remote_alone() {
    let h = harness(spec()).await;
    h.fake.insert_repository(repository_fixture(7, "acme", "r1"));
    h.store
        .set_guard(&h.key, DeletionGuard::Present)
        .await
        .expect("guard set");
    h.store.request_deletion(&h.key).await.expect("deletion requested");

    let outcome = h.reconciler.reconcile(&h.key).await.expect("deletion pass");

    assert_eq!(outcome, ReconcileOutcome::Deleted { remote_deleted: false });
    assert_eq!(h.fake.repository_count(), 1);
    assert!(h.store.snapshot(&h.key).await.is_none());
}

#[tokio::test]
async fn test_deletion_treats_not_found_as_success() {
    let h = harness(spec()).await;
    h.reconciler.reconcile(&h.key).await.expect("first pass");
    let id = h
        .store
        .snapshot(&h.key)
        .await
        .and_then(|r| r.status.snapshot().map(|o| o.id))
        .expect("bound");
    h.fake.remove_repository(id);
    h.store.request_deletion(&h.key).await.expect("deletion requested");

    let outcome = h.reconciler.reconcile(&h.key).await.expect("deletion pass");

    assert_eq!(outcome, ReconcileOutcome::Deleted { remote_deleted: true });
    assert!(h.fake.calls_of(RemoteKind::Repository, Operation::Delete).is_empty());
    assert!(h.store.snapshot(&h.key).await.is_none());
}

#[tokio::test]
async fn test_not_found_from_delete_call_completes_deletion() {
    let h = harness(spec()).await;
    h.reconciler.reconcile(&h.key).await.expect("first pass");
    h.store.request_deletion(&h.key).await.expect("deletion requested");
    h.fake
        .fail(RemoteKind::Repository, Operation::Delete, || Error::NotFound);

    let outcome = h.reconciler.reconcile(&h.key).await.expect("deletion pass");

    assert_eq!(outcome, ReconcileOutcome::Deleted { remote_deleted: true });
    assert_eq!(h.fake.calls_of(RemoteKind::Repository, Operation::Delete).len(), 1);
    assert!(h.store.snapshot(&h.key).await.is_none());
}

#[tokio::test]
async fn test_deletion_follows_remote_rename() {
    let h = harness(spec()).await;
    h.reconciler.reconcile(&h.key).await.expect("first pass");
    let id = h
        .store
        .snapshot(&h.key)
        .await
        .and_then(|r| r.status.snapshot().map(|o| o.id))
        .expect("bound");
    h.fake.modify_repository(id, |repo| {
        repo.name = "r1-renamed".to_string();
        repo.full_name = "acme/r1-renamed".to_string();
    });
    h.store.request_deletion(&h.key).await.expect("deletion requested");

    let outcome = h.reconciler.reconcile(&h.key).await.expect("deletion pass");

    assert_eq!(outcome, ReconcileOutcome::Deleted { remote_deleted: true });
    assert!(h.fake.repository(id).is_none());
    assert_eq!(h.fake.repository_count(), 0);
    assert!(h.store.snapshot(&h.key).await.is_none());
}

#[tokio::test]
async fn test_failed_remote_delete_keeps_record_and_guard() {
    let h = harness(spec()).await;
    h.reconciler.reconcile(&h.key).await.expect("first pass");
    h.store.request_deletion(&h.key).await.expect("deletion requested");
    h.fake.fail(RemoteKind::Repository, Operation::Delete, || {
        Error::RateLimitExceeded
    });

    let result = h.reconciler.reconcile(&h.key).await;

    assert!(result.is_err());
    let record = h.store.snapshot(&h.key).await.expect("record kept");
    assert_eq!(record.guard, DeletionGuard::Present);
    assert_eq!(h.fake.repository_count(), 1);
}
