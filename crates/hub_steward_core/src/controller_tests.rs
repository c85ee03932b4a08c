use super::*;
use crate::{InMemoryRecordStore, RecordStore, RepositoryDriver, RepositorySpec};
use github_client::{Error, Repository};
use test_utils::{FakeGitHub, Operation, RemoteKind};
use tracing_test::traced_test;

type Store = InMemoryRecordStore<RepositorySpec, Repository>;

const SETTINGS: ControllerSettings = ControllerSettings {
    pass_timeout: Duration::from_secs(10),
    retry_delay: Duration::from_secs(30),
};

fn controller(fake: &Arc<FakeGitHub>, store: &Arc<Store>) -> Controller<RepositoryDriver> {
    let reconciler = Reconciler::new(RepositoryDriver::new(fake.clone()), store.clone());
    Controller::new(reconciler, SETTINGS)
}

async fn declare(store: &Store, name: &str) -> RecordKey {
    let key = RecordKey::new("platform", name);
    store.apply(key.clone(), RepositorySpec::new("acme", name)).await;
    key
}

#[test]
fn test_default_settings() {
    let settings = ControllerSettings::default();

    assert_eq!(settings.pass_timeout, Duration::from_secs(120));
    assert_eq!(settings.retry_delay, Duration::from_secs(30));
}

#[test]
fn test_key_lock_is_dropped_once_no_pass_holds_it() {
    let mut locks = KeyLocks::default();
    let key = RecordKey::new("platform", "r1");

    let running = locks.acquire(&key);
    let queued = locks.acquire(&key);
    assert!(Arc::ptr_eq(&running, &queued));

    drop(running);
    locks.release(&key);
    assert_eq!(locks.len(), 1, "a queued pass still holds the lock");

    drop(queued);
    locks.release(&key);
    assert_eq!(locks.len(), 0);

    // Releasing an unknown key is harmless.
    locks.release(&RecordKey::new("platform", "gone"));
    assert_eq!(locks.len(), 0);
}

#[tokio::test]
async fn test_reconcile_all_reports_each_record() {
    let fake = Arc::new(FakeGitHub::new());
    let store = Arc::new(Store::new());
    let b = declare(&store, "b").await;
    let a = declare(&store, "a").await;
    let invalid = RecordKey::new("platform", "invalid");
    store
        .apply(invalid.clone(), RepositorySpec::new("acme", ""))
        .await;
    let controller = controller(&fake, &store);

    let summary = controller
        .reconcile_all(vec![b.clone(), a.clone(), invalid.clone(), a.clone()])
        .await;

    assert!(!summary.is_success());
    let succeeded: Vec<_> = summary.succeeded.iter().map(|(k, _)| k.clone()).collect();
    assert_eq!(succeeded, vec![a, b]);
    assert_eq!(summary.failed.len(), 1);
    assert_eq!(summary.failed[0].0, invalid);
    assert_eq!(fake.repository_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_slow_pass_times_out_without_status() {
    let fake = Arc::new(FakeGitHub::new());
    fake.set_latency(Duration::from_secs(60));
    let store = Arc::new(Store::new());
    let key = declare(&store, "slow").await;
    let controller = controller(&fake, &store);

    let result = controller.reconcile_once(&key).await;

    assert!(matches!(result, Err(ReconcileError::Timeout(limit)) if limit == SETTINGS.pass_timeout));
    let record = store.get(&key).await.expect("record kept");
    assert!(!record.status.has_converged());
}

#[tokio::test(start_paused = true)]
#[traced_test]
async fn test_transient_failure_is_retried_after_delay() {
    let fake = Arc::new(FakeGitHub::new());
    fake.fail_times(RemoteKind::Repository, Operation::Create, 1, || Error::Api {
        status: 503,
        message: "Service Unavailable".to_string(),
    });
    let store = Arc::new(Store::new());
    let key = declare(&store, "r1").await;
    let controller = Arc::new(controller(&fake, &store));
    let (triggers, receiver) = mpsc::unbounded_channel();
    let running = tokio::spawn({
        let controller = controller.clone();
        async move { controller.run(receiver).await }
    });

    triggers.send(key.clone()).expect("controller listening");
    tokio::time::sleep(Duration::from_secs(45)).await;
    drop(triggers);
    running.await.expect("controller stops");

    assert_eq!(fake.calls_of(RemoteKind::Repository, Operation::Create).len(), 2);
    assert_eq!(fake.repository_count(), 1);
    assert!(logs_contain("Pass failed, will retry"));
    let record = store.get(&key).await.expect("record kept");
    assert!(record.status.has_converged());
}

#[tokio::test(start_paused = true)]
async fn test_permanent_failure_is_not_retried() {
    let fake = Arc::new(FakeGitHub::new());
    fake.fail(RemoteKind::Repository, Operation::Create, || Error::Api {
        status: 422,
        message: "Validation Failed".to_string(),
    });
    let store = Arc::new(Store::new());
    let key = declare(&store, "r1").await;
    let controller = Arc::new(controller(&fake, &store));
    let (triggers, receiver) = mpsc::unbounded_channel();
    let running = tokio::spawn({
        let controller = controller.clone();
        async move { controller.run(receiver).await }
    });

    triggers.send(key).expect("controller listening");
    tokio::time::sleep(Duration::from_secs(120)).await;
    drop(triggers);
    running.await.expect("controller stops");

    assert_eq!(fake.calls_of(RemoteKind::Repository, Operation::Create).len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_passes_for_one_record_do_not_overlap() {
    let fake = Arc::new(FakeGitHub::new());
    fake.set_latency(Duration::from_millis(500));
    let store = Arc::new(Store::new());
    let key = declare(&store, "r1").await;
    let controller = controller(&fake, &store);
    let (triggers, receiver) = mpsc::unbounded_channel();

    triggers.send(key.clone()).expect("queued");
    triggers.send(key.clone()).expect("queued");
    drop(triggers);
    controller.run(receiver).await;

    assert_eq!(fake.calls_of(RemoteKind::Repository, Operation::Create).len(), 1);
    assert_eq!(fake.calls_of(RemoteKind::Repository, Operation::GetById).len(), 1);
    assert_eq!(fake.repository_count(), 1);
}

#[tokio::test]
async fn test_run_returns_when_triggers_close() {
    let fake = Arc::new(FakeGitHub::new());
    let store = Arc::new(Store::new());
    let controller = controller(&fake, &store);
    let (triggers, receiver) = mpsc::unbounded_channel::<RecordKey>();
    drop(triggers);

    controller.run(receiver).await;

    assert!(fake.calls().is_empty());
}
