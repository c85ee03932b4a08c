use super::*;
use chrono::Utc;
use github_client::Repository;
use hub_steward_core::RepositorySpec;
use tempfile::TempDir;

type RepositoryStore = FileRecordStore<RepositorySpec, Repository>;

fn store(dir: &TempDir) -> RepositoryStore {
    FileRecordStore::new(dir.path(), ResourceKind::Repository)
}

fn key() -> RecordKey {
    RecordKey::new("platform", "service-a")
}

#[tokio::test]
async fn test_get_reads_declaration_without_state() {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let path = dir.path().join("repositories").join("platform");
    std::fs::create_dir_all(&path).expect("Failed to create namespace");
    std::fs::write(
        path.join("service-a.toml"),
        r#"
[spec]
owner = "acme"
name = "service-a"
has_wiki = false
"#,
    )
    .expect("Failed to write declaration");

    let record = store(&dir).get(&key()).await.expect("record");

    assert_eq!(record.spec.owner, "acme");
    assert_eq!(record.spec.has_wiki, Some(false));
    assert_eq!(record.spec.description, None);
    assert!(!record.deletion_requested);
    assert_eq!(record.guard, DeletionGuard::Absent);
    assert!(!record.status.has_converged());
}

#[tokio::test]
async fn test_get_missing_record_is_not_found() {
    let dir = TempDir::new().expect("Failed to create temp directory");

    let result = store(&dir).get(&key()).await;

    assert!(matches!(result, Err(StoreError::NotFound(k)) if k == key()));
}

#[tokio::test]
async fn test_malformed_declaration_is_a_serialization_error() {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let path = dir.path().join("repositories").join("platform");
    std::fs::create_dir_all(&path).expect("Failed to create namespace");
    std::fs::write(path.join("service-a.toml"), "delete = true\n").expect("write");

    let result = store(&dir).get(&key()).await;

    assert!(matches!(result, Err(StoreError::Serialization { .. })));
}

#[tokio::test]
async fn test_guard_and_status_persist_beside_declaration() {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let store = store(&dir);
    store
        .declare(&key(), &RepositorySpec::new("acme", "service-a"), false)
        .await
        .expect("declare");

    let observed = Repository {
        id: 1001,
        name: "service-a".to_string(),
        ..Default::default()
    };
    store
        .set_guard(&key(), DeletionGuard::Present)
        .await
        .expect("guard");
    store
        .write_status(&key(), ResourceStatus::observed(observed.clone(), Utc::now()))
        .await
        .expect("status");

    let record = store.get(&key()).await.expect("record");
    assert_eq!(record.guard, DeletionGuard::Present);
    assert_eq!(record.status.snapshot(), Some(&observed));
    assert!(dir
        .path()
        .join("repositories/platform/service-a.state.json")
        .exists());

    // Re-declaring keeps the engine-owned state.
    let mut spec = RepositorySpec::new("acme", "service-a");
    spec.archived = Some(true);
    store.declare(&key(), &spec, true).await.expect("declare");
    let record = store.get(&key()).await.expect("record");
    assert!(record.deletion_requested);
    assert_eq!(record.spec.archived, Some(true));
    assert_eq!(record.guard, DeletionGuard::Present);
}

#[tokio::test]
async fn test_state_writes_require_a_declaration() {
    let dir = TempDir::new().expect("Failed to create temp directory");

    let result = store(&dir).set_guard(&key(), DeletionGuard::Present).await;

    assert!(matches!(result, Err(StoreError::NotFound(_))));
}

#[tokio::test]
async fn test_keys_lists_declarations_only() {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let store = store(&dir);
    assert!(store.keys().await.expect("keys").is_empty());

    store
        .declare(&RecordKey::new("platform", "b"), &RepositorySpec::new("acme", "b"), false)
        .await
        .expect("declare");
    store
        .declare(&RecordKey::new("data", "a"), &RepositorySpec::new("acme", "a"), false)
        .await
        .expect("declare");
    store
        .set_guard(&RecordKey::new("data", "a"), DeletionGuard::Present)
        .await
        .expect("guard");
    std::fs::write(store.root().join("README.md"), "notes").expect("write");

    let keys = store.keys().await.expect("keys");

    assert_eq!(
        keys,
        vec![RecordKey::new("data", "a"), RecordKey::new("platform", "b")]
    );
}

#[tokio::test]
async fn test_remove_deletes_both_files_and_tolerates_absence() {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let store = store(&dir);
    store
        .declare(&key(), &RepositorySpec::new("acme", "service-a"), true)
        .await
        .expect("declare");
    store
        .set_guard(&key(), DeletionGuard::Present)
        .await
        .expect("guard");

    store.remove(&key()).await.expect("remove");
    store.remove(&key()).await.expect("second remove");

    assert!(matches!(store.get(&key()).await, Err(StoreError::NotFound(_))));
    assert!(!dir
        .path()
        .join("repositories/platform/service-a.state.json")
        .exists());
}

#[tokio::test]
async fn test_state_without_status_reads_as_unconverged() {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let store = store(&dir);
    store
        .declare(&key(), &RepositorySpec::new("acme", "service-a"), false)
        .await
        .expect("declare");
    std::fs::write(
        dir.path().join("repositories/platform/service-a.state.json"),
        r#"{ "guard": "present" }"#,
    )
    .expect("Failed to write state");

    let record = store.get(&key()).await.expect("record");

    assert_eq!(record.guard, DeletionGuard::Present);
    assert!(!record.status.has_converged());
    assert_eq!(record.status.snapshot(), None);
}
