use super::*;
use github_client::models::AccountRef;
use test_utils::{repository_fixture, FakeGitHub, Operation, RemoteKind};

fn driver() -> (Arc<FakeGitHub>, RepositoryDriver) {
    let fake = Arc::new(FakeGitHub::new());
    (fake.clone(), RepositoryDriver::new(fake))
}

#[tokio::test]
async fn test_unmanaged_fields_never_diff() {
    let (_, driver) = driver();
    let mut observed = repository_fixture(1, "acme", "widgets");
    observed.description = Some("set by hand".to_string());
    observed.has_wiki = false;

    let diff = driver
        .diff(&RepositorySpec::new("acme", "widgets"), &observed)
        .await
        .expect("diff");

    assert!(!diff.needs_update());
    assert_eq!(diff.change_set, RepositorySettingsUpdate::default());
}

#[tokio::test]
async fn test_managed_differences_are_staged() {
    let (_, driver) = driver();
    let observed = repository_fixture(1, "acme", "widgets");
    let mut spec = RepositorySpec::new("acme", "widgets");
    spec.has_wiki = Some(false);
    spec.has_issues = Some(true);
    spec.default_branch = Some("trunk".to_string());
    spec.allow_auto_merge = Some(true);

    let diff = driver.diff(&spec, &observed).await.expect("diff");

    assert_eq!(
        diff.changed_fields,
        vec!["has_wiki", "default_branch", "allow_auto_merge"]
    );
    assert_eq!(diff.change_set.has_wiki, Some(false));
    assert_eq!(diff.change_set.has_issues, None);
    assert_eq!(diff.change_set.default_branch.as_deref(), Some("trunk"));
    assert_eq!(diff.change_set.allow_auto_merge, Some(true));
}

#[tokio::test]
async fn test_create_sends_only_creation_settings() {
    let (fake, driver) = driver();
    let mut spec = RepositorySpec::new("acme", "widgets");
    spec.private = Some(true);
    spec.archived = Some(true);

    let repo = driver.create(&spec).await.expect("created");

    assert!(repo.private);
    assert!(!repo.archived);
    let call = &fake.calls_of(RemoteKind::Repository, Operation::Create)[0];
    assert_eq!(call.target, "acme/widgets");
    assert_eq!(
        call.payload,
        Some(serde_json::json!({ "name": "widgets", "private": true }))
    );
}

#[test]
fn test_binding_rejects_foreign_owner() {
    let (_, driver) = driver();
    let mut observed = repository_fixture(1, "acme", "widgets");
    observed.owner = Some(AccountRef {
        id: 9,
        login: "elsewhere".to_string(),
    });

    let result = driver.check_binding(&RepositorySpec::new("acme", "widgets"), &observed);

    let reason = result.expect_err("owner differs");
    assert!(reason.contains("elsewhere"));
}

#[test]
fn test_binding_accepts_owner_in_other_case() {
    let (_, driver) = driver();
    let observed = repository_fixture(1, "Acme", "widgets");

    assert!(
        driver
            .check_binding(&RepositorySpec::new("acme", "widgets"), &observed)
            .is_ok()
    );
}

#[tokio::test]
async fn test_update_addresses_current_remote_name() {
    let (fake, driver) = driver();
    let observed = repository_fixture(1, "acme", "old-name");
    fake.insert_repository(observed.clone());
    let change_set = RepositorySettingsUpdate {
        name: Some("widgets".to_string()),
        ..Default::default()
    };

    let repo = driver
        .update(&RepositorySpec::new("acme", "widgets"), &observed, &change_set)
        .await
        .expect("updated");

    assert_eq!(repo.name, "widgets");
    let call = &fake.calls_of(RemoteKind::Repository, Operation::Update)[0];
    assert_eq!(call.target, "acme/old-name");
}

#[test]
fn test_validate_rejects_blank_identity() {
    let (_, driver) = driver();

    assert!(driver.validate(&RepositorySpec::new("", "widgets")).is_err());
    assert!(driver.validate(&RepositorySpec::new("acme", "widgets")).is_ok());
}
