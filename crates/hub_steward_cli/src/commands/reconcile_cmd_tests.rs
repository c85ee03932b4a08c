use std::sync::Arc;

use super::*;
use github_client::{Error as GitHubError, Organization, Repository, Team};
use hub_steward_core::{
    BranchProtectionSpec, ControllerSettings, DeletionGuard, ObservedBranchProtection,
    OrganizationSpec, RecordKey, RecordStore, RepositorySpec, TeamSpec,
};
use tempfile::TempDir;
use test_utils::{organization_fixture, FakeGitHub, Operation, RemoteKind};

use crate::{file_store::FileRecordStore, workspace::Clients};

struct Fixture {
    dir: TempDir,
    github: Arc<FakeGitHub>,
    workspace: Workspace,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let github = Arc::new(FakeGitHub::new());
        github.insert_organization(organization_fixture(1, "acme"));
        let workspace = Workspace::new(
            dir.path(),
            ControllerSettings::default(),
            Clients::from_shared(github.clone()),
        );
        Self {
            dir,
            github,
            workspace,
        }
    }

    fn store<S, O>(&self, kind: ResourceKind) -> FileRecordStore<S, O> {
        FileRecordStore::new(self.dir.path(), kind)
    }

    async fn declare_all(&self) {
        let mut organization = OrganizationSpec::new("acme");
        organization.description = Some("Acme platform".to_string());
        self.store::<OrganizationSpec, Organization>(ResourceKind::Organization)
            .declare(&RecordKey::new("platform", "acme"), &organization, false)
            .await
            .expect("declare organization");

        let mut repository = RepositorySpec::new("acme", "service-a");
        repository.has_wiki = Some(false);
        self.store::<RepositorySpec, Repository>(ResourceKind::Repository)
            .declare(&RecordKey::new("platform", "service-a"), &repository, false)
            .await
            .expect("declare repository");

        let mut team = TeamSpec::new("acme", "Platform Team");
        team.privacy = Some("closed".to_string());
        self.store::<TeamSpec, Team>(ResourceKind::Team)
            .declare(&RecordKey::new("platform", "platform-team"), &team, false)
            .await
            .expect("declare team");

        let mut rule = BranchProtectionSpec::new("acme", "service-a", "main");
        rule.requires_linear_history = Some(true);
        self.store::<BranchProtectionSpec, ObservedBranchProtection>(
            ResourceKind::BranchProtectionRule,
        )
        .declare(&RecordKey::new("platform", "service-a-main"), &rule, false)
        .await
        .expect("declare rule");
    }
}

#[tokio::test]
async fn test_reconcile_converges_every_kind_in_order() {
    let fixture = Fixture::new();
    fixture.declare_all().await;

    let summaries = reconcile(&fixture.workspace, &ResourceKind::ALL)
        .await
        .expect("reconcile");

    let kinds: Vec<ResourceKind> = summaries.iter().map(|s| s.kind).collect();
    assert_eq!(kinds, ResourceKind::ALL.to_vec());
    for summary in &summaries {
        assert!(summary.summary.is_success(), "{:?}", summary);
        assert_eq!(summary.summary.succeeded.len(), 1);
    }

    let repository = fixture
        .github
        .find_repository("acme", "service-a")
        .expect("repository created");
    assert!(!repository.has_wiki);
    assert_eq!(
        fixture.github.find_team("acme", "platform-team").map(|t| t.privacy),
        Some(Some("closed".to_string()))
    );
    assert_eq!(fixture.github.rule_count(), 1);
    assert_eq!(
        fixture.github.organization(1).and_then(|o| o.description),
        Some("Acme platform".to_string())
    );

    let record = fixture
        .store::<RepositorySpec, Repository>(ResourceKind::Repository)
        .get(&RecordKey::new("platform", "service-a"))
        .await
        .expect("record");
    assert_eq!(record.guard, DeletionGuard::Present);
    assert_eq!(record.status.snapshot().map(|r| r.id), Some(repository.id));
}

#[tokio::test]
async fn test_second_reconcile_sends_no_mutations() {
    let fixture = Fixture::new();
    fixture.declare_all().await;
    reconcile(&fixture.workspace, &ResourceKind::ALL)
        .await
        .expect("first reconcile");
    fixture.github.clear_calls();

    let summaries = reconcile(&fixture.workspace, &ResourceKind::ALL)
        .await
        .expect("second reconcile");

    assert!(summaries.iter().all(|s| s.summary.is_success()));
    assert_eq!(fixture.github.mutation_count(), 0);
}

#[tokio::test]
async fn test_failures_are_reported_per_kind() {
    let fixture = Fixture::new();
    fixture.declare_all().await;
    fixture
        .github
        .fail(RemoteKind::Repository, Operation::Create, || GitHubError::Api {
            status: 422,
            message: "Repository creation disabled".to_string(),
        });

    let summaries = reconcile(
        &fixture.workspace,
        &[ResourceKind::Repository, ResourceKind::BranchProtectionRule],
    )
    .await
    .expect("reconcile");

    assert_eq!(summaries.len(), 2);
    for summary in &summaries {
        assert_eq!(summary.summary.failed.len(), 1, "{:?}", summary);
    }
    assert_eq!(fixture.github.repository_count(), 0);
    assert_eq!(fixture.github.rule_count(), 0);
}

#[tokio::test]
async fn test_deletion_flag_removes_record_and_remote() {
    let fixture = Fixture::new();
    let key = RecordKey::new("platform", "service-a");
    let store = fixture.store::<RepositorySpec, Repository>(ResourceKind::Repository);
    let spec = RepositorySpec::new("acme", "service-a");
    store.declare(&key, &spec, false).await.expect("declare");
    reconcile(&fixture.workspace, &[ResourceKind::Repository])
        .await
        .expect("create");

    store.declare(&key, &spec, true).await.expect("request deletion");
    let summaries = reconcile(&fixture.workspace, &[ResourceKind::Repository])
        .await
        .expect("delete");

    assert_eq!(
        summaries[0].summary.succeeded,
        vec![(
            key.clone(),
            ReconcileOutcome::Deleted {
                remote_deleted: true
            }
        )]
    );
    assert_eq!(fixture.github.repository_count(), 0);
    assert!(store.keys().await.expect("keys").is_empty());
}

#[test]
fn test_describe_outcome() {
    let created = ReconcileOutcome::Converged {
        created: true,
        updated_fields: vec!["archived"],
        initial_update: false,
        status_written: true,
    };
    let in_sync = ReconcileOutcome::Converged {
        created: false,
        updated_fields: vec![],
        initial_update: false,
        status_written: true,
    };

    assert_eq!(describe_outcome(&created), "created, updated archived");
    assert_eq!(describe_outcome(&in_sync), "in sync");
    assert_eq!(
        describe_outcome(&ReconcileOutcome::Deleted {
            remote_deleted: false
        }),
        "forgotten, remote left in place"
    );
}
