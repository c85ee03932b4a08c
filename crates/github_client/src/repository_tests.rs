//! Tests for repository domain types.

use super::*;
use serde_json::{from_str, json, to_value};

#[test]
fn test_repository_deserialization_from_rest_response() {
    let json = r#"{
        "id": 123456,
        "node_id": "R_kgDOH1234567",
        "name": "widgets",
        "full_name": "acme/widgets",
        "owner": { "login": "acme", "id": 42, "type": "Organization" },
        "description": null,
        "private": true,
        "visibility": "private",
        "has_issues": true,
        "has_projects": false,
        "has_wiki": true,
        "archived": false,
        "default_branch": "main",
        "allow_squash_merge": true,
        "url": "https://api.github.com/repos/acme/widgets"
    }"#;

    let repo: Repository = from_str(json).expect("Failed to deserialize");

    assert_eq!(repo.id, 123456);
    assert_eq!(repo.node_id, "R_kgDOH1234567");
    assert_eq!(repo.owner_login(), Some("acme"));
    assert_eq!(repo.description, None);
    assert!(repo.private);
    assert!(repo.has_issues);
    assert!(!repo.has_projects);
    assert_eq!(repo.default_branch.as_deref(), Some("main"));
    assert_eq!(repo.allow_squash_merge, Some(true));
    assert_eq!(repo.allow_merge_commit, None);
}

#[test]
fn test_repository_missing_flags_default_to_false() {
    let repo: Repository = from_str(r#"{"id": 1, "name": "bare"}"#).expect("Failed to deserialize");

    assert!(!repo.archived);
    assert!(!repo.is_template);
    assert!(repo.owner.is_none());
    assert_eq!(repo.owner_login(), None);
}

#[test]
fn test_settings_update_only_serializes_set_fields() {
    let update = RepositorySettingsUpdate {
        archived: Some(true),
        ..Default::default()
    };

    assert_eq!(to_value(&update).unwrap(), json!({ "archived": true }));
}

#[test]
fn test_empty_settings_update_serializes_to_empty_object() {
    let update = RepositorySettingsUpdate::default();

    assert_eq!(to_value(&update).unwrap(), json!({}));
}

#[test]
fn test_create_payload_includes_name() {
    let payload = RepositoryCreatePayload {
        name: "widgets".to_string(),
        private: Some(true),
        ..Default::default()
    };

    assert_eq!(
        to_value(&payload).unwrap(),
        json!({ "name": "widgets", "private": true })
    );
}
