use super::*;
use serde_json::{from_str, json, to_value};

#[test]
fn test_team_deserialization_with_parent_and_organization() {
    let json = r#"{
        "id": 5,
        "node_id": "T_kwDOAAA",
        "name": "Platform",
        "slug": "platform",
        "description": "Platform engineers",
        "privacy": "closed",
        "notification_setting": "notifications_enabled",
        "permission": "pull",
        "parent": { "id": 2, "slug": "engineering", "name": "Engineering" },
        "organization": { "login": "acme", "id": 1001 }
    }"#;

    let team: Team = from_str(json).expect("Failed to deserialize");

    assert_eq!(team.id, 5);
    assert_eq!(team.slug, "platform");
    assert_eq!(team.privacy.as_deref(), Some("closed"));
    assert_eq!(team.parent_slug(), Some("engineering"));
    assert_eq!(team.organization.as_ref().map(|o| o.id), Some(1001));
}

#[test]
fn test_team_without_parent() {
    let team: Team = from_str(r#"{"id": 5, "name": "Platform", "slug": "platform", "parent": null}"#)
        .expect("Failed to deserialize");

    assert_eq!(team.parent_slug(), None);
}

#[test]
fn test_team_slug_rules() {
    assert_eq!(team_slug("Platform"), "platform");
    assert_eq!(team_slug("Platform Engineers"), "platform-engineers");
    assert_eq!(team_slug("Dev_Ops & SRE"), "dev-ops-sre");
    assert_eq!(team_slug("--edge--"), "edge");
    assert_eq!(team_slug("v2 Team"), "v2-team");
}

#[test]
fn test_settings_update_can_reparent() {
    let update = TeamSettingsUpdate {
        parent_team_id: Some(42),
        ..Default::default()
    };

    assert_eq!(to_value(&update).unwrap(), json!({ "parent_team_id": 42 }));
}
