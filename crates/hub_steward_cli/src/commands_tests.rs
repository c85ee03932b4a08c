use super::*;

#[test]
fn test_no_filter_selects_every_kind_in_dependency_order() {
    assert_eq!(
        selected_kinds(&[]),
        vec![
            ResourceKind::Organization,
            ResourceKind::Repository,
            ResourceKind::Team,
            ResourceKind::BranchProtectionRule,
        ]
    );
}

#[test]
fn test_filter_keeps_dependency_order() {
    let kinds = selected_kinds(&[KindFilter::BranchProtectionRules, KindFilter::Repositories]);

    assert_eq!(
        kinds,
        vec![ResourceKind::Repository, ResourceKind::BranchProtectionRule]
    );
}
