//! Update pipeline tests: request ordering, referential integrity, and the
//! status policy hook.

use crate::common::builders::{ConfigBuilder, EntryBuilder};
use crate::common::fixtures::{ADMINS, ALL_STAFF, DEVS, JDOE, JROE, OPS, STAFF};
use crate::common::{modifies_of, seeded_connector, values_of};
use ldap_provisioning::directory::{DirectoryAttributes, DirectoryRequest, ModifyOp};
use ldap_provisioning::membership::{MembershipChange, MembershipChanges};
use ldap_provisioning::operations::{Attribute, ObjectClass, Uid};
use ldap_provisioning::{GuardedString, MembershipKind, ProvisioningError, StatusManagement};
use std::sync::Arc;

fn jdoe() -> Uid {
    Uid::new(JDOE)
}

#[tokio::test]
async fn test_clearing_posix_reference_with_memberships_is_refused() {
    let connector = seeded_connector(ConfigBuilder::new().build()).await;

    let err = connector
        .update(
            &ObjectClass::Account,
            &jdoe(),
            vec![
                Attribute::strings("description", ["should not be written"]),
                Attribute::empty("uid"),
            ],
        )
        .await
        .unwrap_err();

    match &err {
        ProvisioningError::ReferentialIntegrity {
            attribute,
            kind,
            groups,
        } => {
            assert_eq!(attribute, "uid");
            assert_eq!(*kind, MembershipKind::Posix);
            assert_eq!(groups, &vec![DEVS.to_string()]);
        }
        other => panic!("expected a referential integrity error, got {:?}", other),
    }

    let directory = connector.directory();
    assert!(directory.modify_requests().await.is_empty());
    assert_eq!(directory.mutation_count().await, 0);
    assert_eq!(values_of(directory, JDOE, "uid").await, vec!["jdoe".to_string()]);
}

#[tokio::test]
async fn test_clearing_alias_reference_with_memberships_is_refused() {
    let connector = seeded_connector(ConfigBuilder::new().build()).await;

    let err = connector
        .update(&ObjectClass::Account, &jdoe(), vec![Attribute::empty("mail")])
        .await
        .unwrap_err();

    assert!(err.is_referential_integrity());
    assert!(err.to_string().contains("mail"));
    assert_eq!(connector.directory().mutation_count().await, 0);
}

#[tokio::test]
async fn test_clearing_reference_without_memberships_is_allowed() {
    let connector = seeded_connector(ConfigBuilder::new().build()).await;

    connector
        .update(
            &ObjectClass::Account,
            &Uid::new(JROE),
            vec![Attribute::empty("uid")],
        )
        .await
        .unwrap();

    assert!(values_of(connector.directory(), JROE, "uid").await.is_empty());
}

#[tokio::test]
async fn test_changing_reference_values_is_not_a_removal() {
    // Replacing the value keeps a reference, so the update goes ahead.
    let connector = seeded_connector(ConfigBuilder::new().build()).await;

    connector
        .update(
            &ObjectClass::Account,
            &jdoe(),
            vec![Attribute::strings("uid", ["johnd"])],
        )
        .await
        .unwrap();

    assert_eq!(
        values_of(connector.directory(), JDOE, "uid").await,
        vec!["johnd".to_string()]
    );
    // Without maintenance the POSIX group still holds the old value
    assert_eq!(
        values_of(connector.directory(), DEVS, "memberUid").await,
        vec!["jdoe".to_string()]
    );
}

#[tokio::test]
async fn test_steps_run_in_order() {
    let connector = seeded_connector(ConfigBuilder::new().hash_algorithm("SSHA").build()).await;

    connector
        .update(
            &ObjectClass::Account,
            &jdoe(),
            vec![
                Attribute::password(GuardedString::from("n3w-secret")),
                Attribute::groups(MembershipKind::Alias, Vec::<String>::new()),
                Attribute::groups(MembershipKind::Posix, [OPS]),
                Attribute::groups(MembershipKind::Static, [ADMINS]),
                Attribute::strings("description", ["Updated"]),
            ],
        )
        .await
        .unwrap();

    let mutations: Vec<(String, Option<ModifyOp>, Option<String>)> = connector
        .directory()
        .requests()
        .await
        .into_iter()
        .filter_map(|request| match request {
            DirectoryRequest::Modify { dn, modifications } => Some((
                dn,
                modifications.first().map(|m| m.op),
                modifications.first().map(|m| m.attribute.clone()),
            )),
            _ => None,
        })
        .collect();

    let expected = vec![
        // Ordinary attributes
        (JDOE.to_string(), Some(ModifyOp::Replace), Some("description".to_string())),
        // Static: leave staff, stay in admins
        (STAFF.to_string(), Some(ModifyOp::Remove), Some("uniqueMember".to_string())),
        // POSIX: leave devs, then join ops
        (DEVS.to_string(), Some(ModifyOp::Remove), Some("memberUid".to_string())),
        (OPS.to_string(), Some(ModifyOp::Add), Some("memberUid".to_string())),
        // Alias: leave all-staff
        (ALL_STAFF.to_string(), Some(ModifyOp::Remove), Some("rfc822MailMember".to_string())),
        // Password last, on its own
        (JDOE.to_string(), Some(ModifyOp::Replace), Some("userPassword".to_string())),
    ];
    assert_eq!(mutations, expected);

    let password_requests = modifies_of(connector.directory(), JDOE).await;
    assert_eq!(password_requests[1].len(), 1);
}

#[tokio::test]
async fn test_explicit_static_list_only_touches_differences() {
    let connector = seeded_connector(ConfigBuilder::new().build()).await;
    let release = "cn=release,ou=groups,dc=example,dc=com";
    EntryBuilder::static_group(release, &[JROE])
        .add_to(connector.directory())
        .await;
    connector.directory().clear_journal().await;

    connector
        .update(
            &ObjectClass::Account,
            &jdoe(),
            vec![Attribute::groups(MembershipKind::Static, [ADMINS, release])],
        )
        .await
        .unwrap();

    let directory = connector.directory();
    assert!(modifies_of(directory, ADMINS).await.is_empty());
    assert_eq!(modifies_of(directory, STAFF).await.len(), 1);
    assert_eq!(modifies_of(directory, release).await.len(), 1);

    crate::assert_values_eq!(values_of(directory, release, "uniqueMember").await, [JROE, JDOE]);
    assert!(values_of(directory, STAFF, "uniqueMember").await.is_empty());
}

#[tokio::test]
async fn test_absent_pseudo_attributes_leave_memberships_alone() {
    let connector = seeded_connector(ConfigBuilder::new().build()).await;

    connector
        .update(
            &ObjectClass::Account,
            &jdoe(),
            vec![Attribute::strings("description", ["Only this"])],
        )
        .await
        .unwrap();

    assert_eq!(connector.directory().modify_requests().await.len(), 1);
    assert_eq!(
        values_of(connector.directory(), DEVS, "memberUid").await,
        vec!["jdoe".to_string()]
    );
}

/// Locks disabled accounts and pulls them out of every POSIX group.
struct LockingStatus;

impl StatusManagement for LockingStatus {
    fn set_status(
        &self,
        enabled: bool,
        attributes: &mut DirectoryAttributes,
        memberships: &mut MembershipChanges,
    ) {
        if !enabled {
            attributes.put("pwdAccountLockedTime", vec!["000001010000Z".to_string()]);
            memberships.set(MembershipKind::Posix, MembershipChange::RemoveAll);
        }
    }
}

#[tokio::test]
async fn test_status_policy_rewrites_the_request() {
    let connector = seeded_connector(ConfigBuilder::new().build())
        .await
        .with_status_management(Arc::new(LockingStatus));

    connector
        .update(&ObjectClass::Account, &jdoe(), vec![Attribute::enable(false)])
        .await
        .unwrap();

    let directory = connector.directory();
    assert_eq!(
        values_of(directory, JDOE, "pwdAccountLockedTime").await,
        vec!["000001010000Z".to_string()]
    );
    assert!(values_of(directory, DEVS, "memberUid").await.is_empty());
    // Static memberships were not part of the rewrite
    assert_eq!(values_of(directory, ADMINS, "uniqueMember").await.len(), 1);
}

#[tokio::test]
async fn test_enable_without_policy_changes_nothing() {
    let connector = seeded_connector(ConfigBuilder::new().build()).await;

    connector
        .update(&ObjectClass::Account, &jdoe(), vec![Attribute::enable(false)])
        .await
        .unwrap();

    assert_eq!(connector.directory().mutation_count().await, 0);
}

#[tokio::test]
async fn test_update_by_server_assigned_uid() {
    let connector = seeded_connector(ConfigBuilder::new().server_assigned_uids().build()).await;
    let entry_uuid = values_of(connector.directory(), JROE, "entryUUID")
        .await
        .remove(0);

    let uid = connector
        .update(
            &ObjectClass::Account,
            &Uid::new(entry_uuid.clone()),
            vec![Attribute::strings("description", ["Found by entryUUID"])],
        )
        .await
        .unwrap();
    assert_eq!(uid.value(), entry_uuid);

    let searches = connector
        .directory()
        .requests()
        .await
        .into_iter()
        .filter(|r| matches!(r, DirectoryRequest::Search { .. }))
        .count();
    assert_eq!(searches, 1);
    assert_eq!(
        values_of(connector.directory(), JROE, "description").await,
        vec!["Found by entryUUID".to_string()]
    );
}

#[tokio::test]
async fn test_update_unknown_entry() {
    let connector = seeded_connector(ConfigBuilder::new().server_assigned_uids().build()).await;

    let err = connector
        .update(
            &ObjectClass::Account,
            &Uid::new("00000000-0000-0000-0000-000000000000"),
            vec![Attribute::strings("description", ["x"])],
        )
        .await
        .unwrap_err();
    assert!(err.directory_error().unwrap().is_not_found());
    assert_eq!(connector.directory().mutation_count().await, 0);
}

const MIXED: &str = "cn=mixed,ou=groups,dc=example,dc=com";

#[tokio::test]
async fn test_remove_all_matches_member_values_ignoring_case() {
    let connector = seeded_connector(ConfigBuilder::new().build()).await;
    EntryBuilder::alias_group(MIXED, &["JDoe@Example.com"])
        .add_to(connector.directory())
        .await;
    connector.directory().clear_journal().await;

    connector
        .update(
            &ObjectClass::Account,
            &jdoe(),
            vec![Attribute::groups(MembershipKind::Alias, Vec::<String>::new())],
        )
        .await
        .unwrap();

    let directory = connector.directory();
    assert!(values_of(directory, MIXED, "rfc822MailMember").await.is_empty());
    assert!(values_of(directory, ALL_STAFF, "rfc822MailMember").await.is_empty());
}

#[tokio::test]
async fn test_clearing_reference_held_in_other_case_is_refused() {
    let connector = seeded_connector(ConfigBuilder::new().build()).await;
    EntryBuilder::alias_group(MIXED, &["JRoe@Example.com"])
        .add_to(connector.directory())
        .await;
    connector.directory().clear_journal().await;

    let err = connector
        .update(
            &ObjectClass::Account,
            &Uid::new(JROE),
            vec![Attribute::empty("mail")],
        )
        .await
        .unwrap_err();

    match err {
        ProvisioningError::ReferentialIntegrity { kind, groups, .. } => {
            assert_eq!(kind, MembershipKind::Alias);
            assert_eq!(groups, vec![MIXED.to_string()]);
        }
        other => panic!("expected a referential integrity error, got {:?}", other),
    }
    assert_eq!(connector.directory().mutation_count().await, 0);
    assert_eq!(
        values_of(connector.directory(), JROE, "mail").await,
        vec!["jroe@example.com".to_string()]
    );
}
