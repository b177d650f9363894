//! Renames and reference value changes under membership maintenance.

use crate::common::builders::{ConfigBuilder, EntryBuilder};
use crate::common::fixtures::{ADMINS, DEVS, JDOE, OPS, STAFF};
use crate::common::{modifies_of, seeded_connector, values_of};
use ldap_provisioning::directory::DirectoryRequest;
use ldap_provisioning::operations::{Attribute, ObjectClass, Uid};
use ldap_provisioning::MembershipKind;

const JOHNNY: &str = "cn=Johnny Doe,ou=people,dc=example,dc=com";

#[tokio::test]
async fn test_maintained_static_groups_follow_rename() {
    let connector = seeded_connector(ConfigBuilder::new().maintain_ldap_groups().build()).await;

    let uid = connector
        .update(
            &ObjectClass::Account,
            &Uid::new(JDOE),
            vec![Attribute::entry_name(JOHNNY)],
        )
        .await
        .unwrap();
    assert_eq!(uid.value(), JOHNNY);

    let directory = connector.directory();
    assert!(directory.entry(&crate::common::dn(JDOE)).await.is_none());
    assert_eq!(values_of(directory, JOHNNY, "cn").await, vec!["Johnny Doe".to_string()]);
    for group in [ADMINS, STAFF] {
        assert_eq!(
            values_of(directory, group, "uniqueMember").await,
            vec![JOHNNY.to_string()],
            "membership of {}",
            group
        );
    }
}

#[tokio::test]
async fn test_rename_without_maintenance_leaves_groups_alone() {
    let connector = seeded_connector(ConfigBuilder::new().build()).await;

    connector
        .update(
            &ObjectClass::Account,
            &Uid::new(JDOE),
            vec![Attribute::entry_name(JOHNNY)],
        )
        .await
        .unwrap();

    let directory = connector.directory();
    assert!(modifies_of(directory, ADMINS).await.is_empty());
    assert_eq!(
        values_of(directory, ADMINS, "uniqueMember").await,
        vec![JDOE.to_string()]
    );
}

#[tokio::test]
async fn test_rename_to_new_superior() {
    let connector = seeded_connector(ConfigBuilder::new().maintain_ldap_groups().build()).await;
    let alumni = "ou=alumni,dc=example,dc=com";
    EntryBuilder::new(alumni)
        .object_classes(&["top", "organizationalUnit"])
        .add_to(connector.directory())
        .await;
    connector.directory().clear_journal().await;

    let moved = "cn=John Doe,ou=alumni,dc=example,dc=com";
    let uid = connector
        .update(
            &ObjectClass::Account,
            &Uid::new(JDOE),
            vec![Attribute::entry_name(moved)],
        )
        .await
        .unwrap();
    assert_eq!(uid.value(), moved);

    let requests = connector.directory().requests().await;
    assert!(requests.contains(&DirectoryRequest::Rename {
        dn: JDOE.to_string(),
        new_dn: moved.to_string(),
    }));
    assert_eq!(
        values_of(connector.directory(), STAFF, "uniqueMember").await,
        vec![moved.to_string()]
    );
}

#[tokio::test]
async fn test_rename_with_explicit_static_list() {
    let connector = seeded_connector(ConfigBuilder::new().maintain_ldap_groups().build()).await;

    connector
        .update(
            &ObjectClass::Account,
            &Uid::new(JDOE),
            vec![
                Attribute::entry_name(JOHNNY),
                Attribute::groups(MembershipKind::Static, [STAFF]),
            ],
        )
        .await
        .unwrap();

    let directory = connector.directory();
    assert!(values_of(directory, ADMINS, "uniqueMember").await.is_empty());
    assert_eq!(
        values_of(directory, STAFF, "uniqueMember").await,
        vec![JOHNNY.to_string()]
    );
}

#[tokio::test]
async fn test_maintained_posix_groups_follow_uid_change() {
    let connector = seeded_connector(ConfigBuilder::new().maintain_posix_groups().build()).await;

    connector
        .update(
            &ObjectClass::Account,
            &Uid::new(JDOE),
            vec![Attribute::strings("uid", ["jd"])],
        )
        .await
        .unwrap();

    let directory = connector.directory();
    assert_eq!(values_of(directory, JDOE, "uid").await, vec!["jd".to_string()]);
    assert_eq!(values_of(directory, DEVS, "memberUid").await, vec!["jd".to_string()]);
    // Groups that never referenced the old value are untouched
    assert!(modifies_of(directory, OPS).await.is_empty());
}

#[tokio::test]
async fn test_maintained_posix_groups_use_smallest_new_value() {
    let connector = seeded_connector(ConfigBuilder::new().maintain_posix_groups().build()).await;

    connector
        .update(
            &ObjectClass::Account,
            &Uid::new(JDOE),
            vec![Attribute::strings("uid", ["zeta", "alpha", "beta"])],
        )
        .await
        .unwrap();

    assert_eq!(
        values_of(connector.directory(), DEVS, "memberUid").await,
        vec!["alpha".to_string()]
    );
}

#[tokio::test]
async fn test_posix_groups_joined_after_rename() {
    // The uid is not part of the update, so the new groups are joined with
    // the value read back from the renamed entry.
    let connector = seeded_connector(ConfigBuilder::new().build()).await;

    connector
        .update(
            &ObjectClass::Account,
            &Uid::new(JDOE),
            vec![
                Attribute::entry_name(JOHNNY),
                Attribute::groups(MembershipKind::Posix, [OPS]),
            ],
        )
        .await
        .unwrap();

    let directory = connector.directory();
    assert!(values_of(directory, DEVS, "memberUid").await.is_empty());
    crate::assert_values_eq!(values_of(directory, OPS, "memberUid").await, ["someone", "jdoe"]);

    let requests = directory.requests().await;
    let rename_at = requests
        .iter()
        .position(|r| matches!(r, DirectoryRequest::Rename { .. }))
        .unwrap();
    let ops_at = requests
        .iter()
        .position(|r| matches!(r, DirectoryRequest::Modify { dn, .. } if dn == OPS))
        .unwrap();
    assert!(rename_at < ops_at);
}

#[tokio::test]
async fn test_rename_keeps_extra_naming_values() {
    let connector = seeded_connector(ConfigBuilder::new().build()).await;

    connector
        .update(
            &ObjectClass::Account,
            &Uid::new(JDOE),
            vec![
                Attribute::entry_name(JOHNNY),
                Attribute::strings("cn", ["Johnny Doe", "JD"]),
            ],
        )
        .await
        .unwrap();

    let directory = connector.directory();
    crate::assert_values_eq!(values_of(directory, JOHNNY, "cn").await, ["Johnny Doe", "JD"]);
    assert!(modifies_of(directory, JDOE).await.is_empty());

    let requests = directory.requests().await;
    let rename_at = requests
        .iter()
        .position(|r| matches!(r, DirectoryRequest::Rename { .. }))
        .unwrap();
    let naming_at = requests
        .iter()
        .position(|r| matches!(r, DirectoryRequest::Modify { dn, .. } if dn == JOHNNY))
        .unwrap();
    assert!(rename_at < naming_at);
}

#[tokio::test]
async fn test_rename_with_only_rdn_naming_value_sends_no_modify() {
    let connector = seeded_connector(ConfigBuilder::new().build()).await;

    connector
        .update(
            &ObjectClass::Account,
            &Uid::new(JDOE),
            vec![
                Attribute::entry_name(JOHNNY),
                Attribute::strings("cn", ["johnny doe"]),
            ],
        )
        .await
        .unwrap();

    let directory = connector.directory();
    assert!(modifies_of(directory, JOHNNY).await.is_empty());
    assert_eq!(values_of(directory, JOHNNY, "cn").await, vec!["Johnny Doe".to_string()]);
}
