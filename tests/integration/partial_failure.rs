//! Failures after the first mutation leave earlier requests applied.

use crate::common::builders::ConfigBuilder;
use crate::common::fixtures::{ADMINS, DEVS, JDOE, STAFF};
use crate::common::{dn, seeded_connector, values_of};
use ldap_provisioning::directory::DirectoryError;
use ldap_provisioning::operations::{Attribute, ObjectClass, Uid};
use ldap_provisioning::MembershipKind;

const JOHNNY: &str = "cn=Johnny Doe,ou=people,dc=example,dc=com";

#[tokio::test]
async fn test_group_failure_keeps_attribute_changes() {
    let connector = seeded_connector(ConfigBuilder::new().build()).await;
    connector.directory().deny_writes(&dn(STAFF)).await;

    let err = connector
        .update(
            &ObjectClass::Account,
            &Uid::new(JDOE),
            vec![
                Attribute::strings("description", ["Applied"]),
                Attribute::groups(MembershipKind::Static, [ADMINS]),
                Attribute::groups(MembershipKind::Posix, Vec::<String>::new()),
            ],
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err.directory_error(),
        Some(DirectoryError::InsufficientAccess { .. })
    ));

    let directory = connector.directory();
    assert_eq!(
        values_of(directory, JDOE, "description").await,
        vec!["Applied".to_string()]
    );
    assert_eq!(
        values_of(directory, STAFF, "uniqueMember").await,
        vec![JDOE.to_string()]
    );
    // POSIX changes come after the static ones and were never sent
    assert_eq!(
        values_of(directory, DEVS, "memberUid").await,
        vec!["jdoe".to_string()]
    );
}

#[tokio::test]
async fn test_group_failure_after_rename_keeps_new_name() {
    let connector = seeded_connector(ConfigBuilder::new().maintain_ldap_groups().build()).await;
    connector.directory().deny_writes(&dn(STAFF)).await;

    let err = connector
        .update(
            &ObjectClass::Account,
            &Uid::new(JDOE),
            vec![Attribute::entry_name(JOHNNY)],
        )
        .await
        .unwrap_err();
    assert!(err.directory_error().is_some());

    let directory = connector.directory();
    assert!(directory.entry(&dn(JDOE)).await.is_none());
    assert!(directory.entry(&dn(JOHNNY)).await.is_some());
    assert_eq!(
        values_of(directory, STAFF, "uniqueMember").await,
        vec![JDOE.to_string()]
    );
}

#[tokio::test]
async fn test_denied_entry_fails_before_group_changes() {
    let connector = seeded_connector(ConfigBuilder::new().build()).await;
    connector.directory().deny_writes(&dn(JDOE)).await;

    let err = connector
        .update(
            &ObjectClass::Account,
            &Uid::new(JDOE),
            vec![
                Attribute::strings("description", ["Denied"]),
                Attribute::groups(MembershipKind::Static, Vec::<String>::new()),
            ],
        )
        .await
        .unwrap_err();
    assert!(err.directory_error().is_some());

    let directory = connector.directory();
    assert_eq!(
        values_of(directory, ADMINS, "uniqueMember").await,
        vec![JDOE.to_string()]
    );
    assert_eq!(directory.mutation_count().await, 1);
}
