//! Password hashing through the provisioning operations.

use crate::common::builders::ConfigBuilder;
use crate::common::fixtures::JDOE;
use crate::common::{modifies_of, seeded_connector, values_of};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use ldap_provisioning::directory::{Modification, ModifyOp};
use ldap_provisioning::operations::{Attribute, ObjectClass, Uid};
use ldap_provisioning::{GuardedString, ProvisioningError, ValidationError};

const NEW_USER: &str = "uid=asmith,ou=people,dc=example,dc=com";

fn stored_password(values: Vec<String>) -> String {
    assert_eq!(values.len(), 1, "expected exactly one password value");
    values.into_iter().next().unwrap_or_default()
}

#[tokio::test]
async fn test_create_stores_salted_hash() {
    let connector = seeded_connector(ConfigBuilder::new().hash_algorithm("SSHA").build()).await;

    connector
        .create(
            &ObjectClass::Account,
            vec![
                Attribute::entry_name(NEW_USER),
                Attribute::strings("sn", ["Smith"]),
                Attribute::password(GuardedString::from("s3cret")),
            ],
        )
        .await
        .unwrap();

    let stored = stored_password(values_of(connector.directory(), NEW_USER, "userPassword").await);
    let encoded = stored.strip_prefix("{SSHA}").expect("SSHA prefix");
    // 20 bytes of SHA-1 followed by an 8 byte salt
    assert_eq!(STANDARD.decode(encoded).unwrap().len(), 28);

    // Create sends the password inside the add request
    assert!(connector.directory().modify_requests().await.is_empty());
}

#[tokio::test]
async fn test_update_writes_password_in_its_own_request() {
    let connector = seeded_connector(ConfigBuilder::new().hash_algorithm("SHA").build()).await;

    connector
        .update(
            &ObjectClass::Account,
            &Uid::new(JDOE),
            vec![
                Attribute::strings("description", ["Rotated"]),
                Attribute::password(GuardedString::from("n3w")),
            ],
        )
        .await
        .unwrap();

    let requests = modifies_of(connector.directory(), JDOE).await;
    assert_eq!(requests.len(), 2);
    assert_eq!(
        requests[0],
        vec![Modification::replace("description", vec!["Rotated".to_string()])]
    );
    assert_eq!(requests[1].len(), 1);
    assert_eq!(requests[1][0].op, ModifyOp::Replace);

    let stored = stored_password(values_of(connector.directory(), JDOE, "userPassword").await);
    // Unsalted hashes are deterministic
    assert_eq!(stored, "{SHA}PiEu/8etgNyDNvgt0tgyqjuxA0Q=");
}

#[tokio::test]
async fn test_already_hashed_value_is_stored_unchanged() {
    let connector = seeded_connector(ConfigBuilder::new().hash_algorithm("SSHA").build()).await;
    let hashed = "{SSHA}9XNbOA9jyYkLi4sPx5HGoGYRzJ8hZ2zUGQ9xmQ==";

    connector
        .update(
            &ObjectClass::Account,
            &Uid::new(JDOE),
            vec![Attribute::password(GuardedString::from(hashed))],
        )
        .await
        .unwrap();

    assert_eq!(
        values_of(connector.directory(), JDOE, "userPassword").await,
        vec![hashed.to_string()]
    );
}

#[tokio::test]
async fn test_no_algorithm_stores_plaintext() {
    let connector = seeded_connector(ConfigBuilder::new().build()).await;

    connector
        .update(
            &ObjectClass::Account,
            &Uid::new(JDOE),
            vec![Attribute::password(GuardedString::from("plain-text"))],
        )
        .await
        .unwrap();

    assert_eq!(
        values_of(connector.directory(), JDOE, "userPassword").await,
        vec!["plain-text".to_string()]
    );
}

#[tokio::test]
async fn test_reset_password_generates_printable_value() {
    let connector = seeded_connector(ConfigBuilder::new().build()).await;

    connector
        .update(
            &ObjectClass::Account,
            &Uid::new(JDOE),
            vec![Attribute::reset_password()],
        )
        .await
        .unwrap();

    let stored = stored_password(values_of(connector.directory(), JDOE, "userPassword").await);
    assert_eq!(stored.len(), 30);
    assert!(stored.bytes().all(|b| (33..=126).contains(&b)));
}

#[tokio::test]
async fn test_add_and_remove_password_values() {
    let connector = seeded_connector(ConfigBuilder::new().build()).await;
    let uid = Uid::new(JDOE);

    connector
        .add_attribute_values(
            &ObjectClass::Account,
            &uid,
            vec![Attribute::password(GuardedString::from("first"))],
        )
        .await
        .unwrap();
    connector
        .add_attribute_values(
            &ObjectClass::Account,
            &uid,
            vec![Attribute::password(GuardedString::from("second"))],
        )
        .await
        .unwrap();
    crate::assert_values_eq!(
        values_of(connector.directory(), JDOE, "userPassword").await,
        ["first", "second"]
    );

    connector
        .remove_attribute_values(
            &ObjectClass::Account,
            &uid,
            vec![Attribute::password(GuardedString::from("first"))],
        )
        .await
        .unwrap();
    assert_eq!(
        values_of(connector.directory(), JDOE, "userPassword").await,
        vec!["second".to_string()]
    );
}

#[tokio::test]
async fn test_non_utf8_password_stored_as_given_is_refused_before_writing() {
    let connector = seeded_connector(ConfigBuilder::new().build()).await;

    let err = connector
        .update(
            &ObjectClass::Account,
            &Uid::new(JDOE),
            vec![
                Attribute::strings("cn", ["Johnny"]),
                Attribute::password(GuardedString::new(vec![0x66, 0xff, 0x6f])),
            ],
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ProvisioningError::Validation(ValidationError::NonUtf8Password)
    ));
    let directory = connector.directory();
    assert_eq!(directory.mutation_count().await, 0);
    assert_eq!(values_of(directory, JDOE, "cn").await, vec!["John Doe".to_string()]);
}

#[tokio::test]
async fn test_non_utf8_password_value_is_not_added() {
    let connector = seeded_connector(ConfigBuilder::new().build()).await;

    let err = connector
        .add_attribute_values(
            &ObjectClass::Account,
            &Uid::new(JDOE),
            vec![
                Attribute::strings("mail", ["john.doe@example.com"]),
                Attribute::password(GuardedString::new(vec![0xc3, 0x28])),
            ],
        )
        .await
        .unwrap_err();

    assert!(err.is_validation());
    assert_eq!(connector.directory().mutation_count().await, 0);
}
