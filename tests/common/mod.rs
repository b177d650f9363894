//! Common test utilities for provisioning tests.
//!
//! This module provides builders, fixtures, and small helpers shared by the
//! integration tests.

use ldap_provisioning::directory::{Dn, InMemoryDirectory, Modification};
use ldap_provisioning::{LdapConfiguration, LdapConnector};


/// Initialise `env_logger` once; later calls are ignored.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Parse a DN, panicking on malformed test input.
pub fn dn(raw: &str) -> Dn {
    Dn::parse(raw).unwrap_or_else(|e| panic!("invalid test DN '{}': {}", raw, e))
}

/// A connector over the seeded fixture directory.
pub async fn seeded_connector(config: LdapConfiguration) -> LdapConnector<InMemoryDirectory> {
    init_logging();
    let directory = fixtures::seeded_directory().await;
    LdapConnector::new(config, directory).expect("fixture configuration is valid")
}

/// Values of `attribute` on the entry at `entry`, empty when absent.
pub async fn values_of(directory: &InMemoryDirectory, entry: &str, attribute: &str) -> Vec<String> {
    directory
        .entry(&dn(entry))
        .await
        .unwrap_or_else(|| panic!("entry '{}' does not exist", entry))
        .attributes()
        .get(attribute)
        .map(|values| values.to_vec())
        .unwrap_or_default()
}

/// Modify requests sent to `entry`, compared as DNs.
pub async fn modifies_of(directory: &InMemoryDirectory, entry: &str) -> Vec<Vec<Modification>> {
    let target = dn(entry);
    directory
        .modify_requests()
        .await
        .into_iter()
        .filter(|(modified, _)| dn(modified) == target)
        .map(|(_, modifications)| modifications)
        .collect()
}

/// Assert a value list equals `expected`, ignoring order and case.
#[macro_export]
macro_rules! assert_values_eq {
    ($actual:expr, $expected:expr) => {{
        let mut actual: Vec<String> = $actual.iter().map(|v| v.to_lowercase()).collect();
        let mut expected: Vec<String> = $expected.iter().map(|v| v.to_lowercase()).collect();
        actual.sort();
        expected.sort();
        assert_eq!(actual, expected);
    }};
}
