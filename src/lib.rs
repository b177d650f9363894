//! Directory account and group provisioning for Rust.
//!
//! Creates and updates directory entries, keeps their static, POSIX and
//! alias group memberships consistent across renames and reference value
//! changes, and hashes passwords before they are stored.
//!
//! # Core Components
//!
//! - [`LdapConnector`] - Create, update, and value operations
//! - [`DirectoryProvider`] - Trait for the directory the connector talks to
//! - [`GroupHelper`] - Membership queries and group member mutations
//! - [`MembershipDiff`] - Set difference of current and desired memberships
//! - [`PasswordHasher`] - Salted digest password hashing
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use ldap_provisioning::{LdapConfiguration, LdapConnector};
//! use ldap_provisioning::directory::InMemoryDirectory;
//! use ldap_provisioning::operations::{Attribute, ObjectClass};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = LdapConfiguration::from_json(
//!     r#"{ "baseContexts": ["dc=example,dc=com"], "passwordHashAlgorithm": "SSHA" }"#,
//! )?;
//! let connector = LdapConnector::new(config, InMemoryDirectory::new())?;
//!
//! let uid = connector
//!     .create(
//!         &ObjectClass::Account,
//!         vec![
//!             Attribute::entry_name("uid=jdoe,dc=example,dc=com"),
//!             Attribute::strings("sn", ["Doe"]),
//!         ],
//!     )
//!     .await?;
//! println!("created {}", uid);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod directory;
pub mod error;
pub mod membership;
pub mod operations;
pub mod password;
pub mod status;

// Re-export commonly used types for convenience
pub use config::LdapConfiguration;
pub use directory::{DirectoryError, DirectoryProvider, Dn, InMemoryDirectory};
pub use error::{ProvisioningError, ProvisioningResult, ValidationError};
pub use membership::{
    GroupHelper, GroupMembership, MembershipCache, MembershipChange, MembershipDiff,
    MembershipKind,
};
pub use operations::{Attribute, AttributeValue, LdapConnector, ObjectClass, Uid};
pub use password::{GuardedString, HashAlgorithm, PasswordHasher};
pub use status::{NoStatusManagement, StatusManagement};
