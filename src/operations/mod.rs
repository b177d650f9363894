//! Create, update, and value operations against a directory.
//!
//! [`LdapConnector`] is the entry point. Each operation runs its steps one
//! directory request at a time, in a fixed order:
//!
//! 1. resolve the target entry
//! 2. sort the input attributes (see [`attributes`])
//! 3. refuse reference value removals that would orphan group memberships
//! 4. apply the status policy
//! 5. write the ordinary attributes
//! 6. rename the entry
//! 7. recompute reference values
//! 8. reconcile static, POSIX and alias memberships
//! 9. write the password
//! 10. return the entry's identifier
//!
//! Failures in steps 1 to 4 leave the directory untouched. A failing
//! directory request in a later step stops the operation; requests already
//! sent stay applied.
//!
//! # Example Usage
//!
//! ```rust
//! use ldap_provisioning::config::LdapConfiguration;
//! use ldap_provisioning::directory::InMemoryDirectory;
//! use ldap_provisioning::membership::MembershipKind;
//! use ldap_provisioning::operations::{Attribute, LdapConnector, ObjectClass};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = LdapConfiguration {
//!     base_contexts: vec!["dc=example,dc=com".to_string()],
//!     uid_attribute: "entryDN".to_string(),
//!     ..Default::default()
//! };
//! let connector = LdapConnector::new(config, InMemoryDirectory::new())?;
//!
//! let uid = connector
//!     .create(
//!         &ObjectClass::Account,
//!         vec![
//!             Attribute::entry_name("uid=jdoe,dc=example,dc=com"),
//!             Attribute::strings("cn", ["John Doe"]),
//!             Attribute::strings("sn", ["Doe"]),
//!         ],
//!     )
//!     .await?;
//!
//! connector
//!     .update(
//!         &ObjectClass::Account,
//!         &uid,
//!         vec![Attribute::groups(MembershipKind::Posix, Vec::<String>::new())],
//!     )
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod attributes;
mod create;
mod update;
mod values;

pub use attributes::{Attribute, AttributeValue};

use crate::config::LdapConfiguration;
use crate::directory::{
    DirectoryError, DirectoryProvider, Dn, Filter, Modification, ModifyOp, SearchScope,
};
use crate::error::ProvisioningResult;
use crate::membership::GroupHelper;
use crate::password::{GuardedString, PasswordHasher};
use crate::status::{NoStatusManagement, StatusManagement};
use log::{debug, warn};
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use zeroize::Zeroizing;

/// Length of generated passwords for `RESET_PASSWORD`.
pub const RESET_PASSWORD_LENGTH: usize = 30;

/// Kind of entry an operation targets.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ObjectClass {
    Account,
    Group,
    /// Any other structural object class, by name
    Other(String),
}

impl fmt::Display for ObjectClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectClass::Account => f.write_str("account"),
            ObjectClass::Group => f.write_str("group"),
            ObjectClass::Other(name) => f.write_str(name),
        }
    }
}

/// Logical identifier of an entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Uid(String);

impl Uid {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn value(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Uid {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for Uid {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Provisioning operations over one directory.
pub struct LdapConnector<D: DirectoryProvider> {
    config: LdapConfiguration,
    directory: D,
    status: Arc<dyn StatusManagement>,
    hasher: PasswordHasher,
    base_contexts: Vec<Dn>,
}

impl<D: DirectoryProvider> LdapConnector<D> {
    /// Validate `config` and build a connector with no status policy.
    pub fn new(config: LdapConfiguration, directory: D) -> ProvisioningResult<Self> {
        config.validate()?;
        let hasher = PasswordHasher::new(config.hash_algorithm()?);
        let base_contexts = config.base_context_dns()?;
        Ok(Self {
            config,
            directory,
            status: Arc::new(NoStatusManagement),
            hasher,
            base_contexts,
        })
    }

    /// Replace the status policy.
    pub fn with_status_management(mut self, status: Arc<dyn StatusManagement>) -> Self {
        self.status = status;
        self
    }

    pub fn config(&self) -> &LdapConfiguration {
        &self.config
    }

    pub fn directory(&self) -> &D {
        &self.directory
    }

    pub fn hasher(&self) -> &PasswordHasher {
        &self.hasher
    }

    pub fn group_helper(&self) -> GroupHelper<'_, D> {
        GroupHelper::new(&self.directory, &self.config, &self.base_contexts)
    }

    /// Configured object classes written for `object_class`.
    pub fn object_classes(&self, object_class: &ObjectClass) -> Vec<String> {
        match object_class {
            ObjectClass::Account => self.config.account_object_classes.clone(),
            ObjectClass::Group => self.config.group_object_classes.clone(),
            ObjectClass::Other(name) => vec![name.clone()],
        }
    }

    /// Attribute holding identifiers of `object_class` entries.
    pub fn uid_attribute(&self, object_class: &ObjectClass) -> &str {
        match object_class {
            ObjectClass::Group => &self.config.gid_attribute,
            _ => &self.config.uid_attribute,
        }
    }

    fn uses_dn_as_uid(&self, object_class: &ObjectClass) -> bool {
        let attribute = self.uid_attribute(object_class);
        attribute.eq_ignore_ascii_case(&self.config.dn_attribute)
            || attribute.eq_ignore_ascii_case("dn")
    }

    /// Find the DN of the entry identified by `uid`.
    pub async fn resolve_dn(&self, object_class: &ObjectClass, uid: &Uid) -> ProvisioningResult<Dn> {
        if self.uses_dn_as_uid(object_class) {
            return Ok(Dn::parse(uid.value())?);
        }

        let uid_attribute = self.uid_attribute(object_class);
        let mut terms = vec![Filter::equals(uid_attribute, uid.value())];
        if let Some(structural) = self.object_classes(object_class).last() {
            terms.push(Filter::equals("objectClass", structural.clone()));
        }
        let filter = Filter::And(terms);

        let mut found: Vec<Dn> = Vec::new();
        for base in &self.base_contexts {
            let entries = self
                .directory
                .search(base, SearchScope::Subtree, &filter, &[uid_attribute])
                .await?;
            found.extend(entries.into_iter().map(|entry| entry.dn().clone()));
        }

        if found.len() > 1 {
            warn!("{} entries match {}={}, using the first", found.len(), uid_attribute, uid);
        }
        found
            .into_iter()
            .next()
            .ok_or_else(|| DirectoryError::no_such_object(uid.to_string()).into())
    }

    /// The identifier of the entry at `dn`.
    pub async fn create_uid(&self, object_class: &ObjectClass, dn: &Dn) -> ProvisioningResult<Uid> {
        if self.uses_dn_as_uid(object_class) {
            return Ok(Uid::new(dn.to_string()));
        }

        let uid_attribute = self.uid_attribute(object_class);
        let entry = self
            .directory
            .read(dn, &[uid_attribute])
            .await?
            .ok_or_else(|| DirectoryError::no_such_object(dn.to_string()))?;
        entry
            .attributes()
            .first(uid_attribute)
            .map(Uid::new)
            .ok_or_else(|| DirectoryError::no_such_attribute(dn.to_string(), uid_attribute).into())
    }

    /// Salt seed derived from the entry's identity.
    pub(crate) fn password_seed(dn: &Dn) -> u64 {
        let mut hasher = DefaultHasher::new();
        dn.normalized().hash(&mut hasher);
        hasher.finish()
    }

    /// Hash `password` for storage at `dn`.
    pub(crate) fn hash_password(
        &self,
        password: &GuardedString,
        dn: &Dn,
    ) -> ProvisioningResult<Zeroizing<String>> {
        let seed = Self::password_seed(dn);
        let hashed = password.access(|plain| self.hasher.hash(plain, seed))?;
        Ok(Zeroizing::new(hashed))
    }

    /// Send an already hashed password as its own modify request.
    pub(crate) async fn write_password(
        &self,
        dn: &Dn,
        op: ModifyOp,
        hashed: &str,
    ) -> ProvisioningResult<()> {
        debug!("Writing {} of {}", self.config.password_attribute, dn);
        let modification = Modification::new(
            op,
            self.config.password_attribute.as_str(),
            vec![hashed.to_string()],
        );
        self.directory.modify(dn, vec![modification]).await?;
        Ok(())
    }
}
