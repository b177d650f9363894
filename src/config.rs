//! Connector configuration.
//!
//! [`LdapConfiguration`] carries the attribute mappings and policies the
//! provisioning pipeline consumes. It deserializes from a camelCase JSON
//! document in which every property is optional and falls back to the
//! defaults of a typical `inetOrgPerson` / `groupOfUniqueNames` directory.
//!
//! ```rust
//! use ldap_provisioning::config::LdapConfiguration;
//!
//! let config = LdapConfiguration::from_json(
//!     r#"{
//!         "baseContexts": ["dc=example,dc=com"],
//!         "principal": "cn=admin,dc=example,dc=com",
//!         "maintainPosixGroupMembership": true,
//!         "passwordHashAlgorithm": "SSHA"
//!     }"#,
//! )
//! .unwrap();
//!
//! assert_eq!(config.group_member_attribute, "uniqueMember");
//! assert_eq!(config.alias_group_member_attribute(), "rfc822MailMember");
//! assert!(config.maintain_posix_group_membership);
//! ```

use crate::directory::Dn;
use crate::error::{ConfigurationError, ConfigurationResult};
use crate::password::HashAlgorithm;
use serde::{Deserialize, Serialize};

pub const DEFAULT_GROUP_MEMBER_ATTRIBUTE: &str = "uniqueMember";
pub const DEFAULT_ALIAS_GROUP_MEMBER_ATTRIBUTE: &str = "rfc822MailMember";
pub const DEFAULT_ALIAS_GROUP_MEMBER_REF_ATTRIBUTE: &str = "mail";

/// Group-side attribute holding POSIX group members.
pub const POSIX_GROUP_MEMBER_ATTRIBUTE: &str = "memberUid";

/// Member-side attribute whose values POSIX groups reference.
pub const POSIX_REF_ATTRIBUTE: &str = "uid";

/// Provisioning configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LdapConfiguration {
    /// Search bases for entry and group lookups
    pub base_contexts: Vec<String>,

    /// Bind identity, used to seed mandatory group member attributes
    pub principal: String,

    /// Attribute of static groups holding member DNs
    pub group_member_attribute: String,

    /// Attribute of alias groups holding member mail values
    pub alias_group_member_attribute: String,

    /// Member-side attribute referenced by alias groups
    pub alias_group_member_ref_attribute: String,

    /// Re-point static memberships when an entry is renamed
    pub maintain_ldap_group_membership: bool,

    /// Re-point POSIX memberships when reference values change
    pub maintain_posix_group_membership: bool,

    /// Re-point alias memberships when reference values change
    pub maintain_alias_group_membership: bool,

    /// Attribute receiving the (hashed) password
    pub password_attribute: String,

    /// One of NONE, SHA, SSHA, MD5, SMD5; absent means NONE
    pub password_hash_algorithm: Option<String>,

    /// Attribute supplying account identifiers
    pub uid_attribute: String,

    /// Attribute supplying group identifiers
    pub gid_attribute: String,

    /// Attribute that holds an entry's own DN
    pub dn_attribute: String,

    pub account_object_classes: Vec<String>,

    pub group_object_classes: Vec<String>,
}

impl Default for LdapConfiguration {
    fn default() -> Self {
        Self {
            base_contexts: Vec::new(),
            principal: String::new(),
            group_member_attribute: DEFAULT_GROUP_MEMBER_ATTRIBUTE.to_string(),
            alias_group_member_attribute: DEFAULT_ALIAS_GROUP_MEMBER_ATTRIBUTE.to_string(),
            alias_group_member_ref_attribute: DEFAULT_ALIAS_GROUP_MEMBER_REF_ATTRIBUTE.to_string(),
            maintain_ldap_group_membership: false,
            maintain_posix_group_membership: false,
            maintain_alias_group_membership: false,
            password_attribute: "userPassword".to_string(),
            password_hash_algorithm: None,
            uid_attribute: "entryUUID".to_string(),
            gid_attribute: "entryUUID".to_string(),
            dn_attribute: "entryDN".to_string(),
            account_object_classes: ["top", "person", "organizationalPerson", "inetOrgPerson"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            group_object_classes: ["top", "groupOfUniqueNames"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl LdapConfiguration {
    /// Load a configuration document and validate it.
    pub fn from_json(document: &str) -> ConfigurationResult<Self> {
        let config: LdapConfiguration = serde_json::from_str(document)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that mappings are usable and the hash algorithm is supported.
    pub fn validate(&self) -> ConfigurationResult<()> {
        self.base_context_dns()?;

        let required = [
            ("groupMemberAttribute", &self.group_member_attribute),
            (
                "aliasGroupMemberRefAttribute",
                &self.alias_group_member_ref_attribute,
            ),
            ("passwordAttribute", &self.password_attribute),
            ("uidAttribute", &self.uid_attribute),
            ("gidAttribute", &self.gid_attribute),
            ("dnAttribute", &self.dn_attribute),
        ];
        for (property, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigurationError::blank_property(property));
            }
        }

        self.hash_algorithm()?;
        Ok(())
    }

    /// Parsed base contexts.
    pub fn base_context_dns(&self) -> ConfigurationResult<Vec<Dn>> {
        if self.base_contexts.is_empty() {
            return Err(ConfigurationError::MissingBaseContexts);
        }
        self.base_contexts
            .iter()
            .map(|context| {
                if context.trim().is_empty() {
                    return Err(ConfigurationError::InvalidBaseContext {
                        context: context.clone(),
                        message: "base context is blank".to_string(),
                    });
                }
                Dn::parse(context).map_err(|e| ConfigurationError::InvalidBaseContext {
                    context: context.clone(),
                    message: e.to_string(),
                })
            })
            .collect()
    }

    /// Alias member attribute; a blank value falls back to the default.
    pub fn alias_group_member_attribute(&self) -> &str {
        if self.alias_group_member_attribute.trim().is_empty() {
            DEFAULT_ALIAS_GROUP_MEMBER_ATTRIBUTE
        } else {
            &self.alias_group_member_attribute
        }
    }

    /// The configured password hash algorithm.
    pub fn hash_algorithm(&self) -> ConfigurationResult<HashAlgorithm> {
        match self.password_hash_algorithm.as_deref() {
            None => Ok(HashAlgorithm::None),
            Some(name) => name.parse(),
        }
    }
}
