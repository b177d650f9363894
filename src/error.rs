//! Error types for provisioning operations.
//!
//! Every create, update, and value operation returns a [`ProvisioningError`]
//! on failure. The variants follow the four failure categories of the
//! pipeline: malformed input, referential integrity, directory request
//! failures, and configuration problems.

use crate::directory::DirectoryError;
use crate::membership::MembershipKind;

/// Main error type for provisioning operations.
///
/// `Validation` and `ReferentialIntegrity` are raised before any mutating
/// directory request is sent. `Directory` may be raised after earlier
/// requests of the same operation already took effect; nothing is rolled back.
#[derive(Debug, thiserror::Error)]
pub enum ProvisioningError {
    /// Input attributes are malformed
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Removing reference values would orphan existing group memberships
    #[error(
        "Cannot remove the '{attribute}' attribute: still referenced by {kind} group memberships in {groups:?}"
    )]
    ReferentialIntegrity {
        attribute: String,
        kind: MembershipKind,
        groups: Vec<String>,
    },

    /// A directory request failed
    #[error("Directory request failed: {0}")]
    Directory(#[from] DirectoryError),

    /// The connector configuration is unusable
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
}

/// Validation errors for operation input.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    /// The logical identifier cannot be changed
    #[error("Unable to modify an object's uid")]
    ImmutableUid,

    /// The name can only change through a full update
    #[error("Unable to modify an object's name")]
    ImmutableName,

    /// Create requires a name
    #[error("No Name attribute provided in the attributes")]
    MissingName,

    /// A name or group list holds something that is not a DN
    #[error("Attribute '{attribute}' has an invalid DN '{value}': {message}")]
    InvalidDn {
        attribute: String,
        value: String,
        message: String,
    },

    /// An attribute carries a value of the wrong type
    #[error("Attribute '{attribute}' expects {expected} values")]
    InvalidValueType { attribute: String, expected: String },

    /// The entry has no reference value to write into a POSIX or alias group
    #[error("Cannot add entry '{dn}' to {kind} groups because it has no '{attribute}' attribute")]
    MissingReferenceValue {
        kind: MembershipKind,
        dn: String,
        attribute: String,
    },

    /// A password stored without hashing is not valid UTF-8
    #[error("Password values stored as given must be valid UTF-8")]
    NonUtf8Password,
}

/// Errors in the connector configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    /// The password hash algorithm is not one of NONE, SHA, SSHA, MD5, SMD5
    #[error("Unsupported hash algorithm: {algorithm}")]
    UnsupportedHashAlgorithm { algorithm: String },

    /// A required attribute mapping is blank
    #[error("Configuration property '{property}' must not be blank")]
    BlankProperty { property: String },

    /// No base context was configured
    #[error("At least one base context is required")]
    MissingBaseContexts,

    /// A base context is not a valid distinguished name
    #[error("Invalid base context '{context}': {message}")]
    InvalidBaseContext { context: String, message: String },

    /// The configuration document could not be parsed
    #[error("Invalid configuration document: {0}")]
    InvalidDocument(#[from] serde_json::Error),
}

// Convenience methods for creating common errors
impl ProvisioningError {
    /// Create a referential integrity error
    pub fn referential_integrity(
        attribute: impl Into<String>,
        kind: MembershipKind,
        groups: Vec<String>,
    ) -> Self {
        Self::ReferentialIntegrity {
            attribute: attribute.into(),
            kind,
            groups,
        }
    }

    /// The underlying directory error, if this is a directory failure
    pub fn directory_error(&self) -> Option<&DirectoryError> {
        match self {
            Self::Directory(error) => Some(error),
            _ => None,
        }
    }

    pub fn is_referential_integrity(&self) -> bool {
        matches!(self, Self::ReferentialIntegrity { .. })
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

impl ValidationError {
    /// Create an invalid DN error
    pub fn invalid_dn(
        attribute: impl Into<String>,
        value: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidDn {
            attribute: attribute.into(),
            value: value.into(),
            message: message.into(),
        }
    }

    /// Create an invalid value type error
    pub fn invalid_type(attribute: impl Into<String>, expected: impl Into<String>) -> Self {
        Self::InvalidValueType {
            attribute: attribute.into(),
            expected: expected.into(),
        }
    }

    /// Create a missing reference value error
    pub fn missing_reference(
        kind: MembershipKind,
        dn: impl Into<String>,
        attribute: impl Into<String>,
    ) -> Self {
        Self::MissingReferenceValue {
            kind,
            dn: dn.into(),
            attribute: attribute.into(),
        }
    }
}

impl ConfigurationError {
    pub fn unsupported_hash_algorithm(algorithm: impl Into<String>) -> Self {
        Self::UnsupportedHashAlgorithm {
            algorithm: algorithm.into(),
        }
    }

    pub fn blank_property(property: impl Into<String>) -> Self {
        Self::BlankProperty {
            property: property.into(),
        }
    }
}

// Result type aliases for convenience
pub type ProvisioningResult<T> = Result<T, ProvisioningError>;
pub type ValidationResult<T> = Result<T, ValidationError>;
pub type ConfigurationResult<T> = Result<T, ConfigurationError>;
