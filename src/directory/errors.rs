//! Directory request errors.
//!
//! These errors describe failures reported by the directory collaborator while
//! servicing a single search, add, modify, or rename request. They carry no
//! knowledge of provisioning semantics; the mutation pipeline decides which of
//! them are tolerated (a duplicate member value on add) and which abort the
//! operation.

use std::fmt;

/// Errors returned by a [`DirectoryProvider`](super::DirectoryProvider).
#[derive(Debug)]
pub enum DirectoryError {
    /// The target entry does not exist.
    NoSuchObject { dn: String },

    /// An attribute value being added is already present on the entry.
    AttributeOrValueExists {
        dn: String,
        attribute: String,
        value: Option<String>,
    },

    /// An attribute value being removed is not present on the entry.
    NoSuchAttribute {
        dn: String,
        attribute: String,
        value: Option<String>,
    },

    /// An entry with the same DN already exists.
    EntryAlreadyExists { dn: String },

    /// The bound identity may not perform the request.
    InsufficientAccess { operation: String, dn: String },

    /// The request would leave the entry in violation of its object classes.
    ObjectClassViolation { dn: String, message: String },

    /// The search filter could not be parsed.
    InvalidFilter { filter: String, message: String },

    /// A distinguished name could not be parsed.
    InvalidDn { dn: String, message: String },

    /// The directory is not reachable.
    Unavailable { message: String },

    /// Any other directory failure.
    Internal {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl fmt::Display for DirectoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DirectoryError::NoSuchObject { dn } => write!(f, "No such object: {}", dn),
            DirectoryError::AttributeOrValueExists {
                dn,
                attribute,
                value,
            } => {
                if let Some(value) = value {
                    write!(
                        f,
                        "Value '{}' of attribute '{}' already exists on {}",
                        value, attribute, dn
                    )
                } else {
                    write!(f, "Attribute '{}' already exists on {}", attribute, dn)
                }
            }
            DirectoryError::NoSuchAttribute {
                dn,
                attribute,
                value,
            } => {
                if let Some(value) = value {
                    write!(
                        f,
                        "Value '{}' of attribute '{}' not present on {}",
                        value, attribute, dn
                    )
                } else {
                    write!(f, "Attribute '{}' not present on {}", attribute, dn)
                }
            }
            DirectoryError::EntryAlreadyExists { dn } => {
                write!(f, "Entry already exists: {}", dn)
            }
            DirectoryError::InsufficientAccess { operation, dn } => {
                write!(f, "Insufficient access for {} on {}", operation, dn)
            }
            DirectoryError::ObjectClassViolation { dn, message } => {
                write!(f, "Object class violation on {}: {}", dn, message)
            }
            DirectoryError::InvalidFilter { filter, message } => {
                write!(f, "Invalid filter '{}': {}", filter, message)
            }
            DirectoryError::InvalidDn { dn, message } => {
                write!(f, "Invalid DN '{}': {}", dn, message)
            }
            DirectoryError::Unavailable { message } => {
                write!(f, "Directory unavailable: {}", message)
            }
            DirectoryError::Internal { message, .. } => {
                write!(f, "Internal directory error: {}", message)
            }
        }
    }
}

impl std::error::Error for DirectoryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DirectoryError::Internal { source, .. } => source
                .as_ref()
                .map(|e| e.as_ref() as &(dyn std::error::Error + 'static)),
            _ => None,
        }
    }
}

impl DirectoryError {
    /// Create a new NoSuchObject error.
    pub fn no_such_object(dn: impl Into<String>) -> Self {
        Self::NoSuchObject { dn: dn.into() }
    }

    /// Create a new AttributeOrValueExists error for one value.
    pub fn value_exists(
        dn: impl Into<String>,
        attribute: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self::AttributeOrValueExists {
            dn: dn.into(),
            attribute: attribute.into(),
            value: Some(value.into()),
        }
    }

    /// Create a new NoSuchAttribute error for one value.
    pub fn no_such_value(
        dn: impl Into<String>,
        attribute: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self::NoSuchAttribute {
            dn: dn.into(),
            attribute: attribute.into(),
            value: Some(value.into()),
        }
    }

    /// Create a new NoSuchAttribute error for a whole attribute.
    pub fn no_such_attribute(dn: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self::NoSuchAttribute {
            dn: dn.into(),
            attribute: attribute.into(),
            value: None,
        }
    }

    /// Create a new EntryAlreadyExists error.
    pub fn entry_already_exists(dn: impl Into<String>) -> Self {
        Self::EntryAlreadyExists { dn: dn.into() }
    }

    /// Create a new InsufficientAccess error.
    pub fn insufficient_access(operation: impl Into<String>, dn: impl Into<String>) -> Self {
        Self::InsufficientAccess {
            operation: operation.into(),
            dn: dn.into(),
        }
    }

    /// Create a new ObjectClassViolation error.
    pub fn object_class_violation(dn: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ObjectClassViolation {
            dn: dn.into(),
            message: message.into(),
        }
    }

    /// Create a new InvalidFilter error.
    pub fn invalid_filter(filter: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidFilter {
            filter: filter.into(),
            message: message.into(),
        }
    }

    /// Create a new InvalidDn error.
    pub fn invalid_dn(dn: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidDn {
            dn: dn.into(),
            message: message.into(),
        }
    }

    /// Create a new Unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Create a new Internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// Create a new Internal error with a source error.
    pub fn internal_with_source(
        message: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::Internal {
            message: message.into(),
            source: Some(source),
        }
    }

    /// Check if this error reports an entry that does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, DirectoryError::NoSuchObject { .. })
    }

    /// Check if this error reports a value that is already present.
    ///
    /// Membership adds treat this condition as success.
    pub fn is_value_exists(&self) -> bool {
        matches!(self, DirectoryError::AttributeOrValueExists { .. })
    }

    /// Check if this error reports a conflicting entry or value.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            DirectoryError::AttributeOrValueExists { .. }
                | DirectoryError::EntryAlreadyExists { .. }
        )
    }

    /// Check if this error indicates a temporary failure.
    pub fn is_temporary(&self) -> bool {
        matches!(self, DirectoryError::Unavailable { .. })
    }
}
