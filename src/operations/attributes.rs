//! Operation input attributes.
//!
//! Callers describe an entry as a list of [`Attribute`]s. Besides ordinary
//! directory attributes the list may carry operational pseudo-attributes
//! (`__NAME__`, `__UID__`, `__ENABLE__`, `__PASSWORD__`, `RESET_PASSWORD`)
//! and the three group list pseudo-attributes (`ldapGroups`, `posixGroups`,
//! `aliasGroups`). [`partition`] sorts them into the pieces the pipeline
//! handles separately.

use crate::directory::{DirectoryAttributes, Dn};
use crate::error::{ValidationError, ValidationResult};
use crate::membership::{MembershipChange, MembershipChanges, MembershipKind};
use crate::password::GuardedString;
use base64::{Engine as _, engine::general_purpose::STANDARD};

/// The entry's DN.
pub const NAME: &str = "__NAME__";
/// The entry's logical identifier.
pub const UID: &str = "__UID__";
/// Account enabled flag.
pub const ENABLE: &str = "__ENABLE__";
/// Cleartext (or pre-hashed) password.
pub const PASSWORD: &str = "__PASSWORD__";
/// Replace the password with a random one.
pub const RESET_PASSWORD: &str = "RESET_PASSWORD";

/// One attribute value.
#[derive(Debug, Clone)]
pub enum AttributeValue {
    String(String),
    Integer(i64),
    Boolean(bool),
    /// Sent base64-encoded
    Binary(Vec<u8>),
    Password(GuardedString),
}

impl AttributeValue {
    /// Directory string form; `None` for guarded values.
    pub fn encode(&self) -> Option<String> {
        match self {
            AttributeValue::String(s) => Some(s.clone()),
            AttributeValue::Integer(i) => Some(i.to_string()),
            AttributeValue::Boolean(b) => Some(if *b { "TRUE" } else { "FALSE" }.to_string()),
            AttributeValue::Binary(bytes) => Some(STANDARD.encode(bytes)),
            AttributeValue::Password(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::String(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::String(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Integer(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Boolean(value)
    }
}

impl From<GuardedString> for AttributeValue {
    fn from(value: GuardedString) -> Self {
        AttributeValue::Password(value)
    }
}

/// A named, possibly empty, list of values.
#[derive(Debug, Clone)]
pub struct Attribute {
    name: String,
    values: Vec<AttributeValue>,
}

impl Attribute {
    pub fn new(name: impl Into<String>, values: Vec<AttributeValue>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    /// An attribute of string values.
    pub fn strings<I, V>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        Self::new(
            name,
            values
                .into_iter()
                .map(|v| AttributeValue::String(v.into()))
                .collect(),
        )
    }

    /// An attribute present without values.
    pub fn empty(name: impl Into<String>) -> Self {
        Self::new(name, Vec::new())
    }

    /// The `__NAME__` attribute.
    pub fn entry_name(dn: impl Into<String>) -> Self {
        Self::strings(NAME, [dn.into()])
    }

    pub fn uid(uid: impl Into<String>) -> Self {
        Self::strings(UID, [uid.into()])
    }

    pub fn enable(enabled: bool) -> Self {
        Self::new(ENABLE, vec![AttributeValue::Boolean(enabled)])
    }

    pub fn password(password: GuardedString) -> Self {
        Self::new(PASSWORD, vec![AttributeValue::Password(password)])
    }

    pub fn reset_password() -> Self {
        Self::new(RESET_PASSWORD, vec![AttributeValue::Boolean(true)])
    }

    /// The group list pseudo-attribute of `kind`.
    pub fn groups<I, V>(kind: MembershipKind, groups: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        Self::strings(kind.pseudo_attribute(), groups)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn values(&self) -> &[AttributeValue] {
        &self.values
    }

    /// Case-insensitive name comparison.
    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

/// Which operation the attributes are for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PartitionMode {
    Create,
    Update,
    /// Adding or removing individual values
    Values,
}

/// Operation input sorted by how the pipeline handles it.
#[derive(Debug, Default)]
pub(crate) struct Partitioned {
    pub name: Option<Dn>,
    pub enable: Option<bool>,
    pub memberships: MembershipChanges,
    pub password: Option<GuardedString>,
    pub reset_password: bool,
    pub ordinary: DirectoryAttributes,
}

pub(crate) fn partition(
    attributes: Vec<Attribute>,
    mode: PartitionMode,
) -> ValidationResult<Partitioned> {
    let mut result = Partitioned::default();

    for attribute in attributes {
        if attribute.is(UID) {
            return Err(ValidationError::ImmutableUid);
        } else if attribute.is(NAME) {
            if mode == PartitionMode::Values {
                return Err(ValidationError::ImmutableName);
            }
            result.name = Some(parse_name(&attribute)?);
        } else if let Some(kind) = MembershipKind::from_pseudo_attribute(attribute.name()) {
            let groups = attribute
                .values()
                .iter()
                .map(|value| parse_dn(&attribute, value))
                .collect::<ValidationResult<Vec<_>>>()?;
            result
                .memberships
                .set(kind, MembershipChange::from_groups(groups));
        } else if attribute.is(PASSWORD) {
            result.password = password_value(&attribute)?;
        } else if attribute.is(ENABLE) {
            result.enable = boolean_value(&attribute)?;
        } else if attribute.is(RESET_PASSWORD) {
            result.reset_password = boolean_value(&attribute)?.unwrap_or(false);
        } else {
            let values = attribute
                .values()
                .iter()
                .map(|value| {
                    value
                        .encode()
                        .ok_or_else(|| ValidationError::invalid_type(attribute.name(), "plain"))
                })
                .collect::<ValidationResult<Vec<_>>>()?;

            // Empty attributes are not sent on create.
            if values.is_empty() && mode == PartitionMode::Create {
                continue;
            }
            if result.ordinary.contains(attribute.name()) {
                result.ordinary.extend(attribute.name(), values);
            } else {
                result.ordinary.put(attribute.name(), values);
            }
        }
    }

    Ok(result)
}

fn parse_name(attribute: &Attribute) -> ValidationResult<Dn> {
    match attribute.values() {
        [value] => parse_dn(attribute, value),
        _ => Err(ValidationError::invalid_type(attribute.name(), "exactly one string")),
    }
}

fn parse_dn(attribute: &Attribute, value: &AttributeValue) -> ValidationResult<Dn> {
    let raw = value
        .as_str()
        .ok_or_else(|| ValidationError::invalid_type(attribute.name(), "string"))?;
    let dn = Dn::parse(raw)
        .map_err(|e| ValidationError::invalid_dn(attribute.name(), raw, e.to_string()))?;
    if dn.is_root() {
        return Err(ValidationError::invalid_dn(attribute.name(), raw, "empty DN"));
    }
    Ok(dn)
}

fn password_value(attribute: &Attribute) -> ValidationResult<Option<GuardedString>> {
    match attribute.values() {
        [] => Ok(None),
        [AttributeValue::Password(password)] => Ok(Some(password.clone())),
        [AttributeValue::String(plain)] => Ok(Some(GuardedString::from(plain.as_str()))),
        _ => Err(ValidationError::invalid_type(attribute.name(), "a single password")),
    }
}

fn boolean_value(attribute: &Attribute) -> ValidationResult<Option<bool>> {
    match attribute.values().first() {
        None => Ok(None),
        Some(AttributeValue::Boolean(b)) => Ok(Some(*b)),
        Some(AttributeValue::String(s)) => Ok(Some(s.eq_ignore_ascii_case("true"))),
        Some(_) => Err(ValidationError::invalid_type(attribute.name(), "boolean")),
    }
}
