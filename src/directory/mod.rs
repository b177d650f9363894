//! Directory abstraction layer.
//!
//! This module separates the provisioning pipeline from the directory wire
//! protocol. The [`DirectoryProvider`] trait describes the request/response
//! capabilities the pipeline consumes (search, read, add, modify, rename);
//! connection management, paging, and schema handling live behind it.
//!
//! # Architecture
//!
//! The directory layer is responsible for:
//! - Executing one request and reporting its outcome
//! - Evaluating search filters within a base and scope
//! - Enforcing attribute-level consistency between concurrent callers
//!
//! The directory layer is NOT responsible for:
//! - Deciding which memberships to add or remove
//! - Password hashing
//! - Retrying or rolling back failed requests
//!
//! # Example Usage
//!
//! ```rust
//! use ldap_provisioning::directory::{
//!     DirectoryAttributes, DirectoryProvider, Dn, Filter, InMemoryDirectory, SearchScope,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let directory = InMemoryDirectory::new();
//!
//! let dn = Dn::parse("uid=jdoe,ou=people,dc=example,dc=com")?;
//! let mut attrs = DirectoryAttributes::new();
//! attrs.put("objectClass", vec!["inetOrgPerson".to_string()]);
//! attrs.put("uid", vec!["jdoe".to_string()]);
//! directory.add(&dn, attrs).await?;
//!
//! let base = Dn::parse("dc=example,dc=com")?;
//! let found = directory
//!     .search(&base, SearchScope::Subtree, &Filter::equals("uid", "jdoe"), &[])
//!     .await?;
//! assert_eq!(found.len(), 1);
//! # Ok(())
//! # }
//! ```

pub mod dn;
pub mod errors;
pub mod filter;
pub mod in_memory;

pub use dn::{Ava, Dn, Rdn};
pub use errors::DirectoryError;
pub use filter::Filter;
pub use in_memory::{DirectoryRequest, InMemoryDirectory};

use std::fmt;
use std::future::Future;

/// An ordered, case-insensitively keyed collection of directory attributes.
///
/// Attribute order is insertion order; value order within an attribute is
/// preserved as given.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryAttributes {
    entries: Vec<(String, Vec<String>)>,
}

impl DirectoryAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|(n, _)| n.eq_ignore_ascii_case(name))
    }

    /// Values of an attribute, `None` if the attribute is absent.
    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.position(name).map(|i| self.entries[i].1.as_slice())
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Vec<String>> {
        match self.position(name) {
            Some(i) => Some(&mut self.entries[i].1),
            None => None,
        }
    }

    /// First value of an attribute.
    pub fn first(&self, name: &str) -> Option<&str> {
        self.get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Set an attribute, replacing any existing values.
    pub fn put(&mut self, name: impl Into<String>, values: Vec<String>) {
        let name = name.into();
        match self.position(&name) {
            Some(i) => self.entries[i].1 = values,
            None => self.entries.push((name, values)),
        }
    }

    /// Append values to an attribute, creating it if needed. Values already
    /// present are not duplicated.
    pub fn extend(&mut self, name: impl Into<String>, values: impl IntoIterator<Item = String>) {
        let name = name.into();
        let index = match self.position(&name) {
            Some(i) => i,
            None => {
                self.entries.push((name, Vec::new()));
                self.entries.len() - 1
            }
        };
        let existing = &mut self.entries[index].1;
        for value in values {
            if !existing.iter().any(|v| v == &value) {
                existing.push(value);
            }
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<Vec<String>> {
        self.position(name).map(|i| self.entries.remove(i).1)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keep only the named attributes. An empty list keeps everything.
    pub fn project(&self, names: &[&str]) -> DirectoryAttributes {
        if names.is_empty() || names.contains(&"*") {
            return self.clone();
        }
        DirectoryAttributes {
            entries: self
                .entries
                .iter()
                .filter(|(n, _)| names.iter().any(|want| want.eq_ignore_ascii_case(n)))
                .cloned()
                .collect(),
        }
    }
}

impl IntoIterator for DirectoryAttributes {
    type Item = (String, Vec<String>);
    type IntoIter = std::vec::IntoIter<(String, Vec<String>)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// A directory entry: its DN plus its attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    dn: Dn,
    attributes: DirectoryAttributes,
}

impl Entry {
    pub fn new(dn: Dn, attributes: DirectoryAttributes) -> Self {
        Self { dn, attributes }
    }

    pub fn dn(&self) -> &Dn {
        &self.dn
    }

    pub fn attributes(&self) -> &DirectoryAttributes {
        &self.attributes
    }

    pub fn attributes_mut(&mut self) -> &mut DirectoryAttributes {
        &mut self.attributes
    }

    /// The entry's `objectClass` values.
    pub fn object_classes(&self) -> &[String] {
        self.attributes.get("objectClass").unwrap_or(&[])
    }

    pub fn into_parts(self) -> (Dn, DirectoryAttributes) {
        (self.dn, self.attributes)
    }
}

/// Kind of change in a modify request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModifyOp {
    Add,
    Remove,
    Replace,
}

impl fmt::Display for ModifyOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModifyOp::Add => f.write_str("add"),
            ModifyOp::Remove => f.write_str("delete"),
            ModifyOp::Replace => f.write_str("replace"),
        }
    }
}

/// One item of a modify request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Modification {
    pub op: ModifyOp,
    pub attribute: String,
    pub values: Vec<String>,
}

impl Modification {
    pub fn new(op: ModifyOp, attribute: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            op,
            attribute: attribute.into(),
            values,
        }
    }

    pub fn add(attribute: impl Into<String>, values: Vec<String>) -> Self {
        Self::new(ModifyOp::Add, attribute, values)
    }

    pub fn remove(attribute: impl Into<String>, values: Vec<String>) -> Self {
        Self::new(ModifyOp::Remove, attribute, values)
    }

    pub fn replace(attribute: impl Into<String>, values: Vec<String>) -> Self {
        Self::new(ModifyOp::Replace, attribute, values)
    }
}

/// Search scope relative to the base DN.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchScope {
    /// Only the base entry.
    Base,
    /// Immediate children of the base.
    OneLevel,
    /// The base and everything below it.
    #[default]
    Subtree,
}

impl SearchScope {
    /// Whether `dn` falls within this scope of `base`.
    pub fn includes(&self, base: &Dn, dn: &Dn) -> bool {
        match self {
            SearchScope::Base => dn == base,
            SearchScope::OneLevel => dn.is_child_of(base),
            SearchScope::Subtree => dn.is_within(base),
        }
    }
}

/// Request/response capabilities consumed from the directory.
///
/// Every call issues exactly one request. Implementations report failures as
/// [`DirectoryError`]s and never retry on their own.
///
/// # Behavior
///
/// - `modify` applies its items in order and either all of them take effect or
///   none do; the pipeline builds multi-request sequences on top of this and
///   does not undo earlier requests when a later one fails
/// - adding a value already present fails with
///   [`DirectoryError::AttributeOrValueExists`]
/// - removing a value that is not present fails with
///   [`DirectoryError::NoSuchAttribute`]
pub trait DirectoryProvider: Send + Sync {
    /// Search below `base` within `scope`, returning matching entries with the
    /// requested attributes (all attributes when `attributes` is empty).
    fn search(
        &self,
        base: &Dn,
        scope: SearchScope,
        filter: &Filter,
        attributes: &[&str],
    ) -> impl Future<Output = Result<Vec<Entry>, DirectoryError>> + Send;

    /// Read a single entry, `None` if it does not exist.
    fn read(
        &self,
        dn: &Dn,
        attributes: &[&str],
    ) -> impl Future<Output = Result<Option<Entry>, DirectoryError>> + Send;

    /// Create an entry.
    fn add(
        &self,
        dn: &Dn,
        attributes: DirectoryAttributes,
    ) -> impl Future<Output = Result<(), DirectoryError>> + Send;

    /// Apply an ordered list of modifications to one entry.
    fn modify(
        &self,
        dn: &Dn,
        modifications: Vec<Modification>,
    ) -> impl Future<Output = Result<(), DirectoryError>> + Send;

    /// Rename an entry to `new_rdn`, optionally moving it below
    /// `new_superior`. Returns the new DN.
    fn rename(
        &self,
        dn: &Dn,
        new_rdn: &Rdn,
        new_superior: Option<&Dn>,
    ) -> impl Future<Output = Result<Dn, DirectoryError>> + Send;
}
