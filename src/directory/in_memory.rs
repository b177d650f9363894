//! In-memory directory implementation.
//!
//! This module provides a thread-safe in-memory implementation of the
//! [`DirectoryProvider`] trait using a `BTreeMap` behind an async `RwLock`.
//! It is intended for tests, development, and embedding scenarios where no
//! real directory server is available.
//!
//! # Features
//!
//! * Equality, presence, and boolean filter evaluation with base, one-level
//!   and subtree scopes
//! * Server-assigned `entryUUID`, `entryDN`, `createTimestamp` and
//!   `modifyTimestamp` operational attributes
//! * LDAP result semantics for duplicate value adds, missing value removes,
//!   and mandatory group member attributes on add
//! * A request journal recording every request issued, for assertions
//! * Per-entry write denial to simulate access control failures
//!
//! # Example Usage
//!
//! ```rust
//! use ldap_provisioning::directory::{
//!     DirectoryAttributes, DirectoryProvider, Dn, InMemoryDirectory, Modification,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let directory = InMemoryDirectory::new();
//! let group = Dn::parse("cn=devs,ou=groups,dc=example,dc=com")?;
//!
//! let mut attrs = DirectoryAttributes::new();
//! attrs.put("objectClass", vec!["posixGroup".to_string()]);
//! attrs.put("cn", vec!["devs".to_string()]);
//! directory.add(&group, attrs).await?;
//!
//! directory
//!     .modify(&group, vec![Modification::add("memberUid", vec!["jdoe".to_string()])])
//!     .await?;
//!
//! // Adding the same value twice is reported by the directory
//! let again = directory
//!     .modify(&group, vec![Modification::add("memberUid", vec!["jdoe".to_string()])])
//!     .await;
//! assert!(again.unwrap_err().is_value_exists());
//! # Ok(())
//! # }
//! ```

use crate::directory::{
    DirectoryAttributes, DirectoryError, DirectoryProvider, Dn, Entry, Filter, Modification,
    ModifyOp, Rdn, SearchScope,
};
use chrono::Utc;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Object classes whose member attribute must hold at least one value.
const MANDATORY_MEMBER_ATTRIBUTES: &[(&str, &str)] = &[
    ("groupOfNames", "member"),
    ("groupOfUniqueNames", "uniqueMember"),
];

/// A request as recorded in the journal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryRequest {
    Search { base: String, filter: String },
    Read { dn: String },
    Add { dn: String },
    Modify {
        dn: String,
        modifications: Vec<Modification>,
    },
    Rename { dn: String, new_dn: String },
}

impl DirectoryRequest {
    /// True for requests that change directory state.
    pub fn is_mutation(&self) -> bool {
        !matches!(
            self,
            DirectoryRequest::Search { .. } | DirectoryRequest::Read { .. }
        )
    }
}

/// Statistics about stored entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InMemoryDirectoryStats {
    pub entry_count: usize,
    pub request_count: usize,
    pub mutation_count: usize,
}

/// Thread-safe in-memory directory.
///
/// Entries are keyed by normalised DN. All operations are async and
/// serialised through tokio's `RwLock`.
#[derive(Clone, Default)]
pub struct InMemoryDirectory {
    entries: Arc<RwLock<BTreeMap<String, Entry>>>,
    journal: Arc<RwLock<Vec<DirectoryRequest>>>,
    write_denied: Arc<RwLock<HashSet<String>>>,
}

impl InMemoryDirectory {
    /// Create a new empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an entry as-is, bypassing validation and the journal.
    pub async fn seed(&self, entry: Entry) {
        let mut entries = self.entries.write().await;
        entries.insert(entry.dn().normalized(), entry);
    }

    /// Fetch an entry without recording a request.
    pub async fn entry(&self, dn: &Dn) -> Option<Entry> {
        self.entries.read().await.get(&dn.normalized()).cloned()
    }

    /// Every request issued so far, in order.
    pub async fn requests(&self) -> Vec<DirectoryRequest> {
        self.journal.read().await.clone()
    }

    /// Modify requests issued so far, in order.
    pub async fn modify_requests(&self) -> Vec<(String, Vec<Modification>)> {
        self.journal
            .read()
            .await
            .iter()
            .filter_map(|request| match request {
                DirectoryRequest::Modify { dn, modifications } => {
                    Some((dn.clone(), modifications.clone()))
                }
                _ => None,
            })
            .collect()
    }

    /// Number of requests that changed (or attempted to change) state.
    pub async fn mutation_count(&self) -> usize {
        self.journal
            .read()
            .await
            .iter()
            .filter(|r| r.is_mutation())
            .count()
    }

    /// Forget recorded requests.
    pub async fn clear_journal(&self) {
        self.journal.write().await.clear();
    }

    /// Reject every subsequent write to `dn` with `InsufficientAccess`.
    pub async fn deny_writes(&self, dn: &Dn) {
        self.write_denied.write().await.insert(dn.normalized());
    }

    /// Get directory statistics for debugging.
    pub async fn stats(&self) -> InMemoryDirectoryStats {
        let journal = self.journal.read().await;
        InMemoryDirectoryStats {
            entry_count: self.entries.read().await.len(),
            request_count: journal.len(),
            mutation_count: journal.iter().filter(|r| r.is_mutation()).count(),
        }
    }

    async fn record(&self, request: DirectoryRequest) {
        self.journal.write().await.push(request);
    }

    async fn check_writable(&self, operation: &str, dn: &Dn) -> Result<(), DirectoryError> {
        if self.write_denied.read().await.contains(&dn.normalized()) {
            return Err(DirectoryError::insufficient_access(operation, dn.to_string()));
        }
        Ok(())
    }

    fn timestamp() -> String {
        Utc::now().format("%Y%m%d%H%M%SZ").to_string()
    }

    fn check_mandatory_members(dn: &Dn, attrs: &DirectoryAttributes) -> Result<(), DirectoryError> {
        let classes = attrs.get("objectClass").unwrap_or(&[]);
        for (class, member_attr) in MANDATORY_MEMBER_ATTRIBUTES {
            let has_class = classes.iter().any(|c| c.eq_ignore_ascii_case(class));
            let has_member = attrs
                .get(member_attr)
                .map(|values| !values.is_empty())
                .unwrap_or(false);
            if has_class && !has_member {
                return Err(DirectoryError::object_class_violation(
                    dn.to_string(),
                    format!("object class '{}' requires attribute '{}'", class, member_attr),
                ));
            }
        }
        Ok(())
    }

    fn apply_modification(
        dn: &Dn,
        attrs: &mut DirectoryAttributes,
        modification: &Modification,
    ) -> Result<(), DirectoryError> {
        let attribute = modification.attribute.as_str();
        match modification.op {
            ModifyOp::Add => {
                for value in &modification.values {
                    let present = attrs
                        .get(attribute)
                        .map(|values| values.iter().any(|v| v.eq_ignore_ascii_case(value)))
                        .unwrap_or(false);
                    if present {
                        return Err(DirectoryError::value_exists(
                            dn.to_string(),
                            attribute,
                            value.clone(),
                        ));
                    }
                    attrs.extend(attribute, [value.clone()]);
                }
            }
            ModifyOp::Remove => {
                if modification.values.is_empty() {
                    attrs.remove(attribute).ok_or_else(|| {
                        DirectoryError::no_such_attribute(dn.to_string(), attribute)
                    })?;
                    return Ok(());
                }
                for value in &modification.values {
                    let now_empty = {
                        let values = attrs.get_mut(attribute).ok_or_else(|| {
                            DirectoryError::no_such_value(dn.to_string(), attribute, value.clone())
                        })?;
                        let position = values
                            .iter()
                            .position(|v| v.eq_ignore_ascii_case(value))
                            .ok_or_else(|| {
                                DirectoryError::no_such_value(
                                    dn.to_string(),
                                    attribute,
                                    value.clone(),
                                )
                            })?;
                        values.remove(position);
                        values.is_empty()
                    };
                    if now_empty {
                        attrs.remove(attribute);
                    }
                }
            }
            ModifyOp::Replace => {
                if modification.values.is_empty() {
                    attrs.remove(attribute);
                } else {
                    attrs.put(attribute, modification.values.clone());
                }
            }
        }
        Ok(())
    }
}

impl DirectoryProvider for InMemoryDirectory {
    async fn search(
        &self,
        base: &Dn,
        scope: SearchScope,
        filter: &Filter,
        attributes: &[&str],
    ) -> Result<Vec<Entry>, DirectoryError> {
        self.record(DirectoryRequest::Search {
            base: base.to_string(),
            filter: filter.to_string(),
        })
        .await;

        let entries = self.entries.read().await;
        let results = entries
            .values()
            .filter(|entry| scope.includes(base, entry.dn()))
            .filter(|entry| filter.matches(entry))
            .map(|entry| Entry::new(entry.dn().clone(), entry.attributes().project(attributes)))
            .collect();
        Ok(results)
    }

    async fn read(&self, dn: &Dn, attributes: &[&str]) -> Result<Option<Entry>, DirectoryError> {
        self.record(DirectoryRequest::Read { dn: dn.to_string() }).await;

        let entries = self.entries.read().await;
        Ok(entries
            .get(&dn.normalized())
            .map(|entry| Entry::new(entry.dn().clone(), entry.attributes().project(attributes))))
    }

    async fn add(&self, dn: &Dn, mut attributes: DirectoryAttributes) -> Result<(), DirectoryError> {
        self.record(DirectoryRequest::Add { dn: dn.to_string() }).await;
        if let Some(parent) = dn.parent() {
            self.check_writable("add", &parent).await?;
        }

        let mut entries = self.entries.write().await;
        let key = dn.normalized();
        if entries.contains_key(&key) {
            return Err(DirectoryError::entry_already_exists(dn.to_string()));
        }

        // Checked on add only; later modifies may transiently empty a group.
        Self::check_mandatory_members(dn, &attributes)?;

        if let Some(rdn) = dn.rdn() {
            for ava in rdn.avas() {
                attributes.extend(ava.attribute(), [ava.value().to_string()]);
            }
        }
        let now = Self::timestamp();
        attributes.put("entryUUID", vec![Uuid::new_v4().to_string()]);
        attributes.put("entryDN", vec![dn.to_string()]);
        attributes.put("createTimestamp", vec![now.clone()]);
        attributes.put("modifyTimestamp", vec![now]);

        entries.insert(key, Entry::new(dn.clone(), attributes));
        Ok(())
    }

    async fn modify(
        &self,
        dn: &Dn,
        modifications: Vec<Modification>,
    ) -> Result<(), DirectoryError> {
        self.record(DirectoryRequest::Modify {
            dn: dn.to_string(),
            modifications: modifications.clone(),
        })
        .await;
        self.check_writable("modify", dn).await?;

        let mut entries = self.entries.write().await;
        let entry = entries
            .get_mut(&dn.normalized())
            .ok_or_else(|| DirectoryError::no_such_object(dn.to_string()))?;

        // All items take effect or none do.
        let mut updated = entry.attributes().clone();
        for modification in &modifications {
            Self::apply_modification(dn, &mut updated, modification)?;
        }
        updated.put("modifyTimestamp", vec![Self::timestamp()]);
        *entry.attributes_mut() = updated;
        Ok(())
    }

    async fn rename(
        &self,
        dn: &Dn,
        new_rdn: &Rdn,
        new_superior: Option<&Dn>,
    ) -> Result<Dn, DirectoryError> {
        let parent = new_superior
            .cloned()
            .or_else(|| dn.parent())
            .unwrap_or_default();
        let new_dn = parent.child(new_rdn.clone());

        self.record(DirectoryRequest::Rename {
            dn: dn.to_string(),
            new_dn: new_dn.to_string(),
        })
        .await;
        self.check_writable("rename", dn).await?;

        let mut entries = self.entries.write().await;
        let old_key = dn.normalized();
        if !entries.contains_key(&old_key) {
            return Err(DirectoryError::no_such_object(dn.to_string()));
        }
        let new_key = new_dn.normalized();
        if new_key != old_key && entries.contains_key(&new_key) {
            return Err(DirectoryError::entry_already_exists(new_dn.to_string()));
        }

        let Some(entry) = entries.remove(&old_key) else {
            return Err(DirectoryError::no_such_object(dn.to_string()));
        };
        let (_, mut attrs) = entry.into_parts();

        // Old RDN values are dropped, new ones added.
        if let Some(old_rdn) = dn.rdn() {
            for ava in old_rdn.avas() {
                let now_empty = match attrs.get_mut(ava.attribute()) {
                    Some(values) => {
                        values.retain(|v| !v.eq_ignore_ascii_case(ava.value()));
                        values.is_empty()
                    }
                    None => false,
                };
                if now_empty {
                    attrs.remove(ava.attribute());
                }
            }
        }
        for ava in new_rdn.avas() {
            attrs.extend(ava.attribute(), [ava.value().to_string()]);
        }
        attrs.put("entryDN", vec![new_dn.to_string()]);
        attrs.put("modifyTimestamp", vec![Self::timestamp()]);
        entries.insert(new_key, Entry::new(new_dn.clone(), attrs));

        let descendants: Vec<String> = entries
            .iter()
            .filter(|(_, e)| e.dn().is_within(dn) && e.dn() != dn)
            .map(|(k, _)| k.clone())
            .collect();
        for key in descendants {
            if let Some(child) = entries.remove(&key) {
                let (child_dn, mut child_attrs) = child.into_parts();
                let moved = child_dn.rebase(dn, &new_dn).unwrap_or(child_dn);
                child_attrs.put("entryDN", vec![moved.to_string()]);
                entries.insert(moved.normalized(), Entry::new(moved, child_attrs));
            }
        }

        Ok(new_dn)
    }
}
