//! Per-operation memoization of an entry's memberships.

use crate::directory::{DirectoryError, DirectoryProvider, Dn};
use crate::error::{ProvisioningResult, ValidationError};
use crate::membership::{
    GroupHelper, GroupMembership, MembershipKind, Reference, canonical_reference,
};
use log::debug;

/// Lazily loads one entry's reference values and memberships of one kind.
///
/// Each value is fetched at most once. A cache belongs to a single operation
/// and is dropped with it.
pub struct MembershipCache<'h, D: DirectoryProvider> {
    helper: &'h GroupHelper<'h, D>,
    kind: MembershipKind,
    entry_dn: Dn,
    references: Option<Option<Vec<String>>>,
    memberships: Option<Vec<GroupMembership>>,
}

impl<'h, D: DirectoryProvider> MembershipCache<'h, D> {
    pub fn new(helper: &'h GroupHelper<'h, D>, kind: MembershipKind, entry_dn: Dn) -> Self {
        Self {
            helper,
            kind,
            entry_dn,
            references: None,
            memberships: None,
        }
    }

    pub fn kind(&self) -> MembershipKind {
        self.kind
    }

    pub fn entry_dn(&self) -> &Dn {
        &self.entry_dn
    }

    /// The entry's reference values, `None` when the attribute is absent.
    pub async fn reference_values(&mut self) -> ProvisioningResult<Option<Vec<String>>> {
        if let Some(references) = &self.references {
            return Ok(references.clone());
        }
        let references = read_reference_values(self.helper, self.kind, &self.entry_dn).await?;
        self.references = Some(references.clone());
        Ok(references)
    }

    /// Memberships referencing any of the entry's reference values.
    pub async fn memberships(&mut self) -> ProvisioningResult<Vec<GroupMembership>> {
        if let Some(memberships) = &self.memberships {
            return Ok(memberships.clone());
        }
        let references = self.reference_values().await?.unwrap_or_default();
        let memberships = self.helper.find_memberships(self.kind, &references).await?;
        self.memberships = Some(memberships.clone());
        Ok(memberships)
    }

    /// Memberships whose reference is one of `refs`.
    pub async fn memberships_by_refs(
        &mut self,
        refs: &[String],
    ) -> ProvisioningResult<Vec<GroupMembership>> {
        Ok(self
            .memberships()
            .await?
            .into_iter()
            .filter(|m| refs.iter().any(|r| r == m.member_ref()))
            .collect())
    }

    /// Memberships in any of `groups`, compared as DNs.
    pub async fn memberships_by_groups(
        &mut self,
        groups: &[Dn],
    ) -> ProvisioningResult<Vec<GroupMembership>> {
        Ok(self
            .memberships()
            .await?
            .into_iter()
            .filter(|m| groups.contains(m.group_dn()))
            .collect())
    }
}

/// Read the reference values of the entry at `dn` for `kind`.
///
/// DN references never hit the directory.
pub(crate) async fn read_reference_values<D: DirectoryProvider>(
    helper: &GroupHelper<'_, D>,
    kind: MembershipKind,
    dn: &Dn,
) -> ProvisioningResult<Option<Vec<String>>> {
    let descriptor = helper.descriptor(kind);
    let attribute = match descriptor.reference() {
        Reference::Dn => return Ok(Some(vec![dn.to_string()])),
        Reference::Attribute(name) => name.clone(),
    };

    debug!("Reading {} of {}", attribute, dn);
    let entry = helper
        .directory()
        .read(dn, &[attribute.as_str()])
        .await?
        .ok_or_else(|| DirectoryError::no_such_object(dn.to_string()))?;
    Ok(descriptor.reference_values(None, entry.attributes()))
}

/// The canonical reference of an entry, or a validation error naming the
/// missing attribute.
pub(crate) fn require_canonical(
    helper: &GroupHelper<'_, impl DirectoryProvider>,
    kind: MembershipKind,
    dn: &Dn,
    references: Option<&[String]>,
) -> ProvisioningResult<String> {
    references
        .and_then(canonical_reference)
        .cloned()
        .ok_or_else(|| {
            let descriptor = helper.descriptor(kind);
            ValidationError::missing_reference(
                kind,
                dn.to_string(),
                descriptor.reference_attribute().unwrap_or("dn"),
            )
            .into()
        })
}
