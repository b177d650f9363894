//! Membership queries and single-value group mutations.

use crate::config::LdapConfiguration;
use crate::directory::{DirectoryAttributes, DirectoryProvider, Dn, Modification, SearchScope};
use crate::error::ProvisioningResult;
use crate::membership::{
    GroupMembership, KindDescriptor, MembershipDiff, MembershipKind,
    OBJECT_CLASSES_WITH_MANDATORY_MEMBER_ATTRIBUTE,
};
use log::{debug, trace, warn};

/// Issues membership searches and member add/remove requests.
///
/// Every mutation is a single-value modify against one group entry. Adding a
/// value the group already holds is treated as success.
pub struct GroupHelper<'a, D: DirectoryProvider> {
    directory: &'a D,
    config: &'a LdapConfiguration,
    base_contexts: &'a [Dn],
}

impl<'a, D: DirectoryProvider> GroupHelper<'a, D> {
    pub fn new(directory: &'a D, config: &'a LdapConfiguration, base_contexts: &'a [Dn]) -> Self {
        Self {
            directory,
            config,
            base_contexts,
        }
    }

    pub fn directory(&self) -> &'a D {
        self.directory
    }

    pub fn descriptor(&self, kind: MembershipKind) -> KindDescriptor {
        kind.descriptor(self.config)
    }

    /// Groups of `kind` referencing any of `ref_values`.
    ///
    /// One search per base context with a disjunctive filter; a membership is
    /// reported for every matching group and every queried value it holds.
    pub async fn find_memberships(
        &self,
        kind: MembershipKind,
        ref_values: &[String],
    ) -> ProvisioningResult<Vec<GroupMembership>> {
        if ref_values.is_empty() {
            return Ok(Vec::new());
        }

        let descriptor = self.descriptor(kind);
        let filter = descriptor.filter(ref_values.iter().cloned());
        debug!("Retrieving {} group memberships for {:?}", kind, ref_values);
        trace!("Membership filter: {}", filter);

        let mut memberships: Vec<GroupMembership> = Vec::new();
        for base in self.base_contexts {
            let groups = self
                .directory
                .search(
                    base,
                    SearchScope::Subtree,
                    &filter,
                    &[descriptor.member_attribute()],
                )
                .await?;

            for group in groups {
                let stored = group
                    .attributes()
                    .get(descriptor.member_attribute())
                    .unwrap_or(&[]);
                for reference in ref_values {
                    let held = stored
                        .iter()
                        .any(|value| descriptor.matches_reference(value, reference));
                    let membership = GroupMembership::new(reference.clone(), group.dn().clone());
                    if held && !memberships.contains(&membership) {
                        memberships.push(membership);
                    }
                }
            }
        }

        debug!("Found {} {} group memberships", memberships.len(), kind);
        Ok(memberships)
    }

    /// Add `member_ref` to `group_dn`. A value already present is not an error.
    pub async fn add_membership(
        &self,
        kind: MembershipKind,
        member_ref: &str,
        group_dn: &Dn,
    ) -> ProvisioningResult<()> {
        let descriptor = self.descriptor(kind);
        debug!("Adding {} to {} group {}", member_ref, kind, group_dn);

        let modification =
            Modification::add(descriptor.member_attribute(), vec![member_ref.to_string()]);
        match self.directory.modify(group_dn, vec![modification]).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_value_exists() => {
                warn!("{} is already a member of {} group {}", member_ref, kind, group_dn);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Remove `member_ref` from `group_dn`.
    pub async fn remove_membership(
        &self,
        kind: MembershipKind,
        member_ref: &str,
        group_dn: &Dn,
    ) -> ProvisioningResult<()> {
        let descriptor = self.descriptor(kind);
        debug!("Removing {} from {} group {}", member_ref, kind, group_dn);

        let modification =
            Modification::remove(descriptor.member_attribute(), vec![member_ref.to_string()]);
        self.directory.modify(group_dn, vec![modification]).await?;
        Ok(())
    }

    /// Add `member_ref` to each group in turn.
    pub async fn add_memberships(
        &self,
        kind: MembershipKind,
        member_ref: &str,
        groups: &[Dn],
    ) -> ProvisioningResult<()> {
        for group in groups {
            self.add_membership(kind, member_ref, group).await?;
        }
        Ok(())
    }

    /// Remove each membership in turn.
    pub async fn remove_memberships(
        &self,
        kind: MembershipKind,
        memberships: &[GroupMembership],
    ) -> ProvisioningResult<()> {
        for membership in memberships {
            self.remove_membership(kind, membership.member_ref(), membership.group_dn())
                .await?;
        }
        Ok(())
    }

    /// Apply a diff: every effective removal, then every effective addition.
    ///
    /// Stops at the first failing request; earlier requests stay applied.
    pub async fn apply_diff(
        &self,
        kind: MembershipKind,
        diff: MembershipDiff<GroupMembership>,
    ) -> ProvisioningResult<()> {
        let (removed, added) = diff.into_effective();
        debug!(
            "Modifying {} group memberships: removing {}, adding {}",
            kind,
            removed.len(),
            added.len()
        );

        self.remove_memberships(kind, &removed).await?;
        for membership in &added {
            self.add_membership(kind, membership.member_ref(), membership.group_dn())
                .await?;
        }
        Ok(())
    }

    /// Seed the static member attribute with `creator` when one of
    /// `object_classes` requires a member and none is given.
    ///
    /// Returns true when a value was added.
    pub fn ensure_mandatory_member_seed(
        &self,
        attributes: &mut DirectoryAttributes,
        object_classes: &[String],
        creator: &str,
    ) -> bool {
        let required = object_classes.iter().any(|class| {
            OBJECT_CLASSES_WITH_MANDATORY_MEMBER_ATTRIBUTE
                .binary_search(&class.as_str())
                .is_ok()
        });
        if !required {
            return false;
        }

        let member_attribute = self.config.group_member_attribute.as_str();
        let has_member = attributes
            .get(member_attribute)
            .map(|values| !values.is_empty())
            .unwrap_or(false);
        if has_member {
            return false;
        }

        debug!("Seeding {} with {}", member_attribute, creator);
        attributes.put(member_attribute, vec![creator.to_string()]);
        true
    }
}
