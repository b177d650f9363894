use super::attributes::{PartitionMode, Partitioned, partition};
use super::{LdapConnector, ObjectClass, RESET_PASSWORD_LENGTH, Uid};
use crate::directory::{DirectoryAttributes, DirectoryProvider, Dn, Modification, ModifyOp};
use crate::error::{ProvisioningError, ProvisioningResult};
use crate::membership::{
    GroupMembership, MembershipCache, MembershipKind, read_reference_values, require_canonical,
};
use crate::operations::Attribute;
use crate::password::generate_random_password;
use log::info;

impl<D: DirectoryProvider> LdapConnector<D> {
    /// Add values to an entry's attributes and add the entry to the groups
    /// listed in its group pseudo-attributes.
    ///
    /// POSIX and alias groups receive the entry's canonical reference value
    /// as it stands after the attribute values were added.
    pub async fn add_attribute_values(
        &self,
        object_class: &ObjectClass,
        uid: &Uid,
        attributes: Vec<Attribute>,
    ) -> ProvisioningResult<Uid> {
        let dn = self.resolve_dn(object_class, uid).await?;
        let Partitioned {
            memberships,
            password,
            reset_password,
            ordinary,
            ..
        } = partition(attributes, PartitionMode::Values)?;

        info!("Adding attribute values to {} entry {}", object_class, dn);

        let password = if reset_password {
            Some(generate_random_password(RESET_PASSWORD_LENGTH))
        } else {
            password
        };
        let hashed_password = password
            .as_ref()
            .map(|password| self.hash_password(password, &dn))
            .transpose()?;

        self.modify_values(&dn, ModifyOp::Add, ordinary).await?;
        if let Some(hashed) = &hashed_password {
            self.write_password(&dn, ModifyOp::Add, hashed).await?;
        }

        let helper = self.group_helper();
        for kind in MembershipKind::ALL {
            let groups = memberships.get(kind).groups();
            if groups.is_empty() {
                continue;
            }
            let references = read_reference_values(&helper, kind, &dn).await?;
            let member_ref = require_canonical(&helper, kind, &dn, references.as_deref())?;
            helper.add_memberships(kind, &member_ref, groups).await?;
        }

        Ok(uid.clone())
    }

    /// Remove values from an entry's attributes and remove the entry from
    /// the groups listed in its group pseudo-attributes.
    ///
    /// Removing POSIX or alias reference values that group memberships still
    /// use fails before anything is written.
    pub async fn remove_attribute_values(
        &self,
        object_class: &ObjectClass,
        uid: &Uid,
        attributes: Vec<Attribute>,
    ) -> ProvisioningResult<Uid> {
        let dn = self.resolve_dn(object_class, uid).await?;
        let Partitioned {
            memberships,
            password,
            ordinary,
            ..
        } = partition(attributes, PartitionMode::Values)?;

        info!("Removing attribute values from {} entry {}", object_class, dn);

        let hashed_password = password
            .as_ref()
            .map(|password| self.hash_password(password, &dn))
            .transpose()?;

        let helper = self.group_helper();
        let mut caches =
            MembershipKind::ALL.map(|kind| MembershipCache::new(&helper, kind, dn.clone()));

        for kind in [MembershipKind::Posix, MembershipKind::Alias] {
            let descriptor = helper.descriptor(kind);
            let removed = descriptor
                .reference_values(None, &ordinary)
                .unwrap_or_default();
            if removed.is_empty() {
                continue;
            }
            let in_use = caches[kind.index()].memberships_by_refs(&removed).await?;
            if !in_use.is_empty() {
                return Err(ProvisioningError::referential_integrity(
                    descriptor.reference_attribute().unwrap_or_default(),
                    kind,
                    in_use.iter().map(|m| m.group_dn().to_string()).collect(),
                ));
            }
        }

        // Memberships are looked up by the reference values held before the
        // removal.
        let mut leaving = Vec::new();
        for kind in [MembershipKind::Posix, MembershipKind::Alias] {
            let groups = memberships.get(kind).groups();
            if !groups.is_empty() {
                let found = caches[kind.index()].memberships_by_groups(groups).await?;
                leaving.push((kind, found));
            }
        }

        self.modify_values(&dn, ModifyOp::Remove, ordinary).await?;
        if let Some(hashed) = &hashed_password {
            self.write_password(&dn, ModifyOp::Remove, hashed).await?;
        }

        let static_groups = memberships.get(MembershipKind::Static).groups();
        if !static_groups.is_empty() {
            let entry_ref = dn.to_string();
            let static_memberships: Vec<GroupMembership> = static_groups
                .iter()
                .map(|group| GroupMembership::new(entry_ref.clone(), group.clone()))
                .collect();
            helper
                .remove_memberships(MembershipKind::Static, &static_memberships)
                .await?;
        }
        for (kind, found) in leaving {
            helper.remove_memberships(kind, &found).await?;
        }

        Ok(uid.clone())
    }

    async fn modify_values(
        &self,
        dn: &Dn,
        op: ModifyOp,
        attributes: DirectoryAttributes,
    ) -> ProvisioningResult<()> {
        if attributes.is_empty() {
            return Ok(());
        }
        let modifications = attributes
            .into_iter()
            .map(|(attribute, values)| Modification::new(op, attribute, values))
            .collect();
        self.directory.modify(dn, modifications).await?;
        Ok(())
    }
}
