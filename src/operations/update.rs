use super::attributes::{NAME, PartitionMode, Partitioned, partition};
use super::{LdapConnector, ObjectClass, RESET_PASSWORD_LENGTH, Uid};
use crate::directory::{
    DirectoryAttributes, DirectoryProvider, Dn, Modification, ModifyOp, Rdn,
};
use crate::error::{ProvisioningError, ProvisioningResult, ValidationError};
use crate::membership::{
    GroupMembership, MembershipCache, MembershipDiff, MembershipKind,
    read_reference_values, require_canonical,
};
use crate::operations::Attribute;
use crate::password::generate_random_password;
use log::{debug, info};

/// Requested move of an entry.
struct Rename {
    new_dn: Dn,
    rdn: Rdn,
    new_superior: Option<Dn>,
}

/// POSIX or alias membership requests worked out before anything is written.
struct ReferencePlan {
    kind: MembershipKind,
    diff: MembershipDiff<GroupMembership>,
    /// Groups to join once the renamed entry's reference values are known
    deferred: Vec<Dn>,
}

impl<D: DirectoryProvider> LdapConnector<D> {
    /// Replace attributes of an existing entry, optionally renaming it, and
    /// reconcile its group memberships.
    ///
    /// Returns the entry's identifier after the update, which differs from
    /// `uid` when identifiers are DNs and the entry was renamed.
    pub async fn update(
        &self,
        object_class: &ObjectClass,
        uid: &Uid,
        attributes: Vec<Attribute>,
    ) -> ProvisioningResult<Uid> {
        let dn = self.resolve_dn(object_class, uid).await?;
        let Partitioned {
            name,
            enable,
            mut memberships,
            password,
            reset_password,
            mut ordinary,
        } = partition(attributes, PartitionMode::Update)?;

        let rename = match name.filter(|name| *name != dn) {
            Some(new_dn) => {
                let rdn = new_dn.rdn().cloned().ok_or_else(|| {
                    ValidationError::invalid_dn(NAME, new_dn.to_string(), "empty DN")
                })?;
                let new_superior = new_dn
                    .parent()
                    .filter(|parent| dn.parent().as_ref() != Some(parent));
                info!("Updating {} entry {} (renaming to {})", object_class, dn, new_dn);
                Some(Rename {
                    new_dn,
                    rdn,
                    new_superior,
                })
            }
            None => {
                info!("Updating {} entry {}", object_class, dn);
                None
            }
        };
        let target_dn = rename.as_ref().map(|r| &r.new_dn).unwrap_or(&dn);

        let helper = self.group_helper();
        let mut caches =
            MembershipKind::ALL.map(|kind| MembershipCache::new(&helper, kind, dn.clone()));

        // Reference values the entry will hold, `None` when they are not
        // being changed.
        let new_refs = MembershipKind::ALL.map(|kind| {
            let descriptor = helper.descriptor(kind);
            let attribute = descriptor.reference_attribute()?;
            if rename.is_none() && !ordinary.contains(attribute) {
                return None;
            }
            descriptor.reference_values(Some(target_dn), &ordinary)
        });

        for kind in [MembershipKind::Posix, MembershipKind::Alias] {
            let clearing = new_refs[kind.index()]
                .as_ref()
                .is_some_and(|refs| refs.is_empty());
            if !clearing {
                continue;
            }
            let existing = caches[kind.index()].memberships().await?;
            if !existing.is_empty() {
                let descriptor = helper.descriptor(kind);
                return Err(ProvisioningError::referential_integrity(
                    descriptor.reference_attribute().unwrap_or_default(),
                    kind,
                    existing.iter().map(|m| m.group_dn().to_string()).collect(),
                ));
            }
        }

        if let Some(enabled) = enable {
            self.status.set_status(enabled, &mut ordinary, &mut memberships);
        }

        let password = if reset_password {
            Some(generate_random_password(RESET_PASSWORD_LENGTH))
        } else {
            password
        };
        let hashed_password = password
            .as_ref()
            .map(|password| self.hash_password(password, target_dn))
            .transpose()?;

        let static_descriptor = helper.descriptor(MembershipKind::Static);
        let follow_rename = rename.is_some() && static_descriptor.maintains_membership();
        if follow_rename || !memberships.get(MembershipKind::Static).is_untouched() {
            caches[MembershipKind::Static.index()].memberships().await?;
        }

        let mut plans = Vec::new();
        for kind in [MembershipKind::Posix, MembershipKind::Alias] {
            let i = kind.index();
            let descriptor = helper.descriptor(kind);
            let change = memberships.get(kind);
            let mut diff = MembershipDiff::new();
            let mut deferred = Vec::new();

            if let (Some(new), true) = (&new_refs[i], descriptor.maintains_membership()) {
                let old = caches[i].reference_values().await?.unwrap_or_default();
                let removed: Vec<String> =
                    old.into_iter().filter(|r| !new.contains(r)).collect();
                let stale = caches[i].memberships_by_refs(&removed).await?;
                if !stale.is_empty() {
                    let member_ref = require_canonical(&helper, kind, target_dn, Some(new.as_slice()))?;
                    debug!(
                        "Moving {} {} memberships to reference {}",
                        stale.len(),
                        kind,
                        member_ref
                    );
                    diff.add_all(stale.iter().map(|membership| {
                        GroupMembership::new(member_ref.clone(), membership.group_dn().clone())
                    }));
                    diff.remove_all(stale);
                }
            }

            if !change.is_untouched() {
                diff.remove_all(caches[i].memberships().await?);
                diff.clear_added();
                let groups = change.groups();
                if !groups.is_empty() {
                    match (&new_refs[i], &rename) {
                        (None, Some(_)) => deferred = groups.to_vec(),
                        (new, _) => {
                            let references = match new {
                                Some(new) => Some(new.clone()),
                                None => caches[i].reference_values().await?,
                            };
                            let member_ref = require_canonical(
                                &helper,
                                kind,
                                target_dn,
                                references.as_deref(),
                            )?;
                            diff.add_all(groups.iter().map(|group| {
                                GroupMembership::new(member_ref.clone(), group.clone())
                            }));
                        }
                    }
                }
            }

            plans.push(ReferencePlan {
                kind,
                diff,
                deferred,
            });
        }

        // Naming attribute values are written once the rename has put the
        // new RDN value in place.
        let naming = match &rename {
            Some(rename) => naming_values(&rename.rdn, &mut ordinary),
            None => Vec::new(),
        };

        if !ordinary.is_empty() {
            let modifications = ordinary
                .into_iter()
                .map(|(attribute, values)| Modification::replace(attribute, values))
                .collect();
            self.directory.modify(&dn, modifications).await?;
        }

        let entry_dn = match &rename {
            Some(rename) => {
                let renamed = self
                    .directory
                    .rename(&dn, &rename.rdn, rename.new_superior.as_ref())
                    .await?;
                info!("Renamed {} to {}", dn, renamed);
                renamed
            }
            None => dn.clone(),
        };
        if !naming.is_empty() {
            debug!("Writing naming attribute values of {}", entry_dn);
            self.directory.modify(&entry_dn, naming).await?;
        }

        let mut static_diff = MembershipDiff::new();
        let static_cache = &mut caches[MembershipKind::Static.index()];
        let entry_ref = entry_dn.to_string();
        if follow_rename {
            let existing = static_cache.memberships().await?;
            static_diff.add_all(existing.iter().map(|membership| {
                GroupMembership::new(entry_ref.clone(), membership.group_dn().clone())
            }));
            static_diff.remove_all(existing);
        }
        let static_change = memberships.get(MembershipKind::Static);
        if !static_change.is_untouched() {
            static_diff.remove_all(static_cache.memberships().await?);
            static_diff.clear_added();
            static_diff.add_all(
                static_change
                    .groups()
                    .iter()
                    .map(|group| GroupMembership::new(entry_ref.clone(), group.clone())),
            );
        }
        helper.apply_diff(MembershipKind::Static, static_diff).await?;

        for ReferencePlan {
            kind,
            mut diff,
            deferred,
        } in plans
        {
            if !deferred.is_empty() {
                let references = read_reference_values(&helper, kind, &entry_dn).await?;
                let member_ref =
                    require_canonical(&helper, kind, &entry_dn, references.as_deref())?;
                diff.add_all(
                    deferred
                        .into_iter()
                        .map(|group| GroupMembership::new(member_ref.clone(), group)),
                );
            }
            helper.apply_diff(kind, diff).await?;
        }

        if let Some(hashed) = &hashed_password {
            self.write_password(&entry_dn, ModifyOp::Replace, hashed)
                .await?;
        }

        self.create_uid(object_class, &entry_dn).await
    }
}

/// Take the naming attributes out of `ordinary`. Returns replacements for
/// those that carry values besides the new RDN value, always keeping the RDN
/// value among them.
fn naming_values(rdn: &Rdn, ordinary: &mut DirectoryAttributes) -> Vec<Modification> {
    let mut modifications = Vec::new();
    for ava in rdn.avas() {
        let Some(mut values) = ordinary.remove(ava.attribute()) else {
            continue;
        };
        let extra = values
            .iter()
            .any(|value| !value.eq_ignore_ascii_case(ava.value()));
        if !extra {
            continue;
        }
        if !values.iter().any(|value| value.eq_ignore_ascii_case(ava.value())) {
            values.insert(0, ava.value().to_string());
        }
        modifications.push(Modification::replace(ava.attribute(), values));
    }
    modifications
}
