use super::attributes::{PartitionMode, Partitioned, partition};
use super::{LdapConnector, ObjectClass, RESET_PASSWORD_LENGTH, Uid};
use crate::directory::DirectoryProvider;
use crate::error::{ProvisioningResult, ValidationError};
use crate::membership::{GroupMembership, MembershipDiff, MembershipKind, require_canonical};
use crate::operations::Attribute;
use crate::password::generate_random_password;
use log::{debug, info};

impl<D: DirectoryProvider> LdapConnector<D> {
    /// Create an entry and add it to the groups it lists.
    ///
    /// Requires `__NAME__`. The password, if any, is hashed and sent inside
    /// the add request. Group objects whose classes require a member value
    /// are seeded with the configured principal.
    pub async fn create(
        &self,
        object_class: &ObjectClass,
        attributes: Vec<Attribute>,
    ) -> ProvisioningResult<Uid> {
        let Partitioned {
            name,
            enable,
            mut memberships,
            password,
            reset_password,
            mut ordinary,
        } = partition(attributes, PartitionMode::Create)?;
        let dn = name.ok_or(ValidationError::MissingName)?;

        info!("Creating {} entry {}", object_class, dn);

        if let Some(enabled) = enable {
            self.status.set_status(enabled, &mut ordinary, &mut memberships);
        }

        if !ordinary.contains("objectClass") {
            ordinary.put("objectClass", self.object_classes(object_class));
        }

        let helper = self.group_helper();
        if *object_class == ObjectClass::Group {
            let classes = ordinary
                .get("objectClass")
                .map(|classes| classes.to_vec())
                .unwrap_or_default();
            helper.ensure_mandatory_member_seed(&mut ordinary, &classes, &self.config.principal);
        }

        // Resolve member references up front so a missing one fails before
        // anything is written.
        let mut diffs = Vec::new();
        for kind in MembershipKind::ALL {
            let groups = memberships.get(kind).groups();
            if groups.is_empty() {
                continue;
            }
            let references = helper
                .descriptor(kind)
                .reference_values(Some(&dn), &ordinary);
            let member_ref = require_canonical(&helper, kind, &dn, references.as_deref())?;

            let mut diff = MembershipDiff::new();
            diff.add_all(
                groups
                    .iter()
                    .map(|group| GroupMembership::new(member_ref.clone(), group.clone())),
            );
            diffs.push((kind, diff));
        }

        let password = if reset_password {
            Some(generate_random_password(RESET_PASSWORD_LENGTH))
        } else {
            password
        };
        if let Some(password) = &password {
            let hashed = self.hash_password(password, &dn)?;
            ordinary.put(
                self.config.password_attribute.as_str(),
                vec![hashed.as_str().to_string()],
            );
        }

        self.directory.add(&dn, ordinary).await?;

        for (kind, diff) in diffs {
            debug!("Adding {} to {} groups", dn, kind);
            helper.apply_diff(kind, diff).await?;
        }

        self.create_uid(object_class, &dn).await
    }
}
