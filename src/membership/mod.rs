//! Group membership model and reconciliation.
//!
//! Three membership schemes are supported, all driven by one algorithm
//! parameterized by a [`KindDescriptor`]:
//!
//! | Kind   | Group-side attribute        | Member-side reference          |
//! |--------|-----------------------------|--------------------------------|
//! | Static | `uniqueMember` (configured) | the member's DN                |
//! | POSIX  | `memberUid`                 | the member's `uid` values      |
//! | Alias  | `rfc822MailMember` (conf.)  | the member's `mail` (conf.)    |
//!
//! [`MembershipDiff`] computes what to add and remove, [`GroupHelper`] issues
//! the directory requests, and [`MembershipCache`] memoizes an entry's
//! reference values and memberships for the duration of one operation.

mod cache;
mod diff;
mod helper;

pub use cache::MembershipCache;
pub(crate) use cache::{read_reference_values, require_canonical};
pub use diff::MembershipDiff;
pub use helper::GroupHelper;

use crate::config::{LdapConfiguration, POSIX_GROUP_MEMBER_ATTRIBUTE, POSIX_REF_ATTRIBUTE};
use crate::directory::{DirectoryAttributes, Dn, Filter};
use std::fmt;

/// Pseudo-attribute carrying static group DNs.
pub const LDAP_GROUPS_NAME: &str = "ldapGroups";
/// Pseudo-attribute carrying POSIX group DNs.
pub const POSIX_GROUPS_NAME: &str = "posixGroups";
/// Pseudo-attribute carrying alias group DNs.
pub const ALIAS_GROUPS_NAME: &str = "aliasGroups";

/// Object classes whose member attribute must hold at least one value.
/// Kept sorted.
pub const OBJECT_CLASSES_WITH_MANDATORY_MEMBER_ATTRIBUTE: &[&str] =
    &["groupOfNames", "groupOfUniqueNames"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MembershipKind {
    Static,
    Posix,
    Alias,
}

impl MembershipKind {
    pub const ALL: [MembershipKind; 3] =
        [MembershipKind::Static, MembershipKind::Posix, MembershipKind::Alias];

    /// Name of the pseudo-attribute listing groups of this kind.
    pub fn pseudo_attribute(&self) -> &'static str {
        match self {
            MembershipKind::Static => LDAP_GROUPS_NAME,
            MembershipKind::Posix => POSIX_GROUPS_NAME,
            MembershipKind::Alias => ALIAS_GROUPS_NAME,
        }
    }

    /// Kind named by a pseudo-attribute, compared case-insensitively.
    pub fn from_pseudo_attribute(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.pseudo_attribute().eq_ignore_ascii_case(name))
    }

    pub(crate) fn index(&self) -> usize {
        match self {
            MembershipKind::Static => 0,
            MembershipKind::Posix => 1,
            MembershipKind::Alias => 2,
        }
    }

    /// Attribute names and policy for this kind under `config`.
    pub fn descriptor(&self, config: &LdapConfiguration) -> KindDescriptor {
        match self {
            MembershipKind::Static => KindDescriptor {
                kind: *self,
                member_attribute: config.group_member_attribute.clone(),
                reference: Reference::Dn,
                maintain: config.maintain_ldap_group_membership,
            },
            MembershipKind::Posix => KindDescriptor {
                kind: *self,
                member_attribute: POSIX_GROUP_MEMBER_ATTRIBUTE.to_string(),
                reference: Reference::Attribute(POSIX_REF_ATTRIBUTE.to_string()),
                maintain: config.maintain_posix_group_membership,
            },
            MembershipKind::Alias => KindDescriptor {
                kind: *self,
                member_attribute: config.alias_group_member_attribute().to_string(),
                reference: Reference::Attribute(config.alias_group_member_ref_attribute.clone()),
                maintain: config.maintain_alias_group_membership,
            },
        }
    }
}

impl fmt::Display for MembershipKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MembershipKind::Static => f.write_str("LDAP"),
            MembershipKind::Posix => f.write_str("POSIX"),
            MembershipKind::Alias => f.write_str("alias"),
        }
    }
}

/// Where a member's reference values come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    /// The member entry's DN
    Dn,
    /// Values of an attribute on the member entry
    Attribute(String),
}

/// Per-kind parameters of the membership algorithm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KindDescriptor {
    kind: MembershipKind,
    member_attribute: String,
    reference: Reference,
    maintain: bool,
}

impl KindDescriptor {
    pub fn kind(&self) -> MembershipKind {
        self.kind
    }

    /// Group-side attribute holding member references.
    pub fn member_attribute(&self) -> &str {
        &self.member_attribute
    }

    pub fn reference(&self) -> &Reference {
        &self.reference
    }

    /// Member-side reference attribute, `None` for DN references.
    pub fn reference_attribute(&self) -> Option<&str> {
        match &self.reference {
            Reference::Dn => None,
            Reference::Attribute(name) => Some(name),
        }
    }

    /// Whether memberships follow renames and reference value changes.
    pub fn maintains_membership(&self) -> bool {
        self.maintain
    }

    /// Filter selecting groups that reference any of `values`.
    pub fn filter<I, V>(&self, values: I) -> Filter
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        Filter::any_of(&self.member_attribute, values)
    }

    /// Reference values contributed by `dn` and `attributes`.
    ///
    /// Values of the reference attribute held in the leaf RDN of `dn` count,
    /// followed by the attribute's own values. `None` means the attribute is
    /// absent from `attributes` and the RDN contributes nothing; an empty
    /// vector means the attribute is present without values.
    pub fn reference_values(
        &self,
        dn: Option<&Dn>,
        attributes: &DirectoryAttributes,
    ) -> Option<Vec<String>> {
        let attribute = match &self.reference {
            Reference::Dn => return dn.map(|dn| vec![dn.to_string()]),
            Reference::Attribute(name) => name.as_str(),
        };

        let mut values = dn.map(|dn| dn.leaf_values(attribute)).unwrap_or_default();
        match attributes.get(attribute) {
            Some(present) => {
                for value in present {
                    if !values.contains(value) {
                        values.push(value.clone());
                    }
                }
                Some(values)
            }
            None if values.is_empty() => None,
            None => Some(values),
        }
    }

    /// Whether a value stored in a group's member attribute refers to
    /// `reference`, under the same equality the membership filter matches
    /// with. DN references compare as DNs, other values ignore ASCII case.
    pub fn matches_reference(&self, stored: &str, reference: &str) -> bool {
        match self.reference {
            Reference::Dn => match (Dn::parse(stored), Dn::parse(reference)) {
                (Ok(a), Ok(b)) => a == b,
                _ => stored.eq_ignore_ascii_case(reference),
            },
            Reference::Attribute(_) => stored.eq_ignore_ascii_case(reference),
        }
    }
}

/// The canonical reference among several: the lexicographic minimum.
pub fn canonical_reference(values: &[String]) -> Option<&String> {
    values.iter().min()
}

/// One entry's membership in one group.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupMembership {
    member_ref: String,
    group_dn: Dn,
}

impl GroupMembership {
    pub fn new(member_ref: impl Into<String>, group_dn: Dn) -> Self {
        Self {
            member_ref: member_ref.into(),
            group_dn,
        }
    }

    /// Value written into the group's member attribute.
    pub fn member_ref(&self) -> &str {
        &self.member_ref
    }

    pub fn group_dn(&self) -> &Dn {
        &self.group_dn
    }
}

impl fmt::Display for GroupMembership {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} in {}", self.member_ref, self.group_dn)
    }
}

/// Requested change to one kind of membership.
///
/// Absent, empty, and populated group lists mean different things and are
/// kept apart.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum MembershipChange {
    /// The pseudo-attribute was not supplied: leave memberships alone
    #[default]
    Untouched,
    /// Supplied without values: remove every membership of this kind
    RemoveAll,
    /// Supplied with values: memberships become exactly these groups
    Replace(Vec<Dn>),
}

impl MembershipChange {
    /// `RemoveAll` for an empty list, `Replace` otherwise.
    pub fn from_groups(groups: Vec<Dn>) -> Self {
        if groups.is_empty() {
            MembershipChange::RemoveAll
        } else {
            MembershipChange::Replace(groups)
        }
    }

    pub fn is_untouched(&self) -> bool {
        matches!(self, MembershipChange::Untouched)
    }

    /// Requested groups; empty unless `Replace`.
    pub fn groups(&self) -> &[Dn] {
        match self {
            MembershipChange::Replace(groups) => groups,
            _ => &[],
        }
    }

    /// Append a group, turning an absent or empty request into a replacement.
    pub fn push(&mut self, group: Dn) {
        match self {
            MembershipChange::Replace(groups) => {
                if !groups.contains(&group) {
                    groups.push(group);
                }
            }
            _ => *self = MembershipChange::Replace(vec![group]),
        }
    }
}

/// Requested membership changes for all three kinds.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MembershipChanges {
    changes: [MembershipChange; 3],
}

impl MembershipChanges {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, kind: MembershipKind) -> &MembershipChange {
        &self.changes[kind.index()]
    }

    pub fn get_mut(&mut self, kind: MembershipKind) -> &mut MembershipChange {
        &mut self.changes[kind.index()]
    }

    pub fn set(&mut self, kind: MembershipKind, change: MembershipChange) {
        self.changes[kind.index()] = change;
    }
}
