//! Pluggable account status policy.
//!
//! Directories express "disabled" in many ways: a lock attribute, a
//! password policy, membership in a disabled-users group. The pipeline
//! delegates the `__ENABLE__` pseudo-attribute to a [`StatusManagement`]
//! implementation, which rewrites the outgoing attributes and membership
//! requests before anything is sent.

use crate::directory::DirectoryAttributes;
use crate::membership::MembershipChanges;
use log::debug;

/// Status policy hook.
pub trait StatusManagement: Send + Sync {
    /// Apply `enabled` by editing the attributes and membership requests of
    /// the operation in progress.
    fn set_status(
        &self,
        enabled: bool,
        attributes: &mut DirectoryAttributes,
        memberships: &mut MembershipChanges,
    );
}

/// Policy that ignores status changes.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoStatusManagement;

impl StatusManagement for NoStatusManagement {
    fn set_status(
        &self,
        enabled: bool,
        _attributes: &mut DirectoryAttributes,
        _memberships: &mut MembershipChanges,
    ) {
        debug!("Ignoring status change to enabled={}", enabled);
    }
}
