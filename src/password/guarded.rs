//! Guarded secrets.

use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// A credential whose plaintext is only reachable inside [`access`].
///
/// The bytes are wiped when the value is dropped. `Debug` never prints them.
///
/// [`access`]: GuardedString::access
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct GuardedString {
    secret: Vec<u8>,
}

impl GuardedString {
    pub fn new(plain: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: plain.into(),
        }
    }

    /// Invoke `f` with the plaintext for the duration of the call.
    pub fn access<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
        f(&self.secret)
    }

    pub fn len(&self) -> usize {
        self.secret.len()
    }

    pub fn is_empty(&self) -> bool {
        self.secret.is_empty()
    }
}

impl From<&str> for GuardedString {
    fn from(plain: &str) -> Self {
        Self::new(plain.as_bytes())
    }
}

impl From<String> for GuardedString {
    fn from(plain: String) -> Self {
        Self::new(plain.into_bytes())
    }
}

impl fmt::Debug for GuardedString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("GuardedString(***)")
    }
}
