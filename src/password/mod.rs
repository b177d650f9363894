//! Password hashing.
//!
//! Passwords are stored in the RFC 2307 `{ALGO}base64` form used by most
//! directory servers. Salted variants append an 8-byte salt to the digest
//! before encoding:
//!
//! ```rust
//! use base64::{engine::general_purpose::STANDARD, Engine as _};
//! use ldap_provisioning::password::{HashAlgorithm, PasswordHasher};
//!
//! let hasher = PasswordHasher::new(HashAlgorithm::Ssha);
//! let hashed = hasher.hash(b"secret", 42).unwrap();
//!
//! let encoded = hashed.strip_prefix("{SSHA}").unwrap();
//! assert_eq!(STANDARD.decode(encoded).unwrap().len(), 28);
//!
//! // Values that already carry the algorithm prefix pass through
//! assert_eq!(hasher.hash(hashed.as_bytes(), 7).unwrap(), hashed);
//! ```

mod guarded;

pub use guarded::GuardedString;

use crate::error::{ConfigurationError, ValidationError, ValidationResult};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use md5::Md5;
use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use sha1::{Digest, Sha1};
use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

/// Length of the salt appended to salted digests.
pub const SALT_LENGTH: usize = 8;

/// Supported password storage schemes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HashAlgorithm {
    /// Store the password as given
    #[default]
    None,
    Sha,
    Ssha,
    Md5,
    Smd5,
}

impl HashAlgorithm {
    pub fn name(&self) -> &'static str {
        match self {
            HashAlgorithm::None => "NONE",
            HashAlgorithm::Sha => "SHA",
            HashAlgorithm::Ssha => "SSHA",
            HashAlgorithm::Md5 => "MD5",
            HashAlgorithm::Smd5 => "SMD5",
        }
    }

    pub fn is_salted(&self) -> bool {
        matches!(self, HashAlgorithm::Ssha | HashAlgorithm::Smd5)
    }

    fn digest(&self, plain: &[u8], salt: &[u8]) -> Vec<u8> {
        match self {
            HashAlgorithm::Sha | HashAlgorithm::Ssha => {
                let mut hasher = Sha1::new();
                hasher.update(plain);
                hasher.update(salt);
                hasher.finalize().to_vec()
            }
            HashAlgorithm::Md5 | HashAlgorithm::Smd5 => {
                let mut hasher = Md5::new();
                hasher.update(plain);
                hasher.update(salt);
                hasher.finalize().to_vec()
            }
            HashAlgorithm::None => plain.to_vec(),
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HashAlgorithm {
    type Err = ConfigurationError;

    /// Case-insensitive; a blank name means `None`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        if name.is_empty() || name.eq_ignore_ascii_case("NONE") {
            Ok(HashAlgorithm::None)
        } else if name.eq_ignore_ascii_case("SHA") {
            Ok(HashAlgorithm::Sha)
        } else if name.eq_ignore_ascii_case("SSHA") {
            Ok(HashAlgorithm::Ssha)
        } else if name.eq_ignore_ascii_case("MD5") {
            Ok(HashAlgorithm::Md5)
        } else if name.eq_ignore_ascii_case("SMD5") {
            Ok(HashAlgorithm::Smd5)
        } else {
            Err(ConfigurationError::unsupported_hash_algorithm(name))
        }
    }
}

/// Hashes cleartext passwords with one configured algorithm.
#[derive(Debug, Clone, Copy, Default)]
pub struct PasswordHasher {
    algorithm: HashAlgorithm,
}

impl PasswordHasher {
    pub fn new(algorithm: HashAlgorithm) -> Self {
        Self { algorithm }
    }

    /// Build a hasher from a configured algorithm name.
    pub fn from_name(name: &str) -> Result<Self, ConfigurationError> {
        Ok(Self::new(name.parse()?))
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// Hash `plain` for storage.
    ///
    /// The salt generator is seeded with the current time XOR `seed`, so
    /// callers pass a value derived from the target entry.
    ///
    /// Values stored as given (algorithm `NONE`, or already carrying this
    /// algorithm's prefix) must be valid UTF-8.
    pub fn hash(&self, plain: &[u8], seed: u64) -> ValidationResult<String> {
        let salt = if self.algorithm.is_salted() {
            generate_salt(seed)
        } else {
            Vec::new()
        };
        self.hash_with_salt(plain, &salt)
    }

    /// Hash `plain` with an explicit salt.
    pub fn hash_with_salt(&self, plain: &[u8], salt: &[u8]) -> ValidationResult<String> {
        if self.algorithm == HashAlgorithm::None || self.is_already_hashed(plain) {
            return std::str::from_utf8(plain)
                .map(str::to_owned)
                .map_err(|_| ValidationError::NonUtf8Password);
        }

        let mut hash_plus_salt = self.algorithm.digest(plain, salt);
        hash_plus_salt.extend_from_slice(salt);
        Ok(format!(
            "{{{}}}{}",
            self.algorithm.name(),
            STANDARD.encode(&hash_plus_salt)
        ))
    }

    /// True when `plain` already starts with this algorithm's `{ALGO}` prefix.
    pub fn is_already_hashed(&self, plain: &[u8]) -> bool {
        let Some(rest) = plain.strip_prefix(b"{") else {
            return false;
        };
        let Some(end) = rest.iter().position(|b| *b == b'}') else {
            return false;
        };
        rest[..end].eq_ignore_ascii_case(self.algorithm.name().as_bytes())
    }
}

fn generate_salt(seed: u64) -> Vec<u8> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default();
    let mut rng = ChaCha20Rng::seed_from_u64(now ^ seed);
    let mut salt = vec![0u8; SALT_LENGTH];
    rng.fill_bytes(&mut salt);
    salt
}

/// A random password of printable ASCII characters (33..=126).
pub fn generate_random_password(length: usize) -> GuardedString {
    let mut rng = rand::thread_rng();
    let chars: Vec<u8> = (0..length).map(|_| rng.gen_range(33u8..=126)).collect();
    GuardedString::new(chars)
}
