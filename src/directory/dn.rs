//! Distinguished names.
//!
//! A [`Dn`] is an ordered list of relative distinguished names, leaf first, as
//! written in RFC 4514 string form (`uid=jdoe,ou=people,dc=example,dc=com`).
//! Equality and hashing use a normalised form (lowercased attribute types and
//! values) so that `CN=Admins,DC=Example` and `cn=admins,dc=example` name the
//! same entry.

use crate::directory::DirectoryError;
use std::fmt;
use std::hash::{Hash, Hasher};

/// One attribute-value assertion of an RDN, with the value unescaped.
#[derive(Debug, Clone)]
pub struct Ava {
    attribute: String,
    value: String,
}

impl Ava {
    pub fn new(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

/// A relative distinguished name: one or more AVAs joined by `+`.
#[derive(Debug, Clone)]
pub struct Rdn {
    avas: Vec<Ava>,
}

impl Rdn {
    /// Single-valued RDN such as `uid=jdoe`.
    pub fn new(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            avas: vec![Ava::new(attribute, value)],
        }
    }

    /// Parse one RDN in string form.
    pub fn parse(raw: &str) -> Result<Self, DirectoryError> {
        let mut avas = Vec::new();
        for part in split_unescaped(raw, b'+') {
            let eq = part
                .find('=')
                .ok_or_else(|| DirectoryError::invalid_dn(raw, "RDN is missing '='"))?;
            let attribute = part[..eq].trim();
            if attribute.is_empty() {
                return Err(DirectoryError::invalid_dn(raw, "RDN has an empty attribute type"));
            }
            let value = unescape_value(&part[eq + 1..], raw)?;
            avas.push(Ava::new(attribute, value));
        }
        Ok(Self { avas })
    }

    pub fn avas(&self) -> &[Ava] {
        &self.avas
    }

    /// Values held by this RDN for the given attribute (case-insensitive).
    pub fn values_of(&self, attribute: &str) -> impl Iterator<Item = &str> {
        self.avas
            .iter()
            .filter(move |ava| ava.attribute.eq_ignore_ascii_case(attribute))
            .map(|ava| ava.value.as_str())
    }

    fn normalized(&self) -> String {
        let mut parts: Vec<String> = self
            .avas
            .iter()
            .map(|ava| {
                format!(
                    "{}={}",
                    ava.attribute.to_ascii_lowercase(),
                    escape_dn_value(&ava.value.trim().to_lowercase())
                )
            })
            .collect();
        parts.sort();
        parts.join("+")
    }
}

impl fmt::Display for Rdn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, ava) in self.avas.iter().enumerate() {
            if i > 0 {
                f.write_str("+")?;
            }
            write!(f, "{}={}", ava.attribute, escape_dn_value(&ava.value))?;
        }
        Ok(())
    }
}

impl PartialEq for Rdn {
    fn eq(&self, other: &Self) -> bool {
        self.normalized() == other.normalized()
    }
}

impl Eq for Rdn {}

/// A parsed distinguished name, leaf RDN first.
#[derive(Debug, Clone, Default)]
pub struct Dn {
    rdns: Vec<Rdn>,
}

impl Dn {
    /// The empty (root) DN.
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse a DN in RFC 4514 string form. The empty string is the root DN.
    pub fn parse(raw: &str) -> Result<Self, DirectoryError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(Self::root());
        }
        let rdns = split_unescaped(trimmed, b',')
            .into_iter()
            .map(|part| {
                if part.trim().is_empty() {
                    Err(DirectoryError::invalid_dn(raw, "empty RDN"))
                } else {
                    Rdn::parse(part)
                }
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rdns })
    }

    pub fn is_root(&self) -> bool {
        self.rdns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rdns.len()
    }

    pub fn rdns(&self) -> &[Rdn] {
        &self.rdns
    }

    /// The leaf RDN, `None` for the root DN.
    pub fn rdn(&self) -> Option<&Rdn> {
        self.rdns.first()
    }

    /// The DN one level up, `None` for the root DN.
    pub fn parent(&self) -> Option<Dn> {
        if self.rdns.is_empty() {
            None
        } else {
            Some(Dn {
                rdns: self.rdns[1..].to_vec(),
            })
        }
    }

    /// A child of this DN with the given leaf RDN.
    pub fn child(&self, rdn: Rdn) -> Dn {
        let mut rdns = Vec::with_capacity(self.rdns.len() + 1);
        rdns.push(rdn);
        rdns.extend(self.rdns.iter().cloned());
        Dn { rdns }
    }

    /// True when `self` equals `base` or sits anywhere below it.
    pub fn is_within(&self, base: &Dn) -> bool {
        if base.rdns.len() > self.rdns.len() {
            return false;
        }
        let offset = self.rdns.len() - base.rdns.len();
        self.rdns[offset..]
            .iter()
            .zip(base.rdns.iter())
            .all(|(a, b)| a == b)
    }

    /// True when `self` is an immediate child of `base`.
    pub fn is_child_of(&self, base: &Dn) -> bool {
        self.rdns.len() == base.rdns.len() + 1 && self.is_within(base)
    }

    /// Move this DN from below `old_base` to below `new_base`.
    ///
    /// Returns `None` when `self` is not within `old_base`.
    pub fn rebase(&self, old_base: &Dn, new_base: &Dn) -> Option<Dn> {
        if !self.is_within(old_base) {
            return None;
        }
        let keep = self.rdns.len() - old_base.rdns.len();
        let mut rdns = self.rdns[..keep].to_vec();
        rdns.extend(new_base.rdns.iter().cloned());
        Some(Dn { rdns })
    }

    /// Values the leaf RDN holds for the given attribute.
    pub fn leaf_values(&self, attribute: &str) -> Vec<String> {
        self.rdn()
            .map(|rdn| rdn.values_of(attribute).map(str::to_string).collect())
            .unwrap_or_default()
    }

    /// The normalised string form used for equality and map keys.
    pub fn normalized(&self) -> String {
        self.rdns
            .iter()
            .map(Rdn::normalized)
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl fmt::Display for Dn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, rdn) in self.rdns.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}", rdn)?;
        }
        Ok(())
    }
}

impl PartialEq for Dn {
    fn eq(&self, other: &Self) -> bool {
        self.normalized() == other.normalized()
    }
}

impl Eq for Dn {}

impl Hash for Dn {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.normalized().hash(state);
    }
}

impl std::str::FromStr for Dn {
    type Err = DirectoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Dn::parse(s)
    }
}

/// Escape an attribute value for use inside a DN (RFC 4514).
pub fn escape_dn_value(value: &str) -> String {
    let mut result = String::with_capacity(value.len() * 2);
    let count = value.chars().count();

    for (i, ch) in value.chars().enumerate() {
        let is_first = i == 0;
        let is_last = i + 1 == count;

        match ch {
            ',' | '+' | '"' | '\\' | '<' | '>' | ';' | '=' => {
                result.push('\\');
                result.push(ch);
            }
            '\0' => result.push_str("\\00"),
            ' ' if is_first || is_last => result.push_str("\\20"),
            '#' if is_first => result.push_str("\\23"),
            _ => result.push(ch),
        }
    }

    result
}

/// Split on a separator byte that is not preceded by a backslash escape.
fn split_unescaped(s: &str, sep: u8) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut escaped = false;
    for (i, b) in s.bytes().enumerate() {
        if escaped {
            escaped = false;
            continue;
        }
        if b == b'\\' {
            escaped = true;
        } else if b == sep {
            parts.push(&s[start..i]);
            start = i + 1;
        }
    }
    parts.push(&s[start..]);
    parts
}

fn unescape_value(raw: &str, dn: &str) -> Result<String, DirectoryError> {
    let bytes = raw.trim_start().as_bytes();

    // Trailing spaces are insignificant unless escaped.
    let mut end = bytes.len();
    while end > 0 && bytes[end - 1] == b' ' && !(end >= 2 && bytes[end - 2] == b'\\') {
        end -= 1;
    }
    let bytes = &bytes[..end];

    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' {
            let next = *bytes
                .get(i + 1)
                .ok_or_else(|| DirectoryError::invalid_dn(dn, "dangling escape"))?;
            let low = bytes.get(i + 2).copied().and_then(hex_value);
            match (hex_value(next), low) {
                (Some(high), Some(low)) => {
                    out.push((high << 4) | low);
                    i += 3;
                }
                _ => {
                    out.push(next);
                    i += 2;
                }
            }
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }

    String::from_utf8(out).map_err(|_| DirectoryError::invalid_dn(dn, "value is not valid UTF-8"))
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}
