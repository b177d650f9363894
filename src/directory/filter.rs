//! LDAP search filters.
//!
//! Filters are built as values and rendered to RFC 4515 string form with
//! [`Display`](std::fmt::Display). The in-memory directory evaluates them
//! directly against entries with [`Filter::matches`].

use crate::directory::Entry;
use std::fmt;

/// A search filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// `(attribute=value)`
    Equals { attribute: String, value: String },
    /// `(attribute=*)`
    Present { attribute: String },
    /// `(&...)`
    And(Vec<Filter>),
    /// `(|...)`
    Or(Vec<Filter>),
    /// `(!...)`
    Not(Box<Filter>),
}

impl Filter {
    pub fn equals(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Filter::Equals {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    pub fn present(attribute: impl Into<String>) -> Self {
        Filter::Present {
            attribute: attribute.into(),
        }
    }

    /// Select entries whose `attribute` holds any of `values`.
    ///
    /// One value yields a plain equality filter; several values are joined in
    /// a disjunction.
    pub fn any_of<I, V>(attribute: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        let mut terms: Vec<Filter> = values
            .into_iter()
            .map(|value| Filter::equals(attribute, value))
            .collect();
        if terms.len() == 1 {
            terms.remove(0)
        } else {
            Filter::Or(terms)
        }
    }

    /// Evaluate this filter against an entry.
    ///
    /// Attribute names match case-insensitively, as do values.
    pub fn matches(&self, entry: &Entry) -> bool {
        match self {
            Filter::Equals { attribute, value } => entry
                .attributes()
                .get(attribute)
                .map(|values| values.iter().any(|v| v.eq_ignore_ascii_case(value)))
                .unwrap_or(false),
            Filter::Present { attribute } => entry
                .attributes()
                .get(attribute)
                .map(|values| !values.is_empty())
                .unwrap_or(false),
            Filter::And(filters) => filters.iter().all(|f| f.matches(entry)),
            Filter::Or(filters) => filters.iter().any(|f| f.matches(entry)),
            Filter::Not(filter) => !filter.matches(entry),
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::Equals { attribute, value } => {
                write!(f, "({}={})", attribute, escape_filter_value(value))
            }
            Filter::Present { attribute } => write!(f, "({}=*)", attribute),
            Filter::And(filters) => {
                f.write_str("(&")?;
                for filter in filters {
                    write!(f, "{}", filter)?;
                }
                f.write_str(")")
            }
            Filter::Or(filters) => {
                f.write_str("(|")?;
                for filter in filters {
                    write!(f, "{}", filter)?;
                }
                f.write_str(")")
            }
            Filter::Not(filter) => write!(f, "(!{})", filter),
        }
    }
}

/// Escape special characters in filter assertion values (RFC 4515).
pub fn escape_filter_value(value: &str) -> String {
    value
        .replace('\\', "\\5c")
        .replace('*', "\\2a")
        .replace('(', "\\28")
        .replace(')', "\\29")
        .replace('\0', "\\00")
}
