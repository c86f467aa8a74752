//! Namespaced identifier shared by symbols and keywords
//!
//! An identifier is an optional namespace plus a name. Equality and
//! ordering are structural, so two independently constructed keywords
//! with the same spelling compare equal.

use std::cmp::Ordering;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ident {
    pub ns: Option<String>,
    pub name: String,
}

impl Ident {
    pub fn simple(name: impl Into<String>) -> Self {
        Self {
            ns: None,
            name: name.into(),
        }
    }

    pub fn qualified(ns: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            ns: Some(ns.into()),
            name: name.into(),
        }
    }

    /// Parse `"ns/name"` into a qualified ident, `"name"` into a simple
    /// one. A single `"/"` names the division symbol, not a separator.
    pub fn parse(s: &str) -> Self {
        match s.find('/') {
            Some(idx) if s.len() > 1 => {
                Self::qualified(&s[..idx], &s[idx + 1..])
            }
            _ => Self::simple(s),
        }
    }

    pub fn is_qualified(&self) -> bool {
        self.ns.is_some()
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.ns {
            Some(ns) => write!(f, "{}/{}", ns, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

impl PartialOrd for Ident {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Ident {
    // Namespace first (absent sorts before present), then name.
    fn cmp(&self, other: &Self) -> Ordering {
        self.ns.cmp(&other.ns).then_with(|| self.name.cmp(&other.name))
    }
}
