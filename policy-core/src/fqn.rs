//! Fully-qualified, forward-slash-separated names (namespaces, shapes).

use serde::{Deserialize, Serialize};
use std::fmt;

/// A forward-slash-separated identifier path, e.g. `com/example/billing`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fqn {
    parts: Vec<String>,
}

impl Fqn {
    pub fn new(parts: Vec<String>) -> Self {
        Self { parts }
    }

    /// Parse a `/`-separated path. Empty segments are rejected.
    pub fn parse(s: &str) -> Option<Self> {
        let parts: Vec<String> = s.split('/').map(str::to_string).collect();
        if parts.is_empty() || parts.iter().any(|p| p.is_empty()) {
            return None;
        }
        Some(Self { parts })
    }

    pub fn parts(&self) -> &[String] {
        &self.parts
    }

    /// The last path segment, used as the default alias for a `use` import.
    pub fn last_segment(&self) -> &str {
        self.parts.last().map(String::as_str).unwrap_or_default()
    }

    /// True iff `self` is the direct parent of `other` (exactly one segment
    /// shorter, sharing the common prefix). Self and grandparents are
    /// excluded.
    pub fn is_parent_of(&self, other: &Fqn) -> bool {
        other.parts.len() == self.parts.len() + 1 && other.parts.starts_with(&self.parts)
    }

    /// The inverse of [`Fqn::is_parent_of`].
    pub fn is_child_of(&self, other: &Fqn) -> bool {
        other.is_parent_of(self)
    }
}

impl fmt::Display for Fqn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.parts.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fqn(s: &str) -> Fqn {
        Fqn::parse(s).unwrap()
    }

    #[test]
    fn direct_child_is_parent() {
        assert!(fqn("a/b").is_parent_of(&fqn("a/b/c")));
    }

    #[test]
    fn grandchild_excluded() {
        assert!(!fqn("a/b").is_parent_of(&fqn("a/b/c/d")));
    }

    #[test]
    fn self_excluded() {
        assert!(!fqn("a/b").is_parent_of(&fqn("a/b")));
    }

    #[test]
    fn child_of_is_inverse() {
        assert!(fqn("a/b/c").is_child_of(&fqn("a/b")));
        assert!(!fqn("a/b").is_child_of(&fqn("a/b/c")));
    }

    #[test]
    fn rejects_empty_segments() {
        assert!(Fqn::parse("a//b").is_none());
        assert!(Fqn::parse("").is_none());
    }
}
