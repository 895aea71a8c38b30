//! Identity and ordering types for talksync.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An opaque identifier for a user, group or room on the messaging service.
///
/// Unique within its own collection, not guaranteed unique across
/// collections.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Mid(String);

impl Mid {
    /// Create a Mid from any string-like value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Get the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check whether the identifier is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for Mid {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for Mid {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl PartialEq<str> for Mid {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Mid {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl fmt::Display for Mid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Mid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Mid({})", self.0)
    }
}

/// A server-assigned operation revision.
///
/// Revisions are the ordering authority for the operation stream: the client
/// remembers the highest revision it has applied and asks only for newer ones.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Revision(i64);

impl Revision {
    /// Create a new Revision with the given value.
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Get the numeric value of this Revision.
    pub fn value(&self) -> i64 {
        self.0
    }

    /// Create a Revision representing "nothing applied yet".
    pub fn zero() -> Self {
        Self(0)
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Revision({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mid_compares_with_str() {
        let mid = Mid::from("u123");
        assert_eq!(mid, "u123");
        assert_eq!(mid.as_str(), "u123");
        assert!(!mid.is_empty());
        assert!(Mid::default().is_empty());
    }

    #[test]
    fn mid_serializes_as_plain_string() {
        let json = serde_json::to_string(&Mid::from("c9")).unwrap();
        assert_eq!(json, "\"c9\"");
    }

    #[test]
    fn revision_ordering() {
        let r1 = Revision::new(100);
        let r2 = Revision::new(200);
        assert!(r1 < r2);
        assert_eq!(Revision::zero().value(), 0);
    }

    #[test]
    fn revision_debug_format() {
        assert_eq!(format!("{:?}", Revision::new(7)), "Revision(7)");
    }
}
