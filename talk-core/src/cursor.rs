//! Revision cursor for talksync.
//!
//! The server numbers every change with a revision. The client keeps the
//! highest revision it has applied and uses it both as the starting point of
//! the next fetch and as the filter against redelivered operations.
//!
//! A fetched batch is not assumed to be sorted: every operation is checked
//! against the cursor individually, in arrival order, and the cursor only
//! ever moves forward.

use talk_types::Revision;

/// Monotone revision cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RevisionCursor {
    current: Revision,
}

impl RevisionCursor {
    /// Create a new cursor at revision 0.
    pub fn new() -> Self {
        Self {
            current: Revision::zero(),
        }
    }

    /// Create a cursor starting at a specific revision.
    pub fn with_revision(revision: Revision) -> Self {
        Self { current: revision }
    }

    /// Get the current revision.
    pub fn current(&self) -> Revision {
        self.current
    }

    /// Offer an operation's revision.
    ///
    /// Returns `true` and advances to `revision` if it is newer than the
    /// cursor. Returns `false` (already seen) otherwise.
    pub fn accept(&mut self, revision: Revision) -> bool {
        if revision > self.current {
            self.current = revision;
            true
        } else {
            false
        }
    }

    /// Raise the cursor to at least `revision`. Never moves backwards.
    pub fn advance_to(&mut self, revision: Revision) {
        if revision > self.current {
            self.current = revision;
        }
    }
}
