//! Discovered dataset entries.

use serde::{Deserialize, Serialize};

/// One discovered `(identifier, location)` pair from a source scan.
///
/// `identifier` is the file name without directory or extension. It is meant
/// to be unique within a source, but uniqueness is only checked when the
/// index is built with a rejecting duplicate policy.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Entry {
    /// Base file name without extension.
    pub identifier: String,
    /// Local path or remote object key.
    pub location: String,
}

impl Entry {
    /// Creates a new entry.
    #[must_use]
    pub fn new(identifier: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            location: location.into(),
        }
    }
}
