//! Stable object identity

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identity of a persisted object, independent of its path in the container
///
/// Assigned once when the object is created and never reused. The value is
/// a plain token: holding one keeps nothing alive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectReference(String);

impl ObjectReference {
    /// Generate a fresh random identity (UUID v4)
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Wrap an identity read back from a file
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the identity as a string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
