//! Identity types shared by containers and images.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::SHORT_ID_LENGTH;

/// Produces a 64 hex character identifier from two random UUIDs.
fn random_hex_id() -> String {
    format!(
        "{}{}",
        uuid::Uuid::new_v4().simple(),
        uuid::Uuid::new_v4().simple()
    )
}

/// Truncates an identifier to its display form.
fn truncate(id: &str) -> &str {
    id.get(..SHORT_ID_LENGTH).unwrap_or(id)
}

/// Unique identifier for a container.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ContainerId(String);

impl ContainerId {
    /// Creates a container ID from a string value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a random 64 hex character container ID.
    #[must_use]
    pub fn generate() -> Self {
        Self(random_hex_id())
    }

    /// Returns the inner string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the 12 character prefix used in listings.
    #[must_use]
    pub fn short(&self) -> &str {
        truncate(&self.0)
    }

    /// Whether the identifier is empty (a record that never had one).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for an image.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ImageId(String);

impl ImageId {
    /// Creates an image ID from a string value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a random 64 hex character image ID.
    #[must_use]
    pub fn generate() -> Self {
        Self(random_hex_id())
    }

    /// Returns the inner string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the 12 character prefix used in listings.
    #[must_use]
    pub fn short(&self) -> &str {
        truncate(&self.0)
    }

    /// Whether the identifier is empty; an empty parent marks a base image.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
