//! Immutable image metadata.
//!
//! An [`Image`] is written once. Rebuilding produces a new identity, so the
//! type exposes no mutators; records come from [`ImageBuilder`] or from disk.

use chrono::{DateTime, Utc};
use dockyard_common::error::{DockyardError, Result};
use dockyard_common::types::{ContainerId, ImageId};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::container::Container;
use crate::serde_helpers::timestamp;

/// Metadata describing a built image.
///
/// `config` is what containers created from the image inherit;
/// `container_config` is a snapshot of the container the image was
/// committed from and is kept for history only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ImageRecord")]
pub struct Image {
    #[serde(rename = "Id")]
    id: ImageId,
    #[serde(skip_serializing_if = "ImageId::is_empty")]
    parent: ImageId,
    #[serde(skip_serializing_if = "String::is_empty")]
    comment: String,
    created: DateTime<Utc>,
    #[serde(skip_serializing_if = "ContainerId::is_empty")]
    container: ContainerId,
    container_config: Config,
    #[serde(skip_serializing_if = "String::is_empty")]
    docker_version: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    author: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    config: Option<Config>,
    #[serde(skip_serializing_if = "String::is_empty")]
    architecture: String,
    #[serde(rename = "Size")]
    size: i64,
}

impl Image {
    /// Loads a persisted image record.
    ///
    /// # Errors
    ///
    /// Returns [`DockyardError::Serialization`] for unreadable JSON and
    /// [`DockyardError::Schema`] when the identity or creation time is missing.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let record: ImageRecord = serde_json::from_slice(bytes)?;
        Self::try_from(record)
    }

    /// Serializes the record for persistence.
    ///
    /// # Errors
    ///
    /// Returns [`DockyardError::Serialization`] if serialization fails.
    pub fn to_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    /// Image identity.
    #[must_use]
    pub const fn id(&self) -> &ImageId {
        &self.id
    }

    /// Parent image; empty for a base image.
    #[must_use]
    pub const fn parent(&self) -> &ImageId {
        &self.parent
    }

    /// Free-text commit message.
    #[must_use]
    pub fn comment(&self) -> &str {
        &self.comment
    }

    /// Creation time.
    #[must_use]
    pub const fn created(&self) -> DateTime<Utc> {
        self.created
    }

    /// Container the image was committed from, if any.
    #[must_use]
    pub const fn container(&self) -> &ContainerId {
        &self.container
    }

    /// Snapshot of the builder container's configuration.
    #[must_use]
    pub const fn container_config(&self) -> &Config {
        &self.container_config
    }

    /// Version of the daemon that built the image.
    #[must_use]
    pub fn docker_version(&self) -> &str {
        &self.docker_version
    }

    /// Author of the image.
    #[must_use]
    pub fn author(&self) -> &str {
        &self.author
    }

    /// Configuration inherited by new containers.
    #[must_use]
    pub const fn config(&self) -> Option<&Config> {
        self.config.as_ref()
    }

    /// Target architecture.
    #[must_use]
    pub fn architecture(&self) -> &str {
        &self.architecture
    }

    /// Size of this image's own layer in bytes.
    #[must_use]
    pub const fn size(&self) -> i64 {
        self.size
    }
}

/// Lenient on-disk form of [`Image`].
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ImageRecord {
    #[serde(rename = "Id", alias = "id", alias = "ID")]
    id: String,
    parent: String,
    comment: String,
    #[serde(with = "timestamp")]
    created: Option<DateTime<Utc>>,
    container: String,
    container_config: Option<Config>,
    docker_version: String,
    author: String,
    config: Option<Config>,
    architecture: String,
    #[serde(rename = "Size", alias = "size")]
    size: i64,
}

impl TryFrom<ImageRecord> for Image {
    type Error = DockyardError;

    fn try_from(record: ImageRecord) -> Result<Self> {
        if record.id.is_empty() {
            return Err(DockyardError::schema("image", "missing id"));
        }
        let created = record
            .created
            .ok_or_else(|| DockyardError::schema("image", format!("{}: missing created", record.id)))?;
        if record.size < 0 {
            return Err(DockyardError::schema(
                "image",
                format!("{}: negative Size {}", record.id, record.size),
            ));
        }
        Ok(Self {
            id: ImageId::new(record.id),
            parent: ImageId::new(record.parent),
            comment: record.comment,
            created,
            container: ContainerId::new(record.container),
            container_config: record.container_config.unwrap_or_default(),
            docker_version: record.docker_version,
            author: record.author,
            config: record.config,
            architecture: record.architecture,
            size: record.size,
        })
    }
}

/// Assembles a new [`Image`].
#[derive(Debug)]
pub struct ImageBuilder {
    image: Image,
}

impl ImageBuilder {
    /// Starts a base image with a fresh ID, created now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            image: Image {
                id: ImageId::generate(),
                parent: ImageId::default(),
                comment: String::new(),
                created: Utc::now(),
                container: ContainerId::default(),
                container_config: Config::default(),
                docker_version: String::new(),
                author: String::new(),
                config: None,
                architecture: String::new(),
                size: 0,
            },
        }
    }

    /// Starts an image committed from `container`.
    ///
    /// The parent is the container's image and its configuration is
    /// snapshotted into `container_config`.
    #[must_use]
    pub fn commit(container: &Container) -> Self {
        let mut builder = Self::new();
        builder.image.parent = container.image().clone();
        builder.image.container = container.id().clone();
        builder.image.container_config = container.config().as_ref().clone();
        builder
    }

    /// Uses a specific identity.
    #[must_use]
    pub fn id(mut self, id: ImageId) -> Self {
        self.image.id = id;
        self
    }

    /// Sets the parent image.
    #[must_use]
    pub fn parent(mut self, parent: ImageId) -> Self {
        self.image.parent = parent;
        self
    }

    /// Uses a specific creation time.
    #[must_use]
    pub const fn created(mut self, at: DateTime<Utc>) -> Self {
        self.image.created = at;
        self
    }

    /// Sets the commit message.
    #[must_use]
    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.image.comment = comment.into();
        self
    }

    /// Sets the author.
    #[must_use]
    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.image.author = author.into();
        self
    }

    /// Sets the configuration new containers inherit.
    #[must_use]
    pub fn config(mut self, config: Config) -> Self {
        self.image.config = Some(config);
        self
    }

    /// Sets the builder version string.
    #[must_use]
    pub fn docker_version(mut self, version: impl Into<String>) -> Self {
        self.image.docker_version = version.into();
        self
    }

    /// Sets the target architecture.
    #[must_use]
    pub fn architecture(mut self, arch: impl Into<String>) -> Self {
        self.image.architecture = arch.into();
        self
    }

    /// Sets the layer size in bytes.
    #[must_use]
    pub const fn size(mut self, bytes: i64) -> Self {
        self.image.size = bytes;
        self
    }

    /// Finishes the image.
    ///
    /// # Errors
    ///
    /// Returns [`DockyardError::Config`] if the ID is empty or the size is
    /// negative.
    pub fn build(self) -> Result<Image> {
        if self.image.id.is_empty() {
            return Err(DockyardError::Config {
                message: "image ID must not be empty".to_string(),
            });
        }
        if self.image.size < 0 {
            return Err(DockyardError::Config {
                message: format!("image size must not be negative, got {}", self.image.size),
            });
        }
        tracing::debug!(id = %self.image.id, parent = %self.image.parent, "image assembled");
        Ok(self.image)
    }
}

impl Default for ImageBuilder {
    fn default() -> Self {
        Self::new()
    }
}
