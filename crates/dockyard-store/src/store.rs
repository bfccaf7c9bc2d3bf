//! Container, host configuration and image records on disk.

use std::path::{Path, PathBuf};

use dockyard_common::constants::{
    CONTAINER_CONFIG_FILE, CONTAINERS_DIR, GRAPH_DIR, HOST_CONFIG_FILE, IMAGE_JSON_FILE,
};
use dockyard_common::error::{DockyardError, Result};
use dockyard_common::types::{ContainerId, ImageId};
use dockyard_model::container::Container;
use dockyard_model::host_config::HostConfig;
use dockyard_model::image::Image;

use crate::fs;

/// Record store rooted at a data directory.
#[derive(Debug)]
pub struct RecordStore {
    root: PathBuf,
}

impl RecordStore {
    /// Opens the store, creating the container and image directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the directories cannot be created.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root.join(CONTAINERS_DIR))?;
        fs::create_dir_all(&root.join(GRAPH_DIR))?;
        tracing::info!(path = %root.display(), "record store opened");
        Ok(Self { root })
    }

    /// Root data directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding one container's files.
    #[must_use]
    pub fn container_dir(&self, id: &ContainerId) -> PathBuf {
        self.root.join(CONTAINERS_DIR).join(id.as_str())
    }

    /// Directory holding one image's files.
    #[must_use]
    pub fn image_dir(&self, id: &ImageId) -> PathBuf {
        self.root.join(GRAPH_DIR).join(id.as_str())
    }

    /// Writes a container record, replacing any previous version.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be serialized or written.
    pub fn save_container(&self, container: &Container) -> Result<()> {
        let dir = self.container_dir(container.id());
        fs::create_dir_all(&dir)?;
        fs::write_atomic(&dir.join(CONTAINER_CONFIG_FILE), &container.to_json()?)?;
        tracing::debug!(id = %container.id(), state = %container.state().lifecycle(), "container saved");
        Ok(())
    }

    /// Loads a container record by full identity.
    ///
    /// # Errors
    ///
    /// Returns [`DockyardError::NotFound`] if there is no record,
    /// [`DockyardError::Schema`] if the record fails validation or is stored
    /// under another container's directory.
    pub fn load_container(&self, id: &ContainerId) -> Result<Container> {
        let path = self.container_dir(id).join(CONTAINER_CONFIG_FILE);
        let bytes = fs::read_optional(&path)?.ok_or_else(|| DockyardError::NotFound {
            kind: "container",
            id: id.to_string(),
        })?;
        let container = Container::from_json(&bytes)?;
        if container.id() != id {
            return Err(DockyardError::schema(
                "container",
                format!("{} is stored at {}", container.id(), path.display()),
            ));
        }
        tracing::debug!(%id, "container loaded");
        Ok(container)
    }

    /// Loads every readable container record.
    ///
    /// Records that fail to load are skipped with a warning so one damaged
    /// file does not hide the rest.
    ///
    /// # Errors
    ///
    /// Returns an error only if the containers directory cannot be listed.
    pub fn list_containers(&self) -> Result<Vec<Container>> {
        let mut containers = Vec::new();
        for name in fs::subdirectories(&self.root.join(CONTAINERS_DIR))? {
            match self.load_container(&ContainerId::new(name.as_str())) {
                Ok(container) => containers.push(container),
                Err(e) => tracing::warn!(id = %name, error = %e, "skipping unreadable container"),
            }
        }
        Ok(containers)
    }

    /// Resolves a container by full ID, name or unique ID prefix.
    ///
    /// # Errors
    ///
    /// Returns [`DockyardError::NotFound`] if nothing matches and
    /// [`DockyardError::Ambiguous`] if a prefix matches several containers.
    pub fn find_container(&self, query: &str) -> Result<Container> {
        let exact = ContainerId::new(query);
        if is_plain_component(query) && self.container_dir(&exact).is_dir() {
            return self.load_container(&exact);
        }
        let containers = self.list_containers()?;
        let name = if query.starts_with('/') {
            query.to_string()
        } else {
            format!("/{query}")
        };
        if let Some(found) = containers.iter().find(|c| c.name() == name) {
            return Ok(found.clone());
        }
        let mut matches = containers
            .into_iter()
            .filter(|c| !query.is_empty() && c.id().as_str().starts_with(query));
        match (matches.next(), matches.next()) {
            (Some(found), None) => Ok(found),
            (Some(_), Some(_)) => Err(DockyardError::Ambiguous {
                kind: "container",
                prefix: query.to_string(),
            }),
            (None, _) => Err(DockyardError::NotFound {
                kind: "container",
                id: query.to_string(),
            }),
        }
    }

    /// Deletes a container and its host configuration.
    ///
    /// # Errors
    ///
    /// Returns [`DockyardError::NotFound`] if there is no such container.
    pub fn remove_container(&self, id: &ContainerId) -> Result<()> {
        remove_dir(&self.container_dir(id), "container", id.as_str())?;
        tracing::debug!(%id, "container removed");
        Ok(())
    }

    /// Writes the host configuration of a container.
    ///
    /// # Errors
    ///
    /// Returns [`DockyardError::NotFound`] if the container has no record,
    /// or an error if the file cannot be written.
    pub fn save_host_config(&self, id: &ContainerId, host: &HostConfig) -> Result<()> {
        let dir = self.container_dir(id);
        if !dir.is_dir() {
            return Err(DockyardError::NotFound {
                kind: "container",
                id: id.to_string(),
            });
        }
        let bytes = serde_json::to_vec_pretty(host)?;
        fs::write_atomic(&dir.join(HOST_CONFIG_FILE), &bytes)?;
        tracing::debug!(%id, "host config saved");
        Ok(())
    }

    /// Loads the host configuration of a container.
    ///
    /// Containers created before host configuration was stored separately
    /// have no file; they get the default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_host_config(&self, id: &ContainerId) -> Result<HostConfig> {
        let path = self.container_dir(id).join(HOST_CONFIG_FILE);
        match fs::read_optional(&path)? {
            Some(bytes) => Ok(serde_json::from_slice(&bytes)?),
            None => {
                tracing::debug!(%id, "no host config on disk, using defaults");
                Ok(HostConfig::default())
            }
        }
    }

    /// Stores a new image record.
    ///
    /// # Errors
    ///
    /// Returns [`DockyardError::AlreadyExists`] if an image with the same
    /// identity is already stored; images are never rewritten.
    pub fn save_image(&self, image: &Image) -> Result<()> {
        let dir = self.image_dir(image.id());
        let path = dir.join(IMAGE_JSON_FILE);
        if path.exists() {
            return Err(DockyardError::AlreadyExists {
                kind: "image",
                id: image.id().to_string(),
            });
        }
        fs::create_dir_all(&dir)?;
        fs::write_atomic(&path, &image.to_json()?)?;
        tracing::debug!(id = %image.id(), parent = %image.parent(), "image saved");
        Ok(())
    }

    /// Loads an image record.
    ///
    /// # Errors
    ///
    /// Returns [`DockyardError::NotFound`] if there is no record or
    /// [`DockyardError::Schema`] if it fails validation.
    pub fn load_image(&self, id: &ImageId) -> Result<Image> {
        let path = self.image_dir(id).join(IMAGE_JSON_FILE);
        let bytes = fs::read_optional(&path)?.ok_or_else(|| DockyardError::NotFound {
            kind: "image",
            id: id.to_string(),
        })?;
        let image = Image::from_json(&bytes)?;
        if image.id() != id {
            return Err(DockyardError::schema(
                "image",
                format!("{} is stored at {}", image.id(), path.display()),
            ));
        }
        Ok(image)
    }

    /// Loads every readable image record, skipping damaged ones.
    ///
    /// # Errors
    ///
    /// Returns an error only if the graph directory cannot be listed.
    pub fn list_images(&self) -> Result<Vec<Image>> {
        let mut images = Vec::new();
        for name in fs::subdirectories(&self.root.join(GRAPH_DIR))? {
            match self.load_image(&ImageId::new(name.as_str())) {
                Ok(image) => images.push(image),
                Err(e) => tracing::warn!(id = %name, error = %e, "skipping unreadable image"),
            }
        }
        Ok(images)
    }

    /// Deletes an image record.
    ///
    /// # Errors
    ///
    /// Returns [`DockyardError::NotFound`] if there is no such image.
    pub fn remove_image(&self, id: &ImageId) -> Result<()> {
        remove_dir(&self.image_dir(id), "image", id.as_str())?;
        tracing::debug!(%id, "image removed");
        Ok(())
    }
}

fn remove_dir(dir: &Path, kind: &'static str, id: &str) -> Result<()> {
    if !dir.is_dir() {
        return Err(DockyardError::NotFound {
            kind,
            id: id.to_string(),
        });
    }
    std::fs::remove_dir_all(dir).map_err(|e| fs::io_error(dir, e))
}

/// A single path component that stays inside its parent directory.
fn is_plain_component(query: &str) -> bool {
    !query.is_empty() && query != "." && query != ".." && !query.contains(['/', '\\'])
}
