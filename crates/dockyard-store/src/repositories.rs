//! Repository tags, `repositories.json`.
//!
//! The file maps repository name to tag to image identity:
//!
//! ```json
//! {"Repositories": {"busybox": {"latest": "e9aa60c60128..."}}}
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use dockyard_common::constants::REPOSITORIES_FILE;
use dockyard_common::error::{DockyardError, Result};
use dockyard_common::types::ImageId;
use serde::{Deserialize, Serialize};

use crate::fs;

/// Tag to image identity within one repository.
pub type Repository = BTreeMap<String, ImageId>;

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RepositoriesFile {
    #[serde(default)]
    repositories: BTreeMap<String, Repository>,
}

/// In-memory view of the tag index.
#[derive(Debug)]
pub struct Repositories {
    path: PathBuf,
    repositories: BTreeMap<String, Repository>,
}

impl Repositories {
    /// Loads the index from the data directory; a missing file is empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(REPOSITORIES_FILE);
        let file: RepositoriesFile = match fs::read_optional(&path)? {
            Some(bytes) => serde_json::from_slice(&bytes)?,
            None => RepositoriesFile::default(),
        };
        tracing::debug!(path = %path.display(), repositories = file.repositories.len(), "tags loaded");
        Ok(Self {
            path,
            repositories: file.repositories,
        })
    }

    /// Writes the index back.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self) -> Result<()> {
        let file = RepositoriesFile {
            repositories: self.repositories.clone(),
        };
        fs::write_atomic(&self.path, &serde_json::to_vec_pretty(&file)?)
    }

    /// Points `repository:tag` at `image`, replacing any previous target.
    ///
    /// # Errors
    ///
    /// Returns [`DockyardError::Format`] if the repository or tag is empty
    /// or the tag contains a `:` or `/`.
    pub fn tag(&mut self, repository: &str, tag: &str, image: &ImageId) -> Result<()> {
        if repository.is_empty() {
            return Err(DockyardError::format(repository, "repository name must not be empty"));
        }
        if tag.is_empty() || tag.contains([':', '/']) {
            return Err(DockyardError::format(tag, "tag must be non-empty without ':' or '/'"));
        }
        let previous = self
            .repositories
            .entry(repository.to_string())
            .or_default()
            .insert(tag.to_string(), image.clone());
        tracing::debug!(repository, tag, %image, replaced = previous.is_some(), "tag set");
        Ok(())
    }

    /// Resolves `repository:tag` to an image identity.
    #[must_use]
    pub fn lookup(&self, repository: &str, tag: &str) -> Option<&ImageId> {
        self.repositories.get(repository)?.get(tag)
    }

    /// All `repository:tag` names pointing at `image`, sorted.
    #[must_use]
    pub fn tags_for(&self, image: &ImageId) -> Vec<String> {
        self.repositories
            .iter()
            .flat_map(|(name, tags)| {
                tags.iter()
                    .filter(move |(_, id)| *id == image)
                    .map(move |(tag, _)| format!("{name}:{tag}"))
            })
            .collect()
    }

    /// Number of repositories.
    #[must_use]
    pub fn len(&self) -> usize {
        self.repositories.len()
    }

    /// Whether no repository is tagged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.repositories.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let repos = Repositories::load(dir.path()).expect("load");
        assert!(repos.is_empty());
        assert!(repos.tags_for(&ImageId::new("x")).is_empty());
    }

    #[test]
    fn reads_daemon_written_index() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(
            dir.path().join("repositories.json"),
            br#"{"Repositories":{"base":{"latest":"b750fe79","ubuntu-12.10":"b750fe79"},"busybox":{"latest":"e9aa60c6"}}}"#,
        )
        .expect("write");
        let repos = Repositories::load(dir.path()).expect("load");

        assert_eq!(repos.len(), 2);
        assert_eq!(
            repos.tags_for(&ImageId::new("b750fe79")),
            vec!["base:latest", "base:ubuntu-12.10"]
        );
        assert_eq!(repos.lookup("busybox", "latest"), Some(&ImageId::new("e9aa60c6")));
        assert!(repos.lookup("busybox", "edge").is_none());
    }

    #[test]
    fn tag_and_save_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut repos = Repositories::load(dir.path()).expect("load");
        repos.tag("app", "v1", &ImageId::new("aaa")).expect("tag");
        repos.tag("app", "v1", &ImageId::new("bbb")).expect("retag");
        repos.save().expect("save");

        let reloaded = Repositories::load(dir.path()).expect("reload");
        assert_eq!(reloaded.lookup("app", "v1"), Some(&ImageId::new("bbb")));
        assert!(reloaded.tags_for(&ImageId::new("aaa")).is_empty());
    }

    #[test]
    fn rejects_malformed_tags() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut repos = Repositories::load(dir.path()).expect("load");
        assert!(repos.tag("", "latest", &ImageId::new("a")).is_err());
        assert!(repos.tag("app", "", &ImageId::new("a")).is_err());
        assert!(repos.tag("app", "a:b", &ImageId::new("a")).is_err());
    }
}
