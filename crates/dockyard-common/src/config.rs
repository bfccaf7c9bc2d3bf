//! Global configuration model for the Dockyard daemon tooling.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{DockyardError, Result};

/// Root configuration, loaded from `dockyard.json` when present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DockyardConfig {
    /// Base directory for container and image records.
    pub data_dir: PathBuf,
    /// Whether the daemon runs in debug mode.
    pub debug: bool,
    /// Storage driver identifier stamped on new containers.
    pub driver: String,
    /// Registry index advertised to clients.
    pub index_server_address: String,
    /// Host capabilities reported through `info`.
    pub host: HostCapabilities,
}

/// Kernel and cgroup capabilities of the host, as detected by the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostCapabilities {
    /// Memory cgroup limits are available.
    pub memory_limit: bool,
    /// Swap accounting is available.
    pub swap_limit: bool,
    /// IPv4 forwarding is enabled.
    pub ipv4_forwarding: bool,
    /// Running kernel version.
    pub kernel_version: String,
    /// Version of the low-level runtime.
    pub lxc_version: String,
}

impl Default for DockyardConfig {
    fn default() -> Self {
        Self {
            data_dir: crate::constants::data_dir().clone(),
            debug: false,
            driver: crate::constants::DEFAULT_DRIVER.to_string(),
            index_server_address: crate::constants::DEFAULT_INDEX_SERVER.to_string(),
            host: HostCapabilities::default(),
        }
    }
}

impl DockyardConfig {
    /// Loads the configuration from a JSON file.
    ///
    /// A missing file yields the defaults; fields absent from the file keep
    /// their default values.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|e| DockyardError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: Self = serde_json::from_str(&content)?;
        if config.driver.is_empty() {
            return Err(DockyardError::Config {
                message: "driver must not be empty".to_string(),
            });
        }
        tracing::debug!(path = %path.display(), driver = %config.driver, "config loaded");
        Ok(config)
    }
}
