//! Container aggregate and its persisted record.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dockyard_common::error::{DockyardError, Result};
use dockyard_common::types::{ContainerId, ImageId};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::network::NetworkSettings;
use crate::serde_helpers::{null_default, timestamp};
use crate::state::{State, StateRecord};

/// A container: identity, configuration, runtime paths and lifecycle.
///
/// Identity, configuration and volumes are fixed at creation. Only the
/// [`State`] and the [`NetworkSettings`] change afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", try_from = "ContainerRecord")]
pub struct Container {
    #[serde(rename = "Id")]
    id: ContainerId,
    created: DateTime<Utc>,
    path: String,
    args: Vec<String>,
    config: Arc<Config>,
    state: State,
    image: ImageId,
    network_settings: NetworkSettings,
    sys_init_path: String,
    resolv_conf_path: String,
    hostname_path: String,
    hosts_path: String,
    name: String,
    driver: String,
    volumes: BTreeMap<String, String>,
    /// Kept apart from `volumes` so records written before read-only
    /// volumes existed still load.
    #[serde(rename = "VolumesRW")]
    volumes_rw: BTreeMap<String, bool>,
}

impl Container {
    /// Loads a persisted container record.
    ///
    /// # Errors
    ///
    /// Returns [`DockyardError::Serialization`] if the bytes are not a
    /// structurally valid record and [`DockyardError::Schema`] if a required
    /// field is missing once legacy defaults are applied.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let record: ContainerRecord = serde_json::from_slice(bytes)?;
        Self::try_from(record)
    }

    /// Container identity.
    #[must_use]
    pub const fn id(&self) -> &ContainerId {
        &self.id
    }

    /// Creation time.
    #[must_use]
    pub const fn created(&self) -> DateTime<Utc> {
        self.created
    }

    /// Resolved executable path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Arguments passed to the executable.
    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Portable configuration, shared and never replaced.
    #[must_use]
    pub const fn config(&self) -> &Arc<Config> {
        &self.config
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> &State {
        &self.state
    }

    /// Mutable lifecycle state; it only changes through its transitions.
    pub const fn state_mut(&mut self) -> &mut State {
        &mut self.state
    }

    /// Image the container was created from.
    #[must_use]
    pub const fn image(&self) -> &ImageId {
        &self.image
    }

    /// Current network settings.
    #[must_use]
    pub const fn network_settings(&self) -> &NetworkSettings {
        &self.network_settings
    }

    /// Replaces the network settings wholesale, as a (re)start does.
    pub fn replace_network_settings(&mut self, settings: NetworkSettings) {
        self.network_settings = settings;
    }

    /// Path of the init binary bind-mounted into the container.
    #[must_use]
    pub fn sys_init_path(&self) -> &str {
        &self.sys_init_path
    }

    /// Path of the generated `resolv.conf`.
    #[must_use]
    pub fn resolv_conf_path(&self) -> &str {
        &self.resolv_conf_path
    }

    /// Path of the generated `hostname` file.
    #[must_use]
    pub fn hostname_path(&self) -> &str {
        &self.hostname_path
    }

    /// Path of the generated `hosts` file.
    #[must_use]
    pub fn hosts_path(&self) -> &str {
        &self.hosts_path
    }

    /// Human-assigned name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Storage driver identifier.
    #[must_use]
    pub fn driver(&self) -> &str {
        &self.driver
    }

    /// Volumes: container path to host path.
    #[must_use]
    pub const fn volumes(&self) -> &BTreeMap<String, String> {
        &self.volumes
    }

    /// Read/write flags, keyed like [`Container::volumes`].
    #[must_use]
    pub const fn volumes_rw(&self) -> &BTreeMap<String, bool> {
        &self.volumes_rw
    }

    /// Whether a volume is writable; unknown paths are not.
    #[must_use]
    pub fn is_volume_writable(&self, container_path: &str) -> bool {
        self.volumes_rw.get(container_path).copied().unwrap_or(false)
    }

    /// Starts the process and installs the network settings it got.
    ///
    /// # Errors
    ///
    /// Returns [`DockyardError::InvalidTransition`] unless the container is
    /// created; nothing is changed in that case.
    pub fn start(&mut self, pid: i32, settings: NetworkSettings, at: DateTime<Utc>) -> Result<()> {
        self.state.start(pid, at)?;
        self.network_settings = settings;
        tracing::info!(id = %self.id, pid, "container started");
        Ok(())
    }

    /// Records the process exit and releases its network settings.
    ///
    /// # Errors
    ///
    /// Returns [`DockyardError::InvalidTransition`] unless the container is
    /// running, verified or not.
    pub fn exit(&mut self, exit_code: i32, at: DateTime<Utc>) -> Result<()> {
        self.state.exit(exit_code, at)?;
        self.network_settings = NetworkSettings::default();
        tracing::info!(id = %self.id, exit_code, "container exited");
        Ok(())
    }

    /// Serializes the record for persistence.
    ///
    /// # Errors
    ///
    /// Returns [`DockyardError::Serialization`] if serialization fails.
    pub fn to_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }
}

/// Lenient on-disk form of [`Container`]: every field may be absent or null.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct ContainerRecord {
    #[serde(rename = "Id", alias = "ID", alias = "id")]
    id: String,
    #[serde(with = "timestamp")]
    created: Option<DateTime<Utc>>,
    path: String,
    #[serde(deserialize_with = "null_default")]
    args: Vec<String>,
    config: Option<Config>,
    state: StateRecord,
    image: String,
    network_settings: Option<NetworkSettings>,
    sys_init_path: String,
    resolv_conf_path: String,
    hostname_path: String,
    hosts_path: String,
    name: String,
    driver: String,
    #[serde(deserialize_with = "null_default")]
    volumes: BTreeMap<String, String>,
    #[serde(rename = "VolumesRW")]
    volumes_rw: Option<BTreeMap<String, bool>>,
}

impl TryFrom<ContainerRecord> for Container {
    type Error = DockyardError;

    fn try_from(record: ContainerRecord) -> Result<Self> {
        if record.id.is_empty() {
            return Err(DockyardError::schema("container", "missing Id"));
        }
        let created = record
            .created
            .ok_or_else(|| DockyardError::schema("container", format!("{}: missing Created", record.id)))?;
        let config = record
            .config
            .ok_or_else(|| DockyardError::schema("container", format!("{}: missing Config", record.id)))?;
        let state = State::try_from(record.state)?;
        let volumes_rw = reconcile_volumes_rw(&record.id, &record.volumes, record.volumes_rw);

        Ok(Self {
            id: ContainerId::new(record.id),
            created,
            path: record.path,
            args: record.args,
            config: Arc::new(config),
            state,
            image: ImageId::new(record.image),
            network_settings: record.network_settings.unwrap_or_default(),
            sys_init_path: record.sys_init_path,
            resolv_conf_path: record.resolv_conf_path,
            hostname_path: record.hostname_path,
            hosts_path: record.hosts_path,
            name: record.name,
            driver: record.driver,
            volumes: record.volumes,
            volumes_rw,
        })
    }
}

/// Gives `VolumesRW` exactly the keys of `Volumes`.
///
/// Volumes without a flag, including every volume of a record that predates
/// `VolumesRW`, are writable. Flags for unknown volumes are dropped.
fn reconcile_volumes_rw(
    id: &str,
    volumes: &BTreeMap<String, String>,
    volumes_rw: Option<BTreeMap<String, bool>>,
) -> BTreeMap<String, bool> {
    let Some(mut flags) = volumes_rw else {
        if !volumes.is_empty() {
            tracing::debug!(id, "record predates VolumesRW, volumes default to read-write");
        }
        return volumes.keys().map(|path| (path.clone(), true)).collect();
    };
    let reconciled = volumes
        .keys()
        .map(|path| (path.clone(), flags.remove(path).unwrap_or(true)))
        .collect();
    if !flags.is_empty() {
        tracing::warn!(id, stale = ?flags.keys().collect::<Vec<_>>(), "dropping VolumesRW entries without a volume");
    }
    reconciled
}

/// Assembles a [`Container`] at creation time.
#[derive(Debug)]
pub struct ContainerBuilder {
    id: ContainerId,
    created: DateTime<Utc>,
    config: Config,
    image: ImageId,
    name: Option<String>,
    driver: String,
    sys_init_path: String,
    resolv_conf_path: String,
    hostname_path: String,
    hosts_path: String,
    volumes: BTreeMap<String, String>,
    volumes_rw: BTreeMap<String, bool>,
}

impl ContainerBuilder {
    /// Starts a container from `config` and the resolved image ID.
    ///
    /// A fresh ID and the current time are used unless overridden.
    #[must_use]
    pub fn new(config: Config, image: ImageId) -> Self {
        Self {
            id: ContainerId::generate(),
            created: Utc::now(),
            config,
            image,
            name: None,
            driver: dockyard_common::constants::DEFAULT_DRIVER.to_string(),
            sys_init_path: String::new(),
            resolv_conf_path: String::new(),
            hostname_path: String::new(),
            hosts_path: String::new(),
            volumes: BTreeMap::new(),
            volumes_rw: BTreeMap::new(),
        }
    }

    /// Uses a specific identity.
    #[must_use]
    pub fn id(mut self, id: ContainerId) -> Self {
        self.id = id;
        self
    }

    /// Uses a specific creation time.
    #[must_use]
    pub const fn created(mut self, at: DateTime<Utc>) -> Self {
        self.created = at;
        self
    }

    /// Sets the container name; a leading `/` is added if missing.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the storage driver identifier.
    #[must_use]
    pub fn driver(mut self, driver: impl Into<String>) -> Self {
        self.driver = driver.into();
        self
    }

    /// Sets the init, `resolv.conf`, `hostname` and `hosts` paths.
    #[must_use]
    pub fn runtime_paths(
        mut self,
        sys_init: impl Into<String>,
        resolv_conf: impl Into<String>,
        hostname: impl Into<String>,
        hosts: impl Into<String>,
    ) -> Self {
        self.sys_init_path = sys_init.into();
        self.resolv_conf_path = resolv_conf.into();
        self.hostname_path = hostname.into();
        self.hosts_path = hosts.into();
        self
    }

    /// Adds a volume and its read/write flag to both maps.
    #[must_use]
    pub fn volume(
        mut self,
        container_path: impl Into<String>,
        host_path: impl Into<String>,
        read_write: bool,
    ) -> Self {
        let container_path = container_path.into();
        let _ = self.volumes_rw.insert(container_path.clone(), read_write);
        let _ = self.volumes.insert(container_path, host_path.into());
        self
    }

    /// Builds the container in the `Created` state.
    ///
    /// # Errors
    ///
    /// Returns [`DockyardError::Config`] if the configuration has neither an
    /// entrypoint nor a command, or if the ID is empty.
    pub fn build(self) -> Result<Container> {
        if self.id.is_empty() {
            return Err(DockyardError::Config {
                message: "container ID must not be empty".to_string(),
            });
        }
        let (path, args) = self.config.entrypoint_and_args()?;
        let name = match self.name {
            Some(name) if name.starts_with('/') => name,
            Some(name) => format!("/{name}"),
            None => format!("/{}", self.id.short()),
        };
        tracing::debug!(id = %self.id, %name, %path, "container assembled");
        Ok(Container {
            id: self.id,
            created: self.created,
            path,
            args,
            config: Arc::new(self.config),
            state: State::new(),
            image: self.image,
            network_settings: NetworkSettings::default(),
            sys_init_path: self.sys_init_path,
            resolv_conf_path: self.resolv_conf_path,
            hostname_path: self.hostname_path,
            hosts_path: self.hosts_path,
            name,
            driver: self.driver,
            volumes: self.volumes,
            volumes_rw: self.volumes_rw,
        })
    }
}
