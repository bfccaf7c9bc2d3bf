//! Host-specific runtime configuration.
//!
//! Unlike [`Config`](crate::config::Config), a [`HostConfig`] is tied to the
//! machine the container was created on and is never copied into images.

use dockyard_common::error::{DockyardError, Result};
use serde::{Deserialize, Serialize};

use crate::port::{PortMap, PortSet};
use crate::serde_helpers::{null_default, nullable_values};

/// Non-portable configuration supplied when a container is started.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct HostConfig {
    /// Bind mounts as `host-path:container-path[:mode]`.
    #[serde(deserialize_with = "null_default")]
    pub binds: Vec<String>,
    /// File the container ID is written to once created.
    #[serde(rename = "ContainerIDFile")]
    pub container_id_file: String,
    /// Raw options passed to the low-level runtime.
    #[serde(deserialize_with = "null_default")]
    pub lxc_conf: Vec<KeyValuePair>,
    /// Run with extended privileges.
    pub privileged: bool,
    /// Requested host bindings per container port.
    #[serde(deserialize_with = "nullable_values::deserialize")]
    pub port_bindings: PortMap,
    /// Links to other containers, as `name:alias`.
    #[serde(deserialize_with = "null_default")]
    pub links: Vec<String>,
    /// Publish every exposed port on an allocated host port.
    pub publish_all_ports: bool,
}

/// A raw runtime option.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct KeyValuePair {
    /// Option name.
    pub key: String,
    /// Option value.
    pub value: String,
}

/// A parsed bind-mount specification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindMount {
    /// Path on the host.
    pub host_path: String,
    /// Mount point inside the container.
    pub container_path: String,
    /// Whether the mount is writable.
    pub read_write: bool,
}

impl BindMount {
    /// Parses a `host-path:container-path[:mode]` spec; mode is `rw` or `ro`.
    ///
    /// # Errors
    ///
    /// Returns [`DockyardError::Format`] if the spec is malformed.
    pub fn parse(spec: &str) -> Result<Self> {
        let parts: Vec<&str> = spec.split(':').collect();
        let (host, container, read_write) = match parts.as_slice() {
            [host, container] => (*host, *container, true),
            [host, container, "rw"] => (*host, *container, true),
            [host, container, "ro"] => (*host, *container, false),
            [_, _, _] => return Err(DockyardError::format(spec, "bind mode must be rw or ro")),
            _ => return Err(DockyardError::format(spec, "expected host-path:container-path[:mode]")),
        };
        if host.is_empty() || container.is_empty() {
            return Err(DockyardError::format(spec, "bind paths must not be empty"));
        }
        Ok(Self {
            host_path: host.to_string(),
            container_path: container.to_string(),
            read_write,
        })
    }
}

impl HostConfig {
    /// Parses every bind spec.
    ///
    /// # Errors
    ///
    /// Returns the first malformed spec as [`DockyardError::Format`].
    pub fn bind_mounts(&self) -> Result<Vec<BindMount>> {
        self.binds.iter().map(|b| BindMount::parse(b)).collect()
    }

    /// Bindings to request from the runtime for the given exposed ports.
    ///
    /// Explicit bindings are kept as is. With `publish_all_ports`, every
    /// exposed port without one gets a single empty binding, meaning "any
    /// address, allocate a host port".
    #[must_use]
    pub fn requested_bindings(&self, exposed: &PortSet) -> PortMap {
        let mut bindings = self.port_bindings.clone();
        if self.publish_all_ports {
            for port in exposed {
                let entry = bindings.entry(port.clone()).or_default();
                if entry.is_empty() {
                    entry.push(crate::port::PortBinding::default());
                }
            }
        }
        bindings
    }
}
