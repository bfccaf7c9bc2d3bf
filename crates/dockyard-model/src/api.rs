//! Summary views served to remote clients.
//!
//! These are projections built on demand from the authoritative records.
//! Nothing here is persisted and nothing converts back into a record.

use chrono::{DateTime, Utc};
use dockyard_common::config::DockyardConfig;
use dockyard_common::constants::MAX_IMAGE_DEPTH;
use dockyard_common::types::ImageId;
use serde::{Deserialize, Serialize};

use crate::container::Container;
use crate::image::Image;
use crate::serde_helpers::is_zero;

/// One row of the container list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct APIContainers {
    /// Container identity.
    #[serde(rename = "Id")]
    pub id: String,
    /// Image as the client should see it, a tag when one is known.
    pub image: String,
    /// Entrypoint and arguments joined by spaces.
    pub command: String,
    /// Creation time in seconds since the epoch.
    pub created: i64,
    /// Status line, see [`State::status_text`](crate::state::State::status_text).
    pub status: String,
    /// Realized port bindings.
    pub ports: Vec<APIPort>,
    /// Bytes written to the container's writable layer.
    pub size_rw: i64,
    /// Total size of the container root filesystem.
    pub size_root_fs: i64,
    /// Names the container is reachable under.
    pub names: Vec<String>,
}

/// A single published port in a container listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct APIPort {
    /// Port inside the container.
    pub private_port: i64,
    /// Port on the host, 0 when not published.
    pub public_port: i64,
    /// Protocol.
    #[serde(rename = "Type")]
    pub port_type: String,
    /// Host address the port is bound on.
    #[serde(rename = "IP")]
    pub ip: String,
}

/// One row of the image list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct APIImages {
    /// Image identity.
    #[serde(rename = "Id")]
    pub id: String,
    /// `repository:tag` names pointing at the image.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub repo_tags: Vec<String>,
    /// Creation time in seconds since the epoch.
    pub created: i64,
    /// Size of the image's own layer.
    pub size: i64,
    /// Size of the image and all of its parents.
    pub virtual_size: i64,
    /// Parent identity, absent for base images.
    #[serde(rename = "ParentId", default, skip_serializing_if = "String::is_empty")]
    pub parent_id: String,
}

/// Daemon-wide information.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
#[allow(clippy::struct_excessive_bools)]
pub struct APIInfo {
    /// Daemon runs in debug mode.
    pub debug: bool,
    /// Number of containers known to the daemon.
    pub containers: usize,
    /// Number of images known to the daemon.
    pub images: usize,
    /// Storage driver name.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub driver: String,
    /// Driver-specific key/value status lines.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub driver_status: Vec<[String; 2]>,
    /// Open file descriptors in the daemon.
    #[serde(rename = "NFd", default, skip_serializing_if = "is_zero")]
    pub n_fd: i64,
    /// Concurrent tasks in the daemon.
    #[serde(rename = "NGoroutines", default, skip_serializing_if = "is_zero")]
    pub n_goroutines: i64,
    /// Memory limits are supported.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub memory_limit: bool,
    /// Swap limits are supported.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub swap_limit: bool,
    /// IPv4 forwarding is enabled.
    #[serde(rename = "IPv4Forwarding", default, skip_serializing_if = "is_zero")]
    pub ipv4_forwarding: bool,
    /// Low-level runtime version.
    #[serde(rename = "LXCVersion", default, skip_serializing_if = "String::is_empty")]
    pub lxc_version: String,
    /// Clients subscribed to the event stream.
    #[serde(rename = "NEventsListener", default, skip_serializing_if = "is_zero")]
    pub n_events_listener: i64,
    /// Running kernel version.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kernel_version: String,
    /// Registry index advertised to clients.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub index_server_address: String,
}

/// Per-request inputs for [`APIContainers::project`] that the record does
/// not carry.
#[derive(Debug, Clone)]
pub struct ContainerListing {
    /// Image name to display; empty falls back to the configured image.
    pub image: String,
    /// Names to report; empty falls back to the container's own name.
    pub names: Vec<String>,
    /// `(SizeRw, SizeRootFs)` when sizes were requested.
    pub size: Option<(i64, i64)>,
    /// Reference time for the status line.
    pub now: DateTime<Utc>,
}

impl ContainerListing {
    /// A listing with no overrides, evaluated at `now`.
    #[must_use]
    pub const fn at(now: DateTime<Utc>) -> Self {
        Self {
            image: String::new(),
            names: Vec::new(),
            size: None,
            now,
        }
    }
}

/// Live daemon counters that are not part of any record.
#[derive(Debug, Clone, Default)]
pub struct RuntimeCounters {
    /// Open file descriptors.
    pub open_files: i64,
    /// Concurrent tasks.
    pub tasks: i64,
    /// Event stream subscribers.
    pub event_listeners: i64,
    /// Driver status lines.
    pub driver_status: Vec<[String; 2]>,
}

impl APIContainers {
    /// Projects a container into a list row.
    #[must_use]
    pub fn project(container: &Container, listing: &ContainerListing) -> Self {
        let image = if !listing.image.is_empty() {
            listing.image.clone()
        } else if !container.config().image.is_empty() {
            container.config().image.clone()
        } else {
            container.image().to_string()
        };
        let names = if listing.names.is_empty() {
            vec![container.name().to_string()]
        } else {
            listing.names.clone()
        };
        let (size_rw, size_root_fs) = listing.size.unwrap_or_default();
        Self {
            id: container.id().to_string(),
            image,
            command: display_command(container.path(), container.args()),
            created: container.created().timestamp(),
            status: container.state().status_text(listing.now),
            ports: container.network_settings().port_mapping_api(),
            size_rw,
            size_root_fs,
            names,
        }
    }
}

fn display_command(path: &str, args: &[String]) -> String {
    std::iter::once(path)
        .chain(args.iter().map(String::as_str))
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

impl APIImages {
    /// Projects an image into a list row.
    #[must_use]
    pub fn project(image: &Image, repo_tags: Vec<String>, virtual_size: i64) -> Self {
        Self {
            id: image.id().to_string(),
            repo_tags,
            created: image.created().timestamp(),
            size: image.size(),
            virtual_size,
            parent_id: image.parent().to_string(),
        }
    }
}

/// Sums the layer sizes of `image` and its ancestors.
///
/// `lookup` resolves a parent identity; the walk stops at the first parent it
/// cannot resolve and after [`MAX_IMAGE_DEPTH`] layers.
pub fn virtual_size<F>(image: &Image, mut lookup: F) -> i64
where
    F: FnMut(&ImageId) -> Option<Image>,
{
    let mut total = image.size();
    let mut parent = image.parent().clone();
    let mut depth = 1;
    while !parent.is_empty() {
        if depth >= MAX_IMAGE_DEPTH {
            tracing::warn!(id = %image.id(), depth, "image chain too deep, virtual size truncated");
            break;
        }
        let Some(ancestor) = lookup(&parent) else {
            tracing::debug!(id = %image.id(), missing = %parent, "parent image not found");
            break;
        };
        total = total.saturating_add(ancestor.size());
        parent = ancestor.parent().clone();
        depth += 1;
    }
    total
}

impl APIInfo {
    /// Builds the daemon summary.
    #[must_use]
    pub fn project(
        containers: usize,
        images: usize,
        config: &DockyardConfig,
        counters: &RuntimeCounters,
    ) -> Self {
        Self {
            debug: config.debug,
            containers,
            images,
            driver: config.driver.clone(),
            driver_status: counters.driver_status.clone(),
            n_fd: counters.open_files,
            n_goroutines: counters.tasks,
            memory_limit: config.host.memory_limit,
            swap_limit: config.host.swap_limit,
            ipv4_forwarding: config.host.ipv4_forwarding,
            lxc_version: config.host.lxc_version.clone(),
            n_events_listener: counters.event_listeners,
            kernel_version: config.host.kernel_version.clone(),
            index_server_address: config.index_server_address.clone(),
        }
    }
}
