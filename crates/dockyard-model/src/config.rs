//! Portable container configuration.
//!
//! A [`Config`] holds only what is independent of the host a container runs
//! on; host-specific settings live in [`HostConfig`](crate::host_config::HostConfig).
//! The same value is copied into images, so it must stay host-agnostic.

use std::collections::BTreeSet;

use dockyard_common::error::{DockyardError, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::port::{self, PortSet};
use crate::serde_helpers::{marker_set, null_default};

/// Portable per-container configuration.
///
/// `exposed_ports` and `volumes` are presence-only sets, written as maps to
/// `{}`. The deprecated `PortSpecs` list is read from old records and folded
/// into `exposed_ports`; it is never written.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(remote = "Self", rename_all = "PascalCase", default)]
pub struct Config {
    /// Container hostname.
    pub hostname: String,
    /// Container domain name.
    pub domainname: String,
    /// User (name or uid) the process runs as.
    pub user: String,
    /// Memory limit in bytes; `0` means unlimited.
    pub memory: i64,
    /// Total memory plus swap in bytes; `-1` disables the swap limit.
    pub memory_swap: i64,
    /// CPU shares, relative to other containers.
    pub cpu_shares: i64,
    /// Attach the client to stdin.
    pub attach_stdin: bool,
    /// Attach the client to stdout.
    pub attach_stdout: bool,
    /// Attach the client to stderr.
    pub attach_stderr: bool,
    /// Deprecated free-form port list, e.g. `8080/tcp`.
    #[serde(skip_serializing, deserialize_with = "null_default")]
    port_specs: Vec<String>,
    /// Ports the container exposes.
    #[serde(with = "marker_set")]
    pub exposed_ports: PortSet,
    /// Attach the standard streams to a tty, including stdin if it is open.
    pub tty: bool,
    /// Keep stdin open.
    pub open_stdin: bool,
    /// Close stdin after the first attached client disconnects.
    pub stdin_once: bool,
    /// Environment as `KEY=value` assignments.
    #[serde(deserialize_with = "null_default")]
    pub env: Vec<String>,
    /// Command and arguments.
    #[serde(deserialize_with = "null_default")]
    pub cmd: Vec<String>,
    /// DNS servers.
    #[serde(deserialize_with = "null_default")]
    pub dns: Vec<String>,
    /// Image reference as the operator gave it (may be a tag).
    pub image: String,
    /// Declared volume mount points inside the container.
    #[serde(with = "marker_set")]
    pub volumes: BTreeSet<String>,
    /// Container whose volumes are inherited.
    pub volumes_from: String,
    /// Working directory of the process.
    pub working_dir: String,
    /// Entrypoint overriding the image's.
    #[serde(deserialize_with = "null_default")]
    pub entrypoint: Vec<String>,
    /// Disable networking entirely.
    pub network_disabled: bool,
}

impl Serialize for Config {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        Self::serialize(self, serializer)
    }
}

impl<'de> Deserialize<'de> for Config {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let mut config = Self::deserialize(deserializer)?;
        config.fold_legacy_port_specs();
        Ok(config)
    }
}

impl Config {
    /// Creates a configuration running `cmd` from `image`.
    #[must_use]
    pub fn new(image: impl Into<String>, cmd: Vec<String>) -> Self {
        Self {
            image: image.into(),
            cmd,
            ..Self::default()
        }
    }

    /// Moves legacy `PortSpecs` into `ExposedPorts`.
    ///
    /// `ExposedPorts` is authoritative: when it is already populated the
    /// legacy list is discarded. Malformed legacy entries are dropped.
    fn fold_legacy_port_specs(&mut self) {
        if self.port_specs.is_empty() {
            return;
        }
        let specs = std::mem::take(&mut self.port_specs);
        if !self.exposed_ports.is_empty() {
            tracing::warn!(
                ?specs,
                "ignoring legacy PortSpecs, ExposedPorts is already set"
            );
            return;
        }
        for spec in &specs {
            match port::parse_port_spec(spec) {
                Ok((port, _)) => {
                    let _ = self.exposed_ports.insert(port);
                }
                Err(e) => tracing::warn!(spec = %spec, error = %e, "dropping legacy port spec"),
            }
        }
        tracing::debug!(count = self.exposed_ports.len(), "exposed ports recovered from PortSpecs");
    }

    /// Resolves the executable path and its arguments.
    ///
    /// The entrypoint, if any, runs with `cmd` appended to its own arguments;
    /// otherwise `cmd` runs on its own.
    ///
    /// # Errors
    ///
    /// Returns [`DockyardError::Config`] if neither is set.
    pub fn entrypoint_and_args(&self) -> Result<(String, Vec<String>)> {
        if let Some((path, rest)) = self.entrypoint.split_first() {
            let args = rest.iter().chain(&self.cmd).cloned().collect();
            return Ok((path.clone(), args));
        }
        self.cmd
            .split_first()
            .map(|(path, args)| (path.clone(), args.to_vec()))
            .ok_or_else(|| DockyardError::Config {
                message: "no command specified".to_string(),
            })
    }

    /// Fills unset fields from an image's configuration.
    ///
    /// Scalars are inherited when zero or empty. Exposed ports and volumes
    /// are unioned, environment entries are added for keys not already set,
    /// and DNS servers are appended.
    pub fn inherit_from(&mut self, image: &Self) {
        if self.user.is_empty() {
            self.user.clone_from(&image.user);
        }
        if self.memory == 0 {
            self.memory = image.memory;
        }
        if self.memory_swap == 0 {
            self.memory_swap = image.memory_swap;
        }
        if self.cpu_shares == 0 {
            self.cpu_shares = image.cpu_shares;
        }
        self.exposed_ports.extend(image.exposed_ports.iter().cloned());
        self.tty |= image.tty;
        self.open_stdin |= image.open_stdin;
        self.stdin_once |= image.stdin_once;

        for entry in &image.env {
            let key = env_key(entry);
            if !self.env.iter().any(|own| env_key(own) == key) {
                self.env.push(entry.clone());
            }
        }
        if self.cmd.is_empty() {
            self.cmd.clone_from(&image.cmd);
        }
        self.dns.extend(image.dns.iter().cloned());
        if self.entrypoint.is_empty() {
            self.entrypoint.clone_from(&image.entrypoint);
        }
        if self.working_dir.is_empty() {
            self.working_dir.clone_from(&image.working_dir);
        }
        if self.volumes_from.is_empty() {
            self.volumes_from.clone_from(&image.volumes_from);
        }
        self.volumes.extend(image.volumes.iter().cloned());
    }

    /// Looks up an environment variable.
    #[must_use]
    pub fn env_value(&self, key: &str) -> Option<&str> {
        self.env
            .iter()
            .find(|entry| env_key(entry) == key)
            .map(|entry| entry.split_once('=').map_or("", |(_, v)| v))
    }
}

fn env_key(entry: &str) -> &str {
    entry.split_once('=').map_or(entry, |(k, _)| k)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::port::Port;

    #[test]
    fn memory_fields_are_always_written() {
        let config = Config {
            memory: 0,
            memory_swap: -1,
            ..Config::default()
        };
        let json = serde_json::to_value(&config).expect("serialize");
        assert_eq!(json["Memory"], 0);
        assert_eq!(json["MemorySwap"], -1);
    }

    #[test]
    fn port_specs_are_never_written() {
        let json = serde_json::to_value(Config::default()).expect("serialize");
        assert!(json.get("PortSpecs").is_none());
        assert_eq!(json["ExposedPorts"], json!({}));
    }

    #[test]
    fn field_names_match_wire_format() {
        let json = serde_json::to_value(Config::default()).expect("serialize");
        for key in [
            "Hostname", "Domainname", "User", "CpuShares", "AttachStdin", "Tty", "OpenStdin",
            "StdinOnce", "Env", "Cmd", "Dns", "Image", "Volumes", "VolumesFrom", "WorkingDir",
            "Entrypoint", "NetworkDisabled",
        ] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
    }

    #[test]
    fn legacy_port_specs_populate_exposed_ports() {
        let config: Config = serde_json::from_value(json!({
            "PortSpecs": ["8080:80", "53/udp"],
            "ExposedPorts": null,
        }))
        .expect("parse");
        let expected: PortSet = [Port::tcp(80), Port::new(53, "udp")].into_iter().collect();
        assert_eq!(config.exposed_ports, expected);
        assert!(config.port_specs.is_empty());
    }

    #[test]
    fn exposed_ports_win_over_port_specs() {
        let config: Config = serde_json::from_value(json!({
            "PortSpecs": ["22"],
            "ExposedPorts": {"80/tcp": {}},
        }))
        .expect("parse");
        let expected: PortSet = [Port::tcp(80)].into_iter().collect();
        assert_eq!(config.exposed_ports, expected);
    }

    #[test]
    fn malformed_legacy_specs_are_dropped() {
        let config: Config =
            serde_json::from_value(json!({"PortSpecs": ["http", "443"]})).expect("parse");
        let expected: PortSet = [Port::tcp(443)].into_iter().collect();
        assert_eq!(config.exposed_ports, expected);
    }

    #[test]
    fn malformed_exposed_port_is_an_error() {
        let result: std::result::Result<Config, _> =
            serde_json::from_value(json!({"ExposedPorts": {"eighty": {}}}));
        assert!(result.is_err());
    }

    #[test]
    fn old_record_with_nulls_loads() {
        let config: Config = serde_json::from_value(json!({
            "Hostname": "a1b2",
            "Env": null,
            "Cmd": ["/bin/sh"],
            "Dns": null,
            "Volumes": null,
            "Image": "base",
        }))
        .expect("parse");
        assert_eq!(config.hostname, "a1b2");
        assert!(config.env.is_empty());
        assert!(config.volumes.is_empty());
        assert!(config.entrypoint.is_empty());
        assert!(!config.network_disabled);
    }

    #[test]
    fn entrypoint_prefixes_cmd() {
        let mut config = Config::new("img", vec!["-c".into(), "true".into()]);
        config.entrypoint = vec!["/bin/sh".into(), "-e".into()];
        let (path, args) = config.entrypoint_and_args().expect("resolve");
        assert_eq!(path, "/bin/sh");
        assert_eq!(args, vec!["-e", "-c", "true"]);
    }

    #[test]
    fn cmd_alone_resolves() {
        let config = Config::new("img", vec!["echo".into(), "hi".into()]);
        let (path, args) = config.entrypoint_and_args().expect("resolve");
        assert_eq!(path, "echo");
        assert_eq!(args, vec!["hi"]);
    }

    #[test]
    fn missing_command_is_an_error() {
        assert!(Config::default().entrypoint_and_args().is_err());
    }

    #[test]
    fn inherit_keeps_user_values_and_fills_gaps() {
        let mut user = Config::new("app", Vec::new());
        user.env = vec!["MODE=prod".into()];
        user.memory = 64;
        let _ = user.exposed_ports.insert(Port::tcp(8080));

        let mut image = Config::new("app", vec!["/srv/run".into()]);
        image.env = vec!["MODE=dev".into(), "PATH=/bin".into()];
        image.memory = 128;
        image.working_dir = "/srv".into();
        let _ = image.exposed_ports.insert(Port::tcp(80));
        let _ = image.volumes.insert("/data".into());

        user.inherit_from(&image);
        assert_eq!(user.cmd, vec!["/srv/run"]);
        assert_eq!(user.memory, 64);
        assert_eq!(user.env_value("MODE"), Some("prod"));
        assert_eq!(user.env_value("PATH"), Some("/bin"));
        assert_eq!(user.working_dir, "/srv");
        assert_eq!(user.exposed_ports.len(), 2);
        assert!(user.volumes.contains("/data"));
    }
}
