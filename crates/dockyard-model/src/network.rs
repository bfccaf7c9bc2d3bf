//! Network identity and realized port bindings of a running container.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::api::APIPort;
use crate::port::{Port, PortBinding, PortMap};
use crate::serde_helpers::{null_default, nullable_values};

/// Deprecated flattened mapping: protocol (`Tcp`, `Udp`) to container port
/// to host port.
type LegacyPortMapping = BTreeMap<String, BTreeMap<String, String>>;

/// Network settings assigned by the runtime.
///
/// `ports` holds the bindings actually realized, as opposed to
/// [`HostConfig::port_bindings`](crate::host_config::HostConfig::port_bindings)
/// which holds the request. The legacy `PortMapping` field is only read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(remote = "Self", rename_all = "PascalCase", default)]
pub struct NetworkSettings {
    /// Container address.
    #[serde(rename = "IPAddress")]
    pub ip_address: String,
    /// Prefix length of the container address.
    #[serde(rename = "IPPrefixLen")]
    pub ip_prefix_len: u8,
    /// Default gateway.
    pub gateway: String,
    /// Bridge interface the container is attached to.
    pub bridge: String,
    #[serde(skip_serializing, deserialize_with = "null_default")]
    port_mapping: LegacyPortMapping,
    /// Realized host bindings per container port.
    #[serde(deserialize_with = "nullable_values::deserialize")]
    pub ports: PortMap,
}

impl Serialize for NetworkSettings {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        Self::serialize(self, serializer)
    }
}

impl<'de> Deserialize<'de> for NetworkSettings {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut settings = Self::deserialize(deserializer)?;
        settings.fold_legacy_port_mapping();
        Ok(settings)
    }
}

impl NetworkSettings {
    /// Moves the legacy flattened mapping into `ports`.
    ///
    /// `ports` is authoritative: when it is already populated the legacy
    /// mapping is discarded. Entries whose container port does not parse are
    /// dropped.
    fn fold_legacy_port_mapping(&mut self) {
        if self.port_mapping.is_empty() {
            return;
        }
        let legacy = std::mem::take(&mut self.port_mapping);
        if !self.ports.is_empty() {
            tracing::warn!("ignoring legacy PortMapping, Ports is already set");
            return;
        }
        for (protocol, mapping) in legacy {
            let protocol = protocol.to_ascii_lowercase();
            for (private, public) in mapping {
                let Ok(number) = private.parse::<u16>() else {
                    tracing::warn!(port = %private, "dropping legacy port mapping");
                    continue;
                };
                self.ports
                    .entry(Port::new(number, &protocol))
                    .or_default()
                    .push(PortBinding {
                        host_ip: String::new(),
                        host_port: public,
                    });
            }
        }
        tracing::debug!(count = self.ports.len(), "ports recovered from PortMapping");
    }

    /// Host bindings realized for a container port.
    #[must_use]
    pub fn bindings_for(&self, port: &Port) -> &[PortBinding] {
        self.ports.get(port).map_or(&[], Vec::as_slice)
    }

    /// Flattens the realized bindings for list views.
    ///
    /// A port without bindings yields one entry with no public port.
    #[must_use]
    pub fn port_mapping_api(&self) -> Vec<APIPort> {
        let mut mapping = Vec::new();
        for (port, bindings) in &self.ports {
            let private_port = i64::from(port.number());
            if bindings.is_empty() {
                mapping.push(APIPort {
                    private_port,
                    port_type: port.proto().to_string(),
                    ..APIPort::default()
                });
                continue;
            }
            for binding in bindings {
                mapping.push(APIPort {
                    private_port,
                    public_port: binding.host_port_number().map_or(0, i64::from),
                    port_type: port.proto().to_string(),
                    ip: binding.host_ip.clone(),
                });
            }
        }
        mapping
    }
}
