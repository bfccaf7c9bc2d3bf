//! Port codec: the `<number>/<protocol>` token used as a map key wherever
//! ports appear in the model.
//!
//! The token string is the sole identity of a [`Port`]; equality, ordering
//! and hashing all compare the token. Decoding requires the number part to be
//! the canonical decimal form of a `u16`, so that `encode` and `decode` are
//! exact inverses and distinct `(number, protocol)` pairs never share a token.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use dockyard_common::constants::DEFAULT_PROTOCOL;
use dockyard_common::error::{DockyardError, Result};
use serde::{Deserialize, Serialize};

/// A `(number, protocol)` pair identified by its canonical token.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Port {
    token: String,
    number: u16,
}

/// Set of ports (exposed ports).
pub type PortSet = BTreeSet<Port>;

/// Ports mapped to the host bindings requested or realized for them.
pub type PortMap = BTreeMap<Port, Vec<PortBinding>>;

/// Encodes a port number and protocol into a [`Port`].
///
/// No validation is applied to the protocol; any token is accepted.
#[must_use]
pub fn encode(number: u16, protocol: &str) -> Port {
    Port {
        token: format!("{number}/{protocol}"),
        number,
    }
}

/// Decodes a port token into its number and protocol.
///
/// Splits on the first `/`; everything after it is the protocol.
///
/// # Errors
///
/// Returns [`DockyardError::Format`] if the separator is missing or the
/// number part is not a canonical decimal `u16`.
pub fn decode(token: &str) -> Result<(u16, String)> {
    let (number, protocol) = token
        .split_once('/')
        .ok_or_else(|| DockyardError::format(token, "missing '/' separator"))?;
    Ok((parse_number(number, token)?, protocol.to_string()))
}

fn parse_number(raw: &str, token: &str) -> Result<u16> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(DockyardError::format(token, "port number is not a decimal integer"));
    }
    if raw.len() > 1 && raw.starts_with('0') {
        return Err(DockyardError::format(token, "port number has leading zeros"));
    }
    raw.parse()
        .map_err(|_| DockyardError::format(token, "port number out of range"))
}

impl Port {
    /// Creates a port from its components; same as [`encode`].
    #[must_use]
    pub fn new(number: u16, protocol: &str) -> Self {
        encode(number, protocol)
    }

    /// Creates a TCP port.
    #[must_use]
    pub fn tcp(number: u16) -> Self {
        encode(number, "tcp")
    }

    /// Validates and wraps an existing token.
    ///
    /// # Errors
    ///
    /// Returns [`DockyardError::Format`] if the token does not decode.
    pub fn parse(token: &str) -> Result<Self> {
        let (number, _) = decode(token)?;
        Ok(Self {
            token: token.to_string(),
            number,
        })
    }

    /// Port number.
    #[must_use]
    pub const fn number(&self) -> u16 {
        self.number
    }

    /// Protocol token, e.g. `tcp`.
    #[must_use]
    pub fn proto(&self) -> &str {
        self.token
            .split_once('/')
            .map_or("", |(_, protocol)| protocol)
    }

    /// The canonical token.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.token
    }

    /// Splits the port back into its components.
    #[must_use]
    pub fn decode(&self) -> (u16, String) {
        (self.number, self.proto().to_string())
    }
}

impl PartialEq for Port {
    fn eq(&self, other: &Self) -> bool {
        self.token == other.token
    }
}

impl Eq for Port {}

impl PartialOrd for Port {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Port {
    fn cmp(&self, other: &Self) -> Ordering {
        self.token.cmp(&other.token)
    }
}

impl Hash for Port {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.token.hash(state);
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.token)
    }
}

impl FromStr for Port {
    type Err = DockyardError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Port {
    type Error = DockyardError;

    fn try_from(token: String) -> Result<Self> {
        let (number, _) = decode(&token)?;
        Ok(Self { token, number })
    }
}

impl From<Port> for String {
    fn from(port: Port) -> Self {
        port.token
    }
}

/// A host address/port pair a container port is (or should be) published on.
///
/// Empty fields mean "any address" and "allocate a port" respectively.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortBinding {
    /// Host interface address.
    #[serde(rename = "HostIp", default)]
    pub host_ip: String,
    /// Host port, kept as a string as the wire format does.
    #[serde(rename = "HostPort", default)]
    pub host_port: String,
}

impl PortBinding {
    /// Binding on a specific host port, on all interfaces.
    #[must_use]
    pub fn published(port: u16) -> Self {
        Self {
            host_ip: String::new(),
            host_port: port.to_string(),
        }
    }

    /// Host port as a number, if one was assigned.
    #[must_use]
    pub fn host_port_number(&self) -> Option<u16> {
        self.host_port.parse().ok()
    }
}

/// Parses legacy `PortSpecs` entries into exposed ports and bindings.
///
/// Accepted forms, each with an optional `/proto` suffix (default `tcp`):
/// `port`, `hostPort:port`, `ip:hostPort:port` and `ip::port`. Every spec
/// yields one binding, empty fields included, in input order.
///
/// # Errors
///
/// Returns [`DockyardError::Format`] on the first malformed spec.
pub fn parse_port_specs(specs: &[String]) -> Result<(PortSet, PortMap)> {
    let mut exposed = PortSet::new();
    let mut bindings = PortMap::new();
    for spec in specs {
        let (port, binding) = parse_port_spec(spec)?;
        let _ = exposed.insert(port.clone());
        bindings.entry(port).or_default().push(binding);
    }
    Ok((exposed, bindings))
}

/// Parses a single legacy port spec.
///
/// # Errors
///
/// Returns [`DockyardError::Format`] if the spec is malformed.
pub fn parse_port_spec(spec: &str) -> Result<(Port, PortBinding)> {
    let (raw, protocol) = spec
        .rsplit_once('/')
        .unwrap_or((spec, DEFAULT_PROTOCOL));

    let parts: Vec<&str> = raw.split(':').collect();
    let (host_ip, host_port, container_port) = match parts.as_slice() {
        [container] => ("", "", *container),
        [host_port, container] => ("", *host_port, *container),
        [ip, host_port, container] => (*ip, *host_port, *container),
        _ => return Err(DockyardError::format(spec, "too many ':' separated parts")),
    };

    if container_port.is_empty() {
        return Err(DockyardError::format(spec, "no container port specified"));
    }
    let number: u16 = container_port
        .parse()
        .map_err(|_| DockyardError::format(spec, "invalid container port"))?;
    if !host_port.is_empty() && host_port.parse::<u16>().is_err() {
        return Err(DockyardError::format(spec, "invalid host port"));
    }

    Ok((
        encode(number, protocol),
        PortBinding {
            host_ip: host_ip.to_string(),
            host_port: host_port.to_string(),
        },
    ))
}
