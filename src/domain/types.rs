//! Type-safe domain models for hypervisor network state.
//!
//! Identifiers scraped from command output are wrapped in newtypes so a
//! bridge name can never be handed to something expecting a tap device.
//! Records mirror the shapes the reporting layer consumes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Prefix nova uses for the per-port linux bridge in hybrid OVS setups
pub const QBR_PREFIX: &str = "qbr";

/// Prefix of the tap device that pairs with a `qbr` bridge
pub const TAP_PREFIX: &str = "tap";

/// Flat name -> value mapping read from an environment file
pub type Environment = BTreeMap<String, String>;

/// Bridge name (e.g., "br-ex", "qbrb0f5cfc8-4d")
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BridgeName(String);

impl BridgeName {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BridgeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Network interface name (e.g., "eth0", "qvb6ce314cb-a5")
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InterfaceName(String);

impl InterfaceName {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InterfaceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// OVS port name
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PortName(String);

impl PortName {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PortName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// VM display name as set by the compute service
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VmName(String);

impl VmName {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VmName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Libvirt domain UUID, kept verbatim as found in the descriptor
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstanceUuid(String);

impl InstanceUuid {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InstanceUuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Tap device a VM is plugged into
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TapDevice(String);

impl TapDevice {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Derives the tap device from a `qbr<suffix>` bridge: `tap<suffix>`.
    /// The suffix is kept byte for byte, including the truncation nova
    /// applies to port ids. Bridges without the prefix have no tap pair.
    pub fn from_bridge(bridge: &BridgeName) -> Option<Self> {
        let suffix = bridge.as_str().strip_prefix(QBR_PREFIX)?;
        if suffix.is_empty() {
            return None;
        }
        Some(Self(format!("{}{}", TAP_PREFIX, suffix)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TapDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Key under which a command is registered (e.g., "netns_qrouter-...")
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CommandKey(String);

impl CommandKey {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CommandKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Shell command descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    /// Shell command line
    pub cmd: String,
    /// Short description shown next to the output
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
}

impl CommandSpec {
    pub fn new(cmd: impl Into<String>) -> Self {
        Self {
            cmd: cmd.into(),
            help: None,
        }
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }
}

/// Interfaces attached to a linux bridge.
///
/// Callers pick the representation; the recorder stores it untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Interfaces {
    /// Raw delimited text, e.g. "eth0" or "qvb1 tap1"
    Delimited(String),
    /// One entry per interface
    List(Vec<InterfaceName>),
}

impl Interfaces {
    /// Interface names regardless of representation.
    /// Delimited text is split on whitespace and commas.
    pub fn names(&self) -> Vec<&str> {
        match self {
            Interfaces::Delimited(text) => text
                .split(|c: char| c.is_whitespace() || c == ',')
                .filter(|s| !s.is_empty())
                .collect(),
            Interfaces::List(list) => list.iter().map(InterfaceName::as_str).collect(),
        }
    }
}

impl From<&str> for Interfaces {
    fn from(value: &str) -> Self {
        Interfaces::Delimited(value.to_string())
    }
}

impl From<Vec<InterfaceName>> for Interfaces {
    fn from(value: Vec<InterfaceName>) -> Self {
        Interfaces::List(value)
    }
}

/// Linux bridge entry in the bridge table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeRecord {
    pub interfaces: Interfaces,
}

/// Interface hanging off an OVS port
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OvsInterface {
    pub name: InterfaceName,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

/// OVS port with its VLAN tag and interfaces
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<u16>,
    #[serde(default)]
    pub interfaces: Vec<OvsInterface>,
}

/// Descriptor of a recognised OVS bridge: `{ports: {...}}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeEntry {
    #[serde(default)]
    pub ports: BTreeMap<PortName, PortEntry>,
}

impl BridgeEntry {
    pub fn new() -> Self {
        Self::default()
    }
}

/// One VM as found in libvirt domain descriptors
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmInstance {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<InstanceUuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src_bridge: Option<BridgeName>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tap_dev: Option<TapDevice>,
}

impl VmInstance {
    pub fn new(uuid: Option<InstanceUuid>) -> Self {
        Self {
            uuid,
            src_bridge: None,
            tap_dev: None,
        }
    }

    /// Sets the source bridge and the tap device derived from it
    pub fn attach_bridge(&mut self, bridge: BridgeName) {
        self.tap_dev = TapDevice::from_bridge(&bridge);
        self.src_bridge = Some(bridge);
    }

    /// True once uuid, bridge and tap device are all known
    pub fn is_complete(&self) -> bool {
        self.uuid.is_some() && self.src_bridge.is_some() && self.tap_dev.is_some()
    }
}
