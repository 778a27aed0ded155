//! Catalog of OVS bridges the collector knows how to interpret, and the
//! `ovs-vsctl show` parser that fills in their ports.
//!
//! Lookups of names outside the catalog yield `None`. Callers skip such
//! bridges instead of assuming an empty descriptor.

use crate::domain::{BridgeEntry, BridgeName, InterfaceName, OvsInterface, PortName};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Bridges created by the networking agents on every node
pub const BUILTIN_BRIDGES: [&str; 3] = ["br-ex", "br-int", "br-tun"];

/// Recognised bridge name -> descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BridgeCatalog(BTreeMap<BridgeName, BridgeEntry>);

impl BridgeCatalog {
    /// Compiled-in catalog with an empty descriptor per built-in bridge
    pub fn builtin() -> Self {
        Self(
            BUILTIN_BRIDGES
                .iter()
                .map(|name| (BridgeName::new(*name), BridgeEntry::new()))
                .collect(),
        )
    }

    /// Catalog from injected `{name: descriptor}` entries
    pub fn from_entries(entries: BTreeMap<BridgeName, BridgeEntry>) -> Self {
        Self(entries)
    }

    pub fn lookup(&self, name: &str) -> Option<&BridgeEntry> {
        self.0.get(&BridgeName::new(name))
    }

    pub fn lookup_mut(&mut self, name: &str) -> Option<&mut BridgeEntry> {
        self.0.get_mut(&BridgeName::new(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &BridgeName> {
        self.0.keys()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for BridgeCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Looks `name` up in the compiled-in catalog
pub fn get_bridge_entry(name: &str) -> Option<BridgeEntry> {
    let entry = BridgeCatalog::builtin().lookup(name).cloned();
    if entry.is_none() {
        debug!(bridge = name, "Bridge not in catalog");
    }
    entry
}

/// Parses `ovs-vsctl show` output and stores the ports of every
/// catalogued bridge. Ports of other bridges are skipped.
/// Returns the number of ports stored.
pub fn parse_ovs_vsctl_show<'a, I>(catalog: &mut BridgeCatalog, lines: I) -> usize
where
    I: IntoIterator<Item = &'a str>,
{
    let mut bridge: Option<BridgeName> = None;
    let mut port: Option<PortName> = None;
    let mut stored = 0;

    for line in lines {
        let line = line.trim();
        let (keyword, rest) = match line.split_once(char::is_whitespace) {
            Some((keyword, rest)) => (keyword, unquote(rest.trim())),
            None => continue,
        };

        match keyword {
            "Bridge" => {
                port = None;
                if catalog.contains(rest) {
                    bridge = Some(BridgeName::new(rest));
                } else {
                    warn!(bridge = rest, "Skipping ports of unknown bridge");
                    bridge = None;
                }
            }
            "Port" => {
                port = None;
                let Some(entry) = bridge.as_ref().and_then(|b| catalog.lookup_mut(b.as_str())) else {
                    continue;
                };
                let name = PortName::new(rest);
                entry.ports.insert(name.clone(), Default::default());
                port = Some(name);
                stored += 1;
            }
            "tag:" => {
                let Some(entry) = current_port(catalog, &bridge, &port) else {
                    continue;
                };
                match rest.parse::<u16>() {
                    Ok(tag) => entry.tag = Some(tag),
                    Err(_) => warn!(tag = rest, "Ignoring invalid VLAN tag"),
                }
            }
            "Interface" => {
                if let Some(entry) = current_port(catalog, &bridge, &port) {
                    entry.interfaces.push(OvsInterface {
                        name: InterfaceName::new(rest),
                        kind: None,
                    });
                }
            }
            "type:" => {
                if let Some(iface) =
                    current_port(catalog, &bridge, &port).and_then(|entry| entry.interfaces.last_mut())
                {
                    iface.kind = Some(rest.to_string());
                }
            }
            _ => {}
        }
    }

    stored
}

fn current_port<'c>(
    catalog: &'c mut BridgeCatalog,
    bridge: &Option<BridgeName>,
    port: &Option<PortName>,
) -> Option<&'c mut crate::domain::PortEntry> {
    let bridge = bridge.as_ref()?;
    let port = port.as_ref()?;
    catalog.lookup_mut(bridge.as_str())?.ports.get_mut(port)
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}
