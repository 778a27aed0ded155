//! Accumulators built up across collection passes.
//!
//! The two tables have different merge policies and expose them under
//! different names: the command table only ever inserts missing keys,
//! the bridge table always overwrites.

use crate::domain::{BridgeName, BridgeRecord, CommandKey, CommandSpec, Interfaces};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

/// Deduplicated command table keyed by command key
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommandTable(BTreeMap<CommandKey, CommandSpec>);

impl CommandTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `spec` under `key` unless the key is already registered.
    /// Returns true if the table changed.
    pub fn insert_if_absent(&mut self, key: CommandKey, spec: CommandSpec) -> bool {
        match self.0.entry(key) {
            Entry::Vacant(slot) => {
                slot.insert(spec);
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    pub fn get(&self, key: &CommandKey) -> Option<&CommandSpec> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &CommandKey) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Linux bridge -> interfaces table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BridgeTable(BTreeMap<BridgeName, BridgeRecord>);

impl BridgeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the interfaces of `bridge`, replacing any previous record.
    /// Returns the replaced record.
    pub fn upsert(&mut self, bridge: BridgeName, interfaces: Interfaces) -> Option<BridgeRecord> {
        self.0.insert(bridge, BridgeRecord { interfaces })
    }

    pub fn get(&self, bridge: &BridgeName) -> Option<&BridgeRecord> {
        self.0.get(bridge)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
