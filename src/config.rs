//! Collector configuration loaded from a JSON file.

use crate::data::bridge_catalog::BridgeCatalog;
use crate::data::commands::DEFAULT_NETNS_COMMAND;
use crate::data::libvirt::DEFAULT_NAME_TAG;
use crate::domain::{BridgeEntry, BridgeName};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Tunables for a collection pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    /// Bridge catalog override; empty keeps the compiled-in catalog
    pub bridges: BTreeMap<BridgeName, BridgeEntry>,
    /// Libvirt metadata tag holding the VM display name
    pub name_tag: String,
    /// Command template run per network namespace, `{ns}` is substituted
    pub netns_command: String,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            bridges: BTreeMap::new(),
            name_tag: DEFAULT_NAME_TAG.to_string(),
            netns_command: DEFAULT_NETNS_COMMAND.to_string(),
        }
    }
}

impl CollectorConfig {
    /// Loads configuration from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        Self::from_json(&content).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(content).context("Failed to parse collector config")?;
        if config.name_tag.trim().is_empty() {
            anyhow::bail!("name_tag must not be empty");
        }
        Ok(config)
    }

    /// Catalog to gate OVS bridges with
    pub fn bridge_catalog(&self) -> BridgeCatalog {
        if self.bridges.is_empty() {
            BridgeCatalog::builtin()
        } else {
            BridgeCatalog::from_entries(self.bridges.clone())
        }
    }
}
