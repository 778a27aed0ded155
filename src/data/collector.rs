//! Collection pass over pre-fetched command output and files.

use crate::config::CollectorConfig;
use crate::data::bridge_catalog::{BridgeCatalog, parse_ovs_vsctl_show};
use crate::data::commands::register_netns_commands;
use crate::data::libvirt::{Instances, parse_with_name_tag};
use crate::data::linux_bridge::parse_brctl_show;
use crate::data::{env_file, host};
use crate::domain::{BridgeTable, CommandTable, Environment, TapDevice};
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Where the scheduler left the raw inputs for this pass.
/// Sources left as `None` are not collected.
#[derive(Debug, Clone, Default)]
pub struct CollectorSources {
    /// Shell-export file (e.g. admin-openrc.sh)
    pub env_file: Option<PathBuf>,
    /// Concatenated `virsh dumpxml` output
    pub libvirt_xml: Option<PathBuf>,
    /// `brctl show` output
    pub brctl_show: Option<PathBuf>,
    /// `ovs-vsctl show` output
    pub ovs_vsctl_show: Option<PathBuf>,
    /// `ip netns list` output
    pub netns_list: Option<PathBuf>,
}

/// Everything gathered from one node in one pass
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HostSnapshot {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    pub env: Environment,
    pub commands: CommandTable,
    pub linux_bridges: BridgeTable,
    pub ovs_bridges: BridgeCatalog,
    pub instances: Instances,
    pub missing_tap_devices: Vec<TapDevice>,
}

/// Collects hypervisor network state from local sources
pub struct HostCollector {
    config: CollectorConfig,
}

impl HostCollector {
    pub fn new(config: CollectorConfig) -> Self {
        Self { config }
    }

    /// Runs every parser whose source is present.
    /// Unreadable sources fail the pass; malformed lines never do.
    pub fn collect(&self, sources: &CollectorSources) -> Result<HostSnapshot> {
        let env = match &sources.env_file {
            Some(path) => env_file::get_env(path)?,
            None => Environment::new(),
        };

        let mut commands = CommandTable::new();
        if let Some(path) = &sources.netns_list {
            let output = read_source(path)?;
            register_netns_commands(&mut commands, output.lines(), &self.config.netns_command);
        }

        let mut linux_bridges = BridgeTable::new();
        if let Some(path) = &sources.brctl_show {
            let output = read_source(path)?;
            parse_brctl_show(&mut linux_bridges, output.lines());
        }

        let mut ovs_bridges = self.config.bridge_catalog();
        if let Some(path) = &sources.ovs_vsctl_show {
            let output = read_source(path)?;
            parse_ovs_vsctl_show(&mut ovs_bridges, output.lines());
        }

        let instances = match &sources.libvirt_xml {
            Some(path) => {
                let output = read_source(path)?;
                parse_with_name_tag(output.lines(), &self.config.name_tag)
            }
            None => Instances::new(),
        };

        let missing_tap_devices = if instances.is_empty() {
            Vec::new()
        } else {
            match host::interface_names() {
                Ok(present) => host::missing_tap_devices(instances.values(), &present),
                Err(e) => {
                    // Without the host view every tap would look missing
                    warn!(error = %e, "Skipping tap device check");
                    Vec::new()
                }
            }
        };

        let hostname = host::hostname()
            .inspect_err(|e| warn!(error = %e, "Hostname unavailable"))
            .ok();

        let incomplete = instances.values().filter(|vm| !vm.is_complete()).count();
        info!(
            env = env.len(),
            commands = commands.len(),
            linux_bridges = linux_bridges.len(),
            instances = instances.len(),
            incomplete,
            missing_taps = missing_tap_devices.len(),
            "Collection pass finished"
        );

        Ok(HostSnapshot {
            hostname,
            env,
            commands,
            linux_bridges,
            ovs_bridges,
            instances,
            missing_tap_devices,
        })
    }
}

impl Default for HostCollector {
    fn default() -> Self {
        Self::new(CollectorConfig::default())
    }
}

fn read_source(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}
