//! Parsers for hypervisor sources and the collection pass built on them.

pub mod bridge_catalog;
pub mod collector;
pub mod commands;
pub mod env_file;
pub mod host;
pub mod libvirt;
pub mod linux_bridge;

pub use bridge_catalog::{BridgeCatalog, get_bridge_entry, parse_ovs_vsctl_show};
pub use collector::*;
pub use commands::{add_new_command, register_netns_commands};
pub use env_file::{get_env, parse_env};
pub use libvirt::{Instances, LibvirtInstanceParser, ScanState, libvirt_instance_parser};
pub use linux_bridge::{parse_brctl_show, record_linuxbridge};
