//! Host-side collector for hypervisor networking state.
//!
//! Parses environment files, linux bridge and OVS topology, and libvirt
//! domain descriptors that a scheduler has already fetched, and turns
//! them into typed mappings for the reporting layer.

pub mod config;
pub mod data;
pub mod display;
pub mod domain;

pub use config::CollectorConfig;
pub use data::{
    CollectorSources, HostCollector, HostSnapshot, add_new_command, get_bridge_entry, get_env,
    libvirt_instance_parser, record_linuxbridge,
};
pub use display::{CollectorReport, ReportFormatter};
