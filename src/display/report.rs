//! JSON report handed to the reporting layer.

use crate::data::HostSnapshot;
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Environment names whose values never leave the node
const SECRET_MARKERS: [&str; 3] = ["PASSWORD", "TOKEN", "SECRET"];

const MASK: &str = "********";

/// Counters shown next to the snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub instances: usize,
    pub complete_instances: usize,
    pub linux_bridges: usize,
    pub ovs_ports: usize,
    pub commands: usize,
    pub missing_tap_devices: usize,
}

/// Report document
#[derive(Debug, Clone, Serialize)]
pub struct CollectorReport {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<ReportSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<HostSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Formats snapshots as report documents
pub struct ReportFormatter {
    pretty: bool,
}

impl ReportFormatter {
    pub fn new() -> Self {
        Self { pretty: false }
    }

    /// Emit indented JSON
    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// Builds the report for a finished pass, masking secrets
    pub fn format(&self, snapshot: &HostSnapshot) -> CollectorReport {
        let mut snapshot = snapshot.clone();
        for (name, value) in snapshot.env.iter_mut() {
            if is_secret(name) {
                *value = MASK.to_string();
            }
        }

        CollectorReport {
            status: "ok".to_string(),
            summary: Some(summarize(&snapshot)),
            snapshot: Some(snapshot),
            error: None,
        }
    }

    /// Report for a pass that failed
    pub fn create_error_output(error: anyhow::Error) -> CollectorReport {
        CollectorReport {
            status: "error".to_string(),
            summary: None,
            snapshot: None,
            error: Some(format!("{:#}", error)),
        }
    }

    pub fn to_json(&self, report: &CollectorReport) -> Result<String> {
        let json = if self.pretty {
            serde_json::to_string_pretty(report)?
        } else {
            serde_json::to_string(report)?
        };
        Ok(json)
    }
}

impl Default for ReportFormatter {
    fn default() -> Self {
        Self::new()
    }
}

fn is_secret(name: &str) -> bool {
    let upper = name.to_uppercase();
    SECRET_MARKERS.iter().any(|marker| upper.contains(marker))
}

fn summarize(snapshot: &HostSnapshot) -> ReportSummary {
    ReportSummary {
        instances: snapshot.instances.len(),
        complete_instances: snapshot.instances.values().filter(|vm| vm.is_complete()).count(),
        linux_bridges: snapshot.linux_bridges.len(),
        ovs_ports: snapshot
            .ovs_bridges
            .names()
            .filter_map(|name| snapshot.ovs_bridges.lookup(name.as_str()))
            .map(|entry| entry.ports.len())
            .sum(),
        commands: snapshot.commands.len(),
        missing_tap_devices: snapshot.missing_tap_devices.len(),
    }
}
