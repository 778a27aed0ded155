//! ovs-collector - gathers virtualization and networking state from a
//! hypervisor node and prints it as one JSON document.
//!
//! Usage:
//!   ovs-collector --env-file admin-openrc.sh --libvirt-xml dumpxml.txt
//!   ovs-collector --brctl-show brctl.txt --ovs-vsctl-show ovs.txt --pretty
//!   ovs-collector --config collector.json --netns-list netns.txt -v

use anyhow::Result;
use clap::Parser;
use ovs_collector::{CollectorConfig, CollectorSources, HostCollector, ReportFormatter};
use std::path::PathBuf;
use tracing::{Level, error};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::Directive;

/// Hypervisor network state collector.
#[derive(Parser)]
#[command(name = "ovs-collector", about = "Hypervisor network state collector")]
struct Args {
    /// Shell-export environment file (e.g. admin-openrc.sh).
    #[arg(long, value_name = "PATH")]
    env_file: Option<PathBuf>,

    /// Output of `virsh dumpxml` for the domains on this node.
    #[arg(long, value_name = "PATH")]
    libvirt_xml: Option<PathBuf>,

    /// Output of `brctl show`.
    #[arg(long, value_name = "PATH")]
    brctl_show: Option<PathBuf>,

    /// Output of `ovs-vsctl show`.
    #[arg(long, value_name = "PATH")]
    ovs_vsctl_show: Option<PathBuf>,

    /// Output of `ip netns list`.
    #[arg(long, value_name = "PATH")]
    netns_list: Option<PathBuf>,

    /// JSON collector configuration.
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Indent the JSON report.
    #[arg(long)]
    pretty: bool,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors.
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);

    let formatter = ReportFormatter::new().pretty(args.pretty);

    let sources = CollectorSources {
        env_file: args.env_file,
        libvirt_xml: args.libvirt_xml,
        brctl_show: args.brctl_show,
        ovs_vsctl_show: args.ovs_vsctl_show,
        netns_list: args.netns_list,
    };

    let snapshot = match &args.config {
        Some(path) => CollectorConfig::load(path),
        None => Ok(CollectorConfig::default()),
    }
    .and_then(|config| HostCollector::new(config).collect(&sources));

    let report = match snapshot {
        Ok(snapshot) => formatter.format(&snapshot),
        Err(e) => {
            let message = format!("{:#}", e);
            error!(error = %message, "Collection failed");
            ReportFormatter::create_error_output(e)
        }
    };

    println!("{}", formatter.to_json(&report)?);

    Ok(())
}

/// Logs go to stderr so stdout carries only the report.
fn init_logging(verbose: u8, quiet: bool) {
    let filter = log_filter(verbose, quiet, std::env::var(EnvFilter::DEFAULT_ENV).ok());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// RUST_LOG, when set, is used as-is. Otherwise -v/-q pick the crate
/// level, WARN by default.
fn log_filter(verbose: u8, quiet: bool, rust_log: Option<String>) -> EnvFilter {
    if let Some(directives) = rust_log.filter(|d| !d.trim().is_empty()) {
        return EnvFilter::new(directives);
    }

    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::WARN,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let mut filter = EnvFilter::default();
    if let Ok(directive) = format!("ovs_collector={}", level).parse::<Directive>() {
        filter = filter.add_directive(directive);
    }
    filter
}
