//! Line scanner for libvirt domain descriptors (`virsh dumpxml` output).
//!
//! This is deliberately not an XML parser: dumps of several domains are
//! concatenated and may be truncated, so each line is matched on its own
//! against three markers:
//! - `<uuid>VALUE</uuid>`
//! - `<nova:name>VALUE</nova:name>` (the name tag is configurable; VALUE may
//!   contain spaces)
//! - `<source bridge='VALUE'/>`

use crate::domain::{BridgeName, InstanceUuid, VmInstance, VmName};
use std::collections::BTreeMap;
use tracing::debug;

/// Name tag written by nova into the domain metadata
pub const DEFAULT_NAME_TAG: &str = "nova:name";

/// VM display name -> instance record
pub type Instances = BTreeMap<VmName, VmInstance>;

/// Scanner position between lines.
///
/// A uuid waits for the next name line. A source bridge belongs to the
/// most recently committed name, even while the next uuid is pending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanState {
    /// Nothing pending and no record to attach bridges to
    AwaitingUuid,
    /// A uuid was seen; `last` is the record committed before it, if any
    UuidPending { uuid: InstanceUuid, last: Option<VmName> },
    /// A record was committed and receives bridge lines
    Committed { name: VmName },
}

impl ScanState {
    /// Record that bridge lines attach to in this state
    pub fn attach_target(&self) -> Option<&VmName> {
        match self {
            ScanState::AwaitingUuid => None,
            ScanState::UuidPending { last, .. } => last.as_ref(),
            ScanState::Committed { name } => Some(name),
        }
    }
}

/// One recognised line
#[derive(Debug, Clone, PartialEq, Eq)]
enum Marker {
    Uuid(InstanceUuid),
    Name(VmName),
    SourceBridge(BridgeName),
}

/// Incremental scanner over descriptor lines
#[derive(Debug)]
pub struct LibvirtInstanceParser {
    name_open: String,
    name_close: String,
    state: ScanState,
    instances: Instances,
}

impl LibvirtInstanceParser {
    /// Creates a scanner matching the `nova:name` tag
    pub fn new() -> Self {
        Self::with_name_tag(DEFAULT_NAME_TAG)
    }

    /// Creates a scanner matching `<tag>VALUE</tag>` as the name marker
    pub fn with_name_tag(tag: &str) -> Self {
        Self {
            name_open: format!("<{}>", tag),
            name_close: format!("</{}>", tag),
            state: ScanState::AwaitingUuid,
            instances: Instances::new(),
        }
    }

    pub fn state(&self) -> &ScanState {
        &self.state
    }

    /// Feeds one line through the state machine
    pub fn feed(&mut self, line: &str) {
        let Some(marker) = self.classify(line) else {
            return;
        };

        let state = std::mem::replace(&mut self.state, ScanState::AwaitingUuid);
        self.state = match (state, marker) {
            (ScanState::UuidPending { last, .. }, Marker::Uuid(uuid)) => {
                debug!(uuid = %uuid, "Replacing pending uuid");
                ScanState::UuidPending { uuid, last }
            }
            (ScanState::Committed { name }, Marker::Uuid(uuid)) => {
                ScanState::UuidPending { uuid, last: Some(name) }
            }
            (ScanState::AwaitingUuid, Marker::Uuid(uuid)) => {
                ScanState::UuidPending { uuid, last: None }
            }
            (state, Marker::Name(name)) => {
                let uuid = match state {
                    ScanState::UuidPending { uuid, .. } => Some(uuid),
                    _ => {
                        debug!(vm = %name, "Name without pending uuid");
                        None
                    }
                };
                if self.instances.insert(name.clone(), VmInstance::new(uuid)).is_some() {
                    debug!(vm = %name, "Duplicate VM name, replacing record");
                }
                ScanState::Committed { name }
            }
            (state, Marker::SourceBridge(bridge)) => {
                match state.attach_target().and_then(|name| self.instances.get_mut(name)) {
                    Some(instance) => instance.attach_bridge(bridge),
                    None => debug!(bridge = %bridge, "Source bridge before any VM name, ignoring"),
                }
                state
            }
        };
    }

    /// Consumes the scanner, returning every committed record as-is
    pub fn finish(self) -> Instances {
        self.instances
    }

    fn classify(&self, line: &str) -> Option<Marker> {
        if let Some(uuid) = token_between(line, "<uuid>", "</uuid>") {
            return Some(Marker::Uuid(InstanceUuid::new(uuid)));
        }
        if let Some(name) = extract_between(line, &self.name_open, &self.name_close) {
            return Some(Marker::Name(VmName::new(name)));
        }
        source_bridge(line).map(|bridge| Marker::SourceBridge(BridgeName::new(bridge)))
    }
}

impl Default for LibvirtInstanceParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Groups uuid, name and source bridge lines into one record per VM name
pub fn libvirt_instance_parser<'a, I>(lines: I) -> Instances
where
    I: IntoIterator<Item = &'a str>,
{
    parse_with_name_tag(lines, DEFAULT_NAME_TAG)
}

/// Same as [`libvirt_instance_parser`] with a custom name tag
pub fn parse_with_name_tag<'a, I>(lines: I, tag: &str) -> Instances
where
    I: IntoIterator<Item = &'a str>,
{
    let mut parser = LibvirtInstanceParser::with_name_tag(tag);
    for line in lines {
        parser.feed(line);
    }
    parser.finish()
}

/// Exact content between `open` and `close`; blank content is rejected.
/// Display names may contain spaces, so inner whitespace is kept.
fn extract_between<'l>(line: &'l str, open: &str, close: &str) -> Option<&'l str> {
    let start = line.find(open)? + open.len();
    let len = line[start..].find(close)?;
    let value = &line[start..start + len];

    if value.trim().is_empty() {
        return None;
    }
    Some(value)
}

/// Like [`extract_between`] but the value must contain no whitespace
fn token_between<'l>(line: &'l str, open: &str, close: &str) -> Option<&'l str> {
    extract_between(line, open, close).filter(|value| !value.contains(char::is_whitespace))
}

/// Bridge from `<source bridge='VALUE'/>`
fn source_bridge(line: &str) -> Option<&str> {
    let start = line.find("<source bridge='")?;
    token_between(&line[start..], "bridge='", "'/>")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TapDevice;

    const TWO_VMS: &str = "
        <uuid>31b1cfcc-ca85-48a9-a84a-8b222d377080</uuid>
            <nova:name>VM1</nova:name>
            <source bridge='qbrb0f5cfc8-4d'/>
        <uuid>f9743f1c-caeb-4892-af83-9dc0ac757545</uuid>
            <nova:name>VM2</nova:name>
            <source bridge='qbr6ce314cb-a5'/>
        ";

    fn vm(name: &str) -> VmName {
        VmName::new(name)
    }

    #[test]
    fn test_libvirt_instance_parser() {
        let parsed_data = libvirt_instance_parser(TWO_VMS.split('\n'));

        assert_eq!(parsed_data.len(), 2);
        for name in ["VM1", "VM2"] {
            let instance = &parsed_data[&vm(name)];
            assert!(instance.uuid.is_some());
            assert!(instance.src_bridge.is_some());
            assert!(instance.tap_dev.is_some());
        }
    }

    #[test]
    fn test_libvirt_instance_parser_values() {
        let parsed = libvirt_instance_parser(TWO_VMS.lines());

        let vm1 = &parsed[&vm("VM1")];
        assert_eq!(vm1.uuid, Some(InstanceUuid::new("31b1cfcc-ca85-48a9-a84a-8b222d377080")));
        assert_eq!(vm1.src_bridge, Some(BridgeName::new("qbrb0f5cfc8-4d")));
        assert_eq!(vm1.tap_dev, Some(TapDevice::new("tapb0f5cfc8-4d")));

        let vm2 = &parsed[&vm("VM2")];
        assert_eq!(vm2.uuid, Some(InstanceUuid::new("f9743f1c-caeb-4892-af83-9dc0ac757545")));
        assert_eq!(vm2.src_bridge, Some(BridgeName::new("qbr6ce314cb-a5")));
        assert_eq!(vm2.tap_dev, Some(TapDevice::new("tap6ce314cb-a5")));
    }

    #[test]
    fn test_reparse_is_idempotent() {
        assert_eq!(libvirt_instance_parser(TWO_VMS.lines()), libvirt_instance_parser(TWO_VMS.lines()));
    }

    #[test]
    fn test_later_uuid_replaces_pending() {
        let input = "<uuid>first</uuid>\n<uuid>second</uuid>\n<nova:name>VM</nova:name>\n";
        let parsed = libvirt_instance_parser(input.lines());
        assert_eq!(parsed[&vm("VM")].uuid, Some(InstanceUuid::new("second")));
    }

    #[test]
    fn test_pending_uuid_not_reused() {
        let input = "<uuid>u1</uuid>\n<nova:name>A</nova:name>\n<nova:name>B</nova:name>\n";
        let parsed = libvirt_instance_parser(input.lines());

        assert_eq!(parsed[&vm("A")].uuid, Some(InstanceUuid::new("u1")));
        assert_eq!(parsed[&vm("B")].uuid, None);
    }

    #[test]
    fn test_bridge_before_any_name_ignored() {
        let input = "<source bridge='qbr1234'/>\n<uuid>u1</uuid>\n<source bridge='qbr5678'/>\n<nova:name>A</nova:name>\n";
        let parsed = libvirt_instance_parser(input.lines());

        assert_eq!(parsed.len(), 1);
        let a = &parsed[&vm("A")];
        assert_eq!(a.src_bridge, None);
        assert_eq!(a.tap_dev, None);
    }

    #[test]
    fn test_bridge_attaches_to_last_committed_while_uuid_pending() {
        let input = "<uuid>u1</uuid>\n<nova:name>A</nova:name>\n<uuid>u2</uuid>\n<source bridge='qbr1234'/>\n<nova:name>B</nova:name>\n";
        let parsed = libvirt_instance_parser(input.lines());

        assert_eq!(parsed[&vm("A")].src_bridge, Some(BridgeName::new("qbr1234")));
        assert_eq!(parsed[&vm("B")].uuid, Some(InstanceUuid::new("u2")));
        assert_eq!(parsed[&vm("B")].src_bridge, None);
    }

    #[test]
    fn test_partial_record_kept() {
        let input = "<uuid>u1</uuid>\n<nova:name>A</nova:name>\n";
        let parsed = libvirt_instance_parser(input.lines());

        let a = &parsed[&vm("A")];
        assert!(!a.is_complete());
        assert_eq!(a.uuid, Some(InstanceUuid::new("u1")));
    }

    #[test]
    fn test_duplicate_name_last_commit_wins() {
        let input = "<uuid>u1</uuid>\n<nova:name>A</nova:name>\n<source bridge='qbr1'/>\n<uuid>u2</uuid>\n<nova:name>A</nova:name>\n";
        let parsed = libvirt_instance_parser(input.lines());

        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[&vm("A")], VmInstance::new(Some(InstanceUuid::new("u2"))));
    }

    #[test]
    fn test_unrelated_lines_ignored() {
        let input = "<domain type='kvm' id='2'>\n  <name>instance-00000001</name>\n  <uuid></uuid>\n  <source file='/var/lib/nova/disk'/>\n  <target dev='tap1'/>\n";
        assert!(libvirt_instance_parser(input.lines()).is_empty());
    }

    #[test]
    fn test_non_qbr_bridge_has_no_tap() {
        let input = "<uuid>u1</uuid>\n<nova:name>A</nova:name>\n<source bridge='br-int'/>\n";
        let parsed = libvirt_instance_parser(input.lines());

        assert_eq!(parsed[&vm("A")].src_bridge, Some(BridgeName::new("br-int")));
        assert_eq!(parsed[&vm("A")].tap_dev, None);
    }

    #[test]
    fn test_custom_name_tag() {
        let input = "<uuid>u1</uuid>\n<acme:name>A</acme:name>\n<nova:name>B</nova:name>\n";
        let parsed = parse_with_name_tag(input.lines(), "acme:name");

        assert_eq!(parsed.len(), 1);
        assert!(parsed.contains_key(&vm("A")));
    }

    #[test]
    fn test_state_transitions() {
        let mut parser = LibvirtInstanceParser::new();
        assert_eq!(parser.state(), &ScanState::AwaitingUuid);

        parser.feed("<uuid>u1</uuid>");
        assert_eq!(
            parser.state(),
            &ScanState::UuidPending { uuid: InstanceUuid::new("u1"), last: None }
        );

        parser.feed("<nova:name>A</nova:name>");
        assert_eq!(parser.state(), &ScanState::Committed { name: vm("A") });

        parser.feed("<uuid>u2</uuid>");
        assert_eq!(parser.state().attach_target(), Some(&vm("A")));

        parser.feed("noise");
        assert!(matches!(parser.state(), ScanState::UuidPending { .. }));
    }

    #[test]
    fn test_name_with_spaces() {
        let input = "<uuid>u1</uuid>\n<nova:name>web1</nova:name>\n<source bridge='qbraaaa'/>\n<uuid>u2</uuid>\n<nova:name>web server 2</nova:name>\n<source bridge='qbrbbbb'/>\n";
        let parsed = libvirt_instance_parser(input.lines());

        assert_eq!(parsed.len(), 2);
        let web2 = &parsed[&vm("web server 2")];
        assert_eq!(web2.uuid, Some(InstanceUuid::new("u2")));
        assert_eq!(web2.src_bridge, Some(BridgeName::new("qbrbbbb")));
        assert_eq!(web2.tap_dev, Some(TapDevice::new("tapbbbb")));
    }

    #[test]
    fn test_neighbour_keeps_own_bridge() {
        let input = "<uuid>u1</uuid>\n<nova:name>web1</nova:name>\n<source bridge='qbraaaa'/>\n<uuid>u2</uuid>\n<nova:name>web server 2</nova:name>\n<source bridge='qbrbbbb'/>\n";
        let parsed = libvirt_instance_parser(input.lines());

        let web1 = &parsed[&vm("web1")];
        assert_eq!(web1.src_bridge, Some(BridgeName::new("qbraaaa")));
        assert_eq!(web1.tap_dev, Some(TapDevice::new("tapaaaa")));
    }

    #[test]
    fn test_blank_name_ignored() {
        let input = "<uuid>u1</uuid>\n<nova:name>   </nova:name>\n<nova:name>A</nova:name>\n";
        let parsed = libvirt_instance_parser(input.lines());

        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[&vm("A")].uuid, Some(InstanceUuid::new("u1")));
    }

    #[test]
    fn test_extract_between() {
        assert_eq!(extract_between("  <uuid>abc</uuid>", "<uuid>", "</uuid>"), Some("abc"));
        assert_eq!(extract_between("<n>a b</n>", "<n>", "</n>"), Some("a b"));
        assert_eq!(token_between("<uuid>a b</uuid>", "<uuid>", "</uuid>"), None);
        assert_eq!(extract_between("<uuid>abc", "<uuid>", "</uuid>"), None);
        assert_eq!(source_bridge("<source bridge='qbr1-2'/>"), Some("qbr1-2"));
        assert_eq!(source_bridge("<source network='default'/>"), None);
    }
}
