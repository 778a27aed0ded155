//! Linux bridge recording and `brctl show` parsing.

use crate::domain::{BridgeName, BridgeTable, InterfaceName, Interfaces};
use tracing::{debug, warn};

/// Records `interfaces` for `bridge`, replacing whatever was recorded before
pub fn record_linuxbridge(bridges: &mut BridgeTable, bridge: impl Into<String>, interfaces: impl Into<Interfaces>) {
    let bridge = BridgeName::new(bridge);
    if bridges.upsert(bridge.clone(), interfaces.into()).is_some() {
        debug!(bridge = %bridge, "Replaced previously recorded bridge");
    }
}

/// Parses `brctl show` output into the bridge table.
/// Format: bridge name  bridge id  STP enabled  interfaces
/// Additional interfaces of a bridge follow on indented lines.
/// Returns the number of bridges recorded.
pub fn parse_brctl_show<'a, I>(bridges: &mut BridgeTable, lines: I) -> usize
where
    I: IntoIterator<Item = &'a str>,
{
    let mut current: Option<(BridgeName, Vec<InterfaceName>)> = None;
    let mut recorded = 0;

    for line in lines {
        if line.trim().is_empty() || line.starts_with("bridge name") {
            continue; // Skip header and blank lines
        }

        let parts: Vec<&str> = line.split_whitespace().collect();

        if line.starts_with(char::is_whitespace) {
            // Continuation line: one more interface of the open bridge
            match current.as_mut() {
                Some((_, interfaces)) => interfaces.push(InterfaceName::new(parts[0])),
                None => debug!(line, "Skipping interface line outside any bridge"),
            }
            continue;
        }

        if let Some((name, interfaces)) = current.take() {
            record_linuxbridge(bridges, name.as_str(), interfaces);
            recorded += 1;
        }

        if parts.len() < 3 {
            warn!(line, "Skipping malformed brctl line");
            continue;
        }

        let interfaces = parts
            .get(3)
            .map(|iface| vec![InterfaceName::new(*iface)])
            .unwrap_or_default();
        current = Some((BridgeName::new(parts[0]), interfaces));
    }

    if let Some((name, interfaces)) = current {
        record_linuxbridge(bridges, name.as_str(), interfaces);
        recorded += 1;
    }

    recorded
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::BridgeRecord;

    const BRCTL_SHOW: &str = "bridge name\tbridge id\t\tSTP enabled\tinterfaces
qbr6ce314cb-a5\t\t8000.3a1b2c3d4e5f\tno\t\tqvb6ce314cb-a5
\t\t\t\t\t\t\ttap6ce314cb-a5
qbrb0f5cfc8-4d\t\t8000.5e6f7a8b9c0d\tno\t\tqvbb0f5cfc8-4d
\t\t\t\t\t\t\ttapb0f5cfc8-4d
virbr0\t\t8000.000000000000\tyes\t\t
";

    #[test]
    fn test_record_linuxbridge() {
        let mut bridges = BridgeTable::new();
        let bridge = "test_bridge";
        let interfaces_list = "eth0";

        record_linuxbridge(&mut bridges, bridge, interfaces_list);

        assert_eq!(bridges.len(), 1);
        assert_eq!(
            bridges.get(&BridgeName::new(bridge)),
            Some(&BridgeRecord { interfaces: Interfaces::from(interfaces_list) })
        );
    }

    #[test]
    fn test_record_linuxbridge_overwrites() {
        let mut bridges = BridgeTable::new();

        record_linuxbridge(&mut bridges, "b", "eth0");
        record_linuxbridge(&mut bridges, "b", vec![InterfaceName::new("eth1"), InterfaceName::new("eth2")]);

        assert_eq!(bridges.len(), 1);
        assert_eq!(bridges.get(&BridgeName::new("b")).unwrap().interfaces.names(), vec!["eth1", "eth2"]);
    }

    #[test]
    fn test_parse_brctl_show() {
        let mut bridges = BridgeTable::new();
        let recorded = parse_brctl_show(&mut bridges, BRCTL_SHOW.lines());

        assert_eq!(recorded, 3);
        let qbr = bridges.get(&BridgeName::new("qbr6ce314cb-a5")).unwrap();
        assert_eq!(qbr.interfaces.names(), vec!["qvb6ce314cb-a5", "tap6ce314cb-a5"]);

        let virbr = bridges.get(&BridgeName::new("virbr0")).unwrap();
        assert!(virbr.interfaces.names().is_empty());
    }

    #[test]
    fn test_parse_brctl_show_malformed_lines() {
        let mut bridges = BridgeTable::new();
        let output = "\t\t\torphan0\nbroken\nbr0\t8000.1\tno\teth0\n";

        assert_eq!(parse_brctl_show(&mut bridges, output.lines()), 1);
        assert_eq!(bridges.len(), 1);
        assert_eq!(bridges.get(&BridgeName::new("br0")).unwrap().interfaces.names(), vec!["eth0"]);
    }

    #[test]
    fn test_parse_brctl_show_empty() {
        let mut bridges = BridgeTable::new();
        assert_eq!(parse_brctl_show(&mut bridges, "bridge name\tbridge id\tSTP enabled\tinterfaces\n".lines()), 0);
        assert!(bridges.is_empty());
    }
}
