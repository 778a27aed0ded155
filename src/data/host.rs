//! Probes of the local hypervisor node itself

use crate::domain::{InterfaceName, TapDevice, VmInstance};
use anyhow::{Context, Result};
use network_interface::{NetworkInterface, NetworkInterfaceConfig};
use std::collections::BTreeSet;

/// Hostname of this node, used to label the report
pub fn hostname() -> Result<String> {
    dns_lookup::get_hostname().context("Failed to resolve local hostname")
}

/// Names of all interfaces present on the host.
/// An interface with several addresses is listed once.
pub fn interface_names() -> Result<BTreeSet<InterfaceName>> {
    let system_interfaces = NetworkInterface::show()
        .context("Failed to enumerate network interfaces")?;

    Ok(system_interfaces
        .into_iter()
        .map(|iface| InterfaceName::new(iface.name))
        .collect())
}

/// Tap devices expected by VMs but absent from `present`
pub fn missing_tap_devices<'a, I>(instances: I, present: &BTreeSet<InterfaceName>) -> Vec<TapDevice>
where
    I: IntoIterator<Item = &'a VmInstance>,
{
    let mut missing: Vec<TapDevice> = instances
        .into_iter()
        .filter_map(|vm| vm.tap_dev.clone())
        .filter(|tap| !present.contains(&InterfaceName::new(tap.as_str())))
        .collect();
    missing.sort();
    missing.dedup();
    missing
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BridgeName, InstanceUuid};

    fn instance_on(bridge: &str) -> VmInstance {
        let mut vm = VmInstance::new(Some(InstanceUuid::new("u")));
        vm.attach_bridge(BridgeName::new(bridge));
        vm
    }

    #[test]
    fn test_missing_tap_devices() {
        let instances = vec![instance_on("qbr111"), instance_on("qbr222"), VmInstance::new(None)];
        let present: BTreeSet<_> = [InterfaceName::new("tap111"), InterfaceName::new("eth0")]
            .into_iter()
            .collect();

        let missing = missing_tap_devices(&instances, &present);
        assert_eq!(missing, vec![TapDevice::new("tap222")]);
    }

    #[test]
    fn test_missing_tap_devices_all_present() {
        let instances = vec![instance_on("qbr111")];
        let present: BTreeSet<_> = [InterfaceName::new("tap111")].into_iter().collect();
        assert!(missing_tap_devices(&instances, &present).is_empty());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_interface_names_include_loopback() {
        let names = interface_names().unwrap();
        assert!(names.contains(&InterfaceName::new("lo")));
    }
}
