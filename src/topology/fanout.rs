//! Count-based fan-out of NIC/VM slots

/// Number of VM slots actually declared
///
/// `count` is expected to be validated already; a negative value yields zero.
pub fn effective_count(deploy_vms: bool, count: i64) -> usize {
    if deploy_vms {
        usize::try_from(count).unwrap_or(0)
    } else {
        0
    }
}

/// Resource name of slot `index`: `<base>-<role>-<index + 1>`
pub fn slot_name(base: &str, role: &str, index: usize) -> String {
    format!("{base}-{role}-{}", index + 1)
}

/// Address of slot `index` of a counted resource, e.g. `azurerm_network_interface.vm[0]`
pub fn slot_address(resource_type: &str, index: usize) -> String {
    format!("{resource_type}.vm[{index}]")
}
