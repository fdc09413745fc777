//! In-process stand-in for the Azure resource manager
//!
//! Realizes declared resources without any network access: ids follow the
//! ARM layout, NICs get the lowest free address of their subnet, and the same
//! acceptance rules as the real API are enforced where the topology depends on
//! them.

use declarative::{
    ApplyContext, Attributes, Provider, ProviderError, RecordedResource, Resource,
};
use serde_json::{Value, json};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::net::Ipv4Addr;
use std::sync::Mutex;

use crate::topology::cidr::Ipv4Cidr;
use crate::topology::resources::{
    NIC_TYPE, NSG_ASSOCIATION_TYPE, NSG_TYPE, RESOURCE_GROUP_TYPE, SUBNET_TYPE,
    VIRTUAL_NETWORK_TYPE, VM_TYPE,
};

/// Subscription used when none is configured (provider 3.x)
pub const DEFAULT_SUBSCRIPTION: &str = "00000000-0000-0000-0000-000000000000";

/// Addresses .0-.3 of every subnet are reserved by the platform
const FIRST_HOST_OFFSET: u32 = 4;

/// Simulated provider
pub struct SimulatedAzure {
    subscription_id: String,
    leases: Mutex<Leases>,
    faults: Mutex<HashMap<String, u32>>,
}

/// Addresses handed out or released during this run
#[derive(Default)]
struct Leases {
    by_owner: BTreeMap<String, Ipv4Addr>,
    released: BTreeSet<String>,
}

impl SimulatedAzure {
    pub fn new(subscription_id: &str) -> Self {
        let subscription_id = if subscription_id.trim().is_empty() {
            DEFAULT_SUBSCRIPTION.to_string()
        } else {
            subscription_id.trim().to_string()
        };
        Self {
            subscription_id,
            leases: Mutex::new(Leases::default()),
            faults: Mutex::new(HashMap::new()),
        }
    }

    /// Fail the next `times` calls for `address` with a transient error
    #[cfg(test)]
    pub fn with_transient_failures(self, address: &str, times: u32) -> Self {
        if let Ok(mut faults) = self.faults.lock() {
            faults.insert(address.to_string(), times);
        }
        self
    }

    fn inject_fault(&self, address: &str) -> Result<(), ProviderError> {
        let mut faults = self
            .faults
            .lock()
            .map_err(|_| ProviderError::Transient("fault table poisoned".into()))?;
        if let Some(remaining) = faults.get_mut(address)
            && *remaining > 0
        {
            *remaining -= 1;
            return Err(ProviderError::Transient(format!(
                "{address}: service temporarily unavailable"
            )));
        }
        Ok(())
    }

    fn group_id(&self, resource_group: &str) -> String {
        format!(
            "/subscriptions/{}/resourceGroups/{}",
            self.subscription_id, resource_group
        )
    }

    fn provider_id(&self, resource_group: &str, namespace: &str, kind: &str, name: &str) -> String {
        format!(
            "{}/providers/{}/{}/{}",
            self.group_id(resource_group),
            namespace,
            kind,
            name
        )
    }

    /// Lowest free host address of the NIC's subnet
    fn allocate(
        &self,
        owner: &str,
        subnet_id: &str,
        ctx: &ApplyContext<'_>,
    ) -> Result<Ipv4Addr, ProviderError> {
        let prefix = subnet_prefix(subnet_id, ctx)?;
        let mut leases = self
            .leases
            .lock()
            .map_err(|_| ProviderError::Transient("address table poisoned".into()))?;

        let mut taken: BTreeSet<Ipv4Addr> = ctx
            .snapshot
            .resources
            .iter()
            .filter(|(address, record)| {
                record.resource_type == NIC_TYPE
                    && address.as_str() != owner
                    && !leases.released.contains(address.as_str())
            })
            .filter_map(|(_, record)| record.get("private_ip_address"))
            .filter_map(Value::as_str)
            .filter_map(|ip| ip.parse().ok())
            .filter(|ip| prefix.contains_addr(*ip))
            .collect();
        taken.extend(
            leases
                .by_owner
                .iter()
                .filter(|(o, _)| o.as_str() != owner)
                .map(|(_, ip)| *ip),
        );

        let last = u32::try_from(prefix.size().saturating_sub(1)).unwrap_or(u32::MAX);
        let ip = (FIRST_HOST_OFFSET..last)
            .filter_map(|offset| prefix.host(offset))
            .find(|ip| !taken.contains(ip))
            .ok_or_else(|| {
                ProviderError::QuotaExceeded(format!("no free addresses left in {prefix}"))
            })?;

        leases.by_owner.insert(owner.to_string(), ip);
        leases.released.remove(owner);
        log::debug!("{owner}: allocated {ip} in {prefix}");
        Ok(ip)
    }

    fn release(&self, owner: &str) {
        if let Ok(mut leases) = self.leases.lock() {
            leases.by_owner.remove(owner);
            leases.released.insert(owner.to_string());
        }
    }

    fn realize(
        &self,
        resource: &dyn Resource,
        attrs: &Attributes,
        ctx: &ApplyContext<'_>,
    ) -> Result<Attributes, ProviderError> {
        let address = resource.id();
        let name = required_str(attrs, "name", &address)?;
        let group = attrs
            .get("resource_group_name")
            .and_then(Value::as_str)
            .unwrap_or(name);

        if let Some(location) = attrs.get("location")
            && location.as_str().is_none_or(|l| l.trim().is_empty())
        {
            return Err(ProviderError::Rejected(format!(
                "{address}: location must not be empty"
            )));
        }

        let computed = match resource.resource_type() {
            RESOURCE_GROUP_TYPE => computed_id(self.group_id(name)),
            VIRTUAL_NETWORK_TYPE => computed_id(self.provider_id(
                group,
                "Microsoft.Network",
                "virtualNetworks",
                name,
            )),
            SUBNET_TYPE => {
                let vnet = required_str(attrs, "virtual_network_name", &address)?;
                let vnet_id = self.provider_id(group, "Microsoft.Network", "virtualNetworks", vnet);
                computed_id(format!("{vnet_id}/subnets/{name}"))
            }
            NSG_TYPE => computed_id(self.provider_id(
                group,
                "Microsoft.Network",
                "networkSecurityGroups",
                name,
            )),
            NIC_TYPE => {
                let subnet_id = attrs
                    .get("ip_configuration")
                    .and_then(|c| c.get(0))
                    .and_then(|c| c.get("subnet_id"))
                    .and_then(Value::as_str)
                    .ok_or_else(|| {
                        ProviderError::Rejected(format!("{address}: ip_configuration.subnet_id is required"))
                    })?;
                let ip = self.allocate(&address, subnet_id, ctx)?;
                let mut computed = computed_id(self.provider_id(
                    group,
                    "Microsoft.Network",
                    "networkInterfaces",
                    name,
                ));
                computed.insert("private_ip_address".into(), json!(ip.to_string()));
                computed
            }
            VM_TYPE => self.realize_vm(&address, name, group, attrs, ctx)?,
            other => {
                return Err(ProviderError::Rejected(format!(
                    "{address}: unsupported resource type {other}"
                )));
            }
        };

        Ok(computed)
    }

    fn realize_vm(
        &self,
        address: &str,
        name: &str,
        group: &str,
        attrs: &Attributes,
        ctx: &ApplyContext<'_>,
    ) -> Result<Attributes, ProviderError> {
        let password_disabled = attrs
            .get("disable_password_authentication")
            .and_then(Value::as_bool)
            .unwrap_or(true);

        if password_disabled && !attrs.contains_key("admin_ssh_key") {
            return Err(ProviderError::Rejected(format!(
                "{address}: admin_ssh_key is required when password authentication is disabled"
            )));
        }
        if !password_disabled
            && attrs
                .get("admin_password")
                .and_then(Value::as_str)
                .is_none_or(str::is_empty)
        {
            return Err(ProviderError::Rejected(format!(
                "{address}: admin_password is required when disable_password_authentication is false"
            )));
        }

        let nic_id = attrs
            .get("network_interface_ids")
            .and_then(|ids| ids.get(0))
            .and_then(Value::as_str)
            .ok_or_else(|| {
                ProviderError::Rejected(format!("{address}: at least one network interface is required"))
            })?;
        let private_ip = ctx
            .snapshot
            .resources
            .values()
            .find(|r| r.resource_type == NIC_TYPE && r.object_id() == Some(nic_id))
            .and_then(|r| r.get("private_ip_address"))
            .cloned()
            .unwrap_or(Value::Null);

        let id = self.provider_id(group, "Microsoft.Compute", "virtualMachines", name);
        let mut computed = computed_id(id.clone());
        computed.insert("virtual_machine_id".into(), json!(machine_id(&id)));
        computed.insert("private_ip_address".into(), private_ip);
        Ok(computed)
    }
}

impl Provider for SimulatedAzure {
    fn create(
        &self,
        resource: &dyn Resource,
        resolved: &Attributes,
        ctx: &ApplyContext,
    ) -> Result<Attributes, ProviderError> {
        let address = resource.id();
        self.inject_fault(&address)?;

        if resource.resource_type() == NSG_ASSOCIATION_TYPE {
            // The association is addressed by the subnet it decorates
            let subnet_id = required_str(resolved, "subnet_id", &address)?;
            required_str(resolved, "network_security_group_id", &address)?;
            return Ok(computed_id(subnet_id.to_string()));
        }

        self.realize(resource, resolved, ctx)
    }

    fn update(
        &self,
        resource: &dyn Resource,
        resolved: &Attributes,
        current: &RecordedResource,
        ctx: &ApplyContext,
    ) -> Result<Attributes, ProviderError> {
        let address = resource.id();
        self.inject_fault(&address)?;

        if resource.resource_type() == VM_TYPE {
            // Re-check acceptance rules and pick up the NIC's current address
            let name = required_str(resolved, "name", &address)?;
            let group = required_str(resolved, "resource_group_name", &address)?;
            return self.realize_vm(&address, name, group, resolved, ctx);
        }

        Ok(current.computed.clone())
    }

    fn delete(&self, address: &str, current: &RecordedResource) -> Result<(), ProviderError> {
        self.inject_fault(address)?;
        if current.resource_type == NIC_TYPE {
            self.release(address);
        }
        log::debug!(
            "{address}: deleted {}",
            current.object_id().unwrap_or("(unrealized)")
        );
        Ok(())
    }
}

fn computed_id(id: String) -> Attributes {
    Attributes::from([("id".to_string(), Value::String(id))])
}

fn required_str<'a>(
    attrs: &'a Attributes,
    key: &str,
    address: &str,
) -> Result<&'a str, ProviderError> {
    attrs
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ProviderError::Rejected(format!("{address}: {key} must not be empty")))
}

/// Address prefix recorded for the subnet with the given id
fn subnet_prefix(subnet_id: &str, ctx: &ApplyContext<'_>) -> Result<Ipv4Cidr, ProviderError> {
    let record = ctx
        .snapshot
        .resources
        .values()
        .find(|r| r.resource_type == SUBNET_TYPE && r.object_id() == Some(subnet_id))
        .ok_or_else(|| ProviderError::Rejected(format!("subnet {subnet_id} does not exist")))?;

    let prefix = record
        .get("address_prefixes")
        .and_then(|p| p.get(0))
        .and_then(Value::as_str)
        .ok_or_else(|| ProviderError::Rejected(format!("subnet {subnet_id} has no address prefix")))?;

    prefix
        .parse()
        .map_err(|e: String| ProviderError::Rejected(format!("subnet {subnet_id}: {e}")))
}

/// Stable UUID-shaped identifier derived from the resource id
fn machine_id(id: &str) -> String {
    let hex = blake3::hash(id.as_bytes()).to_hex();
    let h = hex.as_str();
    format!(
        "{}-{}-{}-{}-{}",
        &h[0..8],
        &h[8..12],
        &h[12..16],
        &h[16..20],
        &h[20..32]
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Inputs, Sensitive};
    use crate::topology::Topology;
    use crate::topology::resources::{nic_address, vm_address};
    use declarative::{ExecuteOptions, RetryConfig, Snapshot, execute_simple};
    use std::time::Duration;

    fn inputs(vm_count: i64) -> Inputs {
        Inputs {
            subscription_id: "11111111-2222-3333-4444-555555555555".into(),
            resource_group_name: "rg-demo".into(),
            vm_count,
            admin_password: Some(Sensitive::new("P@ssw0rd!")),
            ..Inputs::default()
        }
    }

    fn opts(jobs: usize) -> ExecuteOptions {
        ExecuteOptions {
            jobs,
            retry: RetryConfig {
                max_attempts: 3,
                base_delay: Duration::from_millis(1),
                backoff_factor: 1.0,
                max_delay: Duration::from_millis(5),
            },
            ..ExecuteOptions::default()
        }
    }

    fn apply(inputs: &Inputs, snapshot: &mut Snapshot, provider: &SimulatedAzure, jobs: usize) {
        let plan = Topology::build(inputs).unwrap().into_plan().unwrap();
        let summary = execute_simple(&plan, snapshot, &opts(jobs), provider).unwrap();
        assert!(summary.is_success(), "failures: {:?}", summary.failures);
    }

    fn ip(snapshot: &Snapshot, address: &str) -> String {
        snapshot
            .attribute(address, "private_ip_address")
            .and_then(Value::as_str)
            .unwrap()
            .to_string()
    }

    #[test]
    fn test_ids_follow_arm_layout() {
        let provider = SimulatedAzure::new("11111111-2222-3333-4444-555555555555");
        let mut snapshot = Snapshot::default();
        apply(&inputs(1), &mut snapshot, &provider, 1);

        let rg = "/subscriptions/11111111-2222-3333-4444-555555555555/resourceGroups/rg-demo";
        let get_id = |address: &str| snapshot.get(address).unwrap().object_id().unwrap().to_string();

        assert_eq!(get_id("azurerm_resource_group.main"), rg);
        assert_eq!(
            get_id("azurerm_virtual_network.main"),
            format!("{rg}/providers/Microsoft.Network/virtualNetworks/rg-demo-vnet")
        );
        assert_eq!(
            get_id("azurerm_subnet.internal"),
            format!("{rg}/providers/Microsoft.Network/virtualNetworks/rg-demo-vnet/subnets/rg-demo-subnet")
        );
        assert_eq!(
            get_id("azurerm_subnet_network_security_group_association.main"),
            get_id("azurerm_subnet.internal")
        );
        assert_eq!(
            get_id(&vm_address(0)),
            format!("{rg}/providers/Microsoft.Compute/virtualMachines/rg-demo-vm-1")
        );
    }

    #[test]
    fn test_addresses_allocated_from_subnet() {
        let provider = SimulatedAzure::new("sub");
        let mut snapshot = Snapshot::default();
        apply(&inputs(3), &mut snapshot, &provider, 1);

        assert_eq!(ip(&snapshot, &nic_address(0)), "10.0.1.4");
        assert_eq!(ip(&snapshot, &nic_address(1)), "10.0.1.5");
        assert_eq!(ip(&snapshot, &nic_address(2)), "10.0.1.6");
        assert_eq!(ip(&snapshot, &vm_address(2)), "10.0.1.6");
    }

    #[test]
    fn test_parallel_allocation_is_unique() {
        let provider = SimulatedAzure::new("sub");
        let mut snapshot = Snapshot::default();
        apply(&inputs(10), &mut snapshot, &provider, 8);

        let ips: BTreeSet<String> = (0..10).map(|i| ip(&snapshot, &nic_address(i))).collect();
        assert_eq!(ips.len(), 10);
        for i in 0..10 {
            assert_eq!(ip(&snapshot, &vm_address(i)), ip(&snapshot, &nic_address(i)));
        }
    }

    #[test]
    fn test_new_run_keeps_recorded_addresses() {
        let mut snapshot = Snapshot::default();
        apply(&inputs(2), &mut snapshot, &SimulatedAzure::new("sub"), 1);
        apply(&inputs(4), &mut snapshot, &SimulatedAzure::new("sub"), 1);

        assert_eq!(ip(&snapshot, &nic_address(0)), "10.0.1.4");
        assert_eq!(ip(&snapshot, &nic_address(1)), "10.0.1.5");
        assert_eq!(ip(&snapshot, &nic_address(2)), "10.0.1.6");
        assert_eq!(ip(&snapshot, &nic_address(3)), "10.0.1.7");
    }

    #[test]
    fn test_password_mode_without_password_rejected() {
        let inputs = Inputs {
            admin_password: None,
            ..inputs(1)
        };
        let plan = Topology::build(&inputs).unwrap().into_plan().unwrap();
        let mut snapshot = Snapshot::default();
        let summary =
            execute_simple(&plan, &mut snapshot, &opts(1), &SimulatedAzure::new("sub")).unwrap();

        assert_eq!(summary.failed, 1);
        assert!(summary.failures[0].1.contains("admin_password is required"));
        assert!(snapshot.get(&vm_address(0)).is_none());
        assert!(snapshot.get(&nic_address(0)).is_some());
    }

    #[test]
    fn test_transient_failures_are_retried() {
        let provider = SimulatedAzure::new("sub").with_transient_failures(&vm_address(0), 2);
        let mut snapshot = Snapshot::default();
        apply(&inputs(1), &mut snapshot, &provider, 1);
        assert!(snapshot.get(&vm_address(0)).is_some());
    }

    #[test]
    fn test_machine_id_shape() {
        let id = machine_id("/subscriptions/x/resourceGroups/y");
        assert_eq!(id.len(), 36);
        assert_eq!(id.matches('-').count(), 4);
        assert_eq!(id, machine_id("/subscriptions/x/resourceGroups/y"));
    }
}
