//! Output projection
//!
//! Derives the user-facing outputs from the inputs and whatever the snapshot
//! has recorded. Values that only exist once resources are realized read as
//! [`KNOWN_AFTER_APPLY`] until then.

use declarative::{REDACTED, Snapshot};
use serde_json::{Map, Value, json};

use crate::schema::{Inputs, ValidationError};
use crate::topology::auth::AuthMode;
use crate::topology::fanout::{effective_count, slot_name};
use crate::topology::resources::{
    RESOURCE_GROUP, SUBNET, VIRTUAL_NETWORK, nic_address, vm_address,
};
use crate::topology::{network_name, security_group_name};

/// Placeholder for values assigned by the provider
pub const KNOWN_AFTER_APPLY: &str = "(known after apply)";

/// Output names in declaration order
pub const OUTPUT_NAMES: &[&str] = &[
    "resource_group_name",
    "resource_group_location",
    "virtual_network_name",
    "virtual_network_id",
    "subnet_id",
    "vm_names",
    "vm_private_ips",
    "vm_ids",
    "network_security_group_name",
    "ssh_commands",
    "deployment_summary",
];

/// One projected output
#[derive(Debug, Clone, PartialEq)]
pub struct Output {
    pub name: &'static str,
    pub description: &'static str,
    pub value: Value,
    pub sensitive: bool,
}

impl Output {
    fn new(name: &'static str, description: &'static str, value: Value) -> Self {
        Self {
            name,
            description,
            value,
            sensitive: false,
        }
    }

    fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    /// Value to show, redacted unless `reveal` is set
    pub fn shown(&self, reveal: bool) -> Value {
        if self.sensitive && !reveal {
            Value::String(REDACTED.to_string())
        } else {
            self.value.clone()
        }
    }
}

fn recorded(snapshot: &Snapshot, address: &str, attribute: &str) -> Value {
    snapshot
        .attribute(address, attribute)
        .filter(|v| !v.is_null())
        .cloned()
        .unwrap_or_else(|| json!(KNOWN_AFTER_APPLY))
}

/// Project every output, in declaration order
///
/// Invalid inputs declare nothing, so they project nothing either.
pub fn project(inputs: &Inputs, snapshot: &Snapshot) -> Result<Vec<Output>, ValidationError> {
    inputs.validate()?;

    let base = &inputs.resource_group_name;
    let count = effective_count(inputs.deploy_vms, inputs.vm_count);
    let auth = AuthMode::select(inputs);

    let vm_names: Vec<String> = (0..count).map(|i| slot_name(base, "vm", i)).collect();
    let private_ips: Vec<Value> = (0..count)
        .map(|i| recorded(snapshot, &nic_address(i), "private_ip_address"))
        .collect();
    let vm_ids: Vec<Value> = (0..count)
        .map(|i| recorded(snapshot, &vm_address(i), "id"))
        .collect();

    let ssh_commands: Vec<String> = if auth.is_ssh_key() {
        private_ips
            .iter()
            .map(|ip| {
                format!(
                    "ssh {}@{}",
                    inputs.admin_username,
                    ip.as_str().unwrap_or(KNOWN_AFTER_APPLY)
                )
            })
            .collect()
    } else {
        Vec::new()
    };

    Ok(vec![
        Output::new(
            "resource_group_name",
            "Name of the resource group",
            json!(base),
        ),
        Output::new(
            "resource_group_location",
            "Location of the resource group",
            json!(inputs.location),
        ),
        Output::new(
            "virtual_network_name",
            "Name of the virtual network",
            json!(network_name(base)),
        ),
        Output::new(
            "virtual_network_id",
            "ID of the virtual network",
            recorded(snapshot, VIRTUAL_NETWORK, "id"),
        ),
        Output::new("subnet_id", "ID of the subnet", recorded(snapshot, SUBNET, "id")),
        Output::new("vm_names", "Names of the virtual machines", json!(vm_names)),
        Output::new(
            "vm_private_ips",
            "Private IP addresses of the virtual machines",
            json!(private_ips),
        ),
        Output::new("vm_ids", "IDs of the virtual machines", json!(vm_ids)).sensitive(),
        Output::new(
            "network_security_group_name",
            "Name of the network security group",
            json!(security_group_name(base)),
        ),
        Output::new(
            "ssh_commands",
            "SSH commands to connect to the VMs (SSH key authentication only)",
            json!(ssh_commands),
        ),
        Output::new(
            "deployment_summary",
            "Summary of the deployment",
            json!({
                "resource_group": base,
                "location": inputs.location,
                "vm_count": count,
                "vm_size": inputs.vm_size,
                "authentication": auth.label(),
                "tags": inputs.tags,
            }),
        ),
    ])
}

/// Outputs as one JSON object, keyed by name
pub fn to_json(outputs: &[Output], reveal: bool) -> Value {
    let map: Map<String, Value> = outputs
        .iter()
        .map(|o| {
            (
                o.name.to_string(),
                json!({ "value": o.shown(reveal), "sensitive": o.sensitive }),
            )
        })
        .collect();
    Value::Object(map)
}

/// Whether the resource group is recorded at all
pub fn is_applied(snapshot: &Snapshot) -> bool {
    snapshot.get(RESOURCE_GROUP).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use declarative::RecordedResource;
    use std::collections::BTreeMap;

    fn find<'a>(outputs: &'a [Output], name: &str) -> &'a Output {
        outputs.iter().find(|o| o.name == name).unwrap()
    }

    fn realized(snapshot: &mut Snapshot, address: &str, computed: Value) {
        let computed: BTreeMap<String, Value> = serde_json::from_value(computed).unwrap();
        snapshot.insert(
            address,
            RecordedResource {
                resource_type: address.split('.').next().unwrap().to_string(),
                stage: 0,
                attributes: BTreeMap::new(),
                computed,
            },
        );
    }

    fn valid() -> Inputs {
        Inputs {
            subscription_id: "sub".into(),
            ..Inputs::default()
        }
    }

    fn ssh_inputs(vm_count: i64) -> Inputs {
        Inputs {
            resource_group_name: "rg-demo".into(),
            vm_count,
            ssh_public_key: Some("ssh-ed25519 AAAA".into()),
            ..valid()
        }
    }

    #[test]
    fn test_output_order() {
        let outputs = project(&valid(), &Snapshot::default()).unwrap();
        let names: Vec<&str> = outputs.iter().map(|o| o.name).collect();
        assert_eq!(names, OUTPUT_NAMES);
    }

    #[test]
    fn test_unrealized_values_are_placeholders() {
        let outputs = project(&ssh_inputs(2), &Snapshot::default()).unwrap();
        assert_eq!(
            find(&outputs, "virtual_network_id").value,
            json!(KNOWN_AFTER_APPLY)
        );
        assert_eq!(
            find(&outputs, "vm_private_ips").value,
            json!([KNOWN_AFTER_APPLY, KNOWN_AFTER_APPLY])
        );
        assert_eq!(
            find(&outputs, "vm_names").value,
            json!(["rg-demo-vm-1", "rg-demo-vm-2"])
        );
    }

    #[test]
    fn test_ssh_commands_use_nic_addresses() {
        let mut snapshot = Snapshot::default();
        realized(&mut snapshot, &nic_address(0), json!({"id": "nic0", "private_ip_address": "10.0.1.4"}));
        realized(&mut snapshot, &nic_address(1), json!({"id": "nic1", "private_ip_address": "10.0.1.5"}));

        let outputs = project(&ssh_inputs(2), &snapshot).unwrap();
        assert_eq!(
            find(&outputs, "ssh_commands").value,
            json!(["ssh azureuser@10.0.1.4", "ssh azureuser@10.0.1.5"])
        );
        assert_eq!(
            find(&outputs, "deployment_summary").value["authentication"],
            json!("SSH Key")
        );
    }

    #[test]
    fn test_password_mode_has_no_ssh_commands() {
        let inputs = Inputs {
            vm_count: 3,
            ..valid()
        };
        let outputs = project(&inputs, &Snapshot::default()).unwrap();
        assert_eq!(find(&outputs, "ssh_commands").value, json!([]));

        let summary = &find(&outputs, "deployment_summary").value;
        assert_eq!(summary["vm_count"], json!(3));
        assert_eq!(summary["authentication"], json!("Password"));
        assert_eq!(summary["resource_group"], json!("rg-vm-topology"));
    }

    #[test]
    fn test_not_deploying_empties_vm_outputs() {
        let inputs = Inputs {
            deploy_vms: false,
            ..ssh_inputs(5)
        };
        let outputs = project(&inputs, &Snapshot::default()).unwrap();
        for name in ["vm_names", "vm_private_ips", "vm_ids", "ssh_commands"] {
            assert_eq!(find(&outputs, name).value, json!([]), "{name}");
        }
        assert_eq!(find(&outputs, "deployment_summary").value["vm_count"], json!(0));
    }

    #[test]
    fn test_out_of_range_count_projects_nothing() {
        for count in [0, 11, 50] {
            let err = project(&ssh_inputs(count), &Snapshot::default()).unwrap_err();
            assert_eq!(err.to_string(), "VM count must be between 1 and 10.");
        }

        // deploy_vms = false does not excuse the count
        let inputs = Inputs {
            deploy_vms: false,
            ..ssh_inputs(50)
        };
        assert!(project(&inputs, &Snapshot::default()).is_err());
    }

    #[test]
    fn test_vm_ids_are_sensitive() {
        let mut snapshot = Snapshot::default();
        realized(&mut snapshot, &vm_address(0), json!({"id": "/subscriptions/x/vm"}));
        let outputs = project(&ssh_inputs(1), &snapshot).unwrap();
        let ids = find(&outputs, "vm_ids");

        assert!(ids.sensitive);
        assert_eq!(ids.shown(false), json!(REDACTED));
        assert_eq!(ids.shown(true), json!(["/subscriptions/x/vm"]));

        let rendered = to_json(&outputs, false);
        assert_eq!(rendered["vm_ids"]["value"], json!(REDACTED));
        assert_eq!(rendered["vm_ids"]["sensitive"], json!(true));
    }
}
