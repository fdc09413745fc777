//! Topology descriptor
//!
//! Turns validated inputs into the ordered list of resources to plan:
//! resource group, network, security group, association, then one NIC and
//! one VM per slot.

pub mod auth;
pub mod cidr;
pub mod fanout;
pub mod resources;

use declarative::{BoxedResource, ExecutionPlan, GraphError};

use crate::schema::{Inputs, ValidationError};
use auth::AuthMode;
use fanout::effective_count;
use resources::{
    LinuxVirtualMachine, NetworkInterface, NetworkSecurityGroup, ResourceGroup, Subnet,
    SubnetNsgAssociation, VirtualNetwork,
};

/// Declared resources plus the decisions that shaped them
#[derive(Debug)]
pub struct Topology {
    pub resources: Vec<BoxedResource>,
    pub auth: AuthMode,
    pub vm_count: usize,
}

impl Topology {
    /// Validate the inputs and declare every resource
    pub fn build(inputs: &Inputs) -> Result<Self, ValidationError> {
        inputs.validate()?;

        let base = &inputs.resource_group_name;
        let tags = &inputs.tags;
        let auth = AuthMode::select(inputs);
        let vm_count = effective_count(inputs.deploy_vms, inputs.vm_count);

        let mut resources: Vec<BoxedResource> = vec![
            Box::new(ResourceGroup {
                name: base.clone(),
                location: inputs.location.clone(),
                tags: tags.clone(),
            }),
            Box::new(VirtualNetwork {
                name: network_name(base),
                address_space: inputs.network.address_space.clone(),
                tags: tags.clone(),
            }),
            Box::new(Subnet {
                name: format!("{base}-subnet"),
                address_prefix: inputs.network.subnet_prefix.clone(),
            }),
            Box::new(NetworkSecurityGroup {
                name: security_group_name(base),
                rules: inputs.security_rules.clone(),
                tags: tags.clone(),
            }),
            Box::new(SubnetNsgAssociation),
        ];

        for index in 0..vm_count {
            resources.push(Box::new(NetworkInterface::new(base, index, tags)));
        }
        for index in 0..vm_count {
            resources.push(Box::new(LinuxVirtualMachine {
                index,
                name: fanout::slot_name(base, "vm", index),
                size: inputs.vm_size.clone(),
                admin_username: inputs.admin_username.clone(),
                auth: auth.clone(),
                tags: tags.clone(),
            }));
        }

        log::debug!(
            "Declared {} resources ({} VMs, {} auth)",
            resources.len(),
            vm_count,
            auth.label()
        );

        Ok(Self {
            resources,
            auth,
            vm_count,
        })
    }

    /// Order the resources into dependency stages
    pub fn into_plan(self) -> Result<ExecutionPlan, GraphError> {
        ExecutionPlan::build(self.resources)
    }
}

/// Name of the virtual network for a resource group
pub fn network_name(base: &str) -> String {
    format!("{base}-vnet")
}

/// Name of the security group for a resource group
pub fn security_group_name(base: &str) -> String {
    format!("{base}-nsg")
}
