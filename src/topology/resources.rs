//! Resource declarations of the topology
//!
//! Each struct declares the desired attributes of one Azure object. Values
//! owned by another resource are written as references, which is also how the
//! planner learns the dependency edges.

use declarative::{Attributes, Resource, reference};
use serde_json::{Value, json};
use std::collections::BTreeMap;

use super::auth::AuthMode;
use super::fanout::{slot_address, slot_name};
use crate::schema::SecurityRule;

pub const RESOURCE_GROUP_TYPE: &str = "azurerm_resource_group";
pub const VIRTUAL_NETWORK_TYPE: &str = "azurerm_virtual_network";
pub const SUBNET_TYPE: &str = "azurerm_subnet";
pub const NSG_TYPE: &str = "azurerm_network_security_group";
pub const NSG_ASSOCIATION_TYPE: &str = "azurerm_subnet_network_security_group_association";
pub const NIC_TYPE: &str = "azurerm_network_interface";
pub const VM_TYPE: &str = "azurerm_linux_virtual_machine";

pub const RESOURCE_GROUP: &str = "azurerm_resource_group.main";
pub const VIRTUAL_NETWORK: &str = "azurerm_virtual_network.main";
pub const SUBNET: &str = "azurerm_subnet.internal";
pub const NSG: &str = "azurerm_network_security_group.main";
pub const NSG_ASSOCIATION: &str = "azurerm_subnet_network_security_group_association.main";

/// Address of NIC slot `index`
pub fn nic_address(index: usize) -> String {
    slot_address(NIC_TYPE, index)
}

/// Address of VM slot `index`
pub fn vm_address(index: usize) -> String {
    slot_address(VM_TYPE, index)
}

fn tags_value(tags: &BTreeMap<String, String>) -> Value {
    json!(tags)
}

fn in_resource_group(attrs: &mut Attributes) {
    attrs.insert(
        "resource_group_name".into(),
        reference(RESOURCE_GROUP, "name"),
    );
    attrs.insert("location".into(), reference(RESOURCE_GROUP, "location"));
}

const PLACEMENT: &[&str] = &["name", "location", "resource_group_name"];

// ============================================================================
// Resource Group
// ============================================================================

#[derive(Debug, Clone)]
pub struct ResourceGroup {
    pub name: String,
    pub location: String,
    pub tags: BTreeMap<String, String>,
}

impl Resource for ResourceGroup {
    fn id(&self) -> String {
        RESOURCE_GROUP.to_string()
    }

    fn description(&self) -> String {
        format!("Resource group {} ({})", self.name, self.location)
    }

    fn resource_type(&self) -> &'static str {
        RESOURCE_GROUP_TYPE
    }

    fn attributes(&self) -> Attributes {
        Attributes::from([
            ("name".into(), json!(self.name)),
            ("location".into(), json!(self.location)),
            ("tags".into(), tags_value(&self.tags)),
        ])
    }

    fn force_new_attributes(&self) -> &[&'static str] {
        &["name", "location"]
    }
}

// ============================================================================
// Virtual Network
// ============================================================================

#[derive(Debug, Clone)]
pub struct VirtualNetwork {
    pub name: String,
    pub address_space: Vec<String>,
    pub tags: BTreeMap<String, String>,
}

impl Resource for VirtualNetwork {
    fn id(&self) -> String {
        VIRTUAL_NETWORK.to_string()
    }

    fn description(&self) -> String {
        format!("Virtual network {} {:?}", self.name, self.address_space)
    }

    fn resource_type(&self) -> &'static str {
        VIRTUAL_NETWORK_TYPE
    }

    fn attributes(&self) -> Attributes {
        let mut attrs = Attributes::from([
            ("name".into(), json!(self.name)),
            ("address_space".into(), json!(self.address_space)),
            ("tags".into(), tags_value(&self.tags)),
        ]);
        in_resource_group(&mut attrs);
        attrs
    }

    fn force_new_attributes(&self) -> &[&'static str] {
        PLACEMENT
    }
}

// ============================================================================
// Subnet
// ============================================================================

#[derive(Debug, Clone)]
pub struct Subnet {
    pub name: String,
    pub address_prefix: String,
}

impl Resource for Subnet {
    fn id(&self) -> String {
        SUBNET.to_string()
    }

    fn description(&self) -> String {
        format!("Subnet {} ({})", self.name, self.address_prefix)
    }

    fn resource_type(&self) -> &'static str {
        SUBNET_TYPE
    }

    fn attributes(&self) -> Attributes {
        Attributes::from([
            ("name".into(), json!(self.name)),
            (
                "resource_group_name".into(),
                reference(RESOURCE_GROUP, "name"),
            ),
            (
                "virtual_network_name".into(),
                reference(VIRTUAL_NETWORK, "name"),
            ),
            ("address_prefixes".into(), json!([self.address_prefix])),
        ])
    }

    fn force_new_attributes(&self) -> &[&'static str] {
        &["name", "resource_group_name", "virtual_network_name"]
    }
}

// ============================================================================
// Network Security Group
// ============================================================================

#[derive(Debug, Clone)]
pub struct NetworkSecurityGroup {
    pub name: String,
    pub rules: Vec<SecurityRule>,
    pub tags: BTreeMap<String, String>,
}

impl Resource for NetworkSecurityGroup {
    fn id(&self) -> String {
        NSG.to_string()
    }

    fn description(&self) -> String {
        format!("Network security group {} ({} rules)", self.name, self.rules.len())
    }

    fn resource_type(&self) -> &'static str {
        NSG_TYPE
    }

    fn attributes(&self) -> Attributes {
        let mut attrs = Attributes::from([
            ("name".into(), json!(self.name)),
            ("security_rule".into(), json!(self.rules)),
            ("tags".into(), tags_value(&self.tags)),
        ]);
        in_resource_group(&mut attrs);
        attrs
    }

    fn force_new_attributes(&self) -> &[&'static str] {
        PLACEMENT
    }
}

// ============================================================================
// NSG <-> Subnet Association
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct SubnetNsgAssociation;

impl Resource for SubnetNsgAssociation {
    fn id(&self) -> String {
        NSG_ASSOCIATION.to_string()
    }

    fn description(&self) -> String {
        "Attach network security group to subnet".to_string()
    }

    fn resource_type(&self) -> &'static str {
        NSG_ASSOCIATION_TYPE
    }

    fn attributes(&self) -> Attributes {
        Attributes::from([
            ("subnet_id".into(), reference(SUBNET, "id")),
            ("network_security_group_id".into(), reference(NSG, "id")),
        ])
    }

    fn force_new_attributes(&self) -> &[&'static str] {
        &["subnet_id", "network_security_group_id"]
    }
}

// ============================================================================
// Network Interface
// ============================================================================

#[derive(Debug, Clone)]
pub struct NetworkInterface {
    pub index: usize,
    pub name: String,
    pub tags: BTreeMap<String, String>,
}

impl NetworkInterface {
    pub fn new(base: &str, index: usize, tags: &BTreeMap<String, String>) -> Self {
        Self {
            index,
            name: slot_name(base, "nic", index),
            tags: tags.clone(),
        }
    }
}

impl Resource for NetworkInterface {
    fn id(&self) -> String {
        nic_address(self.index)
    }

    fn description(&self) -> String {
        format!("Network interface {}", self.name)
    }

    fn resource_type(&self) -> &'static str {
        NIC_TYPE
    }

    fn attributes(&self) -> Attributes {
        let mut attrs = Attributes::from([
            ("name".into(), json!(self.name)),
            (
                "ip_configuration".into(),
                json!([{
                    "name": "internal",
                    "subnet_id": reference(SUBNET, "id"),
                    "private_ip_address_allocation": "Dynamic",
                }]),
            ),
            ("tags".into(), tags_value(&self.tags)),
        ]);
        in_resource_group(&mut attrs);
        attrs
    }

    fn force_new_attributes(&self) -> &[&'static str] {
        PLACEMENT
    }
}

// ============================================================================
// Linux Virtual Machine
// ============================================================================

/// Marketplace image every VM boots from
pub const IMAGE_PUBLISHER: &str = "Canonical";
pub const IMAGE_OFFER: &str = "0001-com-ubuntu-server-jammy";
pub const IMAGE_SKU: &str = "22_04-lts-gen2";
pub const IMAGE_VERSION: &str = "latest";

#[derive(Debug, Clone)]
pub struct LinuxVirtualMachine {
    pub index: usize,
    pub name: String,
    pub size: String,
    pub admin_username: String,
    pub auth: AuthMode,
    pub tags: BTreeMap<String, String>,
}

impl Resource for LinuxVirtualMachine {
    fn id(&self) -> String {
        vm_address(self.index)
    }

    fn description(&self) -> String {
        format!(
            "Linux VM {} ({}, {})",
            self.name,
            self.size,
            self.auth.label()
        )
    }

    fn resource_type(&self) -> &'static str {
        VM_TYPE
    }

    fn attributes(&self) -> Attributes {
        let mut attrs = Attributes::from([
            ("name".into(), json!(self.name)),
            ("size".into(), json!(self.size)),
            ("admin_username".into(), json!(self.admin_username)),
            (
                "disable_password_authentication".into(),
                json!(self.auth.password_disabled()),
            ),
            (
                "network_interface_ids".into(),
                json!([reference(&nic_address(self.index), "id")]),
            ),
            (
                "os_disk".into(),
                json!({
                    "caching": "ReadWrite",
                    "storage_account_type": "Standard_LRS",
                }),
            ),
            (
                "source_image_reference".into(),
                json!({
                    "publisher": IMAGE_PUBLISHER,
                    "offer": IMAGE_OFFER,
                    "sku": IMAGE_SKU,
                    "version": IMAGE_VERSION,
                }),
            ),
            ("tags".into(), tags_value(&self.tags)),
        ]);
        in_resource_group(&mut attrs);

        match &self.auth {
            AuthMode::SshKey { public_key } => {
                attrs.insert(
                    "admin_ssh_key".into(),
                    json!([{
                        "username": self.admin_username,
                        "public_key": public_key,
                    }]),
                );
            }
            AuthMode::Password {
                password: Some(password),
            } => {
                attrs.insert("admin_password".into(), json!(password.expose()));
            }
            AuthMode::Password { password: None } => {}
        }

        attrs
    }

    fn sensitive_attributes(&self) -> &[&'static str] {
        &["admin_password"]
    }

    fn force_new_attributes(&self) -> &[&'static str] {
        &[
            "name",
            "location",
            "resource_group_name",
            "admin_username",
            "admin_password",
            "admin_ssh_key",
            "disable_password_authentication",
            "network_interface_ids",
            "source_image_reference",
        ]
    }
}
