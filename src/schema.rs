//! Input schema for the topology
//!
//! Every field has a default so a minimal file (or no file at all) describes
//! a valid single-VM deployment. Validation is explicit and runs before any
//! resource is planned.

use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

use crate::topology::cidr::Ipv4Cidr;

/// Smallest accepted `vm_count`
pub const MIN_VM_COUNT: i64 = 1;

/// Largest accepted `vm_count`
pub const MAX_VM_COUNT: i64 = 10;

/// Provider priority range for security rules
const RULE_PRIORITY_RANGE: std::ops::RangeInclusive<u32> = 100..=4096;

// ============================================================================
// Validation Errors
// ============================================================================

/// Configuration rejected before planning
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("VM count must be between 1 and 10.")]
    VmCountOutOfRange { count: i64 },

    #[error("invalid CIDR '{value}': {reason}")]
    InvalidCidr { value: String, reason: String },

    #[error("subnet prefix {prefix} is outside the virtual network address space ({space})")]
    SubnetOutsideAddressSpace { prefix: String, space: String },

    #[error("security rules '{first}' and '{second}' share priority {priority}")]
    DuplicateRulePriority {
        priority: u32,
        first: String,
        second: String,
    },

    #[error("security rule '{name}' has priority {priority}; allowed range is 100-4096")]
    RulePriorityOutOfRange { name: String, priority: u32 },

    #[error("provider versions must not be mixed: {}", .0.join(", "))]
    MixedProviderVersions(Vec<String>),

    #[error("unsupported provider version '{0}' (expected =3.1 or =4.1.0)")]
    UnsupportedProviderVersion(String),

    #[error("provider {0} requires subscription_id to be set")]
    MissingSubscriptionId(String),
}

// ============================================================================
// Sensitive Values
// ============================================================================

/// A string that is never printed or serialized in plaintext
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Sensitive(String);

impl Sensitive {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The plaintext, for handing to the provider only
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Sensitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sensitive({})", declarative::REDACTED)
    }
}

impl fmt::Display for Sensitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(declarative::REDACTED)
    }
}

impl Serialize for Sensitive {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(declarative::REDACTED)
    }
}

// ============================================================================
// Inputs
// ============================================================================

/// All inputs of the topology descriptor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Inputs {
    /// Subscription the resources live in (required by provider 4.x)
    #[serde(default)]
    pub subscription_id: String,

    #[serde(default = "default_resource_group_name")]
    pub resource_group_name: String,

    #[serde(default = "default_location")]
    pub location: String,

    /// When false, no NICs or VMs are declared regardless of `vm_count`
    #[serde(default = "default_true")]
    pub deploy_vms: bool,

    /// Requested number of VMs, 1-10
    #[serde(default = "default_vm_count")]
    pub vm_count: i64,

    #[serde(default = "default_vm_size")]
    pub vm_size: String,

    #[serde(default = "default_admin_username")]
    pub admin_username: String,

    /// Used only when no SSH key is given
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_password: Option<Sensitive>,

    /// When set, password authentication is disabled on every VM
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh_public_key: Option<String>,

    #[serde(default = "default_tags")]
    pub tags: BTreeMap<String, String>,

    #[serde(default)]
    pub provider: ProviderConfig,

    #[serde(default)]
    pub network: NetworkConfig,

    #[serde(default = "default_security_rules")]
    pub security_rules: Vec<SecurityRule>,
}

impl Default for Inputs {
    fn default() -> Self {
        Self {
            subscription_id: String::new(),
            resource_group_name: default_resource_group_name(),
            location: default_location(),
            deploy_vms: true,
            vm_count: default_vm_count(),
            vm_size: default_vm_size(),
            admin_username: default_admin_username(),
            admin_password: None,
            ssh_public_key: None,
            tags: default_tags(),
            provider: ProviderConfig::default(),
            network: NetworkConfig::default(),
            security_rules: default_security_rules(),
        }
    }
}

fn default_resource_group_name() -> String {
    "rg-vm-topology".to_string()
}

fn default_location() -> String {
    "East US".to_string()
}

fn default_true() -> bool {
    true
}

fn default_vm_count() -> i64 {
    1
}

fn default_vm_size() -> String {
    "Standard_B1s".to_string()
}

fn default_admin_username() -> String {
    "azureuser".to_string()
}

fn default_tags() -> BTreeMap<String, String> {
    BTreeMap::from([
        ("environment".to_string(), "dev".to_string()),
        ("managed_by".to_string(), "topoform".to_string()),
    ])
}

fn default_security_rules() -> Vec<SecurityRule> {
    vec![SecurityRule {
        name: "SSH".to_string(),
        priority: 1001,
        direction: Direction::Inbound,
        access: Access::Allow,
        protocol: Protocol::Tcp,
        source_port_range: "*".to_string(),
        destination_port_range: "22".to_string(),
        source_address_prefix: "*".to_string(),
        destination_address_prefix: "*".to_string(),
    }]
}

impl Inputs {
    /// Validate the inputs
    ///
    /// The VM count is checked first so an out-of-range count always reports
    /// the same message, whatever else is wrong.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(MIN_VM_COUNT..=MAX_VM_COUNT).contains(&self.vm_count) {
            return Err(ValidationError::VmCountOutOfRange {
                count: self.vm_count,
            });
        }

        let version = self.provider.pin()?;
        if version.requires_subscription_id() && self.subscription_id.trim().is_empty() {
            return Err(ValidationError::MissingSubscriptionId(
                version.as_str().to_string(),
            ));
        }

        self.network.validate()?;
        validate_rules(&self.security_rules)?;

        Ok(())
    }

    /// Whether both authentication inputs were supplied
    ///
    /// The SSH key wins; callers may want to warn that the password is ignored.
    pub fn has_conflicting_credentials(&self) -> bool {
        self.ssh_public_key.is_some() && self.admin_password.is_some()
    }
}

// ============================================================================
// Provider
// ============================================================================

/// Supported provider releases; exactly one may be selected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderVersion {
    V3_1,
    V4_1_0,
}

impl ProviderVersion {
    /// Version constraint as written in configuration
    pub fn as_str(self) -> &'static str {
        match self {
            Self::V3_1 => "=3.1",
            Self::V4_1_0 => "=4.1.0",
        }
    }

    /// Provider 4.x refuses to start without an explicit subscription
    pub fn requires_subscription_id(self) -> bool {
        matches!(self, Self::V4_1_0)
    }

    fn parse(value: &str) -> Result<Self, ValidationError> {
        match value.trim().trim_start_matches('=') {
            "3.1" => Ok(Self::V3_1),
            "4.1.0" => Ok(Self::V4_1_0),
            _ => Err(ValidationError::UnsupportedProviderVersion(
                value.to_string(),
            )),
        }
    }
}

impl fmt::Display for ProviderVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `version = "=4.1.0"` or `version = ["=4.1.0"]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VersionSpec {
    One(String),
    Many(Vec<String>),
}

/// Provider selection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_provider_version")]
    pub version: VersionSpec,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            version: default_provider_version(),
        }
    }
}

fn default_provider_version() -> VersionSpec {
    VersionSpec::One(ProviderVersion::V4_1_0.as_str().to_string())
}

impl ProviderConfig {
    /// Resolve the single pinned provider version
    pub fn pin(&self) -> Result<ProviderVersion, ValidationError> {
        match &self.version {
            VersionSpec::One(v) => ProviderVersion::parse(v),
            VersionSpec::Many(list) => {
                let mut pins: Vec<ProviderVersion> = Vec::new();
                for v in list {
                    let pin = ProviderVersion::parse(v)?;
                    if !pins.contains(&pin) {
                        pins.push(pin);
                    }
                }
                match pins.as_slice() {
                    [one] => Ok(*one),
                    [] => Err(ValidationError::UnsupportedProviderVersion(String::new())),
                    _ => Err(ValidationError::MixedProviderVersions(
                        pins.iter().map(|p| p.as_str().to_string()).collect(),
                    )),
                }
            }
        }
    }
}

// ============================================================================
// Network
// ============================================================================

/// Address plan of the virtual network
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_address_space")]
    pub address_space: Vec<String>,

    #[serde(default = "default_subnet_prefix")]
    pub subnet_prefix: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            address_space: default_address_space(),
            subnet_prefix: default_subnet_prefix(),
        }
    }
}

fn default_address_space() -> Vec<String> {
    vec!["10.0.0.0/16".to_string()]
}

fn default_subnet_prefix() -> String {
    "10.0.1.0/24".to_string()
}

impl NetworkConfig {
    /// Parse every CIDR and check the subnet lies inside the address space
    pub fn validate(&self) -> Result<(), ValidationError> {
        let space = self
            .address_space
            .iter()
            .map(|c| parse_cidr(c))
            .collect::<Result<Vec<_>, _>>()?;
        let subnet = parse_cidr(&self.subnet_prefix)?;

        if !space.iter().any(|s| s.contains(&subnet)) {
            return Err(ValidationError::SubnetOutsideAddressSpace {
                prefix: self.subnet_prefix.clone(),
                space: self.address_space.join(", "),
            });
        }
        Ok(())
    }

    /// Parsed subnet prefix
    pub fn subnet(&self) -> Result<Ipv4Cidr, ValidationError> {
        parse_cidr(&self.subnet_prefix)
    }
}

fn parse_cidr(value: &str) -> Result<Ipv4Cidr, ValidationError> {
    value.parse().map_err(|reason: String| ValidationError::InvalidCidr {
        value: value.to_string(),
        reason,
    })
}

// ============================================================================
// Security Rules
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Inbound,
    Outbound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Access {
    Allow,
    Deny,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Protocol {
    Tcp,
    Udp,
    Icmp,
    #[serde(rename = "*")]
    Any,
}

/// One NSG rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityRule {
    pub name: String,
    pub priority: u32,
    pub direction: Direction,
    pub access: Access,
    pub protocol: Protocol,
    #[serde(default = "any")]
    pub source_port_range: String,
    pub destination_port_range: String,
    #[serde(default = "any")]
    pub source_address_prefix: String,
    #[serde(default = "any")]
    pub destination_address_prefix: String,
}

fn any() -> String {
    "*".to_string()
}

fn validate_rules(rules: &[SecurityRule]) -> Result<(), ValidationError> {
    let mut seen: BTreeMap<u32, &str> = BTreeMap::new();
    for rule in rules {
        if !RULE_PRIORITY_RANGE.contains(&rule.priority) {
            return Err(ValidationError::RulePriorityOutOfRange {
                name: rule.name.clone(),
                priority: rule.priority,
            });
        }
        if let Some(first) = seen.insert(rule.priority, &rule.name) {
            return Err(ValidationError::DuplicateRulePriority {
                priority: rule.priority,
                first: first.to_string(),
                second: rule.name.clone(),
            });
        }
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> Inputs {
        Inputs {
            subscription_id: "00000000-0000-0000-0000-000000000000".to_string(),
            ..Inputs::default()
        }
    }

    #[test]
    fn test_parse_example_inputs() {
        let toml = r#"
subscription_id = "sub-1"
resource_group_name = "demo"
location = "West Europe"
vm_count = 3
admin_password = "P@ssw0rd1234!"

[tags]
owner = "platform"

[provider]
version = "=3.1"

[network]
address_space = ["10.10.0.0/16"]
subnet_prefix = "10.10.2.0/24"

[[security_rules]]
name = "SSH"
priority = 1001
direction = "Inbound"
access = "Allow"
protocol = "Tcp"
destination_port_range = "22"

[[security_rules]]
name = "HTTP"
priority = 1002
direction = "Inbound"
access = "Allow"
protocol = "*"
destination_port_range = "80"
"#;

        let inputs: Inputs = toml::from_str(toml).expect("Failed to parse inputs");

        assert_eq!(inputs.resource_group_name, "demo");
        assert_eq!(inputs.vm_count, 3);
        assert!(inputs.deploy_vms);
        assert_eq!(inputs.vm_size, "Standard_B1s");
        assert_eq!(inputs.admin_username, "azureuser");
        assert_eq!(inputs.admin_password.as_ref().unwrap().expose(), "P@ssw0rd1234!");
        assert!(inputs.ssh_public_key.is_none());
        assert_eq!(inputs.tags.len(), 1);
        assert_eq!(inputs.provider.pin().unwrap(), ProviderVersion::V3_1);
        assert_eq!(inputs.security_rules[1].protocol, Protocol::Any);
        assert_eq!(inputs.security_rules[1].source_address_prefix, "*");
        assert!(inputs.validate().is_ok());
    }

    #[test]
    fn test_defaults_are_valid_with_subscription() {
        assert!(valid().validate().is_ok());
        assert_eq!(valid().security_rules[0].priority, 1001);
    }

    #[test]
    fn test_vm_count_bounds() {
        for count in MIN_VM_COUNT..=MAX_VM_COUNT {
            let inputs = Inputs {
                vm_count: count,
                ..valid()
            };
            assert!(inputs.validate().is_ok(), "count {count} should be valid");
        }

        for count in [-1, 0, 11, 100] {
            let inputs = Inputs {
                vm_count: count,
                ..valid()
            };
            let err = inputs.validate().unwrap_err();
            assert_eq!(err, ValidationError::VmCountOutOfRange { count });
            assert_eq!(err.to_string(), "VM count must be between 1 and 10.");
        }
    }

    #[test]
    fn test_vm_count_checked_even_when_not_deploying() {
        let inputs = Inputs {
            deploy_vms: false,
            vm_count: 0,
            ..valid()
        };
        assert!(matches!(
            inputs.validate(),
            Err(ValidationError::VmCountOutOfRange { .. })
        ));
    }

    #[test]
    fn test_vm_count_checked_before_anything_else() {
        let inputs = Inputs {
            vm_count: 42,
            subscription_id: String::new(),
            network: NetworkConfig {
                address_space: vec!["nonsense".into()],
                subnet_prefix: "10.0.1.0/24".into(),
            },
            ..Inputs::default()
        };
        assert_eq!(
            inputs.validate().unwrap_err().to_string(),
            "VM count must be between 1 and 10."
        );
    }

    #[test]
    fn test_provider_pins() {
        let mixed = ProviderConfig {
            version: VersionSpec::Many(vec!["=3.1".into(), "=4.1.0".into()]),
        };
        assert_eq!(
            mixed.pin().unwrap_err(),
            ValidationError::MixedProviderVersions(vec!["=3.1".into(), "=4.1.0".into()])
        );

        let repeated = ProviderConfig {
            version: VersionSpec::Many(vec!["=4.1.0".into(), "4.1.0".into()]),
        };
        assert_eq!(repeated.pin().unwrap(), ProviderVersion::V4_1_0);

        let unknown = ProviderConfig {
            version: VersionSpec::One("~>3.0".into()),
        };
        assert!(matches!(
            unknown.pin(),
            Err(ValidationError::UnsupportedProviderVersion(_))
        ));
    }

    #[test]
    fn test_subscription_required_only_for_v4() {
        let v4 = Inputs::default();
        assert_eq!(
            v4.validate().unwrap_err(),
            ValidationError::MissingSubscriptionId("=4.1.0".into())
        );

        let v3 = Inputs {
            provider: ProviderConfig {
                version: VersionSpec::One("=3.1".into()),
            },
            ..Inputs::default()
        };
        assert!(v3.validate().is_ok());
    }

    #[test]
    fn test_subnet_must_fit_address_space() {
        let inputs = Inputs {
            network: NetworkConfig {
                address_space: vec!["10.0.0.0/16".into()],
                subnet_prefix: "10.1.0.0/24".into(),
            },
            ..valid()
        };
        assert!(matches!(
            inputs.validate(),
            Err(ValidationError::SubnetOutsideAddressSpace { .. })
        ));

        let second_space = Inputs {
            network: NetworkConfig {
                address_space: vec!["10.0.0.0/16".into(), "10.1.0.0/16".into()],
                subnet_prefix: "10.1.0.0/24".into(),
            },
            ..valid()
        };
        assert!(second_space.validate().is_ok());
    }

    #[test]
    fn test_invalid_cidr_reported() {
        let inputs = Inputs {
            network: NetworkConfig {
                address_space: vec!["10.0.0.0/33".into()],
                subnet_prefix: "10.0.1.0/24".into(),
            },
            ..valid()
        };
        assert!(matches!(
            inputs.validate(),
            Err(ValidationError::InvalidCidr { .. })
        ));
    }

    #[test]
    fn test_rule_priorities() {
        let mut rules = default_security_rules();
        let mut http = rules[0].clone();
        http.name = "HTTP".into();
        rules.push(http);

        let inputs = Inputs {
            security_rules: rules.clone(),
            ..valid()
        };
        assert_eq!(
            inputs.validate().unwrap_err(),
            ValidationError::DuplicateRulePriority {
                priority: 1001,
                first: "SSH".into(),
                second: "HTTP".into(),
            }
        );

        rules[1].priority = 50;
        let inputs = Inputs {
            security_rules: rules,
            ..valid()
        };
        assert!(matches!(
            inputs.validate(),
            Err(ValidationError::RulePriorityOutOfRange { priority: 50, .. })
        ));
    }

    #[test]
    fn test_sensitive_never_printed() {
        let secret = Sensitive::new("hunter2");
        assert_eq!(secret.to_string(), declarative::REDACTED);
        assert!(!format!("{secret:?}").contains("hunter2"));

        let inputs = Inputs {
            admin_password: Some(secret),
            ..valid()
        };
        let rendered = toml::to_string(&inputs).unwrap();
        assert!(!rendered.contains("hunter2"));
        assert!(!inputs.has_conflicting_credentials());
    }
}
