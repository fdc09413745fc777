//! Resource trait for declarative graphs
//!
//! A Resource is a node of the desired-state graph: an address, a type and a
//! set of declared attributes. Edges are never declared explicitly; they are
//! inferred from `${address.attribute}` references inside the attributes.

use crate::reference;
use crate::types::{Attributes, REDACTED};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Core trait for declarative resources
///
/// # Example
///
/// ```ignore
/// use declarative::{reference, Attributes, Resource};
///
/// #[derive(Debug)]
/// struct Subnet { prefix: String }
///
/// impl Resource for Subnet {
///     fn id(&self) -> String { "subnet.internal".into() }
///     fn description(&self) -> String { format!("Subnet {}", self.prefix) }
///     fn resource_type(&self) -> &'static str { "subnet" }
///     fn attributes(&self) -> Attributes {
///         let mut attrs = Attributes::new();
///         attrs.insert("address_prefix".into(), self.prefix.clone().into());
///         attrs.insert("network_name".into(), reference("network.main", "name"));
///         attrs
///     }
/// }
/// ```
pub trait Resource: Send + Sync + fmt::Debug {
    /// Unique address of this resource within the graph
    ///
    /// Examples:
    /// - "azurerm_resource_group.main"
    /// - "azurerm_network_interface.vm[0]"
    fn id(&self) -> String;

    /// Human-readable description of what this resource is
    fn description(&self) -> String;

    /// Resource type category, used for grouping and filtering
    fn resource_type(&self) -> &'static str;

    /// Declared attributes, possibly containing references
    fn attributes(&self) -> Attributes;

    /// Top-level attribute keys whose values must never be displayed
    fn sensitive_attributes(&self) -> &[&'static str] {
        &[]
    }

    /// Top-level attribute keys that cannot be updated in place
    ///
    /// A change to any of these replaces the resource.
    fn force_new_attributes(&self) -> &[&'static str] {
        &[]
    }

    /// Addresses this resource depends on, inferred from its references
    fn depends_on(&self) -> Vec<String> {
        reference::dependencies(&self.attributes())
    }
}

/// A boxed resource for type-erased storage
pub type BoxedResource = Box<dyn Resource>;

/// Extension helpers available on every resource
pub trait ResourceExt {
    /// Check if a top-level attribute is sensitive
    fn is_sensitive(&self, key: &str) -> bool;

    /// Attributes with sensitive values replaced by a keyed one-way seal
    ///
    /// This is what gets recorded and compared; the plaintext never leaves
    /// the process.
    fn sealed_attributes(&self, key: &SealKey) -> Attributes;

    /// Attributes with sensitive values replaced by [`REDACTED`]
    fn display_attributes(&self) -> Attributes;
}

impl<R: Resource + ?Sized> ResourceExt for R {
    fn is_sensitive(&self, key: &str) -> bool {
        self.sensitive_attributes().contains(&key)
    }

    fn sealed_attributes(&self, key: &SealKey) -> Attributes {
        self.attributes()
            .into_iter()
            .map(|(k, v)| {
                if self.is_sensitive(&k) {
                    let sealed = seal(&v, key);
                    (k, sealed)
                } else {
                    (k, v)
                }
            })
            .collect()
    }

    fn display_attributes(&self) -> Attributes {
        self.attributes()
            .into_iter()
            .map(|(k, v)| {
                if self.is_sensitive(&k) {
                    (k, Value::String(REDACTED.to_string()))
                } else {
                    (k, v)
                }
            })
            .collect()
    }
}

/// Secret key for sealing sensitive values, generated once per snapshot
///
/// Keying the hash means a leaked state file cannot be checked against a
/// dictionary without the key.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SealKey([u8; 32]);

impl SealKey {
    /// Fresh random key
    pub fn generate() -> Self {
        Self(rand::random())
    }

    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for SealKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SealKey(..)")
    }
}

impl From<SealKey> for String {
    fn from(key: SealKey) -> Self {
        key.0.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl TryFrom<String> for SealKey {
    type Error = String;

    fn try_from(hex: String) -> Result<Self, Self::Error> {
        if hex.len() != 64 || !hex.is_ascii() {
            return Err(format!("seal key must be 64 hex digits, got {}", hex.len()));
        }
        let mut bytes = [0u8; 32];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16)
                .map_err(|e| format!("invalid seal key: {e}"))?;
        }
        Ok(Self(bytes))
    }
}

/// Keyed one-way seal of a sensitive value
pub fn seal(value: &Value, key: &SealKey) -> Value {
    let hash = blake3::keyed_hash(key.as_bytes(), value.to_string().as_bytes());
    Value::String(format!("blake3:{}", hash.to_hex()))
}
