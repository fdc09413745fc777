//! Attribute references
//!
//! A string attribute of the exact form `${<address>.<attribute>}` refers to
//! an attribute of another resource. References are the only source of
//! dependency edges: a resource depends on every address it references.

use crate::error::GraphError;
use crate::types::Attributes;
use serde_json::Value;
use std::fmt;

/// A parsed `${address.attribute}` reference
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Reference {
    pub address: String,
    pub attribute: String,
}

impl Reference {
    /// Parse a reference expression, returning None for plain strings
    pub fn parse(expr: &str) -> Option<Self> {
        let inner = expr.strip_prefix("${")?.strip_suffix('}')?;
        let (address, attribute) = inner.rsplit_once('.')?;
        if address.is_empty() || attribute.is_empty() || attribute.contains(']') {
            return None;
        }
        Some(Self {
            address: address.to_string(),
            attribute: attribute.to_string(),
        })
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${{{}.{}}}", self.address, self.attribute)
    }
}

/// Build a reference value to `address.attribute`
pub fn reference(address: &str, attribute: &str) -> Value {
    Value::String(format!("${{{address}.{attribute}}}"))
}

/// Collect every reference found in a value, depth first
pub fn collect_references(value: &Value, out: &mut Vec<Reference>) {
    match value {
        Value::String(s) => {
            if let Some(r) = Reference::parse(s) {
                out.push(r);
            }
        }
        Value::Array(items) => items.iter().for_each(|v| collect_references(v, out)),
        Value::Object(map) => map.values().for_each(|v| collect_references(v, out)),
        _ => {}
    }
}

/// Addresses referenced by a set of attributes, deduplicated in first-seen order
pub fn dependencies(attributes: &Attributes) -> Vec<String> {
    let mut refs = Vec::new();
    for value in attributes.values() {
        collect_references(value, &mut refs);
    }

    let mut seen = Vec::new();
    for r in refs {
        if !seen.contains(&r.address) {
            seen.push(r.address);
        }
    }
    seen
}

/// Replace every reference with the value returned by `lookup`
///
/// Fails with [`GraphError::UnresolvedReference`] when the lookup has no value.
pub fn resolve<F>(attributes: &Attributes, lookup: &F) -> Result<Attributes, GraphError>
where
    F: Fn(&Reference) -> Option<Value>,
{
    attributes
        .iter()
        .map(|(k, v)| Ok((k.clone(), resolve_value(v, lookup)?)))
        .collect()
}

fn resolve_value<F>(value: &Value, lookup: &F) -> Result<Value, GraphError>
where
    F: Fn(&Reference) -> Option<Value>,
{
    match value {
        Value::String(s) => match Reference::parse(s) {
            Some(r) => lookup(&r).ok_or(GraphError::UnresolvedReference {
                address: r.address,
                attribute: r.attribute,
            }),
            None => Ok(value.clone()),
        },
        Value::Array(items) => items
            .iter()
            .map(|v| resolve_value(v, lookup))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| Ok((k.clone(), resolve_value(v, lookup)?)))
            .collect::<Result<serde_json::Map<_, _>, GraphError>>()
            .map(Value::Object),
        _ => Ok(value.clone()),
    }
}
