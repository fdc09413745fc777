//! Core types for declarative resource management

use crate::resource::SealKey;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Declared or computed attributes of a resource, ordered by key
pub type Attributes = BTreeMap<String, serde_json::Value>;

/// Placeholder shown instead of sensitive values
pub const REDACTED: &str = "(sensitive value)";

/// What a previous run realized for one resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedResource {
    /// Type of the resource
    pub resource_type: String,
    /// Dependency stage the resource was applied in
    pub stage: usize,
    /// Declared attributes as applied (sensitive values sealed)
    pub attributes: Attributes,
    /// Attributes the provider computed (`id`, allocated addresses, ...)
    #[serde(default)]
    pub computed: Attributes,
}

impl RecordedResource {
    /// Look up an attribute, preferring computed values over declared ones
    pub fn get(&self, attribute: &str) -> Option<&serde_json::Value> {
        self.computed
            .get(attribute)
            .or_else(|| self.attributes.get(attribute))
    }

    /// Provider id of the realized object, if any
    pub fn object_id(&self) -> Option<&str> {
        self.computed.get("id").and_then(|v| v.as_str())
    }
}

/// Recorded state of every realized resource, keyed by address
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Key for sealing sensitive values recorded in this snapshot
    #[serde(default = "SealKey::generate")]
    pub seal_key: SealKey,
    #[serde(default)]
    pub resources: BTreeMap<String, RecordedResource>,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            seal_key: SealKey::generate(),
            resources: BTreeMap::new(),
        }
    }
}

impl Snapshot {
    /// Recorded entry for an address
    pub fn get(&self, address: &str) -> Option<&RecordedResource> {
        self.resources.get(address)
    }

    /// Record (or overwrite) a realized resource
    pub fn insert(&mut self, address: impl Into<String>, record: RecordedResource) {
        self.resources.insert(address.into(), record);
    }

    /// Forget a resource
    pub fn remove(&mut self, address: &str) -> Option<RecordedResource> {
        self.resources.remove(address)
    }

    /// Look up a single attribute of a recorded resource
    pub fn attribute(&self, address: &str, attribute: &str) -> Option<&serde_json::Value> {
        self.get(address).and_then(|r| r.get(attribute))
    }

    /// Number of recorded resources
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Check if nothing is recorded
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

/// Result of applying a resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApplyResult {
    /// No changes needed
    NoChange,
    /// Resource was created
    Created,
    /// Resource was updated in place
    Modified,
    /// Resource was destroyed and created again
    Replaced,
    /// Resource was removed
    Removed,
    /// Apply failed
    Failed { error: String },
    /// Apply was skipped
    Skipped { reason: String },
}

impl ApplyResult {
    /// Check if the result represents success (no failure)
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }

    /// Check if the result represents a change
    pub fn is_change(&self) -> bool {
        matches!(
            self,
            Self::Created | Self::Modified | Self::Replaced | Self::Removed
        )
    }
}

/// Summary of execution results
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteSummary {
    pub created: usize,
    pub modified: usize,
    pub replaced: usize,
    pub removed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub no_change: usize,
    /// Addresses and messages of failed resources
    #[serde(default)]
    pub failures: Vec<(String, String)>,
}

impl ExecuteSummary {
    /// Total number of actual changes made
    pub fn total_changes(&self) -> usize {
        self.created + self.modified + self.replaced + self.removed
    }

    /// Check if execution was fully successful (no failures)
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// Total number of resources processed
    pub fn total(&self) -> usize {
        self.total_changes() + self.skipped + self.failed + self.no_change
    }

    /// Add a result to the summary
    pub fn add_result(&mut self, address: &str, result: &ApplyResult) {
        match result {
            ApplyResult::NoChange => self.no_change += 1,
            ApplyResult::Created => self.created += 1,
            ApplyResult::Modified => self.modified += 1,
            ApplyResult::Replaced => self.replaced += 1,
            ApplyResult::Removed => self.removed += 1,
            ApplyResult::Failed { error } => {
                self.failed += 1;
                self.failures.push((address.to_string(), error.clone()));
            }
            ApplyResult::Skipped { .. } => self.skipped += 1,
        }
    }
}

/// Options for execution
#[derive(Debug, Clone)]
pub struct ExecuteOptions {
    /// Number of parallel jobs within a stage
    pub jobs: usize,
    /// Retry policy for transient provider failures
    pub retry: crate::retry::RetryConfig,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            jobs: 4,
            retry: crate::retry::RetryConfig::default(),
        }
    }
}
