//! Diff computation between a plan and recorded state

use crate::planner::ExecutionPlan;
use crate::reference::{self, Reference};
use crate::resource::{Resource, ResourceExt, SealKey};
use crate::types::{Attributes, REDACTED, RecordedResource, Snapshot};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// What has to happen to a resource to converge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeAction {
    /// Not recorded yet
    Create,
    /// Recorded, mutable attributes differ
    Update,
    /// Recorded, an immutable attribute differs
    Replace,
    /// Recorded but no longer declared
    Delete,
}

impl ChangeAction {
    /// Plan symbol for display
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Create => "+",
            Self::Update => "~",
            Self::Replace => "-/+",
            Self::Delete => "-",
        }
    }
}

/// One attribute that differs between recorded and desired state
///
/// Sensitive values are already redacted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeChange {
    pub key: String,
    pub before: Option<Value>,
    pub after: Option<Value>,
    pub forces_replacement: bool,
}

/// A diff between recorded and desired state of a resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceDiff {
    /// Address of the resource
    pub resource_id: String,
    /// Type of the resource
    pub resource_type: String,
    /// Human-readable description
    pub description: String,
    /// Dependency stage (recorded stage for deletions)
    pub stage: usize,
    /// Required action
    pub action: ChangeAction,
    /// Attribute-level changes
    pub changes: Vec<AttributeChange>,
}

impl ResourceDiff {
    /// Create a diff from a resource, returning None if no changes needed
    ///
    /// Sensitive values are sealed with `key` before comparison.
    pub fn from_resource(
        resource: &dyn Resource,
        stage: usize,
        recorded: Option<&RecordedResource>,
        key: &SealKey,
    ) -> Option<Self> {
        let desired = resource.sealed_attributes(key);
        let shown = |key: &str, value: &Value| -> Value {
            if resource.is_sensitive(key) {
                Value::String(REDACTED.to_string())
            } else {
                value.clone()
            }
        };

        let Some(recorded) = recorded else {
            let changes = desired
                .iter()
                .map(|(k, v)| AttributeChange {
                    key: k.clone(),
                    before: None,
                    after: Some(shown(k, v)),
                    forces_replacement: false,
                })
                .collect();
            return Some(Self::new(resource, stage, ChangeAction::Create, changes));
        };

        let keys: BTreeSet<&String> = desired.keys().chain(recorded.attributes.keys()).collect();
        let changes: Vec<AttributeChange> = keys
            .into_iter()
            .filter(|k| desired.get(*k) != recorded.attributes.get(*k))
            .map(|k| AttributeChange {
                key: k.clone(),
                before: recorded.attributes.get(k).map(|v| shown(k, v)),
                after: desired.get(k).map(|v| shown(k, v)),
                forces_replacement: resource.force_new_attributes().contains(&k.as_str()),
            })
            .collect();

        if changes.is_empty() {
            return None;
        }

        let action = if changes.iter().any(|c| c.forces_replacement) {
            ChangeAction::Replace
        } else {
            ChangeAction::Update
        };
        Some(Self::new(resource, stage, action, changes))
    }

    /// Diff removing a recorded resource that is no longer declared
    pub fn deletion(address: &str, recorded: &RecordedResource) -> Self {
        Self {
            resource_id: address.to_string(),
            resource_type: recorded.resource_type.clone(),
            description: format!("{} (no longer declared)", address),
            stage: recorded.stage,
            action: ChangeAction::Delete,
            changes: Vec::new(),
        }
    }

    fn new(
        resource: &dyn Resource,
        stage: usize,
        action: ChangeAction,
        changes: Vec<AttributeChange>,
    ) -> Self {
        Self {
            resource_id: resource.id(),
            resource_type: resource.resource_type().to_string(),
            description: resource.description(),
            stage,
            action,
            changes,
        }
    }

    /// Check if this diff represents an addition
    pub fn is_addition(&self) -> bool {
        self.action == ChangeAction::Create
    }

    /// Check if this diff represents a removal
    pub fn is_removal(&self) -> bool {
        self.action == ChangeAction::Delete
    }

    /// Check if this diff represents an in-place modification
    pub fn is_modification(&self) -> bool {
        self.action == ChangeAction::Update
    }

    /// Check if this diff represents a replacement
    pub fn is_replacement(&self) -> bool {
        self.action == ChangeAction::Replace
    }
}

/// Compute diffs for a plan against recorded state
///
/// Deletions of recorded-but-undeclared resources come first, deepest stage
/// first; they are omitted for targeted plans. The remaining diffs follow
/// stage order. Attributes referencing a replaced dependency count as changed
/// too, so a dependent is replaced whenever such an attribute is force-new,
/// whatever else changed on it.
pub fn compute_diffs(plan: &ExecutionPlan, snapshot: &Snapshot) -> Vec<ResourceDiff> {
    let mut diffs = Vec::new();

    if !plan.targeted {
        let declared: BTreeSet<String> = plan.resources().map(|r| r.id()).collect();
        let mut orphans: Vec<ResourceDiff> = snapshot
            .resources
            .iter()
            .filter(|(address, _)| !declared.contains(*address))
            .map(|(address, recorded)| ResourceDiff::deletion(address, recorded))
            .collect();
        orphans.sort_by(|a, b| {
            b.stage
                .cmp(&a.stage)
                .then_with(|| a.resource_id.cmp(&b.resource_id))
        });
        diffs.extend(orphans);
    }

    let mut replaced: BTreeSet<String> = BTreeSet::new();
    for (stage, resources) in plan.stages.iter().enumerate() {
        for resource in resources {
            let recorded = snapshot.get(&resource.id());
            let mut diff =
                ResourceDiff::from_resource(resource.as_ref(), stage, recorded, &snapshot.seal_key);
            if let Some(recorded) = recorded {
                let inherited = upstream_changes(resource.as_ref(), recorded, &replaced);
                if !inherited.is_empty() {
                    diff = Some(merge_inherited(resource.as_ref(), stage, diff, inherited));
                }
            }

            if let Some(diff) = diff {
                if diff.is_replacement() {
                    replaced.insert(diff.resource_id.clone());
                }
                diffs.push(diff);
            }
        }
    }

    diffs
}

/// Changes of attributes that reference a replaced dependency
fn upstream_changes(
    resource: &dyn Resource,
    recorded: &RecordedResource,
    replaced: &BTreeSet<String>,
) -> Vec<AttributeChange> {
    if replaced.is_empty() {
        return Vec::new();
    }

    let attributes: Attributes = resource.attributes();
    attributes
        .iter()
        .filter(|(_, v)| {
            let mut refs: Vec<Reference> = Vec::new();
            reference::collect_references(v, &mut refs);
            refs.iter().any(|r| replaced.contains(&r.address))
        })
        .map(|(k, v)| AttributeChange {
            key: k.clone(),
            before: recorded.attributes.get(k).cloned(),
            after: Some(v.clone()),
            forces_replacement: resource.force_new_attributes().contains(&k.as_str()),
        })
        .collect()
}

/// Fold inherited changes into the resource's own diff and re-derive the action
fn merge_inherited(
    resource: &dyn Resource,
    stage: usize,
    own: Option<ResourceDiff>,
    inherited: Vec<AttributeChange>,
) -> ResourceDiff {
    let mut diff =
        own.unwrap_or_else(|| ResourceDiff::new(resource, stage, ChangeAction::Update, Vec::new()));
    for change in inherited {
        if !diff.changes.iter().any(|c| c.key == change.key) {
            diff.changes.push(change);
        }
    }
    diff.changes.sort_by(|a, b| a.key.cmp(&b.key));

    diff.action = if diff.changes.iter().any(|c| c.forces_replacement) {
        ChangeAction::Replace
    } else {
        ChangeAction::Update
    };
    diff
}

/// Diff summary statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffSummary {
    /// Number of resources to add
    pub additions: usize,
    /// Number of resources to remove
    pub removals: usize,
    /// Number of resources to update in place
    pub modifications: usize,
    /// Number of resources to replace
    pub replacements: usize,
}

impl DiffSummary {
    /// Create a summary from a list of diffs
    pub fn from_diffs(diffs: &[ResourceDiff]) -> Self {
        let mut summary = Self::default();
        for diff in diffs {
            match diff.action {
                ChangeAction::Create => summary.additions += 1,
                ChangeAction::Delete => summary.removals += 1,
                ChangeAction::Update => summary.modifications += 1,
                ChangeAction::Replace => summary.replacements += 1,
            }
        }
        summary
    }

    /// Total number of changes
    pub fn total(&self) -> usize {
        self.additions + self.removals + self.modifications + self.replacements
    }

    /// Check if there are any changes
    pub fn has_changes(&self) -> bool {
        self.total() > 0
    }
}

/// Group diffs by resource type
pub fn group_by_type(diffs: &[ResourceDiff]) -> BTreeMap<String, Vec<&ResourceDiff>> {
    let mut groups: BTreeMap<String, Vec<&ResourceDiff>> = BTreeMap::new();
    for diff in diffs {
        groups
            .entry(diff.resource_type.clone())
            .or_default()
            .push(diff);
    }
    groups
}
