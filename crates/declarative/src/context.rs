//! Apply context and provider traits
//!
//! These traits allow the declarative crate to be used without
//! depending on a specific cloud API, progress UI or prompt library.

use crate::error::{GraphError, ProviderError};
use crate::reference::{self, Reference};
use crate::resource::Resource;
use crate::types::{ApplyResult, Attributes, RecordedResource, Snapshot};
use anyhow::Result;

/// Backend that realizes resources
///
/// Implementations receive attributes with every reference already resolved
/// and return the attributes they computed (at least `id`).
pub trait Provider: Send + Sync {
    /// Create a resource that is not recorded yet
    fn create(
        &self,
        resource: &dyn Resource,
        resolved: &Attributes,
        ctx: &ApplyContext,
    ) -> Result<Attributes, ProviderError>;

    /// Update a recorded resource in place
    fn update(
        &self,
        resource: &dyn Resource,
        resolved: &Attributes,
        current: &RecordedResource,
        ctx: &ApplyContext,
    ) -> Result<Attributes, ProviderError>;

    /// Delete a recorded resource
    fn delete(&self, address: &str, current: &RecordedResource) -> Result<(), ProviderError>;
}

/// Progress callback for execution operations
pub trait ProgressCallback: Send {
    /// Called when starting a dependency stage (or the deletion pass)
    fn on_stage_start(&mut self, stage: usize, count: usize);

    /// Called when starting to apply a single resource
    fn on_resource_start(&mut self, id: &str, description: &str);

    /// Called when a resource application completes
    fn on_resource_complete(&mut self, id: &str, result: &ApplyResult);

    /// Called when a stage completes
    fn on_stage_complete(&mut self);
}

/// Confirmation callback for user interaction
pub trait ConfirmCallback: Send {
    /// Ask the user to confirm an action
    ///
    /// # Returns
    /// `true` if the user confirmed, `false` otherwise
    fn confirm(&mut self, prompt: &str) -> Result<bool>;
}

/// No-op progress callback
pub struct NoProgress;

impl ProgressCallback for NoProgress {
    fn on_stage_start(&mut self, _stage: usize, _count: usize) {}
    fn on_resource_start(&mut self, _id: &str, _description: &str) {}
    fn on_resource_complete(&mut self, _id: &str, _result: &ApplyResult) {}
    fn on_stage_complete(&mut self) {}
}

/// Auto-confirm callback (always returns true)
pub struct AutoConfirm;

impl ConfirmCallback for AutoConfirm {
    fn confirm(&mut self, _prompt: &str) -> Result<bool> {
        Ok(true)
    }
}

/// Auto-decline callback (always returns false)
pub struct AutoDecline;

impl ConfirmCallback for AutoDecline {
    fn confirm(&mut self, _prompt: &str) -> Result<bool> {
        Ok(false)
    }
}

/// Context passed to provider operations
pub struct ApplyContext<'a> {
    /// Resources realized by earlier stages
    pub snapshot: &'a Snapshot,
}

impl<'a> ApplyContext<'a> {
    /// Create a new apply context over a snapshot
    pub fn new(snapshot: &'a Snapshot) -> Self {
        Self { snapshot }
    }

    /// Resolve every reference in `attributes` against the snapshot
    pub fn resolve(&self, attributes: &Attributes) -> Result<Attributes, GraphError> {
        reference::resolve(attributes, &|r: &Reference| {
            self.snapshot.attribute(&r.address, &r.attribute).cloned()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::reference;
    use serde_json::json;

    #[test]
    fn test_context_resolves_from_snapshot() {
        let mut snapshot = Snapshot::default();
        let mut computed = Attributes::new();
        computed.insert("id".into(), json!("/subnets/internal"));
        snapshot.insert(
            "subnet.internal",
            RecordedResource {
                resource_type: "subnet".into(),
                stage: 2,
                attributes: Attributes::new(),
                computed,
            },
        );

        let ctx = ApplyContext::new(&snapshot);
        let mut attrs = Attributes::new();
        attrs.insert("subnet_id".into(), reference("subnet.internal", "id"));
        let resolved = ctx.resolve(&attrs).unwrap();
        assert_eq!(resolved["subnet_id"], json!("/subnets/internal"));

        attrs.insert("other".into(), reference("subnet.missing", "id"));
        assert!(ctx.resolve(&attrs).is_err());
    }

    #[test]
    fn test_confirm_callbacks() {
        assert!(AutoConfirm.confirm("go?").unwrap());
        assert!(!AutoDecline.confirm("go?").unwrap());
    }
}
