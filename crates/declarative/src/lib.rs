//! # Declarative
//!
//! A framework for declarative resource graphs.
//!
//! This crate provides the core abstractions for declaring desired state,
//! inferring dependency order from attribute references, diffing against a
//! recorded snapshot, and converging through a provider.
//!
//! ## Core Concepts
//!
//! - **Resource**: A node with an address, a type and declared attributes
//! - **Reference**: An attribute value of the form `${address.attribute}`;
//!   every reference is also a dependency edge
//! - **ExecutionPlan**: Resources grouped into dependency stages
//! - **Snapshot**: What a previous run realized (ids, computed attributes)
//! - **Executor**: Applies changed resources stage by stage, in parallel
//!   within a stage, retrying transient provider failures
//!
//! ## Example
//!
//! ```ignore
//! use declarative::{
//!     reference, Attributes, ExecutionPlan, ExecuteOptions, Resource, Snapshot,
//!     execute_simple,
//! };
//!
//! #[derive(Debug)]
//! struct Network { name: String }
//!
//! impl Resource for Network {
//!     fn id(&self) -> String { "network.main".into() }
//!     fn description(&self) -> String { format!("Network {}", self.name) }
//!     fn resource_type(&self) -> &'static str { "network" }
//!     fn attributes(&self) -> Attributes {
//!         let mut attrs = Attributes::new();
//!         attrs.insert("name".into(), self.name.clone().into());
//!         attrs
//!     }
//! }
//!
//! let plan = ExecutionPlan::build(vec![Box::new(Network { name: "core".into() })])?;
//! let mut snapshot = Snapshot::default();
//! let summary = execute_simple(&plan, &mut snapshot, &ExecuteOptions::default(), &provider)?;
//! ```
//!
//! ## Provider Traits
//!
//! The crate uses traits for dependency injection:
//!
//! - [`Provider`]: Realizes, updates and deletes resources
//! - [`ProgressCallback`]: Receives progress updates
//! - [`ConfirmCallback`]: Handles user confirmations
//! - [`RetryCallback`]: Observes retries of transient failures

pub mod context;
pub mod diff;
pub mod error;
pub mod executor;
pub mod planner;
pub mod reference;
pub mod resource;
pub mod retry;
pub mod types;

// Re-export main types at crate root
pub use context::{
    ApplyContext, AutoConfirm, AutoDecline, ConfirmCallback, NoProgress, ProgressCallback,
    Provider,
};
pub use diff::{
    AttributeChange, ChangeAction, DiffSummary, ResourceDiff, compute_diffs, group_by_type,
};
pub use error::{GraphError, ProviderError};
pub use executor::{execute, execute_simple};
pub use planner::ExecutionPlan;
pub use reference::{Reference, reference};
pub use resource::{BoxedResource, Resource, ResourceExt, SealKey};
pub use retry::{LogCallback, NoCallback, RetryCallback, RetryConfig, with_retry};
pub use types::{
    ApplyResult, Attributes, ExecuteOptions, ExecuteSummary, REDACTED, RecordedResource, Snapshot,
};
