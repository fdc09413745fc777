//! Error types for graph construction and provider calls

use thiserror::Error;

/// Errors raised while building or resolving a resource graph.
///
/// These are configuration errors: they are fatal to the run and never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// Two resources share the same address
    #[error("duplicate resource address: {0}")]
    DuplicateAddress(String),

    /// A resource references an address that is not declared
    #[error("{from} references undeclared resource {to}")]
    DanglingReference { from: String, to: String },

    /// The reference graph contains a cycle
    #[error("dependency cycle between: {}", .0.join(", "))]
    Cycle(Vec<String>),

    /// A reference points at an attribute the upstream resource has not realized
    #[error("{address}.{attribute} is not known yet")]
    UnresolvedReference { address: String, attribute: String },
}

/// Errors reported by a [`Provider`](crate::Provider).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// Temporary failure (throttling, timeouts); worth retrying
    #[error("transient provider failure: {0}")]
    Transient(String),

    /// The object already exists or is being modified elsewhere
    #[error("conflict: {0}")]
    Conflict(String),

    /// Subscription quota exhausted
    #[error("quota exceeded: {0}")]
    QuotaExceeded(String),

    /// Credentials missing or refused
    #[error("authorization failed: {0}")]
    AuthFailed(String),

    /// The provider refused the request as invalid
    #[error("rejected by provider: {0}")]
    Rejected(String),

    /// A reference could not be resolved before the call
    #[error(transparent)]
    Graph(#[from] GraphError),
}

impl ProviderError {
    /// Whether this error is typically transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}
