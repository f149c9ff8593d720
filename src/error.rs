//! Error types for stratus-edge.

/// Opaque error produced by a function handler.
///
/// Handlers are supplied by callers and may fail in arbitrary ways; the
/// original cause is preserved as the source of [`EdgeError::Execution`].
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type alias using [`EdgeError`].
pub type Result<T> = std::result::Result<T, EdgeError>;

/// Errors that can occur in the edge control plane core.
#[derive(Debug, thiserror::Error)]
pub enum EdgeError {
    /// Function not deployed on the runtime it was invoked against.
    #[error("function not found: {0}")]
    FunctionNotFound(String),

    /// Node not present in the cluster where the contract calls for an error.
    ///
    /// Deregistering an unknown node is explicitly not an error; see
    /// [`EdgeCluster::deregister_node`](crate::cluster::EdgeCluster::deregister_node).
    #[error("node not found: {0}")]
    NodeNotFound(String),

    /// A node with this id is already registered.
    #[error("node already registered: {0}")]
    NodeAlreadyRegistered(String),

    /// A rollout target does not satisfy the function's capability requirements.
    #[error("node {node} is missing required capability: {capability}")]
    MissingCapability {
        /// Target node id.
        node: String,
        /// The capability the node lacks.
        capability: String,
    },

    /// Handler execution exceeded the function's configured budget.
    ///
    /// Detected after the handler returns; there is no preemptive
    /// cancellation of a running handler.
    #[error("function {function} exceeded its timeout: {elapsed_ms}ms elapsed, {budget_ms}ms allowed")]
    Timeout {
        /// Function id.
        function: String,
        /// Measured wall time in milliseconds.
        elapsed_ms: u64,
        /// Configured budget in milliseconds.
        budget_ms: u64,
    },

    /// The handler itself failed; the original cause is preserved.
    #[error("function {function} failed: {source}")]
    Execution {
        /// Function id.
        function: String,
        /// The error the handler produced.
        #[source]
        source: HandlerError,
    },

    /// Invalid deployment plan state transition attempted.
    #[error("invalid state transition: cannot transition from {from} to {to}")]
    InvalidStateTransition {
        /// Current state.
        from: &'static str,
        /// Attempted target state.
        to: &'static str,
    },

    /// Serialisation error.
    #[error("serialisation error: {0}")]
    Serialisation(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl EdgeError {
    /// Create a serialisation error.
    #[must_use]
    pub fn serialisation(msg: impl Into<String>) -> Self {
        Self::Serialisation(msg.into())
    }

    /// Create a configuration error.
    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Returns true if this error represents a post-hoc timeout.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}
