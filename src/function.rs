//! Function model: deployable units and the handler capability they carry.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::HandlerError;
use crate::node::{EdgeNode, NodeId};

/// Unique identifier for a function.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FunctionId(String);

impl FunctionId {
    /// Create a new function ID.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for FunctionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for FunctionId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for FunctionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// The executable capability behind a deployed function.
///
/// The body of a function is opaque to the control plane: whoever authors the
/// function supplies an implementation of this trait, and the runtime only
/// ever calls [`invoke`](FunctionHandler::invoke). Handlers run to completion;
/// there is no preemptive cancellation.
#[async_trait]
pub trait FunctionHandler: Send + Sync {
    /// Execute the function with the given arguments.
    async fn invoke(&self, args: Value) -> Result<Value, HandlerError>;
}

/// Adapter exposing a plain closure as a [`FunctionHandler`].
pub struct BlockingHandler<F>(F);

impl<F> BlockingHandler<F>
where
    F: Fn(Value) -> Result<Value, HandlerError> + Send + Sync,
{
    /// Wrap a closure.
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

#[async_trait]
impl<F> FunctionHandler for BlockingHandler<F>
where
    F: Fn(Value) -> Result<Value, HandlerError> + Send + Sync,
{
    async fn invoke(&self, args: Value) -> Result<Value, HandlerError> {
        (self.0)(args)
    }
}

/// A small unit of executable logic deployable to one or more edge nodes.
#[derive(Clone)]
pub struct EdgeFunction {
    /// Unique function identifier.
    pub id: FunctionId,
    /// Human-readable name.
    pub name: String,
    /// The opaque handler capability.
    pub handler: Arc<dyn FunctionHandler>,
    /// Memory limit in MB.
    pub memory_mb: u32,
    /// Execution budget; exceeding it is reported as a timeout.
    pub timeout: Duration,
    /// Environment variables passed to the handler's surroundings.
    pub environment: HashMap<String, String>,
    /// Capabilities a node must offer to host this function.
    pub required_capabilities: HashSet<String>,
}

impl EdgeFunction {
    /// Create a new function with default limits (128 MB, 30 s budget).
    #[must_use]
    pub fn new(
        id: impl Into<FunctionId>,
        name: impl Into<String>,
        handler: Arc<dyn FunctionHandler>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            handler,
            memory_mb: 128,
            timeout: Duration::from_secs(30),
            environment: HashMap::new(),
            required_capabilities: HashSet::new(),
        }
    }

    /// Set the execution budget, returning self for chaining.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Require a node capability, returning self for chaining.
    #[must_use]
    pub fn require_capability(mut self, capability: impl Into<String>) -> Self {
        self.required_capabilities.insert(capability.into());
        self
    }

    /// Returns true iff the node offers every required capability.
    #[must_use]
    pub fn can_run_on(&self, node: &EdgeNode) -> bool {
        self.required_capabilities
            .iter()
            .all(|c| node.capabilities.contains(c))
    }

    /// The first required capability the node lacks, if any.
    #[must_use]
    pub fn missing_capability(&self, node: &EdgeNode) -> Option<&str> {
        self.required_capabilities
            .iter()
            .find(|c| !node.capabilities.contains(*c))
            .map(String::as_str)
    }
}

impl fmt::Debug for EdgeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EdgeFunction")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("memory_mb", &self.memory_mb)
            .field("timeout", &self.timeout)
            .field("required_capabilities", &self.required_capabilities)
            .finish_non_exhaustive()
    }
}

/// Record of a function placed on a node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeDeployment {
    /// Deployed function.
    pub function_id: FunctionId,
    /// Hosting node.
    pub node_id: NodeId,
    /// When the function was placed.
    pub deployed_at: DateTime<Utc>,
    /// Whether the placement is live.
    pub active: bool,
    /// Number of invocations served.
    pub invocations: u64,
}

impl EdgeDeployment {
    /// Create a new active deployment record.
    #[must_use]
    pub fn new(function_id: FunctionId, node_id: NodeId) -> Self {
        Self {
            function_id,
            node_id,
            deployed_at: Utc::now(),
            active: true,
            invocations: 0,
        }
    }
}
