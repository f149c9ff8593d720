//! Per-node function runtime.

use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{EdgeError, Result};
use crate::function::{EdgeDeployment, EdgeFunction, FunctionId};
use crate::metrics::{EdgeMetrics, InvocationRecord};
use crate::node::NodeId;

/// Executes functions deployed to a single node.
///
/// The runtime owns the node's function table. Invocations measure the
/// handler's wall time; a handler that finishes over its budget is reported
/// as a timeout after the fact, never cancelled mid-flight. Every invocation
/// outcome is reported into the shared [`EdgeMetrics`] log.
pub struct EdgeRuntime {
    node_id: NodeId,
    functions: DashMap<FunctionId, EdgeFunction>,
    deployments: DashMap<FunctionId, EdgeDeployment>,
    metrics: Arc<EdgeMetrics>,
}

impl EdgeRuntime {
    /// Create a runtime for a node, reporting into the given metrics log.
    #[must_use]
    pub fn new(node_id: NodeId, metrics: Arc<EdgeMetrics>) -> Self {
        Self {
            node_id,
            functions: DashMap::new(),
            deployments: DashMap::new(),
            metrics,
        }
    }

    /// The node this runtime belongs to.
    #[must_use]
    pub const fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    /// Install a function, overwriting any existing function with the same id.
    pub fn deploy(&self, function: EdgeFunction) {
        let id = function.id.clone();
        debug!(node = %self.node_id, function = %id, "deploying function");
        self.deployments
            .insert(id.clone(), EdgeDeployment::new(id.clone(), self.node_id.clone()));
        self.functions.insert(id, function);
    }

    /// Remove a function if present. Returns false when absent.
    pub fn undeploy(&self, id: &FunctionId) -> bool {
        let removed = self.functions.remove(id).is_some();
        if removed {
            debug!(node = %self.node_id, function = %id, "undeployed function");
            if let Some(mut deployment) = self.deployments.get_mut(id) {
                deployment.active = false;
            }
        }
        removed
    }

    /// Returns true if the function is currently deployed.
    #[must_use]
    pub fn has_function(&self, id: &FunctionId) -> bool {
        self.functions.contains_key(id)
    }

    /// Snapshot of the deployed functions.
    #[must_use]
    pub fn list_functions(&self) -> Vec<EdgeFunction> {
        self.functions.iter().map(|r| r.value().clone()).collect()
    }

    /// Deployment record for a function, live or historical.
    #[must_use]
    pub fn deployment(&self, id: &FunctionId) -> Option<EdgeDeployment> {
        self.deployments.get(id).map(|r| r.clone())
    }

    /// Execute a deployed function.
    ///
    /// Blocks the caller for as long as the handler runs, up to the handler's
    /// own completion. The elapsed wall time is compared against the
    /// function's budget only after the handler returns; an over-budget
    /// success is reported as [`EdgeError::Timeout`], distinct from
    /// [`EdgeError::Execution`].
    #[allow(clippy::cast_possible_truncation)]
    pub async fn invoke(&self, id: &FunctionId, args: Value) -> Result<Value> {
        let function = self
            .functions
            .get(id)
            .map(|r| r.value().clone())
            .ok_or_else(|| EdgeError::FunctionNotFound(id.to_string()))?;

        let started = Instant::now();
        let outcome = function.handler.invoke(args).await;
        let elapsed = started.elapsed();
        let elapsed_ms = elapsed.as_millis() as u64;

        if let Some(mut deployment) = self.deployments.get_mut(id) {
            deployment.invocations += 1;
        }

        match outcome {
            Ok(value) if elapsed <= function.timeout => {
                self.metrics
                    .record(InvocationRecord::success(
                        id.clone(),
                        self.node_id.clone(),
                        elapsed_ms,
                    ))
                    .await;
                Ok(value)
            }
            Ok(_) => {
                let error = EdgeError::Timeout {
                    function: id.to_string(),
                    elapsed_ms,
                    budget_ms: function.timeout.as_millis() as u64,
                };
                warn!(node = %self.node_id, function = %id, elapsed_ms, "invocation exceeded budget");
                self.metrics
                    .record(InvocationRecord::failure(
                        id.clone(),
                        self.node_id.clone(),
                        elapsed_ms,
                        error.to_string(),
                    ))
                    .await;
                Err(error)
            }
            Err(source) => {
                warn!(node = %self.node_id, function = %id, error = %source, "invocation failed");
                self.metrics
                    .record(InvocationRecord::failure(
                        id.clone(),
                        self.node_id.clone(),
                        elapsed_ms,
                        source.to_string(),
                    ))
                    .await;
                Err(EdgeError::Execution {
                    function: id.to_string(),
                    source,
                })
            }
        }
    }
}

impl std::fmt::Debug for EdgeRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EdgeRuntime")
            .field("node_id", &self.node_id)
            .field("functions", &self.functions.len())
            .finish_non_exhaustive()
    }
}
