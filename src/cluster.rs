//! Cluster registry mapping node ids to their nodes and runtimes.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, info};

use crate::error::{EdgeError, Result};
use crate::function::EdgeFunction;
use crate::metrics::EdgeMetrics;
use crate::node::{EdgeNode, NodeId, NodeStatus};
use crate::runtime::EdgeRuntime;

struct NodeEntry {
    node: EdgeNode,
    runtime: Arc<EdgeRuntime>,
}

/// Registry of edge nodes and their dedicated runtimes.
///
/// The cluster exclusively owns its node/runtime pairs. Entry-level access is
/// atomic; cluster-wide operations (`list_nodes`, `deploy_to_all`) see a
/// point-in-time view, not a frozen snapshot.
pub struct EdgeCluster {
    nodes: DashMap<NodeId, NodeEntry>,
    metrics: Arc<EdgeMetrics>,
}

impl EdgeCluster {
    /// Create an empty cluster with its own metrics log.
    #[must_use]
    pub fn new() -> Self {
        Self::with_metrics(Arc::new(EdgeMetrics::new()))
    }

    /// Create an empty cluster reporting into an existing metrics log.
    #[must_use]
    pub fn with_metrics(metrics: Arc<EdgeMetrics>) -> Self {
        Self {
            nodes: DashMap::new(),
            metrics,
        }
    }

    /// The invocation metrics log shared by every runtime in this cluster.
    #[must_use]
    pub fn metrics(&self) -> Arc<EdgeMetrics> {
        self.metrics.clone()
    }

    /// Register a node and create its dedicated runtime.
    pub fn register_node(&self, node: EdgeNode) -> Result<()> {
        let node_id = node.id.clone();
        if self.nodes.contains_key(&node_id) {
            return Err(EdgeError::NodeAlreadyRegistered(node_id.to_string()));
        }

        info!(node = %node_id, location = %node.location, "registering node");
        let runtime = Arc::new(EdgeRuntime::new(node_id.clone(), self.metrics.clone()));
        self.nodes.insert(node_id, NodeEntry { node, runtime });
        Ok(())
    }

    /// Remove a node and its runtime. Returns false when the node is unknown;
    /// absence is not an error.
    pub fn deregister_node(&self, id: &NodeId) -> bool {
        let removed = self.nodes.remove(id).is_some();
        if removed {
            info!(node = %id, "deregistered node");
        }
        removed
    }

    /// Look up a node by id.
    #[must_use]
    pub fn get_node(&self, id: &NodeId) -> Option<EdgeNode> {
        self.nodes.get(id).map(|e| e.node.clone())
    }

    /// Look up a node's runtime by id.
    #[must_use]
    pub fn get_runtime(&self, id: &NodeId) -> Option<Arc<EdgeRuntime>> {
        self.nodes.get(id).map(|e| e.runtime.clone())
    }

    /// List nodes, optionally filtered by status.
    #[must_use]
    pub fn list_nodes(&self, status: Option<NodeStatus>) -> Vec<EdgeNode> {
        self.nodes
            .iter()
            .map(|e| e.node.clone())
            .filter(|n| status.map_or(true, |s| n.status == s))
            .collect()
    }

    /// Snapshot of the ids of currently-online nodes.
    #[must_use]
    pub fn online_node_ids(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|e| e.node.status == NodeStatus::Online)
            .map(|e| e.key().clone())
            .collect()
    }

    /// Number of registered nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true when no nodes are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Deploy a function to a single node, enforcing its capability
    /// requirements.
    ///
    /// Errors with [`EdgeError::NodeNotFound`] for an unknown node and
    /// [`EdgeError::MissingCapability`] when the node lacks a required
    /// capability.
    pub fn deploy_to_node(&self, id: &NodeId, function: &EdgeFunction) -> Result<()> {
        let entry = self
            .nodes
            .get(id)
            .ok_or_else(|| EdgeError::NodeNotFound(id.to_string()))?;

        if let Some(capability) = function.missing_capability(&entry.node) {
            return Err(EdgeError::MissingCapability {
                node: id.to_string(),
                capability: capability.to_owned(),
            });
        }

        entry.runtime.deploy(function.clone());
        Ok(())
    }

    /// Deploy a function to every registered runtime, unconditionally.
    ///
    /// Capability filtering is deliberately not performed here; it is the
    /// responsibility of the
    /// [`DeploymentManager`](crate::deployment::DeploymentManager).
    pub fn deploy_to_all(&self, function: &EdgeFunction) -> usize {
        let mut count = 0;
        for entry in &self.nodes {
            entry.runtime.deploy(function.clone());
            count += 1;
        }
        debug!(function = %function.id, count, "deployed to all runtimes");
        count
    }

    /// Record a heartbeat for a node: sets its status to online and
    /// refreshes the timestamp. Unknown ids are a silent no-op by design;
    /// a late heartbeat from a deregistered node must not be an error.
    pub fn heartbeat(&self, id: &NodeId) {
        if let Some(mut entry) = self.nodes.get_mut(id) {
            entry.node.heartbeat();
        }
    }

    /// Update a node's status in place. Unknown ids are an error.
    pub fn set_status(&self, id: &NodeId, status: NodeStatus) -> Result<()> {
        let mut entry = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| EdgeError::NodeNotFound(id.to_string()))?;
        entry.node.status = status;
        Ok(())
    }
}

impl Default for EdgeCluster {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EdgeCluster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EdgeCluster")
            .field("nodes", &self.nodes.len())
            .finish_non_exhaustive()
    }
}
