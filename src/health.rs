//! Heartbeat-age-based health checks with bounded history and flap detection.

use std::collections::{HashMap, VecDeque};
use std::time::Instant;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde_json::{json, Value};
use tracing::debug;

use crate::config::HealthConfig;
use crate::node::{EdgeNode, NodeId, NodeStatus};

/// Result of one health check against one node.
#[derive(Debug, Clone)]
pub struct HealthCheck {
    /// Checked node.
    pub node_id: NodeId,
    /// Verdict: heartbeat fresh enough and node not offline.
    pub healthy: bool,
    /// Wall time the check itself took, in milliseconds.
    pub latency_ms: f64,
    /// When the check ran.
    pub checked_at: DateTime<Utc>,
    /// Supporting detail (status, heartbeat age).
    pub details: HashMap<String, Value>,
}

/// Aggregate report over a set of nodes.
#[derive(Debug, Clone)]
pub struct ClusterHealthReport {
    /// Nodes checked.
    pub total_nodes: usize,
    /// Nodes that passed.
    pub healthy_nodes: usize,
    /// Nodes that failed.
    pub unhealthy_nodes: usize,
    /// Healthy percentage; 100.0 for an empty set.
    pub health_percent: f64,
    /// Per-node results, in input order.
    pub checks: Vec<HealthCheck>,
}

/// Tracks node health over time.
///
/// Callers drive the cadence: each `check_node` call appends to a bounded
/// per-node history (most recent entries kept, oldest dropped on overflow),
/// over which flapping is detected.
#[derive(Debug)]
pub struct HealthMonitor {
    config: HealthConfig,
    history: DashMap<NodeId, VecDeque<HealthCheck>>,
}

impl HealthMonitor {
    /// Create a monitor with the given configuration.
    #[must_use]
    pub fn new(config: HealthConfig) -> Self {
        Self {
            config,
            history: DashMap::new(),
        }
    }

    /// Check one node and record the result.
    ///
    /// Healthy iff the heartbeat is fresher than the configured timeout and
    /// the node is not offline.
    pub fn check_node(&self, node: &EdgeNode) -> HealthCheck {
        let started = Instant::now();
        let age = node.heartbeat_age();
        let healthy = age < self.config.heartbeat_timeout && node.status != NodeStatus::Offline;

        let mut details = HashMap::new();
        details.insert("status".to_owned(), json!(node.status.as_str()));
        details.insert("heartbeat_age_secs".to_owned(), json!(age.as_secs_f64()));
        details.insert("overloaded".to_owned(), json!(node.resources.is_overloaded()));

        let check = HealthCheck {
            node_id: node.id.clone(),
            healthy,
            latency_ms: started.elapsed().as_secs_f64() * 1000.0,
            checked_at: Utc::now(),
            details,
        };

        debug!(node = %node.id, healthy, "health check");
        let mut entries = self.history.entry(node.id.clone()).or_default();
        entries.push_back(check.clone());
        while entries.len() > self.config.history_limit {
            entries.pop_front();
        }

        check
    }

    /// Check every node and aggregate the results.
    #[allow(clippy::cast_precision_loss)]
    pub fn check_cluster(&self, nodes: &[EdgeNode]) -> ClusterHealthReport {
        let checks: Vec<HealthCheck> = nodes.iter().map(|n| self.check_node(n)).collect();
        let healthy_nodes = checks.iter().filter(|c| c.healthy).count();
        let total_nodes = checks.len();
        let health_percent = if total_nodes == 0 {
            100.0
        } else {
            healthy_nodes as f64 / total_nodes as f64 * 100.0
        };

        ClusterHealthReport {
            total_nodes,
            healthy_nodes,
            unhealthy_nodes: total_nodes - healthy_nodes,
            health_percent,
            checks,
        }
    }

    /// Detect a node oscillating between healthy and unhealthy.
    ///
    /// Looks at the most recent `window` recorded checks: fewer than 3
    /// checks is never flapping; 3 or more healthy/unhealthy transitions
    /// among them is.
    #[must_use]
    pub fn detect_flapping(&self, node_id: &NodeId, window: usize) -> bool {
        let Some(entries) = self.history.get(node_id) else {
            return false;
        };

        let recent: Vec<bool> = entries
            .iter()
            .rev()
            .take(window)
            .map(|c| c.healthy)
            .collect();
        if recent.len() < 3 {
            return false;
        }

        let transitions = recent.windows(2).filter(|w| w[0] != w[1]).count();
        transitions >= 3
    }

    /// Detect flapping over the configured default window.
    #[must_use]
    pub fn is_flapping(&self, node_id: &NodeId) -> bool {
        self.detect_flapping(node_id, self.config.flap_window)
    }

    /// Copy of a node's recorded checks, oldest first.
    #[must_use]
    pub fn node_history(&self, node_id: &NodeId) -> Vec<HealthCheck> {
        self.history
            .get(node_id)
            .map(|e| e.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// The most recent check for a node, if any.
    #[must_use]
    pub fn latest(&self, node_id: &NodeId) -> Option<HealthCheck> {
        self.history.get(node_id).and_then(|e| e.back().cloned())
    }

    /// Drop recorded history for a deregistered node.
    pub fn forget(&self, node_id: &NodeId) {
        self.history.remove(node_id);
    }
}

impl Default for HealthMonitor {
    fn default() -> Self {
        Self::new(HealthConfig::default())
    }
}
