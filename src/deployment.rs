//! Rollout orchestration: strategies, plans, and rollback.
//!
//! A [`DeploymentPlan`] is the record of attempting to place one function on
//! a set of nodes via a chosen [`RolloutStrategy`]. Plans move through a
//! strict state machine:
//!
//! ```text
//! Pending ──▶ InProgress ──▶ Completed
//!                 │
//!                 ├──▶ Failed
//!                 └──▶ RolledBack
//! ```
//!
//! Completed, Failed, and RolledBack are terminal. Per-node failures are
//! captured into the plan's `failed_nodes` rather than raised, so a single
//! bad node cannot abort an otherwise-viable rollout of the others; callers
//! must inspect the returned plan's state, not just the absence of an error.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::cluster::EdgeCluster;
use crate::config::DeploymentConfig;
use crate::error::{EdgeError, Result};
use crate::function::EdgeFunction;
use crate::node::NodeId;

/// Unique identifier for a deployment plan.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlanId(String);

impl PlanId {
    /// Generate a new unique plan ID using ULID.
    #[must_use]
    pub fn generate() -> Self {
        Self(ulid::Ulid::new().to_string().to_lowercase())
    }

    /// Get the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a rollout distributes a function across its targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RolloutStrategy {
    /// One node at a time, in order; fail fast to bound blast radius.
    Rolling,
    /// Every node attempted exactly once before a verdict; all-or-nothing
    /// exposure by intent.
    BlueGreen,
    /// A small validation batch first, then the rest best-effort.
    Canary,
}

impl RolloutStrategy {
    /// Get the strategy name as a static string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Rolling => "rolling",
            Self::BlueGreen => "blue_green",
            Self::Canary => "canary",
        }
    }
}

impl fmt::Display for RolloutStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Deployment plan state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanState {
    /// Plan created, not yet executed.
    Pending,
    /// Execution underway.
    InProgress,
    /// Every target deployed successfully.
    Completed,
    /// Failures occurred and deployed nodes were rolled back.
    RolledBack,
    /// Failures occurred and stand.
    Failed,
}

impl PlanState {
    /// Get the state name as a static string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::RolledBack => "rolled_back",
            Self::Failed => "failed",
        }
    }

    /// Returns true for states no transition leaves.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::RolledBack | Self::Failed)
    }
}

impl fmt::Display for PlanState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Request to roll out one function across chosen targets.
#[derive(Debug, Clone)]
pub struct RolloutRequest {
    /// Function to roll out.
    pub function: EdgeFunction,
    /// Strategy to use.
    pub strategy: RolloutStrategy,
    /// Explicit targets; defaults to a snapshot of currently-online nodes.
    pub target_nodes: Option<Vec<NodeId>>,
    /// Canary batch size as a percentage of targets; defaults from config.
    pub canary_percent: Option<u8>,
    /// Whether failures trigger rollback; defaults from config.
    pub rollback_on_error: Option<bool>,
}

impl RolloutRequest {
    /// Create a request with configured defaults for everything optional.
    #[must_use]
    pub fn new(function: EdgeFunction, strategy: RolloutStrategy) -> Self {
        Self {
            function,
            strategy,
            target_nodes: None,
            canary_percent: None,
            rollback_on_error: None,
        }
    }

    /// Set explicit target nodes, returning self for chaining.
    #[must_use]
    pub fn with_targets(mut self, targets: Vec<NodeId>) -> Self {
        self.target_nodes = Some(targets);
        self
    }

    /// Set the canary percentage, returning self for chaining.
    #[must_use]
    pub fn with_canary_percent(mut self, percent: u8) -> Self {
        self.canary_percent = Some(percent);
        self
    }

    /// Set rollback behaviour, returning self for chaining.
    #[must_use]
    pub fn with_rollback_on_error(mut self, rollback: bool) -> Self {
        self.rollback_on_error = Some(rollback);
        self
    }
}

/// The record of one rollout attempt.
///
/// Owned by whoever created it; the manager only appends terminal copies to
/// its history and never mutates a plan after returning it.
#[derive(Debug, Clone)]
pub struct DeploymentPlan {
    /// Unique plan identifier.
    pub id: PlanId,
    /// Function being rolled out.
    pub function: EdgeFunction,
    /// Strategy in use.
    pub strategy: RolloutStrategy,
    /// Target node ids, snapshotted at plan creation.
    pub target_nodes: Vec<NodeId>,
    /// Canary batch size as a percentage of targets.
    pub canary_percent: u8,
    /// Whether failures trigger rollback.
    pub rollback_on_error: bool,
    /// Current state.
    pub state: PlanState,
    /// Nodes the function was deployed to during this plan.
    pub deployed_nodes: Vec<NodeId>,
    /// Nodes that failed during this plan.
    pub failed_nodes: Vec<NodeId>,
    /// Strategy-specific annotations (e.g. `canary_nodes`, `canary_complete`).
    pub metadata: HashMap<String, Value>,
    /// When the plan was created.
    pub created_at: DateTime<Utc>,
    /// When the plan last changed state.
    pub updated_at: DateTime<Utc>,
}

/// Orchestrates rollouts of functions across cluster nodes.
///
/// Owns rollback and the append-only plan history. The history mutex makes
/// individual calls atomic; concurrent `execute` calls for overlapping
/// targets are the caller's problem, as with any two rollouts racing.
pub struct DeploymentManager {
    cluster: Arc<EdgeCluster>,
    config: DeploymentConfig,
    history: Mutex<Vec<DeploymentPlan>>,
}

impl DeploymentManager {
    /// Create a manager for the given cluster.
    #[must_use]
    pub fn new(cluster: Arc<EdgeCluster>, config: DeploymentConfig) -> Self {
        Self {
            cluster,
            config,
            history: Mutex::new(Vec::new()),
        }
    }

    /// Create a pending plan from a request.
    ///
    /// When the request names no targets, the plan snapshots the ids of
    /// currently-online nodes; the snapshot is not recomputed during
    /// execution.
    #[must_use]
    pub fn create_plan(&self, request: RolloutRequest) -> DeploymentPlan {
        let target_nodes = request
            .target_nodes
            .unwrap_or_else(|| self.cluster.online_node_ids());
        let now = Utc::now();

        let plan = DeploymentPlan {
            id: PlanId::generate(),
            function: request.function,
            strategy: request.strategy,
            target_nodes,
            canary_percent: request.canary_percent.unwrap_or(self.config.canary_percent),
            rollback_on_error: request
                .rollback_on_error
                .unwrap_or(self.config.rollback_on_error),
            state: PlanState::Pending,
            deployed_nodes: Vec::new(),
            failed_nodes: Vec::new(),
            metadata: HashMap::new(),
            created_at: now,
            updated_at: now,
        };

        info!(
            plan = %plan.id,
            function = %plan.function.id,
            strategy = %plan.strategy,
            targets = plan.target_nodes.len(),
            "created rollout plan"
        );
        plan
    }

    /// Execute a pending plan to a terminal state.
    ///
    /// Per-node failures are recorded in the plan, never raised; the only
    /// error here is executing a plan that is not pending. Once started, the
    /// plan runs to a terminal state before returning; there is no
    /// cancellation token.
    pub async fn execute(&self, mut plan: DeploymentPlan) -> Result<DeploymentPlan> {
        if plan.state != PlanState::Pending {
            return Err(EdgeError::InvalidStateTransition {
                from: plan.state.as_str(),
                to: PlanState::InProgress.as_str(),
            });
        }

        plan.state = PlanState::InProgress;
        plan.updated_at = Utc::now();
        info!(plan = %plan.id, strategy = %plan.strategy, "executing rollout");

        match plan.strategy {
            RolloutStrategy::Rolling => self.execute_rolling(&mut plan),
            RolloutStrategy::BlueGreen => self.execute_blue_green(&mut plan),
            RolloutStrategy::Canary => self.execute_canary(&mut plan),
        }

        plan.updated_at = Utc::now();
        info!(
            plan = %plan.id,
            state = %plan.state,
            deployed = plan.deployed_nodes.len(),
            failed = plan.failed_nodes.len(),
            "rollout finished"
        );

        self.history.lock().await.push(plan.clone());
        Ok(plan)
    }

    /// Visit targets in order, one at a time. Fail fast: the first failure
    /// rolls back everything deployed so far (when configured) and leaves the
    /// remaining targets unattempted.
    fn execute_rolling(&self, plan: &mut DeploymentPlan) {
        let targets = plan.target_nodes.clone();
        for node_id in &targets {
            if self.try_deploy(plan, node_id) {
                plan.deployed_nodes.push(node_id.clone());
            } else {
                plan.failed_nodes.push(node_id.clone());
                if plan.rollback_on_error {
                    self.roll_back_deployed(plan);
                    plan.state = PlanState::RolledBack;
                    return;
                }
            }
        }

        plan.state = if plan.failed_nodes.is_empty() {
            PlanState::Completed
        } else {
            PlanState::Failed
        };
    }

    /// Attempt every target exactly once regardless of earlier failures,
    /// then reach a verdict over the full pass.
    fn execute_blue_green(&self, plan: &mut DeploymentPlan) {
        let targets = plan.target_nodes.clone();
        for node_id in &targets {
            if self.try_deploy(plan, node_id) {
                plan.deployed_nodes.push(node_id.clone());
            } else {
                plan.failed_nodes.push(node_id.clone());
            }
        }

        plan.state = if plan.failed_nodes.is_empty() {
            PlanState::Completed
        } else if plan.rollback_on_error {
            self.roll_back_deployed(plan);
            PlanState::RolledBack
        } else {
            PlanState::Failed
        };
    }

    /// Validate on a small batch first, with rolling semantics; only a fully
    /// successful canary batch opens the remaining targets, which are then
    /// attempted best-effort without triggering rollback.
    fn execute_canary(&self, plan: &mut DeploymentPlan) {
        let targets = plan.target_nodes.clone();
        let total = targets.len();
        let canary_count = (total * usize::from(plan.canary_percent) / 100)
            .max(1)
            .min(total);
        let (canary, rest) = targets.split_at(canary_count);

        for node_id in canary {
            if self.try_deploy(plan, node_id) {
                plan.deployed_nodes.push(node_id.clone());
            } else {
                plan.failed_nodes.push(node_id.clone());
                if plan.rollback_on_error {
                    self.roll_back_deployed(plan);
                    plan.state = PlanState::RolledBack;
                } else {
                    plan.state = PlanState::Failed;
                }
                warn!(plan = %plan.id, node = %node_id, "canary batch failed");
                return;
            }
        }

        plan.metadata.insert(
            "canary_nodes".to_owned(),
            Value::from(canary.iter().map(ToString::to_string).collect::<Vec<_>>()),
        );
        plan.metadata
            .insert("canary_complete".to_owned(), Value::Bool(true));

        for node_id in rest {
            if self.try_deploy(plan, node_id) {
                plan.deployed_nodes.push(node_id.clone());
            } else {
                plan.failed_nodes.push(node_id.clone());
            }
        }

        plan.state = if plan.failed_nodes.is_empty() {
            PlanState::Completed
        } else {
            PlanState::Failed
        };
    }

    /// Attempt one target. An unknown node or a missing capability is a
    /// per-node failure like any other: the error is logged against the plan
    /// and captured, never raised.
    fn try_deploy(&self, plan: &DeploymentPlan, node_id: &NodeId) -> bool {
        match self.cluster.deploy_to_node(node_id, &plan.function) {
            Ok(()) => true,
            Err(error) => {
                warn!(plan = %plan.id, node = %node_id, %error, "target deployment failed");
                false
            }
        }
    }

    /// Undeploy the plan's function from every node deployed so far and mark
    /// the plan rolled back. Returns the number of nodes undeployed.
    pub async fn rollback(&self, plan: &mut DeploymentPlan) -> usize {
        let count = self.roll_back_deployed(plan);
        plan.state = PlanState::RolledBack;
        plan.updated_at = Utc::now();
        count
    }

    fn roll_back_deployed(&self, plan: &DeploymentPlan) -> usize {
        let mut count = 0;
        for node_id in &plan.deployed_nodes {
            if let Some(runtime) = self.cluster.get_runtime(node_id) {
                if runtime.undeploy(&plan.function.id) {
                    count += 1;
                }
            }
        }
        if count > 0 {
            info!(plan = %plan.id, count, "rolled back deployed nodes");
        }
        count
    }

    /// Full unpruned plan history.
    pub async fn list_deployments(&self) -> Vec<DeploymentPlan> {
        self.history.lock().await.clone()
    }
}

impl fmt::Debug for DeploymentManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeploymentManager").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function::{BlockingHandler, FunctionId};
    use crate::node::EdgeNode;

    fn make_cluster(node_ids: &[&str]) -> Arc<EdgeCluster> {
        let cluster = Arc::new(EdgeCluster::new());
        for id in node_ids {
            cluster
                .register_node(EdgeNode::new(*id, format!("Node {id}"), "eu-west"))
                .unwrap();
        }
        cluster
    }

    fn make_manager(cluster: Arc<EdgeCluster>) -> DeploymentManager {
        DeploymentManager::new(cluster, DeploymentConfig::default())
    }

    fn echo_function(id: &str) -> EdgeFunction {
        EdgeFunction::new(id, id, Arc::new(BlockingHandler::new(|args| Ok(args))))
    }

    fn ids(raw: &[&str]) -> Vec<NodeId> {
        raw.iter().map(|s| NodeId::new(*s)).collect()
    }

    #[tokio::test]
    async fn rolling_deploys_everywhere_on_success() {
        let cluster = make_cluster(&["a", "b", "c"]);
        let manager = make_manager(cluster.clone());

        let plan = manager.create_plan(RolloutRequest::new(
            echo_function("fn-1"),
            RolloutStrategy::Rolling,
        ));
        assert_eq!(plan.target_nodes.len(), 3);

        let plan = manager.execute(plan).await.unwrap();
        assert_eq!(plan.state, PlanState::Completed);
        assert_eq!(plan.deployed_nodes.len(), 3);
        assert!(plan.failed_nodes.is_empty());
    }

    #[tokio::test]
    async fn rolling_failure_mid_list_rolls_back_and_stops() {
        let cluster = make_cluster(&["a", "b", "d", "e"]);
        let manager = make_manager(cluster.clone());

        // "c" is never registered: a deliberately unreachable node mid-list.
        let request = RolloutRequest::new(echo_function("fn-1"), RolloutStrategy::Rolling)
            .with_targets(ids(&["a", "b", "c", "d", "e"]))
            .with_rollback_on_error(true);

        let plan = manager.execute(manager.create_plan(request)).await.unwrap();

        assert_eq!(plan.state, PlanState::RolledBack);
        assert_eq!(plan.failed_nodes, ids(&["c"]));
        // Nodes after the failure were never attempted.
        assert_eq!(plan.deployed_nodes, ids(&["a", "b"]));
        // Every node deployed before the failure was undeployed again.
        for id in ["a", "b", "d", "e"] {
            let runtime = cluster.get_runtime(&NodeId::new(id)).unwrap();
            assert!(!runtime.has_function(&FunctionId::new("fn-1")));
        }
    }

    #[tokio::test]
    async fn rolling_without_rollback_is_best_effort() {
        let cluster = make_cluster(&["a", "c"]);
        let manager = make_manager(cluster.clone());

        let request = RolloutRequest::new(echo_function("fn-1"), RolloutStrategy::Rolling)
            .with_targets(ids(&["a", "b", "c"]))
            .with_rollback_on_error(false);

        let plan = manager.execute(manager.create_plan(request)).await.unwrap();

        assert_eq!(plan.state, PlanState::Failed);
        assert_eq!(plan.deployed_nodes, ids(&["a", "c"]));
        assert_eq!(plan.failed_nodes, ids(&["b"]));
        assert!(cluster
            .get_runtime(&NodeId::new("c"))
            .unwrap()
            .has_function(&FunctionId::new("fn-1")));
    }

    #[tokio::test]
    async fn blue_green_attempts_every_node_exactly_once() {
        let cluster = make_cluster(&["a", "c", "e"]);
        let manager = make_manager(cluster.clone());

        let targets = ids(&["a", "b", "c", "d", "e"]);
        let request = RolloutRequest::new(echo_function("fn-1"), RolloutStrategy::BlueGreen)
            .with_targets(targets.clone())
            .with_rollback_on_error(false);

        let plan = manager.execute(manager.create_plan(request)).await.unwrap();

        assert_eq!(plan.state, PlanState::Failed);
        let mut attempted: Vec<NodeId> = plan
            .deployed_nodes
            .iter()
            .chain(plan.failed_nodes.iter())
            .cloned()
            .collect();
        attempted.sort_by(|x, y| x.as_str().cmp(y.as_str()));
        assert_eq!(attempted, targets);
    }

    #[tokio::test]
    async fn blue_green_rolls_back_after_full_pass() {
        let cluster = make_cluster(&["a", "b", "d"]);
        let manager = make_manager(cluster.clone());

        let request = RolloutRequest::new(echo_function("fn-1"), RolloutStrategy::BlueGreen)
            .with_targets(ids(&["a", "b", "c", "d"]))
            .with_rollback_on_error(true);

        let plan = manager.execute(manager.create_plan(request)).await.unwrap();

        assert_eq!(plan.state, PlanState::RolledBack);
        // The full pass happened: "d" comes after the failing "c".
        assert_eq!(plan.deployed_nodes, ids(&["a", "b", "d"]));
        assert_eq!(plan.failed_nodes, ids(&["c"]));
        for id in ["a", "b", "d"] {
            let runtime = cluster.get_runtime(&NodeId::new(id)).unwrap();
            assert!(!runtime.has_function(&FunctionId::new("fn-1")));
        }
    }

    #[tokio::test]
    async fn canary_batch_size_and_completion_metadata() {
        let names: Vec<String> = (0..20).map(|i| format!("n{i:02}")).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let cluster = make_cluster(&refs);
        let manager = make_manager(cluster.clone());

        let request = RolloutRequest::new(echo_function("fn-1"), RolloutStrategy::Canary)
            .with_targets(names.iter().map(NodeId::new).collect())
            .with_canary_percent(10);

        let plan = manager.execute(manager.create_plan(request)).await.unwrap();

        assert_eq!(plan.state, PlanState::Completed);
        assert_eq!(plan.metadata.get("canary_complete"), Some(&Value::Bool(true)));
        let canary_nodes = plan
            .metadata
            .get("canary_nodes")
            .and_then(Value::as_array)
            .unwrap();
        assert_eq!(canary_nodes.len(), 2); // max(1, 20 * 10 / 100)
    }

    #[tokio::test]
    async fn canary_batch_is_at_least_one_node() {
        let cluster = make_cluster(&["a", "b", "c"]);
        let manager = make_manager(cluster.clone());

        let request = RolloutRequest::new(echo_function("fn-1"), RolloutStrategy::Canary)
            .with_canary_percent(10)
            .with_targets(ids(&["a", "b", "c"]));

        let plan = manager.execute(manager.create_plan(request)).await.unwrap();
        let canary_nodes = plan
            .metadata
            .get("canary_nodes")
            .and_then(Value::as_array)
            .unwrap();
        assert_eq!(canary_nodes.len(), 1); // 3 * 10 / 100 rounds to 0, floored at 1
    }

    #[tokio::test]
    async fn canary_failure_rolls_back_and_never_opens_the_rest() {
        let cluster = make_cluster(&["b", "c", "d"]);
        let manager = make_manager(cluster.clone());

        // First target "a" is unreachable, so the canary batch fails.
        let request = RolloutRequest::new(echo_function("fn-1"), RolloutStrategy::Canary)
            .with_targets(ids(&["a", "b", "c", "d"]))
            .with_canary_percent(25)
            .with_rollback_on_error(true);

        let plan = manager.execute(manager.create_plan(request)).await.unwrap();

        assert_eq!(plan.state, PlanState::RolledBack);
        assert!(!plan.metadata.contains_key("canary_complete"));
        // Post-canary nodes were never attempted.
        for id in ["b", "c", "d"] {
            let runtime = cluster.get_runtime(&NodeId::new(id)).unwrap();
            assert!(!runtime.has_function(&FunctionId::new("fn-1")));
        }
    }

    #[tokio::test]
    async fn canary_failure_without_rollback_fails_the_plan() {
        let cluster = make_cluster(&["b", "c"]);
        let manager = make_manager(cluster.clone());

        let request = RolloutRequest::new(echo_function("fn-1"), RolloutStrategy::Canary)
            .with_targets(ids(&["a", "b", "c"]))
            .with_rollback_on_error(false);

        let plan = manager.execute(manager.create_plan(request)).await.unwrap();

        assert_eq!(plan.state, PlanState::Failed);
        assert!(!plan.metadata.contains_key("canary_complete"));
        assert!(plan.deployed_nodes.is_empty());
    }

    #[tokio::test]
    async fn post_canary_failures_do_not_trigger_rollback() {
        let cluster = make_cluster(&["a", "b", "d"]);
        let manager = make_manager(cluster.clone());

        // Canary batch ("a") succeeds; "c" fails in the best-effort phase.
        let request = RolloutRequest::new(echo_function("fn-1"), RolloutStrategy::Canary)
            .with_targets(ids(&["a", "b", "c", "d"]))
            .with_canary_percent(25)
            .with_rollback_on_error(true);

        let plan = manager.execute(manager.create_plan(request)).await.unwrap();

        assert_eq!(plan.state, PlanState::Failed);
        assert_eq!(plan.metadata.get("canary_complete"), Some(&Value::Bool(true)));
        assert_eq!(plan.deployed_nodes, ids(&["a", "b", "d"]));
        assert_eq!(plan.failed_nodes, ids(&["c"]));
        // Deployments from both phases stand.
        assert!(cluster
            .get_runtime(&NodeId::new("d"))
            .unwrap()
            .has_function(&FunctionId::new("fn-1")));
    }

    #[tokio::test]
    async fn executing_a_terminal_plan_is_rejected() {
        let cluster = make_cluster(&["a"]);
        let manager = make_manager(cluster.clone());

        let plan = manager
            .execute(manager.create_plan(RolloutRequest::new(
                echo_function("fn-1"),
                RolloutStrategy::Rolling,
            )))
            .await
            .unwrap();
        assert!(plan.state.is_terminal());

        let result = manager.execute(plan).await;
        assert!(matches!(
            result,
            Err(EdgeError::InvalidStateTransition { .. })
        ));
    }

    #[tokio::test]
    async fn manual_rollback_counts_undeployments() {
        let cluster = make_cluster(&["a", "b"]);
        let manager = make_manager(cluster.clone());

        let mut plan = manager
            .execute(manager.create_plan(RolloutRequest::new(
                echo_function("fn-1"),
                RolloutStrategy::BlueGreen,
            )))
            .await
            .unwrap();
        assert_eq!(plan.state, PlanState::Completed);

        let count = manager.rollback(&mut plan).await;
        assert_eq!(count, 2);
        assert_eq!(plan.state, PlanState::RolledBack);
    }

    #[tokio::test]
    async fn history_is_append_only() {
        let cluster = make_cluster(&["a"]);
        let manager = make_manager(cluster.clone());

        for _ in 0..3 {
            manager
                .execute(manager.create_plan(RolloutRequest::new(
                    echo_function("fn-1"),
                    RolloutStrategy::Rolling,
                )))
                .await
                .unwrap();
        }

        let history = manager.list_deployments().await;
        assert_eq!(history.len(), 3);
        assert!(history.iter().all(|p| p.state.is_terminal()));
    }
}
