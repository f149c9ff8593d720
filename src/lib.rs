//! Stratus Edge
//!
//! Control plane core for a fleet of edge-compute nodes: registers nodes,
//! deploys small function units to them, rolls out changes using configurable
//! strategies, caches results locally, tracks node health over time, and
//! reconciles state with a central authority.
//!
//! # Architecture
//!
//! - [`EdgeCluster`] is the registry mapping node ids to their
//!   [`EdgeNode`]/[`EdgeRuntime`] pairs; each runtime executes invocations
//!   and reports into the shared [`EdgeMetrics`] log.
//! - [`DeploymentManager`] orchestrates rollouts of one function across
//!   target nodes using a rolling, blue-green, or canary strategy, with
//!   partial-failure capture and rollback.
//! - [`EdgeCache`], [`HealthMonitor`], and [`EdgeSynchronizer`] are the
//!   supporting services: a TTL/capacity bounded result cache, heartbeat-age
//!   health checks with flap detection, and version-based edge/cloud
//!   reconciliation with checksummed state.
//!
//! Transports, persistence, and CLI wiring are external collaborators: this
//! crate specifies component contracts and invariants, and callers drive the
//! cadence of heartbeats, health checks, and sync rounds.
//!
//! # Rollout state machine
//!
//! ```text
//! Pending ──▶ InProgress ──▶ Completed
//!                 │
//!                 ├──▶ Failed
//!                 └──▶ RolledBack
//! ```
//!
//! Per-node failures during a rollout are captured into the plan's
//! `failed_nodes` rather than raised; callers always receive a terminal
//! [`DeploymentPlan`] and must inspect its state, because the absence of an
//! error is never sufficient evidence of success.

#![forbid(unsafe_code)]

pub mod cache;
pub mod cluster;
pub mod config;
pub mod deployment;
pub mod error;
pub mod function;
pub mod health;
pub mod metrics;
pub mod node;
pub mod runtime;
pub mod sync;

// Re-export commonly used types at the crate root
pub use cache::{CacheEntry, CacheStats, EdgeCache};
pub use cluster::EdgeCluster;
pub use config::{CacheConfig, DeploymentConfig, EdgeConfig, HealthConfig};
pub use deployment::{
    DeploymentManager, DeploymentPlan, PlanId, PlanState, RolloutRequest, RolloutStrategy,
};
pub use error::{EdgeError, HandlerError, Result};
pub use function::{BlockingHandler, EdgeDeployment, EdgeFunction, FunctionHandler, FunctionId};
pub use health::{ClusterHealthReport, HealthCheck, HealthMonitor};
pub use metrics::{EdgeMetrics, InvocationRecord};
pub use node::{EdgeNode, NodeId, NodeStatus, ResourceUsage};
pub use runtime::EdgeRuntime;
pub use sync::{EdgeSynchronizer, PendingChange, SyncState};
