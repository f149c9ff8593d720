//! Edge node model: identity, status, and resource accounting.

use std::collections::HashSet;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Heartbeat age below which an online node counts as healthy.
pub const HEALTHY_HEARTBEAT_AGE: Duration = Duration::from_secs(60);

/// Unique identifier for an edge node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Create a new node ID.
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

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for NodeId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for NodeId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Node status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    /// Node is reachable and serving.
    Online,
    /// Node is unreachable.
    Offline,
    /// Node is reachable but impaired.
    Degraded,
    /// Node is reconciling state with the central authority.
    Syncing,
    /// Node is deliberately taken out of rotation.
    Maintenance,
}

impl NodeStatus {
    /// Get the status name as a static string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Offline => "offline",
            Self::Degraded => "degraded",
            Self::Syncing => "syncing",
            Self::Maintenance => "maintenance",
        }
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Resource usage snapshot reported by a node.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourceUsage {
    /// CPU utilisation as a percentage (0-100).
    pub cpu_percent: f64,
    /// Memory in use, in MB.
    pub memory_mb: u32,
    /// Total memory available, in MB.
    pub memory_max_mb: u32,
    /// Disk in use, in MB.
    pub disk_mb: u32,
    /// Number of functions currently executing.
    pub active_functions: u32,
}

impl ResourceUsage {
    /// Memory utilisation as a percentage (0-100).
    #[must_use]
    pub fn memory_percent(&self) -> f64 {
        if self.memory_max_mb == 0 {
            return 0.0;
        }
        f64::from(self.memory_mb) / f64::from(self.memory_max_mb) * 100.0
    }

    /// Returns true when CPU or memory utilisation exceeds 90%.
    #[must_use]
    pub fn is_overloaded(&self) -> bool {
        self.cpu_percent > 90.0 || self.memory_percent() > 90.0
    }
}

/// A machine at the network edge capable of hosting deployed functions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeNode {
    /// Unique node identifier.
    pub id: NodeId,
    /// Human-readable name.
    pub name: String,
    /// Physical or logical location label.
    pub location: String,
    /// Current status.
    pub status: NodeStatus,
    /// Capabilities this node offers (e.g. "gpu", "arm64").
    pub capabilities: HashSet<String>,
    /// Latest resource usage snapshot.
    pub resources: ResourceUsage,
    /// Time of the last heartbeat received from the node.
    pub last_heartbeat: DateTime<Utc>,
    /// Maximum number of functions this node will host.
    pub max_functions: usize,
}

impl EdgeNode {
    /// Create a new node, online with a fresh heartbeat.
    #[must_use]
    pub fn new(id: impl Into<NodeId>, name: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            location: location.into(),
            status: NodeStatus::Online,
            capabilities: HashSet::new(),
            resources: ResourceUsage::default(),
            last_heartbeat: Utc::now(),
            max_functions: 10,
        }
    }

    /// Add a capability, returning self for chaining.
    #[must_use]
    pub fn with_capability(mut self, capability: impl Into<String>) -> Self {
        self.capabilities.insert(capability.into());
        self
    }

    /// Age of the last heartbeat. Zero if the heartbeat is in the future.
    #[must_use]
    pub fn heartbeat_age(&self) -> Duration {
        Utc::now()
            .signed_duration_since(self.last_heartbeat)
            .to_std()
            .unwrap_or_default()
    }

    /// A node is healthy iff it is online and its heartbeat is fresher
    /// than [`HEALTHY_HEARTBEAT_AGE`].
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.status == NodeStatus::Online && self.heartbeat_age() < HEALTHY_HEARTBEAT_AGE
    }

    /// Record a heartbeat: refreshes the timestamp and brings the node online.
    pub fn heartbeat(&mut self) {
        self.status = NodeStatus::Online;
        self.last_heartbeat = Utc::now();
    }
}
