//! Invocation metrics: an append-only log with derived aggregates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::function::FunctionId;
use crate::node::NodeId;

/// One completed (or failed) function invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvocationRecord {
    /// Invoked function.
    pub function_id: FunctionId,
    /// Node the invocation ran on.
    pub node_id: NodeId,
    /// Wall time of the handler call, in milliseconds.
    pub duration_ms: u64,
    /// Whether the invocation succeeded within its budget.
    pub success: bool,
    /// When the invocation completed.
    pub timestamp: DateTime<Utc>,
    /// Error description for failed invocations.
    pub error: Option<String>,
}

impl InvocationRecord {
    /// Record a successful invocation.
    #[must_use]
    pub fn success(function_id: FunctionId, node_id: NodeId, duration_ms: u64) -> Self {
        Self {
            function_id,
            node_id,
            duration_ms,
            success: true,
            timestamp: Utc::now(),
            error: None,
        }
    }

    /// Record a failed invocation with its error description.
    #[must_use]
    pub fn failure(
        function_id: FunctionId,
        node_id: NodeId,
        duration_ms: u64,
        error: impl Into<String>,
    ) -> Self {
        Self {
            function_id,
            node_id,
            duration_ms,
            success: false,
            timestamp: Utc::now(),
            error: Some(error.into()),
        }
    }
}

/// Append-only invocation log with derived aggregates.
///
/// A single mutex guards the log; each public method is atomic, but two
/// sequential calls are not jointly atomic.
#[derive(Debug, Default)]
pub struct EdgeMetrics {
    records: Mutex<Vec<InvocationRecord>>,
}

impl EdgeMetrics {
    /// Create an empty metrics log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record. The log is unbounded.
    pub async fn record(&self, record: InvocationRecord) {
        self.records.lock().await.push(record);
    }

    /// Count invocations, optionally filtered by function and/or node.
    pub async fn total_invocations(
        &self,
        function_id: Option<&FunctionId>,
        node_id: Option<&NodeId>,
    ) -> usize {
        self.records
            .lock()
            .await
            .iter()
            .filter(|r| function_id.map_or(true, |f| &r.function_id == f))
            .filter(|r| node_id.map_or(true, |n| &r.node_id == n))
            .count()
    }

    /// Success rate as a percentage of matching records.
    ///
    /// Returns exactly 100.0 when no records match: the absence of data is
    /// vacuously "fully successful", not an error.
    #[allow(clippy::cast_precision_loss)]
    pub async fn success_rate(&self, function_id: Option<&FunctionId>) -> f64 {
        let records = self.records.lock().await;
        let matching: Vec<_> = records
            .iter()
            .filter(|r| function_id.map_or(true, |f| &r.function_id == f))
            .collect();

        if matching.is_empty() {
            return 100.0;
        }

        let successes = matching.iter().filter(|r| r.success).count();
        successes as f64 / matching.len() as f64 * 100.0
    }

    /// Mean handler wall time over matching records; 0.0 when none match.
    #[allow(clippy::cast_precision_loss)]
    pub async fn avg_latency_ms(&self, function_id: Option<&FunctionId>) -> f64 {
        let records = self.records.lock().await;
        let (total, count) = records
            .iter()
            .filter(|r| function_id.map_or(true, |f| &r.function_id == f))
            .fold((0u64, 0usize), |(sum, n), r| (sum + r.duration_ms, n + 1));

        if count == 0 {
            return 0.0;
        }
        total as f64 / count as f64
    }

    /// Count of failed invocations, optionally filtered by node.
    pub async fn error_count(&self, node_id: Option<&NodeId>) -> usize {
        self.records
            .lock()
            .await
            .iter()
            .filter(|r| !r.success)
            .filter(|r| node_id.map_or(true, |n| &r.node_id == n))
            .count()
    }

    /// Snapshot of the full log.
    pub async fn records(&self) -> Vec<InvocationRecord> {
        self.records.lock().await.clone()
    }
}
