//! Edge-cloud state reconciliation with versioning and integrity checks.
//!
//! Conflict resolution is purely by version number: a remote state replaces
//! the local one only when its version is strictly greater, never because its
//! wall-clock timestamp looks newer. Integrity is a checksum over a canonical
//! (key-sorted) serialisation of the data; verification is advisory, a
//! boolean the caller decides policy on, never an error.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{EdgeError, Result};

/// Checksummed, versioned state snapshot.
///
/// The data map is a `BTreeMap` so its serialised form is canonical: keys
/// always appear in sorted order, and the checksum is stable across
/// round-trips. Mutating `data` without recomputing the checksum makes
/// [`verify`](SyncState::verify) return false.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncState {
    /// Monotonic version number; 0 for the empty initial state.
    pub version: u64,
    /// Opaque key/value payload.
    pub data: BTreeMap<String, Value>,
    /// Hex-encoded SHA-256 over the canonical serialisation of `data`.
    pub checksum: String,
    /// When this state was produced.
    pub updated_at: DateTime<Utc>,
}

impl SyncState {
    /// The empty initial state, version 0.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            version: 0,
            checksum: checksum_of(&BTreeMap::new()),
            data: BTreeMap::new(),
            updated_at: Utc::now(),
        }
    }

    /// Build a state from data, computing its checksum.
    pub fn from_data(data: BTreeMap<String, Value>, version: u64) -> Result<Self> {
        let checksum = try_checksum_of(&data)?;
        Ok(Self {
            version,
            data,
            checksum,
            updated_at: Utc::now(),
        })
    }

    /// Recompute the checksum and compare against the stored one.
    #[must_use]
    pub fn verify(&self) -> bool {
        try_checksum_of(&self.data).is_ok_and(|c| c == self.checksum)
    }
}

fn checksum_of(data: &BTreeMap<String, Value>) -> String {
    // BTreeMap<String, _> serialisation cannot fail; the empty map doubly so.
    try_checksum_of(data).unwrap_or_default()
}

fn try_checksum_of(data: &BTreeMap<String, Value>) -> Result<String> {
    let bytes = serde_json::to_vec(data).map_err(|e| EdgeError::serialisation(e.to_string()))?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(hex::encode(hasher.finalize()))
}

/// A local update not yet confirmed by the central authority.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingChange {
    /// Version the update produced.
    pub version: u64,
    /// Snapshot of the data at that version.
    pub data: BTreeMap<String, Value>,
    /// When the update was recorded.
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug)]
struct SyncInner {
    state: SyncState,
    pending: Vec<PendingChange>,
}

/// Reconciles local state with a central authority.
///
/// A single mutex guards all mutating operations; individual calls are
/// atomic, but two sequential calls are not jointly atomic.
#[derive(Debug)]
pub struct EdgeSynchronizer {
    inner: Mutex<SyncInner>,
}

impl EdgeSynchronizer {
    /// Create a synchroniser at the empty initial state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(SyncInner {
                state: SyncState::empty(),
                pending: Vec::new(),
            }),
        }
    }

    /// Replace the local data, bumping the version (first update is 1) and
    /// recording a pending change for later upload.
    pub async fn update_local(&self, data: BTreeMap<String, Value>) -> Result<SyncState> {
        let mut inner = self.inner.lock().await;
        let version = inner.state.version + 1;
        let state = SyncState::from_data(data, version)?;

        inner.pending.push(PendingChange {
            version,
            data: state.data.clone(),
            recorded_at: state.updated_at,
        });
        inner.state = state.clone();

        debug!(version, "recorded local update");
        Ok(state)
    }

    /// Apply a remote state if its version is strictly greater than the
    /// local one. Returns whether it was applied.
    pub async fn apply_remote(&self, state: SyncState) -> bool {
        let mut inner = self.inner.lock().await;
        if state.version <= inner.state.version {
            debug!(
                remote = state.version,
                local = inner.state.version,
                "ignoring remote state at or below local version"
            );
            return false;
        }

        info!(
            from = inner.state.version,
            to = state.version,
            "applying remote state"
        );
        inner.state = state;
        true
    }

    /// Snapshot of the current local state.
    pub async fn local_state(&self) -> SyncState {
        self.inner.lock().await.state.clone()
    }

    /// Copy of the pending-changes log, never the live log.
    pub async fn get_pending_changes(&self) -> Vec<PendingChange> {
        self.inner.lock().await.pending.clone()
    }

    /// Drop pending entries with version at or below the confirmed value.
    /// Returns the number of entries dropped.
    pub async fn confirm_sync(&self, up_to_version: u64) -> usize {
        let mut inner = self.inner.lock().await;
        let before = inner.pending.len();
        inner.pending.retain(|c| c.version > up_to_version);
        let dropped = before - inner.pending.len();
        if dropped > 0 {
            debug!(up_to_version, dropped, "confirmed synced changes");
        }
        dropped
    }
}

impl Default for EdgeSynchronizer {
    fn default() -> Self {
        Self::new()
    }
}
