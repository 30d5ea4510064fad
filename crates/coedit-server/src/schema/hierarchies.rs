//! Schema types for publishing hierarchy snapshots.

use serde::{Deserialize, Serialize};

use coedit_core::HierarchyNode;

/// Request to publish a snapshot's node tree.
#[derive(Debug, Clone, Deserialize)]
pub struct PublishSnapshotRequest {
    pub nodes: Vec<HierarchyNode>,
}

/// Response after publishing or withdrawing a snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotResponse {
    pub project_id: String,
    pub snapshot_id: String,
    pub node_count: usize,
    /// True if a snapshot with the same id was replaced (publish) or
    /// removed (withdraw).
    pub replaced: bool,
    /// Snapshots loaded for the project after the change, in publication
    /// order.
    pub snapshot_ids: Vec<String>,
}
