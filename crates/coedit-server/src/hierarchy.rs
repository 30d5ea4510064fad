//! Source of hierarchy snapshots for correlation.
//!
//! The lock service only reads snapshots; publishing them is the job of the
//! content collaborators. [`HierarchyCatalog`] is the in-process
//! implementation, fed through the HTTP surface.

use std::sync::Arc;

use dashmap::DashMap;

use coedit_core::{HierarchySnapshot, ProjectId, SnapshotId, SnapshotSet};

/// Provides the currently loaded hierarchy snapshots of a project.
pub trait HierarchySource: Send + Sync {
    /// Returns the project's snapshots in publication order. Unknown
    /// projects yield an empty set.
    fn snapshots(&self, project_id: &ProjectId) -> SnapshotSet;
}

/// In-memory snapshot catalog keyed by project.
///
/// Backed by `DashMap`; snapshots are shared as `Arc`s so handing a set to
/// the resolver never copies trees.
pub struct HierarchyCatalog {
    projects: DashMap<ProjectId, SnapshotSet>,
}

impl HierarchyCatalog {
    /// Creates a new empty catalog.
    pub fn new() -> Self {
        HierarchyCatalog {
            projects: DashMap::new(),
        }
    }

    /// Publishes a snapshot, replacing any snapshot with the same id.
    ///
    /// Returns the replaced snapshot, if any.
    pub fn publish(
        &self,
        project_id: ProjectId,
        snapshot: HierarchySnapshot,
    ) -> Option<Arc<HierarchySnapshot>> {
        let snapshot_id = snapshot.id().clone();
        tracing::debug!(project = %project_id, snapshot = %snapshot_id, nodes = snapshot.len(), "hierarchy snapshot published");
        self.projects
            .entry(project_id)
            .or_default()
            .insert(snapshot_id, Arc::new(snapshot))
    }

    /// Removes a snapshot and returns it, if it was present.
    pub fn withdraw(
        &self,
        project_id: &ProjectId,
        snapshot_id: &SnapshotId,
    ) -> Option<Arc<HierarchySnapshot>> {
        let removed = self
            .projects
            .get_mut(project_id)
            .and_then(|mut set| set.shift_remove(snapshot_id));
        self.projects.remove_if(project_id, |_, set| set.is_empty());
        if removed.is_some() {
            tracing::debug!(project = %project_id, snapshot = %snapshot_id, "hierarchy snapshot withdrawn");
        }
        removed
    }

    /// Ids of the project's loaded snapshots.
    pub fn snapshot_ids(&self, project_id: &ProjectId) -> Vec<SnapshotId> {
        self.projects
            .get(project_id)
            .map(|set| set.keys().cloned().collect())
            .unwrap_or_default()
    }
}

impl Default for HierarchyCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl HierarchySource for HierarchyCatalog {
    fn snapshots(&self, project_id: &ProjectId) -> SnapshotSet {
        self.projects
            .get(project_id)
            .map(|set| set.value().clone())
            .unwrap_or_default()
    }
}
