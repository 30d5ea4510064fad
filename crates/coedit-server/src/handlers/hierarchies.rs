//! Hierarchy snapshot publication handlers.

use axum::extract::{Path, State};
use axum::Json;

use coedit_core::{HierarchySnapshot, ProjectId, SnapshotId};

use crate::error::ApiError;
use crate::hierarchy::HierarchyCatalog;
use crate::schema::hierarchies::{PublishSnapshotRequest, SnapshotResponse};
use crate::state::AppState;

fn loaded_ids(catalog: &HierarchyCatalog, project_id: &ProjectId) -> Vec<String> {
    catalog
        .snapshot_ids(project_id)
        .into_iter()
        .map(|id| id.to_string())
        .collect()
}

/// `PUT /projects/{project}/hierarchies/{snapshot}`
pub async fn publish_snapshot(
    State(state): State<AppState>,
    Path((project_id, snapshot_id)): Path<(String, String)>,
    Json(req): Json<PublishSnapshotRequest>,
) -> Result<Json<SnapshotResponse>, ApiError> {
    let snapshot = HierarchySnapshot::new(SnapshotId::new(snapshot_id.clone()), req.nodes)?;
    let node_count = snapshot.len();
    let project = ProjectId::new(project_id.clone());
    let replaced = state.hierarchies.publish(project.clone(), snapshot).is_some();

    Ok(Json(SnapshotResponse {
        snapshot_ids: loaded_ids(&state.hierarchies, &project),
        project_id,
        snapshot_id,
        node_count,
        replaced,
    }))
}

/// `DELETE /projects/{project}/hierarchies/{snapshot}`
pub async fn withdraw_snapshot(
    State(state): State<AppState>,
    Path((project_id, snapshot_id)): Path<(String, String)>,
) -> Result<Json<SnapshotResponse>, ApiError> {
    let project = ProjectId::new(project_id.clone());
    let removed = state
        .hierarchies
        .withdraw(&project, &SnapshotId::new(snapshot_id.clone()))
        .ok_or_else(|| {
            ApiError::NotFound(format!(
                "snapshot {} not loaded for project {}",
                snapshot_id, project_id
            ))
        })?;

    Ok(Json(SnapshotResponse {
        snapshot_ids: loaded_ids(&state.hierarchies, &project),
        project_id,
        snapshot_id,
        node_count: removed.len(),
        replaced: true,
    }))
}
