//! Lock management handlers.

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;

use coedit_core::{OwnerId, PageId, ProjectId};

use crate::concurrency::extract_owner;
use crate::error::ApiError;
use crate::schema::locks::{
    AcquireLockRequest, AcquireLockResponse, HeartbeatRequest, LockListResponse, LockTypeQuery,
    LockView, ReleaseAllRequest, ReleaseAllResponse, ReleaseLockRequest, ReleaseLockResponse,
};
use crate::state::AppState;

/// Rejects blank page ids. The id is otherwise kept verbatim, so it matches
/// the node ids published in hierarchy snapshots.
fn page_id(raw: &str) -> Result<PageId, ApiError> {
    if raw.trim().is_empty() {
        return Err(ApiError::BadRequest("page_id must not be empty".to_string()));
    }
    Ok(PageId::new(raw))
}

/// `POST /projects/{project}/locks/acquire`
pub async fn acquire_lock(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<AcquireLockRequest>,
) -> Result<Json<AcquireLockResponse>, ApiError> {
    let owner = extract_owner(&headers)?;
    let page_id = page_id(&req.page_id)?;

    let lock = state.locks.acquire(
        &ProjectId::new(project_id),
        &page_id,
        req.lock_type,
        &owner,
        req.fail_if_exists,
    )?;

    Ok(Json(AcquireLockResponse {
        created: lock.is_some(),
        lock: lock.map(LockView::from),
    }))
}

/// `POST /projects/{project}/locks/release`
pub async fn release_lock(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<ReleaseLockRequest>,
) -> Result<Json<ReleaseLockResponse>, ApiError> {
    let owner = extract_owner(&headers)?;
    let page_id = page_id(&req.page_id)?;
    tracing::debug!(owner = %owner.id, page = %page_id, "release requested");

    let released = state
        .locks
        .release(&ProjectId::new(project_id), &page_id, req.lock_type)
        .is_some();

    Ok(Json(ReleaseLockResponse { released }))
}

/// `POST /projects/{project}/locks/heartbeat`
pub async fn heartbeat(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<HeartbeatRequest>,
) -> Result<Json<LockView>, ApiError> {
    let owner = extract_owner(&headers)?;
    let lock = state
        .locks
        .heartbeat(&ProjectId::new(project_id), &owner.id, req.lock_type)?;
    Ok(Json(LockView::from(lock)))
}

/// `GET /projects/{project}/locks?lock_type=`
pub async fn list_project_locks(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    Query(query): Query<LockTypeQuery>,
) -> Json<LockListResponse> {
    let locks = state
        .locks
        .list(&ProjectId::new(project_id), query.lock_type);
    Json(LockListResponse::from_locks(locks))
}

/// `GET /projects/{project}/locks/pages/{page}?lock_type=`
pub async fn lock_by_page(
    State(state): State<AppState>,
    Path((project_id, page)): Path<(String, String)>,
    Query(query): Query<LockTypeQuery>,
) -> Result<Json<LockView>, ApiError> {
    let page_id = page_id(&page)?;
    state
        .locks
        .lookup_by_page(&ProjectId::new(project_id), &page_id, query.lock_type)
        .map(|lock| Json(LockView::from(lock)))
        .ok_or_else(|| ApiError::NotFound(format!("no {} lock on page {}", query.lock_type, page_id)))
}

/// `GET /projects/{project}/locks/owners/{owner}?lock_type=`
pub async fn lock_by_owner(
    State(state): State<AppState>,
    Path((project_id, owner)): Path<(String, String)>,
    Query(query): Query<LockTypeQuery>,
) -> Result<Json<LockView>, ApiError> {
    let owner_id = OwnerId::new(owner);
    state
        .locks
        .lookup_by_owner(&ProjectId::new(project_id), &owner_id, query.lock_type)
        .map(|lock| Json(LockView::from(lock)))
        .ok_or_else(|| {
            ApiError::NotFound(format!("no {} lock held by {}", query.lock_type, owner_id))
        })
}

/// `POST /locks/release-all`
pub async fn release_all(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ReleaseAllRequest>,
) -> Result<Json<ReleaseAllResponse>, ApiError> {
    let owner = extract_owner(&headers)?;

    let released = state
        .locks
        .release_all_for_owner(&owner.id, req.lock_type)
        .into_iter()
        .map(|lock| lock.token.to_string())
        .collect();

    Ok(Json(ReleaseAllResponse { released }))
}

/// `GET /locks`
pub async fn list_all_locks(State(state): State<AppState>) -> Json<LockListResponse> {
    Json(LockListResponse::from_locks(state.locks.all()))
}
