//! Schema types for lock management API.

use serde::{Deserialize, Serialize};

use crate::concurrency::{Lock, LockType};

/// Request to acquire a lock on a page.
#[derive(Debug, Clone, Deserialize)]
pub struct AcquireLockRequest {
    pub page_id: String,
    pub lock_type: LockType,
    /// Fail with 409 instead of succeeding as a no-op when the page is
    /// already locked.
    #[serde(default)]
    pub fail_if_exists: bool,
}

/// Response after an acquire attempt.
///
/// `created` is false when the page was already locked and nothing was
/// created; the existing holder is not reported.
#[derive(Debug, Clone, Serialize)]
pub struct AcquireLockResponse {
    pub created: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lock: Option<LockView>,
}

/// Request to release the lock on a page.
#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseLockRequest {
    pub page_id: String,
    pub lock_type: LockType,
}

/// Response after releasing a lock.
#[derive(Debug, Clone, Serialize)]
pub struct ReleaseLockResponse {
    /// False if no live lock claimed the page.
    pub released: bool,
}

/// Request to extend the caller's lock.
#[derive(Debug, Clone, Deserialize)]
pub struct HeartbeatRequest {
    pub lock_type: LockType,
}

/// Request to release all of the caller's locks.
#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseAllRequest {
    /// Restrict to one lock type; all types when absent.
    #[serde(default)]
    pub lock_type: Option<LockType>,
}

/// Response after a bulk release.
#[derive(Debug, Clone, Serialize)]
pub struct ReleaseAllResponse {
    /// Tokens of the released locks.
    pub released: Vec<String>,
}

/// Query parameters selecting a lock type.
#[derive(Debug, Clone, Deserialize)]
pub struct LockTypeQuery {
    pub lock_type: LockType,
}

/// Response listing locks.
#[derive(Debug, Clone, Serialize)]
pub struct LockListResponse {
    pub count: usize,
    pub locks: Vec<LockView>,
}

/// View of a claimed page.
#[derive(Debug, Clone, Serialize)]
pub struct ClaimedPageView {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot_id: Option<String>,
    pub page_id: String,
}

/// View of a single lock.
#[derive(Debug, Clone, Serialize)]
pub struct LockView {
    pub token: String,
    pub project_id: String,
    pub lock_type: LockType,
    pub owner_id: String,
    pub owner_name: String,
    pub claimed: Vec<ClaimedPageView>,
    pub created_at: String,
    pub expires_at: String,
}

impl From<Lock> for LockView {
    fn from(lock: Lock) -> Self {
        LockView {
            token: lock.token.to_string(),
            project_id: lock.project_id.0,
            lock_type: lock.lock_type,
            owner_id: lock.owner.id.0,
            owner_name: lock.owner.display_name,
            claimed: lock
                .claimed
                .into_iter()
                .map(|c| ClaimedPageView {
                    snapshot_id: c.snapshot_id.map(|s| s.0),
                    page_id: c.page_id.0,
                })
                .collect(),
            created_at: lock.created_at.to_rfc3339(),
            expires_at: lock.expires_at.to_rfc3339(),
        }
    }
}

impl LockListResponse {
    pub fn from_locks(locks: Vec<Lock>) -> Self {
        LockListResponse {
            count: locks.len(),
            locks: locks.into_iter().map(LockView::from).collect(),
        }
    }
}
