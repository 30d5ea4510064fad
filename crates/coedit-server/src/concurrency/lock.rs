//! Lock records and the errors lock operations can return.

use std::fmt;

use chrono::{DateTime, Utc};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use coedit_core::{CorrelatedPage, OwnerId, PageId, ProjectId};

/// A claimed page, tagged with the snapshot it was resolved from.
pub type ClaimedPage = CorrelatedPage;

/// Opaque lock token (UUID v4 newtype). Also the storage key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LockToken(pub Uuid);

impl LockToken {
    /// Generates a fresh random token.
    pub fn generate() -> Self {
        LockToken(Uuid::new_v4())
    }
}

impl fmt::Display for LockToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Locking namespace. A user may hold one lock of each type at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LockType {
    /// A single content unit.
    Section,
    /// The whole document.
    Document,
}

impl fmt::Display for LockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockType::Section => f.write_str("section"),
            LockType::Document => f.write_str("document"),
        }
    }
}

/// Identity of the acting user, supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    pub id: OwnerId,
    pub display_name: String,
}

impl Owner {
    pub fn new(id: impl Into<OwnerId>, display_name: impl Into<String>) -> Self {
        Owner {
            id: id.into(),
            display_name: display_name.into(),
        }
    }
}

/// The `(project, lock type)` pair that bounds mutual exclusion.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Scope {
    pub project_id: ProjectId,
    pub lock_type: LockType,
}

impl Scope {
    pub fn new(project_id: ProjectId, lock_type: LockType) -> Self {
        Scope {
            project_id,
            lock_type,
        }
    }
}

/// An exclusive, time-limited editing claim over correlated pages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lock {
    pub token: LockToken,
    pub project_id: ProjectId,
    pub lock_type: LockType,
    pub owner: Owner,
    /// Requested page first, then every correlated page.
    pub claimed: IndexSet<ClaimedPage>,
    pub created_at: DateTime<Utc>,
    /// Wall-clock expiry reported to clients. The store decides liveness
    /// on its own monotonic deadline.
    pub expires_at: DateTime<Utc>,
}

impl Lock {
    pub fn scope(&self) -> Scope {
        Scope::new(self.project_id.clone(), self.lock_type)
    }

    /// The page the lock was originally requested for.
    pub fn primary_page(&self) -> Option<&PageId> {
        self.claimed.first().map(|c| &c.page_id)
    }

    /// Returns true if any claimed entry carries this page id.
    pub fn claims(&self, page_id: &PageId) -> bool {
        self.claimed.iter().any(|c| &c.page_id == page_id)
    }
}

/// Errors from lock operations.
///
/// Conflicts never name the current holder.
#[derive(Debug, thiserror::Error)]
pub enum LockError {
    /// Another live lock already claims the page.
    #[error("{lock_type} {page_id} is being edited by someone else")]
    AlreadyLocked {
        lock_type: LockType,
        page_id: PageId,
    },

    /// No live lock matches the request.
    #[error("lock not found: {0}")]
    NotFound(String),
}
