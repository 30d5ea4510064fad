//! Core error types for coedit-core.
//!
//! Uses `thiserror` for structured, matchable error variants. Correlation
//! problems are not errors: they are reported as [`CorrelationWarning`] and
//! never stop a lock from being taken.

use crate::id::{PageId, SnapshotId};
use thiserror::Error;

/// Core errors produced by the coedit-core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Two nodes in one snapshot share the same page identifier.
    #[error("duplicate page id '{page_id}' in snapshot '{snapshot_id}'")]
    DuplicatePageId {
        snapshot_id: SnapshotId,
        page_id: PageId,
    },

    /// A snapshot was supplied without an identifier.
    #[error("snapshot id must not be empty")]
    EmptySnapshotId,
}

/// Reason a correlation lookup fell back to the requested page only.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CorrelationWarning {
    /// No supplied snapshot contains a node with the requested id.
    #[error("page '{page_id}' not present in any loaded hierarchy snapshot")]
    PageNotFound { page_id: PageId },

    /// The page exists but carries no content reference.
    #[error("page '{page_id}' in snapshot '{snapshot_id}' has no content reference")]
    MissingContentReference {
        snapshot_id: SnapshotId,
        page_id: PageId,
    },
}
