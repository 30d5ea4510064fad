//! Editing lock infrastructure.
//!
//! Provides the building blocks for collaborative editing:
//! - [`lock`] for the lock record, lock types and errors
//! - [`store::LockStore`] for TTL-based storage with a self-healing index
//! - [`lock_manager::LockService`] for the locking policy

pub mod lock;
pub mod lock_manager;
pub mod store;

pub use lock::{ClaimedPage, Lock, LockError, LockToken, LockType, Owner, Scope};
pub use lock_manager::LockService;
pub use store::{LockStore, DEFAULT_LOCK_TTL};

use axum::http::HeaderMap;

use crate::error::ApiError;

/// Extracts the acting user from the `X-User-Id` / `X-User-Name` headers.
///
/// The display name falls back to the id. Returns `ApiError::BadRequest` if
/// the id header is missing or empty. Identity is trusted as given.
pub fn extract_owner(headers: &HeaderMap) -> Result<Owner, ApiError> {
    let id = headers
        .get("X-User-Id")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::BadRequest("X-User-Id header required".to_string()))?;

    let display_name = headers
        .get("X-User-Name")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(id);

    Ok(Owner::new(id, display_name))
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn owner_from_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("X-User-Id", HeaderValue::from_static("alice"));
        headers.insert("X-User-Name", HeaderValue::from_static("Alice Martin"));
        let owner = extract_owner(&headers).unwrap();
        assert_eq!(owner.id.as_str(), "alice");
        assert_eq!(owner.display_name, "Alice Martin");
    }

    #[test]
    fn display_name_defaults_to_id() {
        let mut headers = HeaderMap::new();
        headers.insert("X-User-Id", HeaderValue::from_static("bob"));
        assert_eq!(extract_owner(&headers).unwrap().display_name, "bob");
    }

    #[test]
    fn missing_id_is_rejected() {
        assert!(matches!(
            extract_owner(&HeaderMap::new()),
            Err(ApiError::BadRequest(_))
        ));
    }
}
