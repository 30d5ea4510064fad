//! Application state shared by all handlers.
//!
//! [`AppState`] owns the lock service and the hierarchy catalog it reads
//! from. Both are constructed once per process and shared through `Arc`; the
//! lock service does its own fine-grained locking, so no outer mutex is
//! needed.

use std::sync::Arc;

use crate::concurrency::LockService;
use crate::config::ServerConfig;
use crate::hierarchy::HierarchyCatalog;

/// Shared application state for the HTTP server.
#[derive(Clone)]
pub struct AppState {
    /// Collaborative editing lock service.
    pub locks: Arc<LockService>,
    /// Loaded hierarchy snapshots, per project.
    pub hierarchies: Arc<HierarchyCatalog>,
}

impl AppState {
    /// Creates state from configuration and starts the expiry sweep.
    ///
    /// Must be called inside a tokio runtime.
    pub fn new(config: &ServerConfig) -> Self {
        let state = Self::without_sweep(config);
        state.locks.start_expiry_sweep(config.sweep_interval);
        state
    }

    /// Creates state without spawning the background sweep (for tests).
    pub fn without_sweep(config: &ServerConfig) -> Self {
        let hierarchies = Arc::new(HierarchyCatalog::new());
        let locks = Arc::new(LockService::new(config.lock_ttl, hierarchies.clone()));
        AppState { locks, hierarchies }
    }
}
