//! Router assembly for the coedit HTTP API.
//!
//! [`build_router`] wires all handler functions to their routes with
//! CORS and tracing middleware layers.

use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Builds the complete axum router with all API routes.
///
/// Routes use axum 0.8 `/{param}` path syntax.
/// TraceLayer provides request-level logging via tracing.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Hierarchy snapshots
        .route(
            "/projects/{project}/hierarchies/{snapshot}",
            put(handlers::hierarchies::publish_snapshot)
                .delete(handlers::hierarchies::withdraw_snapshot),
        )
        // Lock mutation
        .route(
            "/projects/{project}/locks/acquire",
            post(handlers::locks::acquire_lock),
        )
        .route(
            "/projects/{project}/locks/release",
            post(handlers::locks::release_lock),
        )
        .route(
            "/projects/{project}/locks/heartbeat",
            post(handlers::locks::heartbeat),
        )
        .route("/locks/release-all", post(handlers::locks::release_all))
        // Lock queries
        .route(
            "/projects/{project}/locks",
            get(handlers::locks::list_project_locks),
        )
        .route(
            "/projects/{project}/locks/pages/{page}",
            get(handlers::locks::lock_by_page),
        )
        .route(
            "/projects/{project}/locks/owners/{owner}",
            get(handlers::locks::lock_by_owner),
        )
        .route("/locks", get(handlers::locks::list_all_locks))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
