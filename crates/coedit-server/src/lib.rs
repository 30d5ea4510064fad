//! In-process collaborative editing lock manager with an HTTP/JSON surface.
//!
//! The lock manager keeps two users from editing the same content unit at
//! once, even when that unit is reachable under different page ids through
//! several hierarchy snapshots. This crate contains the lock store and
//! service, the hierarchy catalog, configuration, error handling, and the
//! route definitions.

pub mod concurrency;
pub mod config;
pub mod error;
pub mod handlers;
pub mod hierarchy;
pub mod router;
pub mod schema;
pub mod state;
