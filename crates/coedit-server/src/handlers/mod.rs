//! HTTP handler modules for the coedit API.
//!
//! Each sub-module implements thin handlers that parse requests, delegate to
//! [`LockService`](crate::concurrency::LockService) or the hierarchy catalog,
//! and return JSON responses. No locking policy lives in handlers.

pub mod hierarchies;
pub mod locks;
