//! Collaborative editing lock service.
//!
//! [`LockService`] composes the correlation resolver and the [`LockStore`]
//! and enforces the locking policy:
//! - first claim wins: a page claimed by a live lock cannot be claimed again
//!   in the same `(project, lock type)` scope;
//! - one lock per owner per scope: acquiring a new lock releases the owner's
//!   previous one of that type;
//! - locks expire `ttl` after their last acquire or heartbeat.
//!
//! Mutating operations run under a per-scope mutex so the check-then-insert
//! in [`LockService::acquire`] is atomic. Unrelated scopes never contend.
//! A scope's mutex is dropped again once the scope holds no live lock and
//! no caller is using it.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use parking_lot::Mutex;

use coedit_core::correlation::resolve;
use coedit_core::{OwnerId, PageId, ProjectId};

use super::lock::{Lock, LockError, LockToken, LockType, Owner, Scope};
use super::store::{LockStore, DEFAULT_LOCK_TTL};
use crate::hierarchy::{HierarchyCatalog, HierarchySource};

/// Lock manager for concurrent content editing.
pub struct LockService {
    store: LockStore,
    hierarchies: Arc<dyn HierarchySource>,
    scopes: DashMap<Scope, Arc<Mutex<()>>>,
}

impl LockService {
    /// Creates a service resolving correlations through `hierarchies`.
    pub fn new(ttl: Duration, hierarchies: Arc<dyn HierarchySource>) -> Self {
        LockService {
            store: LockStore::new(ttl),
            hierarchies,
            scopes: DashMap::new(),
        }
    }

    /// Creates a service with the default 5-minute TTL and an empty catalog.
    pub fn with_default_ttl() -> Self {
        Self::new(DEFAULT_LOCK_TTL, Arc::new(HierarchyCatalog::new()))
    }

    pub fn ttl(&self) -> Duration {
        self.store.ttl()
    }

    /// Runs `f` under the scope mutex, creating it if needed.
    fn with_scope<R>(&self, scope: &Scope, f: impl FnOnce() -> R) -> R {
        let mutex = self.scopes.entry(scope.clone()).or_default().value().clone();
        let result = {
            let _guard = mutex.lock();
            f()
        };
        drop(mutex);
        self.prune_scope(scope);
        result
    }

    /// Runs `f` under the scope mutex only if one exists. A scope without a
    /// mutex holds no live lock.
    fn with_existing_scope<R>(&self, scope: &Scope, f: impl FnOnce() -> R) -> Option<R> {
        let mutex = self.scopes.get(scope)?.value().clone();
        let result = {
            let _guard = mutex.lock();
            f()
        };
        drop(mutex);
        self.prune_scope(scope);
        Some(result)
    }

    fn prune_scope(&self, scope: &Scope) {
        self.scopes.remove_if(scope, |scope, mutex| {
            Arc::strong_count(mutex) == 1 && self.store.scoped(scope).next().is_none()
        });
    }

    fn find_by_page(&self, scope: &Scope, page_id: &PageId) -> Option<Lock> {
        self.store.scoped(scope).find(|lock| lock.claims(page_id))
    }

    fn find_by_owner(&self, scope: &Scope, owner_id: &OwnerId) -> Option<Lock> {
        self.store.scoped(scope).find(|lock| &lock.owner.id == owner_id)
    }

    /// Returns true if some live lock in the scope claims `page_id`.
    pub fn exists(&self, project_id: &ProjectId, page_id: &PageId, lock_type: LockType) -> bool {
        self.lookup_by_page(project_id, page_id, lock_type).is_some()
    }

    /// Returns true if `owner_id` holds a live lock of this type in the project.
    pub fn exists_for_owner(
        &self,
        project_id: &ProjectId,
        owner_id: &OwnerId,
        lock_type: LockType,
    ) -> bool {
        self.lookup_by_owner(project_id, owner_id, lock_type).is_some()
    }

    pub fn lookup_by_page(
        &self,
        project_id: &ProjectId,
        page_id: &PageId,
        lock_type: LockType,
    ) -> Option<Lock> {
        self.find_by_page(&Scope::new(project_id.clone(), lock_type), page_id)
    }

    pub fn lookup_by_owner(
        &self,
        project_id: &ProjectId,
        owner_id: &OwnerId,
        lock_type: LockType,
    ) -> Option<Lock> {
        self.find_by_owner(&Scope::new(project_id.clone(), lock_type), owner_id)
    }

    /// Number of live locks in the scope.
    pub fn count(&self, project_id: &ProjectId, lock_type: LockType) -> usize {
        self.store
            .scoped(&Scope::new(project_id.clone(), lock_type))
            .count()
    }

    /// Live locks of one scope.
    pub fn list(&self, project_id: &ProjectId, lock_type: LockType) -> Vec<Lock> {
        self.store
            .scoped(&Scope::new(project_id.clone(), lock_type))
            .collect()
    }

    /// Every live lock across all projects and types.
    pub fn all(&self) -> Vec<Lock> {
        self.store.all().collect()
    }

    /// Claims `page_id` (and every page correlated with it) for `owner`.
    ///
    /// If a live lock already claims the page, returns `Ok(None)` without
    /// creating anything, or [`LockError::AlreadyLocked`] when
    /// `fail_if_exists` is set. This holds whoever owns the existing lock.
    /// Otherwise the owner's previous lock in the scope is released and the
    /// new lock is returned.
    pub fn acquire(
        &self,
        project_id: &ProjectId,
        page_id: &PageId,
        lock_type: LockType,
        owner: &Owner,
        fail_if_exists: bool,
    ) -> Result<Option<Lock>, LockError> {
        let scope = Scope::new(project_id.clone(), lock_type);
        self.with_scope(&scope, || {
            let existing: Vec<Lock> = self.store.scoped(&scope).collect();

            if existing.iter().any(|lock| lock.claims(page_id)) {
                if fail_if_exists {
                    tracing::debug!(project = %project_id, page = %page_id, %lock_type, "acquire refused: page already locked");
                    return Err(LockError::AlreadyLocked {
                        lock_type,
                        page_id: page_id.clone(),
                    });
                }
                tracing::debug!(project = %project_id, page = %page_id, %lock_type, "page already locked; acquire is a no-op");
                return Ok(None);
            }

            let snapshots = self.hierarchies.snapshots(project_id);
            let correlation = resolve(page_id, &snapshots);
            if let Some(warning) = &correlation.warning {
                tracing::warn!(project = %project_id, %warning, "correlation incomplete; locking requested page only");
            }

            let previous = existing.iter().find(|lock| lock.owner.id == owner.id);

            // A correlated page held by someone else is a conflict too. The
            // owner's previous lock does not count; it is about to be released.
            let correlated_conflict = existing
                .iter()
                .filter(|lock| previous.map_or(true, |p| p.token != lock.token))
                .any(|lock| correlation.pages.iter().any(|c| lock.claims(&c.page_id)));
            if correlated_conflict {
                if fail_if_exists {
                    tracing::debug!(project = %project_id, page = %page_id, %lock_type, "acquire refused: correlated page already locked");
                    return Err(LockError::AlreadyLocked {
                        lock_type,
                        page_id: page_id.clone(),
                    });
                }
                return Ok(None);
            }

            if let Some(previous) = previous {
                self.store.remove(&previous.token);
                tracing::info!(project = %project_id, owner = %owner.id, token = %previous.token, %lock_type, "released superseded lock");
            }

            let now = Utc::now();
            let lock = self.store.put(Lock {
                token: LockToken::generate(),
                project_id: project_id.clone(),
                lock_type,
                owner: owner.clone(),
                claimed: correlation.pages,
                created_at: now,
                expires_at: now,
            });

            tracing::info!(
                project = %project_id,
                page = %page_id,
                owner = %owner.id,
                token = %lock.token,
                claimed = lock.claimed.len(),
                %lock_type,
                "lock acquired"
            );
            Ok(Some(lock))
        })
    }

    /// Removes the lock claiming `page_id`, if any.
    pub fn release(
        &self,
        project_id: &ProjectId,
        page_id: &PageId,
        lock_type: LockType,
    ) -> Option<Lock> {
        let scope = Scope::new(project_id.clone(), lock_type);
        self.with_existing_scope(&scope, || {
            let lock = self.find_by_page(&scope, page_id)?;
            let removed = self.store.remove(&lock.token);
            tracing::info!(project = %project_id, page = %page_id, token = %lock.token, %lock_type, "lock released");
            removed
        })
        .flatten()
    }

    /// Removes every live lock held by `owner_id`, across projects,
    /// optionally restricted to one lock type.
    pub fn release_all_for_owner(
        &self,
        owner_id: &OwnerId,
        lock_type: Option<LockType>,
    ) -> Vec<Lock> {
        let candidates: Vec<Lock> = self
            .store
            .all()
            .filter(|lock| &lock.owner.id == owner_id)
            .filter(|lock| lock_type.map_or(true, |t| t == lock.lock_type))
            .collect();

        let mut released = Vec::new();
        for candidate in candidates {
            // Re-check under the scope lock: it may have been released or
            // superseded since enumeration.
            let removed = self.with_scope(&candidate.scope(), || {
                self.store.get(&candidate.token).ok()?;
                self.store.remove(&candidate.token)
            });
            if let Some(lock) = removed {
                tracing::debug!(
                    project = %lock.project_id,
                    page = ?lock.primary_page(),
                    token = %lock.token,
                    lock_type = %lock.lock_type,
                    "lock released for owner"
                );
                released.push(lock);
            }
        }

        if !released.is_empty() {
            tracing::info!(owner = %owner_id, count = released.len(), "released all locks for owner");
        }
        released
    }

    /// Extends the owner's lock to `now + ttl`.
    ///
    /// Fails with [`LockError::NotFound`] if the owner holds no live lock of
    /// this type; the caller must acquire again.
    pub fn heartbeat(
        &self,
        project_id: &ProjectId,
        owner_id: &OwnerId,
        lock_type: LockType,
    ) -> Result<Lock, LockError> {
        let scope = Scope::new(project_id.clone(), lock_type);
        let not_found = || {
            LockError::NotFound(format!(
                "no {lock_type} lock held by {owner_id} in project {project_id}"
            ))
        };
        self.with_existing_scope(&scope, || {
            let lock = self.find_by_owner(&scope, owner_id).ok_or_else(not_found)?;
            let refreshed = self.store.put(lock);
            tracing::debug!(project = %project_id, owner = %owner_id, token = %refreshed.token, "heartbeat");
            Ok(refreshed)
        })
        .unwrap_or_else(|| Err(not_found()))
    }

    /// Checks that `owner_id` may save `page_id`: a live lock must claim the
    /// page and belong to the owner.
    pub fn verify_can_save(
        &self,
        project_id: &ProjectId,
        page_id: &PageId,
        lock_type: LockType,
        owner_id: &OwnerId,
    ) -> Result<Lock, LockError> {
        match self.lookup_by_page(project_id, page_id, lock_type) {
            Some(lock) if &lock.owner.id == owner_id => Ok(lock),
            Some(_) => Err(LockError::AlreadyLocked {
                lock_type,
                page_id: page_id.clone(),
            }),
            None => Err(LockError::NotFound(format!(
                "no {lock_type} lock on {page_id} in project {project_id}"
            ))),
        }
    }

    /// Checks that `owner_id` may load `page_id` for editing: no other
    /// owner may hold a live lock on it.
    pub fn verify_can_load(
        &self,
        project_id: &ProjectId,
        page_id: &PageId,
        lock_type: LockType,
        owner_id: &OwnerId,
    ) -> Result<(), LockError> {
        match self.lookup_by_page(project_id, page_id, lock_type) {
            Some(lock) if &lock.owner.id != owner_id => Err(LockError::AlreadyLocked {
                lock_type,
                page_id: page_id.clone(),
            }),
            _ => Ok(()),
        }
    }

    /// Drops expired lock values and returns them. Scope mutexes left idle
    /// are dropped too.
    pub fn sweep_expired_locks(&self) -> Vec<Lock> {
        let swept = self.store.purge_expired();
        self.scopes.retain(|scope, mutex| {
            Arc::strong_count(mutex) > 1 || self.store.scoped(scope).next().is_some()
        });
        swept
    }

    /// Spawns a background tokio task that periodically sweeps expired locks.
    pub fn start_expiry_sweep(self: &Arc<Self>, interval: Duration) {
        let service = Arc::clone(self);
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(interval);
            loop {
                tick.tick().await;
                let swept = service.sweep_expired_locks();
                if !swept.is_empty() {
                    let tokens: Vec<String> = swept.iter().map(|l| l.token.to_string()).collect();
                    tracing::info!("Swept {} expired lock(s): {:?}", swept.len(), tokens);
                }
            }
        });
    }
}

impl Default for LockService {
    fn default() -> Self {
        Self::with_default_ttl()
    }
}
