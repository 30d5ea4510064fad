//! TTL-based lock storage with a per-scope enumeration index.
//!
//! [`LockStore`] keeps lock values keyed by token and, separately, an index
//! of tokens per `(project, lock type)` scope. Expired values are dropped by
//! [`LockStore::get`] and [`LockStore::purge_expired`] without touching the
//! index, so the two can disagree for a while. Enumeration
//! ([`LockStore::all`], [`LockStore::scoped`]) reconciles them: any index
//! entry that no longer resolves to a live value is dropped as it is visited.
//!
//! Liveness is decided on the monotonic clock. The wall-clock `expires_at`
//! on a [`Lock`] is only reported to clients.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use indexmap::IndexSet;

use super::lock::{Lock, LockError, LockToken, Scope};

/// Default lock time-to-live: 5 minutes.
pub const DEFAULT_LOCK_TTL: Duration = Duration::from_secs(5 * 60);

/// A stored lock and its monotonic deadline. `None` never expires.
#[derive(Debug)]
struct Entry {
    lock: Lock,
    deadline: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.deadline.map_or(true, |deadline| deadline > now)
    }
}

/// Concurrent lock store with TTL expiry.
pub struct LockStore {
    values: DashMap<LockToken, Entry>,
    index: DashMap<Scope, IndexSet<LockToken>>,
    ttl: Duration,
}

impl LockStore {
    /// Creates an empty store whose locks live for `ttl` after each `put`.
    pub fn new(ttl: Duration) -> Self {
        LockStore {
            values: DashMap::new(),
            index: DashMap::new(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn expiry_from(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        chrono::Duration::from_std(self.ttl)
            .ok()
            .and_then(|ttl| now.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Inserts or replaces a lock by token. The lock stays live for `ttl`
    /// from now; `expires_at` is set to the matching wall-clock time.
    ///
    /// Returns the stored lock with its new expiry.
    pub fn put(&self, mut lock: Lock) -> Lock {
        let deadline = Instant::now().checked_add(self.ttl);
        lock.expires_at = self.expiry_from(Utc::now());
        let token = lock.token;
        let scope = lock.scope();
        // Value before index: enumeration treats an indexed token without a
        // value as stale.
        self.values.insert(
            token,
            Entry {
                lock: lock.clone(),
                deadline,
            },
        );
        self.index.entry(scope).or_default().insert(token);
        lock
    }

    /// Returns the lock if present and unexpired.
    pub fn get(&self, token: &LockToken) -> Result<Lock, LockError> {
        let now = Instant::now();
        if let Some(entry) = self.values.get(token) {
            if entry.is_live(now) {
                return Ok(entry.lock.clone());
            }
        }
        self.values.remove_if(token, |_, entry| !entry.is_live(now));
        Err(LockError::NotFound(format!("token {token}")))
    }

    /// Deletes a lock unconditionally. Idempotent.
    pub fn remove(&self, token: &LockToken) -> Option<Lock> {
        match self.values.remove(token) {
            Some((_, Entry { lock, .. })) => {
                let scope = lock.scope();
                if let Some(mut tokens) = self.index.get_mut(&scope) {
                    tokens.shift_remove(token);
                }
                self.index.remove_if(&scope, |_, tokens| tokens.is_empty());
                Some(lock)
            }
            None => {
                tracing::warn!(%token, "remove called for a token with no stored lock");
                None
            }
        }
    }

    /// Lazily yields every live lock, healing stale index entries on the way.
    ///
    /// The token list is captured up front; locks stored after the call
    /// starts are not seen. The iterator cannot be restarted.
    pub fn all(&self) -> impl Iterator<Item = Lock> + '_ {
        let mut entries = Vec::new();
        for entry in self.index.iter() {
            let scope = entry.key();
            entries.extend(entry.value().iter().map(|token| (scope.clone(), *token)));
        }
        entries
            .into_iter()
            .filter_map(move |(scope, token)| self.resolve_indexed(&scope, token))
    }

    /// Like [`LockStore::all`], restricted to one scope.
    pub fn scoped(&self, scope: &Scope) -> impl Iterator<Item = Lock> + '_ {
        let tokens: Vec<LockToken> = self
            .index
            .get(scope)
            .map(|tokens| tokens.iter().copied().collect())
            .unwrap_or_default();
        let scope = scope.clone();
        tokens
            .into_iter()
            .filter_map(move |token| self.resolve_indexed(&scope, token))
    }

    /// Removes expired values and returns them. Leaves the index untouched;
    /// the next enumeration drops the orphaned tokens.
    pub fn purge_expired(&self) -> Vec<Lock> {
        let now = Instant::now();
        let expired: Vec<LockToken> = self
            .values
            .iter()
            .filter(|entry| !entry.value().is_live(now))
            .map(|entry| *entry.key())
            .collect();

        expired
            .into_iter()
            .filter_map(|token| {
                self.values
                    .remove_if(&token, |_, entry| !entry.is_live(now))
                    .map(|(_, entry)| entry.lock)
            })
            .collect()
    }

    /// Number of tokens in the index, live or not.
    #[cfg(test)]
    pub(crate) fn indexed_len(&self) -> usize {
        self.index.iter().map(|entry| entry.value().len()).sum()
    }

    fn resolve_indexed(&self, scope: &Scope, token: LockToken) -> Option<Lock> {
        let now = Instant::now();
        if let Some(entry) = self.values.get(&token) {
            if entry.is_live(now) {
                return Some(entry.lock.clone());
            }
        }

        self.values.remove_if(&token, |_, entry| !entry.is_live(now));

        // Re-check under the index entry lock: a concurrent put may have
        // refreshed the value since the check above.
        if let Some(mut tokens) = self.index.get_mut(scope) {
            let refreshed = self
                .values
                .get(&token)
                .map(|entry| entry.is_live(Instant::now()))
                .unwrap_or(false);
            if !refreshed && tokens.shift_remove(&token) {
                tracing::debug!(%token, project = %scope.project_id, "dropped stale index entry");
            }
        }
        self.index.remove_if(scope, |_, tokens| tokens.is_empty());
        None
    }
}

impl Default for LockStore {
    fn default() -> Self {
        Self::new(DEFAULT_LOCK_TTL)
    }
}

#[cfg(test)]
mod tests {
    use std::thread::sleep;

    use chrono::Utc;
    use indexmap::IndexSet;

    use coedit_core::{PageId, ProjectId};

    use super::*;
    use crate::concurrency::lock::{ClaimedPage, LockType, Owner};

    fn lock(project: &str, lock_type: LockType, page: &str) -> Lock {
        let now = Utc::now();
        let mut claimed = IndexSet::new();
        claimed.insert(ClaimedPage::new(None, PageId::new(page)));
        Lock {
            token: LockToken::generate(),
            project_id: ProjectId::new(project),
            lock_type,
            owner: Owner::new("alice", "Alice"),
            claimed,
            created_at: now,
            expires_at: now,
        }
    }

    #[test]
    fn put_sets_expiry_from_ttl() {
        let store = LockStore::default();
        let before = Utc::now();
        let stored = store.put(lock("p", LockType::Section, "x"));
        assert!(stored.expires_at >= before + chrono::Duration::minutes(5));
        assert_eq!(store.get(&stored.token).unwrap().token, stored.token);
    }

    #[test]
    fn get_missing_is_not_found() {
        let store = LockStore::default();
        assert!(matches!(
            store.get(&LockToken::generate()),
            Err(LockError::NotFound(_))
        ));
    }

    #[test]
    fn remove_is_idempotent() {
        let store = LockStore::default();
        let stored = store.put(lock("p", LockType::Section, "x"));
        assert!(store.remove(&stored.token).is_some());
        assert!(store.remove(&stored.token).is_none());
        assert_eq!(store.all().count(), 0);
        assert_eq!(store.indexed_len(), 0);
    }

    #[test]
    fn scoped_filters_by_project_and_type() {
        let store = LockStore::default();
        store.put(lock("p", LockType::Section, "x"));
        store.put(lock("p", LockType::Document, "doc"));
        store.put(lock("q", LockType::Section, "y"));

        let scope = Scope::new(ProjectId::new("p"), LockType::Section);
        let found: Vec<Lock> = store.scoped(&scope).collect();
        assert_eq!(found.len(), 1);
        assert!(found[0].claims(&PageId::new("x")));
        assert_eq!(store.all().count(), 3);
    }

    #[test]
    fn expired_values_are_hidden_and_index_heals() {
        let store = LockStore::new(Duration::from_millis(20));
        let stored = store.put(lock("p", LockType::Section, "x"));
        sleep(Duration::from_millis(50));

        assert!(store.get(&stored.token).is_err());
        // Value is gone, index still references it until enumeration.
        assert_eq!(store.indexed_len(), 1);
        assert_eq!(store.all().count(), 0);
        assert_eq!(store.indexed_len(), 0);
    }

    #[test]
    fn purge_leaves_index_for_enumeration() {
        let store = LockStore::new(Duration::from_millis(20));
        store.put(lock("p", LockType::Section, "x"));
        sleep(Duration::from_millis(50));

        assert_eq!(store.purge_expired().len(), 1);
        assert_eq!(store.indexed_len(), 1);
        let scope = Scope::new(ProjectId::new("p"), LockType::Section);
        assert_eq!(store.scoped(&scope).count(), 0);
        assert_eq!(store.indexed_len(), 0);
    }

    #[test]
    fn put_again_refreshes_expiry() {
        let store = LockStore::new(Duration::from_millis(200));
        let stored = store.put(lock("p", LockType::Section, "x"));
        sleep(Duration::from_millis(20));
        let refreshed = store.put(stored.clone());
        assert!(refreshed.expires_at > stored.expires_at);
        assert_eq!(store.all().count(), 1);
    }

    #[test]
    fn liveness_ignores_wall_clock_expiry() {
        let store = LockStore::default();
        let stored = store.put(lock("p", LockType::Section, "x"));
        // Wall clock jumps forward past the reported expiry.
        if let Some(mut entry) = store.values.get_mut(&stored.token) {
            entry.lock.expires_at = Utc::now() - chrono::Duration::hours(1);
        }
        assert!(store.get(&stored.token).is_ok());
        assert_eq!(store.all().count(), 1);
        assert!(store.purge_expired().is_empty());
    }

    #[test]
    fn passed_deadline_expires_despite_future_wall_clock() {
        let store = LockStore::default();
        let stored = store.put(lock("p", LockType::Section, "x"));
        if let Some(mut entry) = store.values.get_mut(&stored.token) {
            entry.lock.expires_at = Utc::now() + chrono::Duration::hours(1);
            entry.deadline = Some(Instant::now());
        }
        assert!(store.get(&stored.token).is_err());
        assert_eq!(store.all().count(), 0);
        assert_eq!(store.indexed_len(), 0);
    }
}
