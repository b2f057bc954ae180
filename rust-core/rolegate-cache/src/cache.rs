// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//! The role cache.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use rolegate_audit::{Auditor, PerformanceMetric, SyncEvent};
use rolegate_model::{role_label, CacheState, Role, SharedClock, SystemClock, UserId};

use crate::config::CacheConfig;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One cached role assignment.
///
/// Only [`RoleCache`] creates or mutates entries; callers get copies from
/// [`RoleCache::peek`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    role: Option<Role>,
    cached_at: DateTime<Utc>,
    access_count: u64,
    last_access: DateTime<Utc>,
    /// Cache-wide access sequence at the last touch. Breaks `last_access` ties
    /// so that, at equal timestamps, the earlier access is evicted first.
    #[serde(skip)]
    access_seq: u64,
}

impl CacheEntry {
    fn new(role: Option<Role>, now: DateTime<Utc>, seq: u64) -> Self {
        Self {
            role,
            cached_at: now,
            access_count: 0,
            last_access: now,
            access_seq: seq,
        }
    }

    fn touch(&mut self, now: DateTime<Utc>, seq: u64) {
        self.access_count += 1;
        self.last_access = now;
        self.access_seq = seq;
    }

    fn recency_key(&self) -> RecencyKey {
        (self.last_access, self.access_seq)
    }

    pub fn role(&self) -> Option<Role> {
        self.role
    }

    pub fn cached_at(&self) -> DateTime<Utc> {
        self.cached_at
    }

    pub fn access_count(&self) -> u64 {
        self.access_count
    }

    pub fn last_access(&self) -> DateTime<Utc> {
        self.last_access
    }
}

/// Result of [`RoleCache::get`].
///
/// `Expired` still carries the stale role so the caller can choose between
/// serving it and forcing a refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheLookup {
    Hit(Option<Role>),
    Expired(Option<Role>),
    Miss,
}

impl CacheLookup {
    /// The cached value, fresh or stale. `None` on a miss or for a user that
    /// was cached as having no role.
    pub fn role(self) -> Option<Role> {
        match self {
            CacheLookup::Hit(role) | CacheLookup::Expired(role) => role,
            CacheLookup::Miss => None,
        }
    }

    pub fn state(self) -> CacheState {
        match self {
            CacheLookup::Hit(_) => CacheState::Hit,
            CacheLookup::Expired(_) => CacheState::Expired,
            CacheLookup::Miss => CacheState::Miss,
        }
    }

    pub fn is_hit(self) -> bool {
        matches!(self, CacheLookup::Hit(_))
    }
}

/// Aggregate cache statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    pub size: usize,
    pub max_size: usize,
    pub ttl_seconds: u64,
    /// `hit_count / total_requests`, or 0.0 before the first lookup.
    pub hit_rate: f64,
    /// Every `get`: hits, misses and expired reads.
    pub total_requests: u64,
    pub hit_count: u64,
    pub miss_count: u64,
    pub expired_count: u64,
    /// Entries removed to make room for new keys.
    pub eviction_count: u64,
    /// Entries removed by explicit invalidation.
    pub invalidation_count: u64,
}

// ---------------------------------------------------------------------------
// RoleCache
// ---------------------------------------------------------------------------

/// Position of an entry in eviction order, oldest first.
type RecencyKey = (DateTime<Utc>, u64);

/// The map and its recency index. Both change together under one lock.
#[derive(Debug)]
struct Slots {
    entries: HashMap<UserId, CacheEntry>,
    recency: BTreeMap<RecencyKey, UserId>,
}

impl Slots {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: HashMap::with_capacity(capacity),
            recency: BTreeMap::new(),
        }
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    /// Move `user_id` to the recent end of the index after `update` changes
    /// its recency.
    fn reposition(&mut self, user_id: UserId, update: impl FnOnce(&mut CacheEntry)) -> Option<&CacheEntry> {
        let entry = self.entries.get_mut(&user_id)?;
        self.recency.remove(&entry.recency_key());
        update(entry);
        self.recency.insert(entry.recency_key(), user_id);
        Some(entry)
    }

    fn insert(&mut self, user_id: UserId, entry: CacheEntry) {
        self.recency.insert(entry.recency_key(), user_id);
        self.entries.insert(user_id, entry);
    }

    fn remove(&mut self, user_id: UserId) -> Option<CacheEntry> {
        let entry = self.entries.remove(&user_id)?;
        self.recency.remove(&entry.recency_key());
        Some(entry)
    }

    fn pop_oldest(&mut self) -> Option<(UserId, CacheEntry)> {
        let (_, user_id) = self.recency.pop_first()?;
        self.entries.remove(&user_id).map(|entry| (user_id, entry))
    }

    fn oldest(&self) -> Option<UserId> {
        self.recency.first_key_value().map(|(_, id)| *id)
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.recency.clear();
    }
}

/// Bounded TTL + LRU cache of user roles.
///
/// The map and an ordered recency index sit behind a single `RwLock`. `get`
/// takes the write lock because it updates recency. A lookup, an upsert with
/// its eviction, or an invalidation each happen under one lock acquisition,
/// so no caller can observe a half-written entry or a half-finished eviction.
/// Eviction pops the head of the recency index and costs the same at any
/// fill level. Audit records are emitted after the lock is released.
pub struct RoleCache {
    config: CacheConfig,
    ttl: chrono::Duration,
    clock: SharedClock,
    auditor: Arc<Auditor>,
    slots: RwLock<Slots>,
    sequence: AtomicU64,
    hit_count: AtomicU64,
    miss_count: AtomicU64,
    expired_count: AtomicU64,
    eviction_count: AtomicU64,
    invalidation_count: AtomicU64,
}

impl RoleCache {
    /// Create a cache reading the system clock.
    pub fn new(config: CacheConfig, auditor: Arc<Auditor>) -> Self {
        Self::with_clock(config, Arc::new(SystemClock), auditor)
    }

    pub fn with_clock(config: CacheConfig, clock: SharedClock, auditor: Arc<Auditor>) -> Self {
        let capacity = config.effective_max_size().min(4096);
        Self {
            ttl: config.ttl(),
            config,
            clock,
            auditor,
            slots: RwLock::new(Slots::with_capacity(capacity)),
            sequence: AtomicU64::new(0),
            hit_count: AtomicU64::new(0),
            miss_count: AtomicU64::new(0),
            expired_count: AtomicU64::new(0),
            eviction_count: AtomicU64::new(0),
            invalidation_count: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Look up a user's cached role.
    ///
    /// Hits and expired reads both refresh the entry's recency and access
    /// count; staleness is tracked separately through `cached_at`.
    pub fn get(&self, user_id: UserId) -> CacheLookup {
        let now = self.clock.now();
        let mut slots = self.write();
        let seq = self.next_seq();
        match slots.reposition(user_id, |entry| entry.touch(now, seq)) {
            Some(entry) => {
                if self.is_expired(entry, now) {
                    self.expired_count.fetch_add(1, Ordering::Relaxed);
                    CacheLookup::Expired(entry.role)
                } else {
                    self.hit_count.fetch_add(1, Ordering::Relaxed);
                    CacheLookup::Hit(entry.role)
                }
            }
            None => {
                self.miss_count.fetch_add(1, Ordering::Relaxed);
                CacheLookup::Miss
            }
        }
    }

    /// Insert or overwrite a user's role.
    ///
    /// An existing entry is refreshed in place. A new key at capacity first
    /// evicts the least recently accessed entry.
    pub fn set(&self, user_id: UserId, role: Option<Role>) {
        let start = Instant::now();
        let now = self.clock.now();

        let evicted = {
            let mut slots = self.write();
            let seq = self.next_seq();
            let refreshed = slots.reposition(user_id, |entry| {
                entry.role = role;
                entry.cached_at = now;
                entry.last_access = now;
                entry.access_seq = seq;
            });
            if refreshed.is_some() {
                None
            } else {
                let mut evicted = None;
                while slots.len() >= self.config.effective_max_size() {
                    match self.evict_lru_inner(&mut slots) {
                        Some(id) => evicted = Some(id),
                        None => break,
                    }
                }
                slots.insert(user_id, CacheEntry::new(role, now, seq));
                evicted
            }
        };

        if let Some(id) = evicted {
            debug!(evicted = %id, inserted = %user_id, "Role cache evicted least recently used entry");
        }

        let mut metric = PerformanceMetric::new("cache_set", start.elapsed(), false, role)
            .with_context("user_id", user_id.get());
        if let Some(id) = evicted {
            metric = metric.with_context("evicted_user_id", id.get());
        }
        self.auditor.performance(metric);
    }

    /// Remove one user's entry (`Some`) or every entry (`None`).
    ///
    /// Returns the number of entries removed: 0 or 1 for a single user, the
    /// prior size for a global invalidation.
    pub fn invalidate(&self, user_id: Option<UserId>) -> usize {
        let start = Instant::now();
        let (sync_type, removed) = {
            let mut slots = self.write();
            match user_id {
                Some(id) => ("invalidate_user", usize::from(slots.remove(id).is_some())),
                None => {
                    let prior = slots.len();
                    slots.clear();
                    ("invalidate_all", prior)
                }
            }
        };

        self.invalidation_count
            .fetch_add(removed as u64, Ordering::Relaxed);

        match user_id {
            Some(id) => info!(user_id = %id, removed = removed, "Role cache entry invalidated"),
            None => info!(removed = removed, "Role cache cleared"),
        }

        self.auditor
            .sync(SyncEvent::new(sync_type, start.elapsed(), removed));
        removed
    }

    pub fn invalidate_user(&self, user_id: UserId) -> usize {
        self.invalidate(Some(user_id))
    }

    pub fn invalidate_all(&self) -> usize {
        self.invalidate(None)
    }

    /// Mark every cached entry as maximally stale so the next `get` reports
    /// it expired whatever the TTL. Entries and their recency are kept.
    ///
    /// `resolver_fn` is then called once per marked user, outside the cache
    /// lock; users for which it fails are reported in the sync event's
    /// `failed_ids`. Returns the number of entries marked.
    pub fn refresh_all<F, E>(&self, mut resolver_fn: F) -> usize
    where
        F: FnMut(UserId) -> Result<(), E>,
        E: fmt::Display,
    {
        let start = Instant::now();
        // The earliest representable instant, older than now by more than any
        // capped TTL.
        let stale = DateTime::<Utc>::MIN_UTC;

        let mut marked: Vec<UserId> = {
            let mut slots = self.write();
            for entry in slots.entries.values_mut() {
                entry.cached_at = stale;
            }
            slots.entries.keys().copied().collect()
        };
        marked.sort_unstable();

        let mut failed = Vec::new();
        let mut first_error = None;
        for &user_id in &marked {
            if let Err(err) = resolver_fn(user_id) {
                if first_error.is_none() {
                    first_error = Some(format!("user {}: {}", user_id, err));
                }
                failed.push(user_id);
            }
        }

        let count = marked.len();
        info!(marked = count, failed = failed.len(), "Role cache marked stale");

        let event = SyncEvent::new("refresh_all", start.elapsed(), count).with_failures(failed, first_error);
        self.auditor.sync(event);
        count
    }

    /// Copy of a user's entry without touching recency or statistics.
    pub fn peek(&self, user_id: UserId) -> Option<CacheEntry> {
        self.read().entries.get(&user_id).cloned()
    }

    pub fn contains(&self, user_id: UserId) -> bool {
        self.read().entries.contains_key(&user_id)
    }

    /// The entry the next eviction would remove.
    pub fn eviction_candidate(&self) -> Option<UserId> {
        self.read().oldest()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let size = self.len();
        let hits = self.hit_count.load(Ordering::Relaxed);
        let misses = self.miss_count.load(Ordering::Relaxed);
        let expired = self.expired_count.load(Ordering::Relaxed);
        let total = hits + misses + expired;
        let hit_rate = if total > 0 {
            hits as f64 / total as f64
        } else {
            0.0
        };

        CacheStats {
            size,
            max_size: self.config.max_size,
            ttl_seconds: self.config.ttl_seconds,
            hit_rate,
            total_requests: total,
            hit_count: hits,
            miss_count: misses,
            expired_count: expired,
            eviction_count: self.eviction_count.load(Ordering::Relaxed),
            invalidation_count: self.invalidation_count.load(Ordering::Relaxed),
        }
    }

    // -----------------------------------------------------------------------
    // Internal helpers
    // -----------------------------------------------------------------------

    /// Remove the entry with the oldest `(last_access, access_seq)` from
    /// already-locked slots.
    fn evict_lru_inner(&self, slots: &mut Slots) -> Option<UserId> {
        let (oldest, entry) = slots.pop_oldest()?;
        debug!(
            user_id = %oldest,
            role = role_label(entry.role),
            access_count = entry.access_count,
            "Evicting role cache entry"
        );
        self.eviction_count.fetch_add(1, Ordering::Relaxed);
        Some(oldest)
    }

    fn is_expired(&self, entry: &CacheEntry, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(entry.cached_at) > self.ttl
    }

    fn next_seq(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::Relaxed)
    }

    // Writers never leave the map half-updated before a point that can
    // panic, so a poisoned lock still guards a consistent map.
    fn read(&self) -> RwLockReadGuard<'_, Slots> {
        self.slots.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Slots> {
        self.slots.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl fmt::Debug for RoleCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoleCache")
            .field("config", &self.config)
            .field("size", &self.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
