// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//! The authoritative role lists.
//!
//! The surrounding application owns the three membership lists and refreshes
//! them on its own schedule. Resolution only ever reads a snapshot.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use rolegate_model::Role;

use crate::error::StoreError;

/// One consistent view of the three membership lists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleSnapshot {
    pub admin_ids: Vec<i64>,
    pub coordinator_ids: Vec<i64>,
    pub viewer_ids: Vec<i64>,
}

impl RoleSnapshot {
    pub fn new(admin_ids: Vec<i64>, coordinator_ids: Vec<i64>, viewer_ids: Vec<i64>) -> Self {
        Self {
            admin_ids,
            coordinator_ids,
            viewer_ids,
        }
    }

    pub fn ids_for(&self, role: Role) -> &[i64] {
        match role {
            Role::Admin => &self.admin_ids,
            Role::Coordinator => &self.coordinator_ids,
            Role::Viewer => &self.viewer_ids,
        }
    }

    /// Every list containing `user_id`, highest role first.
    ///
    /// All three lists are always scanned in full so the cost does not depend
    /// on whether, or where, the id is found.
    pub fn memberships(&self, user_id: i64) -> Vec<Role> {
        let mut found = Vec::new();
        for role in Role::BY_PRECEDENCE {
            let mut member = false;
            for id in self.ids_for(role) {
                member |= *id == user_id;
            }
            if member {
                found.push(role);
            }
        }
        found
    }

    /// The role granted to `user_id`: the first list, in precedence order,
    /// that contains it.
    pub fn role_of(&self, user_id: i64) -> Option<Role> {
        self.memberships(user_id).first().copied()
    }

    /// Ids that appear in more than one list, ascending.
    pub fn overlapping_ids(&self) -> Vec<i64> {
        let mut all: Vec<i64> = Vec::with_capacity(self.len());
        for role in Role::BY_PRECEDENCE {
            let mut ids = self.ids_for(role).to_vec();
            ids.sort_unstable();
            ids.dedup();
            all.extend(ids);
        }
        all.sort_unstable();

        let mut overlapping: Vec<i64> = all
            .windows(2)
            .filter(|w| w[0] == w[1])
            .map(|w| w[0])
            .collect();
        overlapping.dedup();
        overlapping
    }

    /// Total entries across the three lists.
    pub fn len(&self) -> usize {
        self.admin_ids.len() + self.coordinator_ids.len() + self.viewer_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Source of role snapshots.
#[async_trait]
pub trait RoleStore: Send + Sync {
    /// Read the current membership lists.
    async fn snapshot(&self) -> Result<Arc<RoleSnapshot>, StoreError>;
}

#[async_trait]
impl<S: RoleStore + ?Sized> RoleStore for Arc<S> {
    async fn snapshot(&self) -> Result<Arc<RoleSnapshot>, StoreError> {
        (**self).snapshot().await
    }
}

/// Role lists held in process memory.
#[derive(Debug, Default)]
pub struct InMemoryRoleStore {
    current: RwLock<Arc<RoleSnapshot>>,
    reads: AtomicU64,
}

impl InMemoryRoleStore {
    pub fn new(snapshot: RoleSnapshot) -> Self {
        let overlapping = snapshot.overlapping_ids();
        if !overlapping.is_empty() {
            warn!(ids = ?overlapping, "Role lists overlap; highest role wins");
        }
        Self {
            current: RwLock::new(Arc::new(snapshot)),
            reads: AtomicU64::new(0),
        }
    }

    /// Swap in a new set of lists. Readers holding the previous snapshot
    /// keep it until they drop it.
    pub fn replace(&self, snapshot: RoleSnapshot) {
        let overlapping = snapshot.overlapping_ids();
        if !overlapping.is_empty() {
            warn!(ids = ?overlapping, "Role lists overlap; highest role wins");
        }
        debug!(entries = snapshot.len(), "Role store replaced");
        let mut current = self.current.write().unwrap_or_else(|e| e.into_inner());
        *current = Arc::new(snapshot);
    }

    /// Number of snapshots handed out.
    pub fn read_count(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl RoleStore for InMemoryRoleStore {
    async fn snapshot(&self) -> Result<Arc<RoleSnapshot>, StoreError> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        let current = self.current.read().unwrap_or_else(|e| e.into_inner());
        Ok(Arc::clone(&current))
    }
}

/// Bounds every snapshot read of a remote-backed store.
#[derive(Debug)]
pub struct TimeoutRoleStore<S> {
    inner: S,
    timeout: Duration,
}

impl<S: RoleStore> TimeoutRoleStore<S> {
    pub fn new(inner: S, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: RoleStore> RoleStore for TimeoutRoleStore<S> {
    async fn snapshot(&self) -> Result<Arc<RoleSnapshot>, StoreError> {
        match tokio::time::timeout(self.timeout, self.inner.snapshot()).await {
            Ok(result) => result,
            Err(_) => {
                warn!(timeout_ms = self.timeout.as_millis() as u64, "Role store snapshot timed out");
                Err(StoreError::Timeout(self.timeout))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> RoleSnapshot {
        RoleSnapshot::new(vec![100], vec![200], vec![300])
    }

    struct SlowStore;

    #[async_trait]
    impl RoleStore for SlowStore {
        async fn snapshot(&self) -> Result<Arc<RoleSnapshot>, StoreError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(Arc::new(RoleSnapshot::default()))
        }
    }

    #[test]
    fn test_role_of_follows_precedence() {
        let s = snapshot();
        assert_eq!(s.role_of(100), Some(Role::Admin));
        assert_eq!(s.role_of(200), Some(Role::Coordinator));
        assert_eq!(s.role_of(300), Some(Role::Viewer));
        assert_eq!(s.role_of(999), None);
    }

    #[test]
    fn test_overlap_highest_wins() {
        let s = RoleSnapshot::new(vec![7], vec![8], vec![7, 8, 9]);
        assert_eq!(s.memberships(7), vec![Role::Admin, Role::Viewer]);
        assert_eq!(s.role_of(7), Some(Role::Admin));
        assert_eq!(s.overlapping_ids(), vec![7, 8]);
    }

    #[test]
    fn test_duplicates_within_one_list_are_not_overlap() {
        let s = RoleSnapshot::new(vec![1, 1], vec![], vec![2]);
        assert!(s.overlapping_ids().is_empty());
    }

    #[tokio::test]
    async fn test_replace_is_visible_to_next_snapshot() {
        let store = InMemoryRoleStore::new(snapshot());
        let before = store.snapshot().await.unwrap();
        store.replace(RoleSnapshot::new(vec![], vec![], vec![100]));
        let after = store.snapshot().await.unwrap();

        assert_eq!(before.role_of(100), Some(Role::Admin));
        assert_eq!(after.role_of(100), Some(Role::Viewer));
        assert_eq!(store.read_count(), 2);
    }

    #[tokio::test]
    async fn test_timeout_store_surfaces_timeout() {
        let store = TimeoutRoleStore::new(SlowStore, Duration::from_millis(50));
        let err = store.snapshot().await.unwrap_err();
        assert_eq!(err, StoreError::Timeout(Duration::from_millis(50)));
    }

    #[tokio::test]
    async fn test_timeout_store_passes_through() {
        let store = TimeoutRoleStore::new(InMemoryRoleStore::new(snapshot()), Duration::from_secs(1));
        assert_eq!(store.snapshot().await.unwrap().role_of(200), Some(Role::Coordinator));
        assert_eq!(store.inner().read_count(), 1);
    }
}
