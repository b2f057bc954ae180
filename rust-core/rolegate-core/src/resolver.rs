// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//! Role resolution: cache first, then the authoritative lists.
//!
//! A resolution is one linear pass:
//!
//! 1. Normalize the raw id. Malformed input resolves to no role and still
//!    performs a cache probe and a store scan against a sentinel id, so the
//!    response time does not reveal whether the input was well formed.
//! 2. Look the id up in the [`RoleCache`].
//! 3. On a hit, return the cached role.
//! 4. On a miss or an expired entry, read a store snapshot, take the highest
//!    list containing the id, and write the answer (including "no role")
//!    back to the cache.
//!
//! Store failures are audited and then returned; nothing is cached.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use rolegate_audit::{AccessResult, Auditor, AuthorizationEvent, PerformanceMetric, SyncEvent};
use rolegate_cache::{CacheLookup, RoleCache};
use rolegate_model::{role_label, CacheState, RawUserId, Role, UserId};

use crate::error::{AuthError, StoreError};
use crate::store::RoleStore;

/// Stand-in id scanned for malformed input. Normalization never produces it,
/// so it is never a cache key and never matches a real caller.
const PROBE_SENTINEL: UserId = UserId::new(UserId::RESERVED);

/// Action label used for events emitted by [`RoleResolver::resolve`].
pub const RESOLVE_ACTION: &str = "role_resolution";

/// Outcome of the lookup half of a resolution, before anything is audited.
#[derive(Debug, Clone)]
pub(crate) struct Resolution {
    pub user_id: Option<UserId>,
    pub role: Option<Role>,
    pub cache_state: CacheState,
    /// Raw input and the reason it was rejected, for malformed ids.
    pub rejected: Option<(String, String)>,
    /// Every list the id was found in, when more than one.
    pub overlapping: Vec<Role>,
}

impl Resolution {
    /// Authorization event describing this resolution.
    pub fn event(&self, action: &str, result: AccessResult) -> AuthorizationEvent {
        let mut event = AuthorizationEvent::new(self.user_id, action, result, self.role, self.cache_state);
        if let Some((raw, reason)) = &self.rejected {
            event = event
                .with_metadata("raw_user_id", raw.as_str())
                .with_metadata("invalid_reason", reason.as_str());
        }
        if !self.overlapping.is_empty() {
            let roles: Vec<&str> = self.overlapping.iter().map(|r| r.as_str()).collect();
            event = event.with_metadata("overlapping_roles", roles);
        }
        event
    }
}

/// A store failure together with what was known when it happened.
#[derive(Debug, Clone)]
pub(crate) struct ResolveFailure {
    pub user_id: UserId,
    /// Cache state that sent the resolution to the store.
    pub prior_state: CacheState,
    pub error: StoreError,
}

impl ResolveFailure {
    pub fn event(&self, action: &str) -> AuthorizationEvent {
        AuthorizationEvent::new(Some(self.user_id), action, AccessResult::Denied, None, CacheState::Error)
            .with_metadata("prior_cache_state", self.prior_state.as_str())
            .with_error(self.error.to_string())
    }
}

/// Resolves a user's current role through the cache.
#[derive(Debug)]
pub struct RoleResolver {
    cache: Arc<RoleCache>,
    auditor: Arc<Auditor>,
}

impl RoleResolver {
    pub fn new(cache: Arc<RoleCache>, auditor: Arc<Auditor>) -> Self {
        Self { cache, auditor }
    }

    pub fn cache(&self) -> &Arc<RoleCache> {
        &self.cache
    }

    /// Resolve `user_id` to its role, or `None` when it has none or is
    /// malformed.
    ///
    /// Emits one authorization event and one performance metric. Returns an
    /// error only when the store could not be read.
    pub async fn resolve<S>(&self, user_id: impl Into<RawUserId>, store: &S) -> Result<Option<Role>, AuthError>
    where
        S: RoleStore + ?Sized,
    {
        let raw = user_id.into();
        let start = Instant::now();
        let outcome = self.lookup(&raw, store).await;
        let elapsed = start.elapsed();

        match outcome {
            Ok(resolution) => {
                let result = AccessResult::from_granted(resolution.role.is_some());
                self.auditor.authorization(resolution.event(RESOLVE_ACTION, result));
                self.auditor.performance(resolution_metric(&resolution, elapsed));
                Ok(resolution.role)
            }
            Err(failure) => {
                self.auditor.authorization(failure.event(RESOLVE_ACTION));
                self.auditor.performance(
                    PerformanceMetric::new(RESOLVE_ACTION, elapsed, false, None)
                        .with_context("user_id", failure.user_id.get())
                        .with_context("cache_state", CacheState::Error.as_str()),
                );
                Err(failure.error.into())
            }
        }
    }

    /// The unaudited part of a resolution, shared with the access gate.
    pub(crate) async fn lookup<S>(&self, raw: &RawUserId, store: &S) -> Result<Resolution, ResolveFailure>
    where
        S: RoleStore + ?Sized,
    {
        let user_id = match raw.normalize() {
            Ok(id) => id,
            Err(err) => {
                self.probe_like_miss(store).await;
                debug!(raw = %raw, reason = %err, "Rejected malformed user id");
                return Ok(Resolution {
                    user_id: None,
                    role: None,
                    cache_state: CacheState::InvalidUserId,
                    rejected: Some((raw.to_string(), err.to_string())),
                    overlapping: Vec::new(),
                });
            }
        };

        let lookup = self.cache.get(user_id);
        if let CacheLookup::Hit(role) = lookup {
            return Ok(Resolution {
                user_id: Some(user_id),
                role,
                cache_state: CacheState::Hit,
                rejected: None,
                overlapping: Vec::new(),
            });
        }

        let prior_state = lookup.state();
        let snapshot = store.snapshot().await.map_err(|error| {
            warn!(user_id = %user_id, error = %error, "Role store read failed");
            ResolveFailure {
                user_id,
                prior_state,
                error,
            }
        })?;

        let memberships = snapshot.memberships(user_id.get());
        let role = memberships.first().copied();
        let overlapping = if memberships.len() > 1 {
            let roles: Vec<&str> = memberships.iter().map(|r| r.as_str()).collect();
            warn!(
                user_id = %user_id,
                roles = ?roles,
                granted = role_label(role),
                "User appears in more than one role list; highest role wins"
            );
            memberships
        } else {
            Vec::new()
        };

        self.cache.set(user_id, role);

        Ok(Resolution {
            user_id: Some(user_id),
            role,
            cache_state: prior_state,
            rejected: None,
            overlapping,
        })
    }

    /// Same work as a cache miss for an unknown user, with no side effects.
    async fn probe_like_miss<S>(&self, store: &S)
    where
        S: RoleStore + ?Sized,
    {
        let _ = self.cache.peek(PROBE_SENTINEL);
        let _ = self.cache.eviction_candidate();
        if let Ok(snapshot) = store.snapshot().await {
            let _ = snapshot.memberships(PROBE_SENTINEL.get());
        }
    }

    /// Force every cached entry to expire and report drift against the
    /// current store contents.
    ///
    /// Entries whose cached role no longer matches the store are listed in
    /// the sync event's `failed_ids`. Entries are not re-resolved here; the
    /// next lookup of each one goes to the store. Returns the number of
    /// entries marked.
    pub async fn refresh_cached<S>(&self, store: &S) -> Result<usize, AuthError>
    where
        S: RoleStore + ?Sized,
    {
        let start = Instant::now();
        let snapshot = match store.snapshot().await {
            Ok(snapshot) => snapshot,
            Err(error) => {
                self.auditor
                    .sync(SyncEvent::new("refresh_all", start.elapsed(), 0).failed(error.to_string()));
                return Err(error.into());
            }
        };

        let cache = &self.cache;
        let marked = cache.refresh_all(|user_id| {
            let cached = cache.peek(user_id).map(|entry| entry.role());
            let current = snapshot.role_of(user_id.get());
            match cached {
                Some(cached) if cached != current => Err(format!(
                    "cached role {} but store grants {}",
                    role_label(cached),
                    role_label(current)
                )),
                _ => Ok(()),
            }
        });
        Ok(marked)
    }
}

fn resolution_metric(resolution: &Resolution, elapsed: Duration) -> PerformanceMetric {
    let mut metric = PerformanceMetric::new(
        RESOLVE_ACTION,
        elapsed,
        resolution.cache_state == CacheState::Hit,
        resolution.role,
    )
    .with_context("cache_state", resolution.cache_state.as_str());
    if let Some(id) = resolution.user_id {
        metric = metric.with_context("user_id", id.get());
    }
    metric
}
