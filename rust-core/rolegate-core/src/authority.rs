// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//! Composition root.
//!
//! [`RoleAuthority`] owns one cache, one auditor, one store handle and the
//! resolver and gate built over them. Instances are independent: there is no
//! process-wide singleton, so tests and multi-tenant hosts can build as many
//! as they need.

use std::sync::Arc;

use tracing::info;

use rolegate_audit::{AuditStats, Auditor};
use rolegate_cache::{CacheStats, RoleCache};
use rolegate_model::{RawUserId, Role, SharedClock, SystemClock, UserId};

use crate::config::RoleGateConfig;
use crate::error::{AuthError, ConfigError};
use crate::gate::{AccessGate, Decision};
use crate::resolver::RoleResolver;
use crate::store::RoleStore;

pub struct RoleAuthority {
    config: RoleGateConfig,
    auditor: Arc<Auditor>,
    cache: Arc<RoleCache>,
    resolver: Arc<RoleResolver>,
    gate: AccessGate,
    store: Arc<dyn RoleStore>,
}

impl RoleAuthority {
    /// Build with a tracing-only auditor and the system clock.
    pub fn new(config: RoleGateConfig, store: Arc<dyn RoleStore>) -> Result<Self, ConfigError> {
        let auditor = Arc::new(Auditor::with_tracing(config.audit_config()));
        Self::with_auditor(config, store, auditor)
    }

    pub fn with_auditor(
        config: RoleGateConfig,
        store: Arc<dyn RoleStore>,
        auditor: Arc<Auditor>,
    ) -> Result<Self, ConfigError> {
        Self::with_clock(config, store, auditor, Arc::new(SystemClock))
    }

    pub fn with_clock(
        config: RoleGateConfig,
        store: Arc<dyn RoleStore>,
        auditor: Arc<Auditor>,
        clock: SharedClock,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let cache = Arc::new(RoleCache::with_clock(config.cache_config(), clock, Arc::clone(&auditor)));
        let resolver = Arc::new(RoleResolver::new(Arc::clone(&cache), Arc::clone(&auditor)));
        let gate = AccessGate::new(Arc::clone(&resolver), Arc::clone(&store), Arc::clone(&auditor));

        info!(
            ttl_seconds = config.ttl_seconds,
            max_cache_size = config.max_cache_size,
            slow_threshold_ms = config.slow_threshold_ms,
            fast_threshold_ms = config.fast_threshold_ms,
            "Role authority initialized"
        );

        Ok(Self {
            config,
            auditor,
            cache,
            resolver,
            gate,
            store,
        })
    }

    pub async fn resolve(&self, user_id: impl Into<RawUserId>) -> Result<Option<Role>, AuthError> {
        self.resolver.resolve(user_id, self.store.as_ref()).await
    }

    pub async fn check(&self, user_id: impl Into<RawUserId>, required: &[Role]) -> Result<Decision, AuthError> {
        self.gate.check(user_id, required).await
    }

    pub async fn check_action(
        &self,
        user_id: impl Into<RawUserId>,
        required: &[Role],
        action: &str,
    ) -> Result<Decision, AuthError> {
        self.gate.check_action(user_id, required, action).await
    }

    /// Drop one user's cached role. Returns 1 if an entry was removed.
    pub fn invalidate_user(&self, user_id: UserId) -> usize {
        self.cache.invalidate_user(user_id)
    }

    /// Drop every cached role. Returns the number removed.
    pub fn invalidate_all(&self) -> usize {
        self.cache.invalidate_all()
    }

    /// Expire every cached role and report drift against the store.
    pub async fn refresh_all(&self) -> Result<usize, AuthError> {
        self.resolver.refresh_cached(self.store.as_ref()).await
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn audit_stats(&self) -> AuditStats {
        self.auditor.stats()
    }

    pub fn config(&self) -> &RoleGateConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<RoleCache> {
        &self.cache
    }

    pub fn auditor(&self) -> &Arc<Auditor> {
        &self.auditor
    }

    pub fn resolver(&self) -> &Arc<RoleResolver> {
        &self.resolver
    }

    pub fn gate(&self) -> &AccessGate {
        &self.gate
    }
}

impl std::fmt::Debug for RoleAuthority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoleAuthority")
            .field("config", &self.config)
            .field("cache", &self.cache)
            .field("auditor", &self.auditor)
            .finish_non_exhaustive()
    }
}
