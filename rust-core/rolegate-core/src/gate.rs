// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//! Per-request access decisions.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use rolegate_audit::{AccessResult, Auditor, PerformanceMetric};
use rolegate_model::{role_label, CacheState, RawUserId, Role};

use crate::error::AuthError;
use crate::resolver::{Resolution, RoleResolver};
use crate::store::RoleStore;

/// Action label used by [`AccessGate::check`].
pub const CHECK_ACTION: &str = "access_check";

/// Why a request was denied. The caller composes any user-facing text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DenialReason {
    InvalidUserId,
    NoRole,
    InsufficientRole { required: Role, actual: Role },
    NoRequiredRoles,
}

impl DenialReason {
    pub fn as_str(self) -> &'static str {
        match self {
            DenialReason::InvalidUserId => "invalid_user_id",
            DenialReason::NoRole => "no_role",
            DenialReason::InsufficientRole { .. } => "insufficient_role",
            DenialReason::NoRequiredRoles => "no_required_roles",
        }
    }
}

impl fmt::Display for DenialReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenialReason::InsufficientRole { required, actual } => {
                write!(f, "insufficient_role (required {}, actual {})", required, actual)
            }
            other => f.write_str(other.as_str()),
        }
    }
}

/// The answer to one access check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub granted: bool,
    pub resolved_role: Option<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<DenialReason>,
}

impl Decision {
    /// Compare a resolved role against a required set.
    ///
    /// The set is satisfied by any role at or above its lowest member. An
    /// empty set is never satisfied.
    pub fn evaluate(resolved: Option<Role>, required: &[Role], malformed: bool) -> Self {
        let reason = match (resolved, required.iter().min()) {
            (None, _) if malformed => Some(DenialReason::InvalidUserId),
            (None, _) => Some(DenialReason::NoRole),
            (Some(_), None) => Some(DenialReason::NoRequiredRoles),
            (Some(actual), Some(&lowest)) if !actual.satisfies(lowest) => Some(DenialReason::InsufficientRole {
                required: lowest,
                actual,
            }),
            (Some(_), Some(_)) => None,
        };
        Self {
            granted: reason.is_none(),
            resolved_role: resolved,
            reason,
        }
    }
}

/// Resolves a caller's role and compares it against what a command needs.
///
/// Stateless between calls; the only shared state is the resolver's cache.
pub struct AccessGate {
    resolver: Arc<RoleResolver>,
    store: Arc<dyn RoleStore>,
    auditor: Arc<Auditor>,
}

impl AccessGate {
    pub fn new(resolver: Arc<RoleResolver>, store: Arc<dyn RoleStore>, auditor: Arc<Auditor>) -> Self {
        Self {
            resolver,
            store,
            auditor,
        }
    }

    /// Check access under the default action label.
    pub async fn check(&self, user_id: impl Into<RawUserId>, required: &[Role]) -> Result<Decision, AuthError> {
        self.check_action(user_id, required, CHECK_ACTION).await
    }

    /// Check access, labelling the audit event with `action`.
    ///
    /// Emits exactly one authorization event and one performance metric,
    /// timed over the whole resolve and compare. A store failure is audited
    /// as a denial and returned.
    pub async fn check_action(
        &self,
        user_id: impl Into<RawUserId>,
        required: &[Role],
        action: &str,
    ) -> Result<Decision, AuthError> {
        let raw = user_id.into();
        let start = Instant::now();
        let required_labels: Vec<&str> = required.iter().map(|r| r.as_str()).collect();

        let resolution = match self.resolver.lookup(&raw, self.store.as_ref()).await {
            Ok(resolution) => resolution,
            Err(failure) => {
                let event = failure.event(action).with_metadata("required_roles", required_labels);
                let metric = PerformanceMetric::new(CHECK_ACTION, start.elapsed(), false, None)
                    .with_context("action", action)
                    .with_context("user_id", failure.user_id.get())
                    .with_context("cache_state", CacheState::Error.as_str());
                self.auditor.authorization(event);
                self.auditor.performance(metric);
                return Err(failure.error.into());
            }
        };

        let decision = Decision::evaluate(
            resolution.role,
            required,
            resolution.cache_state == CacheState::InvalidUserId,
        );
        self.log_decision(&resolution, &decision, action);

        let mut event = resolution
            .event(action, AccessResult::from_granted(decision.granted))
            .with_metadata("required_roles", required_labels);
        if let Some(reason) = decision.reason {
            event = event.with_metadata("denial_reason", reason.as_str());
        }

        let mut metric = PerformanceMetric::new(
            CHECK_ACTION,
            start.elapsed(),
            resolution.cache_state == CacheState::Hit,
            resolution.role,
        )
        .with_context("action", action)
        .with_context("granted", decision.granted);
        if let Some(id) = resolution.user_id {
            metric = metric.with_context("user_id", id.get());
        }

        self.auditor.authorization(event);
        self.auditor.performance(metric);
        Ok(decision)
    }

    fn log_decision(&self, resolution: &Resolution, decision: &Decision, action: &str) {
        match (decision.reason, resolution.user_id) {
            (None, Some(id)) => debug!(
                user_id = %id,
                action = action,
                role = role_label(decision.resolved_role),
                "Access granted"
            ),
            (Some(reason), Some(id)) => info!(
                user_id = %id,
                action = action,
                role = role_label(decision.resolved_role),
                reason = %reason,
                "Access denied"
            ),
            (_, None) => info!(action = action, "Access denied for malformed user id"),
        }
    }
}

impl fmt::Debug for AccessGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessGate")
            .field("resolver", &self.resolver)
            .finish_non_exhaustive()
    }
}
