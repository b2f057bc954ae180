// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//! Severity routing for audit records.
//!
//! Operational alerting keys off these severities, so the mapping lives in
//! one configuration struct instead of at each call site.

use serde::{Deserialize, Serialize};

use crate::event::{AccessResult, AuditRecord};

/// Audit severity, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Debug,
    Info,
    Warning,
    Error,
}

impl Severity {
    pub const ALL: [Severity; 4] = [Severity::Debug, Severity::Info, Severity::Warning, Severity::Error];

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Debug => "debug",
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Thresholds and severities for classifying audit records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Operations slower than this (milliseconds) are reported at `slow_severity`.
    /// Default: 300ms.
    pub slow_threshold_ms: f64,

    /// Operations faster than this (milliseconds) are reported at `fast_severity`.
    /// Default: 100ms.
    pub fast_threshold_ms: f64,

    pub granted_severity: Severity,
    pub denied_severity: Severity,
    pub sync_success_severity: Severity,
    pub sync_failure_severity: Severity,
    pub fast_severity: Severity,
    pub normal_severity: Severity,
    pub slow_severity: Severity,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            slow_threshold_ms: 300.0,
            fast_threshold_ms: 100.0,
            granted_severity: Severity::Info,
            denied_severity: Severity::Warning,
            sync_success_severity: Severity::Info,
            sync_failure_severity: Severity::Error,
            fast_severity: Severity::Debug,
            normal_severity: Severity::Info,
            slow_severity: Severity::Warning,
        }
    }
}

impl AuditConfig {
    /// Default severities with custom latency thresholds.
    pub fn with_thresholds(slow_threshold_ms: f64, fast_threshold_ms: f64) -> Self {
        Self {
            slow_threshold_ms,
            fast_threshold_ms,
            ..Default::default()
        }
    }

    /// Classify a latency in milliseconds.
    ///
    /// Strictly above the slow threshold is slow, strictly below the fast
    /// threshold is fast; both boundaries themselves are normal.
    pub fn latency_severity(&self, duration_ms: f64) -> Severity {
        if duration_ms > self.slow_threshold_ms {
            self.slow_severity
        } else if duration_ms < self.fast_threshold_ms {
            self.fast_severity
        } else {
            self.normal_severity
        }
    }

    pub fn classify(&self, record: &AuditRecord) -> Severity {
        match record {
            AuditRecord::Authorization(ev) => match ev.result {
                AccessResult::Granted => self.granted_severity,
                AccessResult::Denied => self.denied_severity,
            },
            AuditRecord::Sync(ev) => {
                if ev.success {
                    self.sync_success_severity
                } else {
                    self.sync_failure_severity
                }
            }
            AuditRecord::Performance(m) => self.latency_severity(m.duration_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{AuthorizationEvent, PerformanceMetric, SyncEvent};
    use rolegate_model::{CacheState, Role, UserId};
    use std::time::Duration;

    fn perf(ms: f64) -> AuditRecord {
        PerformanceMetric::from_millis("access_check", ms, true, Some(Role::Viewer)).into()
    }

    #[test]
    fn test_authorization_routing() {
        let config = AuditConfig::default();
        let granted = AuthorizationEvent::new(Some(UserId::new(1)), "check", AccessResult::Granted, Some(Role::Admin), CacheState::Hit);
        let denied = AuthorizationEvent::new(Some(UserId::new(1)), "check", AccessResult::Denied, None, CacheState::Miss);
        assert_eq!(config.classify(&granted.into()), Severity::Info);
        assert_eq!(config.classify(&denied.into()), Severity::Warning);
    }

    #[test]
    fn test_sync_routing() {
        let config = AuditConfig::default();
        let ok = SyncEvent::new("invalidate_user", Duration::ZERO, 1);
        let failed = SyncEvent::new("refresh_all", Duration::ZERO, 2).failed("store down");
        assert_eq!(config.classify(&ok.into()), Severity::Info);
        assert_eq!(config.classify(&failed.into()), Severity::Error);
    }

    #[test]
    fn test_latency_routing_boundaries() {
        let config = AuditConfig::default();
        assert_eq!(config.classify(&perf(0.2)), Severity::Debug);
        assert_eq!(config.classify(&perf(99.9)), Severity::Debug);
        assert_eq!(config.classify(&perf(100.0)), Severity::Info);
        assert_eq!(config.classify(&perf(300.0)), Severity::Info);
        assert_eq!(config.classify(&perf(300.1)), Severity::Warning);
    }

    #[test]
    fn test_custom_thresholds() {
        let config = AuditConfig::with_thresholds(50.0, 10.0);
        assert_eq!(config.latency_severity(60.0), Severity::Warning);
        assert_eq!(config.latency_severity(20.0), Severity::Info);
        assert_eq!(config.latency_severity(5.0), Severity::Debug);
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Error > Severity::Warning);
        assert!(Severity::Warning > Severity::Info);
        assert!(Severity::Info > Severity::Debug);
    }
}
