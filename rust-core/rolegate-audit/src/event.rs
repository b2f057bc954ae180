// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//! Audit record types.
//!
//! Records are built once by the emitting component and handed to the
//! [`Auditor`](crate::Auditor) by value; sinks only ever see shared
//! references. Field names are the stable wire names of the audit stream.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use rolegate_model::{CacheState, Role, UserId};

/// Outcome of an authorization decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessResult {
    Granted,
    Denied,
}

impl AccessResult {
    pub fn from_granted(granted: bool) -> Self {
        if granted {
            AccessResult::Granted
        } else {
            AccessResult::Denied
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AccessResult::Granted => "granted",
            AccessResult::Denied => "denied",
        }
    }
}

impl std::fmt::Display for AccessResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One role resolution or access decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorizationEvent {
    /// Normalized caller id; `None` when the raw input could not be normalized.
    pub user_id: Option<UserId>,
    pub action: String,
    pub result: AccessResult,
    pub resolved_role: Option<Role>,
    pub cache_state: CacheState,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_details: Option<String>,
}

impl AuthorizationEvent {
    pub fn new(
        user_id: Option<UserId>,
        action: impl Into<String>,
        result: AccessResult,
        resolved_role: Option<Role>,
        cache_state: CacheState,
    ) -> Self {
        Self {
            user_id,
            action: action.into(),
            result,
            resolved_role,
            cache_state,
            timestamp: Utc::now(),
            metadata: None,
            error_details: None,
        }
    }

    /// Attach a metadata key.
    pub fn with_metadata(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.metadata
            .get_or_insert_with(Map::new)
            .insert(key.to_string(), value.into());
        self
    }

    pub fn with_error(mut self, details: impl Into<String>) -> Self {
        self.error_details = Some(details.into());
        self
    }
}

/// Latency of one measured operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetric {
    pub operation: String,
    pub duration_ms: f64,
    pub cache_hit: bool,
    pub resolved_role: Option<Role>,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Map<String, Value>>,
}

impl PerformanceMetric {
    pub fn new(
        operation: impl Into<String>,
        elapsed: Duration,
        cache_hit: bool,
        resolved_role: Option<Role>,
    ) -> Self {
        Self {
            operation: operation.into(),
            duration_ms: elapsed.as_secs_f64() * 1000.0,
            cache_hit,
            resolved_role,
            timestamp: Utc::now(),
            context: None,
        }
    }

    /// Build a metric from an already-measured millisecond duration.
    pub fn from_millis(
        operation: impl Into<String>,
        duration_ms: f64,
        cache_hit: bool,
        resolved_role: Option<Role>,
    ) -> Self {
        Self {
            operation: operation.into(),
            duration_ms,
            cache_hit,
            resolved_role,
            timestamp: Utc::now(),
            context: None,
        }
    }

    pub fn with_context(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.context
            .get_or_insert_with(Map::new)
            .insert(key.to_string(), value.into());
        self
    }
}

/// Outcome of a cache invalidation or refresh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncEvent {
    pub sync_type: String,
    pub duration_ms: f64,
    pub records_processed: usize,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_ids: Option<Vec<UserId>>,
    pub timestamp: DateTime<Utc>,
}

impl SyncEvent {
    pub fn new(sync_type: impl Into<String>, elapsed: Duration, records_processed: usize) -> Self {
        Self {
            sync_type: sync_type.into(),
            duration_ms: elapsed.as_secs_f64() * 1000.0,
            records_processed,
            success: true,
            error_details: None,
            failed_ids: None,
            timestamp: Utc::now(),
        }
    }

    /// Mark the sync as failed for the given ids. An empty list leaves the
    /// event successful.
    pub fn with_failures(mut self, failed_ids: Vec<UserId>, details: Option<String>) -> Self {
        if !failed_ids.is_empty() {
            self.success = false;
            self.failed_ids = Some(failed_ids);
            self.error_details = details;
        }
        self
    }

    pub fn failed(mut self, details: impl Into<String>) -> Self {
        self.success = false;
        self.error_details = Some(details.into());
        self
    }
}

/// Any record accepted by the audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AuditRecord {
    Authorization(AuthorizationEvent),
    Sync(SyncEvent),
    Performance(PerformanceMetric),
}

impl AuditRecord {
    pub fn kind(&self) -> &'static str {
        match self {
            AuditRecord::Authorization(_) => "authorization",
            AuditRecord::Sync(_) => "sync",
            AuditRecord::Performance(_) => "performance",
        }
    }
}

impl From<AuthorizationEvent> for AuditRecord {
    fn from(ev: AuthorizationEvent) -> Self {
        AuditRecord::Authorization(ev)
    }
}

impl From<SyncEvent> for AuditRecord {
    fn from(ev: SyncEvent) -> Self {
        AuditRecord::Sync(ev)
    }
}

impl From<PerformanceMetric> for AuditRecord {
    fn from(m: PerformanceMetric) -> Self {
        AuditRecord::Performance(m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authorization_event_wire_fields() {
        let ev = AuthorizationEvent::new(
            Some(UserId::new(100)),
            "resolve_role",
            AccessResult::Granted,
            Some(Role::Admin),
            CacheState::Hit,
        )
        .with_metadata("source", "cache");

        let json = serde_json::to_value(AuditRecord::from(ev)).unwrap();
        assert_eq!(json["kind"], "authorization");
        assert_eq!(json["user_id"], 100);
        assert_eq!(json["result"], "granted");
        assert_eq!(json["resolved_role"], "admin");
        assert_eq!(json["cache_state"], "hit");
        assert_eq!(json["metadata"]["source"], "cache");
        assert!(json.get("error_details").is_none());
    }

    #[test]
    fn test_absent_role_serializes_as_null() {
        let ev = AuthorizationEvent::new(None, "resolve_role", AccessResult::Denied, None, CacheState::InvalidUserId);
        let json = serde_json::to_value(&ev).unwrap();
        assert!(json["user_id"].is_null());
        assert!(json["resolved_role"].is_null());
        assert_eq!(json["cache_state"], "invalid_user_id");
    }

    #[test]
    fn test_performance_metric_duration() {
        let m = PerformanceMetric::new("cache_set", Duration::from_micros(2500), false, None);
        assert!((m.duration_ms - 2.5).abs() < 1e-9);
        let m = m.with_context("user_id", 5);
        assert_eq!(m.context.unwrap()["user_id"], 5);
    }

    #[test]
    fn test_sync_event_failures() {
        let ok = SyncEvent::new("refresh_all", Duration::ZERO, 3).with_failures(vec![], None);
        assert!(ok.success);
        assert!(ok.failed_ids.is_none());

        let failed = SyncEvent::new("refresh_all", Duration::ZERO, 3)
            .with_failures(vec![UserId::new(7)], Some("store unavailable".into()));
        assert!(!failed.success);
        assert_eq!(failed.failed_ids, Some(vec![UserId::new(7)]));
    }

    #[test]
    fn test_record_roundtrip() {
        let rec = AuditRecord::from(SyncEvent::new("invalidate_all", Duration::from_millis(1), 4));
        let json = serde_json::to_string(&rec).unwrap();
        let parsed: AuditRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, rec);
        assert_eq!(parsed.kind(), "sync");
    }
}
