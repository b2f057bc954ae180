// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//! Audit sinks.
//!
//! A sink commits one already-classified record. Sinks are called
//! synchronously on the emitting thread and must not buffer: when `record`
//! returns `Ok`, the record is in the trail.

use std::collections::VecDeque;
use std::io::Write;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use rolegate_model::role_label;

use crate::error::AuditError;
use crate::event::{AuditRecord, AuthorizationEvent, PerformanceMetric, SyncEvent};
use crate::severity::Severity;

/// `tracing` target for audit records.
pub const AUDIT_TARGET: &str = "rolegate::audit";

/// Destination for audit records.
pub trait AuditSink: Send + Sync {
    /// Short name used in fallback diagnostics.
    fn name(&self) -> &str;

    fn record(&self, record: &AuditRecord, severity: Severity) -> Result<(), AuditError>;
}

macro_rules! at_severity {
    ($severity:expr, $($arg:tt)+) => {
        match $severity {
            Severity::Debug => debug!(target: AUDIT_TARGET, $($arg)+),
            Severity::Info => info!(target: AUDIT_TARGET, $($arg)+),
            Severity::Warning => warn!(target: AUDIT_TARGET, $($arg)+),
            Severity::Error => error!(target: AUDIT_TARGET, $($arg)+),
        }
    };
}

// ---------------------------------------------------------------------------
// Tracing
// ---------------------------------------------------------------------------

/// Emits each record as a structured `tracing` event at its routed level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl AuditSink for TracingSink {
    fn name(&self) -> &str {
        "tracing"
    }

    fn record(&self, record: &AuditRecord, severity: Severity) -> Result<(), AuditError> {
        match record {
            AuditRecord::Authorization(ev) => {
                let user = ev.user_id.map(|u| u.to_string()).unwrap_or_else(|| "invalid".to_string());
                let metadata = ev
                    .metadata
                    .as_ref()
                    .map(|m| serde_json::Value::Object(m.clone()).to_string())
                    .unwrap_or_default();
                at_severity!(
                    severity,
                    user_id = %user,
                    action = %ev.action,
                    result = %ev.result,
                    role = role_label(ev.resolved_role),
                    cache_state = %ev.cache_state,
                    metadata = %metadata,
                    error = ev.error_details.as_deref().unwrap_or(""),
                    "authorization {}", ev.result
                );
            }
            AuditRecord::Sync(ev) => {
                let failed = ev.failed_ids.as_ref().map(|ids| ids.len()).unwrap_or(0);
                let outcome = if ev.success { "completed" } else { "failed" };
                at_severity!(
                    severity,
                    sync_type = %ev.sync_type,
                    duration_ms = ev.duration_ms,
                    records = ev.records_processed,
                    success = ev.success,
                    failed = failed,
                    error = ev.error_details.as_deref().unwrap_or(""),
                    "cache sync {}", outcome
                );
            }
            AuditRecord::Performance(m) => {
                at_severity!(
                    severity,
                    operation = %m.operation,
                    duration_ms = m.duration_ms,
                    cache_hit = m.cache_hit,
                    role = role_label(m.resolved_role),
                    "operation timed"
                );
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// JSON lines
// ---------------------------------------------------------------------------

/// Append-only JSON-lines stream for a log aggregator.
///
/// Each record is written as one line with its severity added, then the
/// writer is flushed.
pub struct JsonLinesSink<W: Write + Send> {
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Consume the sink and hand back the writer.
    pub fn into_inner(self) -> W {
        self.writer.into_inner().unwrap_or_else(|e| e.into_inner())
    }
}

impl<W: Write + Send> AuditSink for JsonLinesSink<W> {
    fn name(&self) -> &str {
        "json_lines"
    }

    fn record(&self, record: &AuditRecord, severity: Severity) -> Result<(), AuditError> {
        let mut value = serde_json::to_value(record)?;
        if let Some(obj) = value.as_object_mut() {
            obj.insert("severity".to_string(), serde_json::to_value(severity)?);
        }
        let mut line = serde_json::to_vec(&value)?;
        line.push(b'\n');

        let mut writer = self
            .writer
            .lock()
            .map_err(|_| AuditError::Unavailable("json lines writer lock poisoned".to_string()))?;
        writer.write_all(&line)?;
        writer.flush()?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// In-memory ring buffer
// ---------------------------------------------------------------------------

/// A record together with the severity it was committed at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub severity: Severity,
    pub record: AuditRecord,
}

/// Bounded in-memory audit trail.
///
/// Cloning shares the underlying buffer, so a handle can be kept for
/// inspection after the sink is installed in an [`Auditor`](crate::Auditor).
#[derive(Debug, Clone)]
pub struct MemoryAuditLog {
    entries: Arc<Mutex<VecDeque<AuditEntry>>>,
    /// Maximum number of entries retained (oldest dropped first).
    max_entries: usize,
}

impl MemoryAuditLog {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Arc::new(Mutex::new(VecDeque::with_capacity(max_entries.min(4096)))),
            max_entries,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<AuditEntry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Snapshot of all retained entries, oldest first.
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.lock().iter().cloned().collect()
    }

    pub fn authorization_events(&self) -> Vec<AuthorizationEvent> {
        self.lock()
            .iter()
            .filter_map(|e| match &e.record {
                AuditRecord::Authorization(ev) => Some(ev.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn sync_events(&self) -> Vec<SyncEvent> {
        self.lock()
            .iter()
            .filter_map(|e| match &e.record {
                AuditRecord::Sync(ev) => Some(ev.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn performance_metrics(&self) -> Vec<PerformanceMetric> {
        self.lock()
            .iter()
            .filter_map(|e| match &e.record {
                AuditRecord::Performance(m) => Some(m.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}

impl Default for MemoryAuditLog {
    fn default() -> Self {
        Self::new(10_000)
    }
}

impl AuditSink for MemoryAuditLog {
    fn name(&self) -> &str {
        "memory"
    }

    fn record(&self, record: &AuditRecord, severity: Severity) -> Result<(), AuditError> {
        let mut entries = self.lock();
        while entries.len() >= self.max_entries.max(1) {
            entries.pop_front();
        }
        entries.push_back(AuditEntry {
            severity,
            record: record.clone(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::AccessResult;
    use rolegate_model::{CacheState, Role, UserId};
    use std::time::Duration;

    fn denied(id: i64) -> AuditRecord {
        AuthorizationEvent::new(Some(UserId::new(id)), "check", AccessResult::Denied, None, CacheState::Miss).into()
    }

    #[test]
    fn test_memory_log_capacity() {
        let log = MemoryAuditLog::new(3);
        assert!(log.is_empty());
        for i in 0..5 {
            log.record(&denied(i), Severity::Warning).unwrap();
        }
        assert_eq!(log.len(), 3);
        let ids: Vec<i64> = log
            .authorization_events()
            .iter()
            .map(|e| e.user_id.unwrap().get())
            .collect();
        assert_eq!(ids, vec![2, 3, 4]);
    }

    #[test]
    fn test_memory_log_filters_by_kind() {
        let log = MemoryAuditLog::default();
        log.record(&denied(1), Severity::Warning).unwrap();
        log.record(&SyncEvent::new("invalidate_all", Duration::ZERO, 0).into(), Severity::Info).unwrap();
        log.record(
            &PerformanceMetric::from_millis("cache_set", 0.1, false, Some(Role::Viewer)).into(),
            Severity::Debug,
        )
        .unwrap();
        assert_eq!(log.authorization_events().len(), 1);
        assert_eq!(log.sync_events().len(), 1);
        assert_eq!(log.performance_metrics().len(), 1);
        assert_eq!(log.entries()[2].severity, Severity::Debug);

        log.clear();
        assert!(log.is_empty());
    }

    #[test]
    fn test_json_lines_one_record_per_line() {
        let sink = JsonLinesSink::new(Vec::new());
        sink.record(&denied(42), Severity::Warning).unwrap();
        sink.record(&SyncEvent::new("invalidate_user", Duration::ZERO, 1).into(), Severity::Info).unwrap();

        let out = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["kind"], "authorization");
        assert_eq!(first["severity"], "warning");
        assert_eq!(first["user_id"], 42);
        assert_eq!(first["result"], "denied");

        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["kind"], "sync");
        assert_eq!(second["records_processed"], 1);
    }

    #[test]
    fn test_tracing_sink_never_fails() {
        let sink = TracingSink;
        for severity in Severity::ALL {
            assert!(sink.record(&denied(1), severity).is_ok());
        }
    }
}
