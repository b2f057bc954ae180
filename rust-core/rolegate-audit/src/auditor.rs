// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//! The audit front door.
//!
//! [`Auditor`] classifies each record once and commits it to every sink
//! before returning. Sink failures are diagnosed on a fallback channel and
//! counted; they are never propagated to the caller.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::error;

use crate::event::{AuditRecord, AuthorizationEvent, PerformanceMetric, SyncEvent};
use crate::severity::{AuditConfig, Severity};
use crate::sink::{AuditSink, TracingSink};

/// `tracing` target used when a sink fails to commit a record.
pub const FALLBACK_TARGET: &str = "rolegate::audit::fallback";

/// Counters describing audit traffic since the auditor was built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditStats {
    pub records: u64,
    pub debug: u64,
    pub info: u64,
    pub warning: u64,
    pub error: u64,
    /// Individual sink commits that failed and went to the fallback channel.
    pub sink_failures: u64,
}

#[derive(Default)]
struct Counters {
    records: AtomicU64,
    debug: AtomicU64,
    info: AtomicU64,
    warning: AtomicU64,
    error: AtomicU64,
    sink_failures: AtomicU64,
}

/// Fans audit records out to the configured sinks.
pub struct Auditor {
    config: AuditConfig,
    sinks: Vec<Arc<dyn AuditSink>>,
    counters: Counters,
}

impl Auditor {
    /// An auditor with no sinks. Records are still classified and counted.
    pub fn new(config: AuditConfig) -> Self {
        Self {
            config,
            sinks: Vec::new(),
            counters: Counters::default(),
        }
    }

    /// An auditor writing to `tracing` only.
    pub fn with_tracing(config: AuditConfig) -> Self {
        Self::new(config).with_sink(Arc::new(TracingSink))
    }

    pub fn with_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn config(&self) -> &AuditConfig {
        &self.config
    }

    /// Classify and commit a record. Returns the severity it was routed at.
    pub fn emit(&self, record: impl Into<AuditRecord>) -> Severity {
        let record = record.into();
        let severity = self.config.classify(&record);

        self.counters.records.fetch_add(1, Ordering::Relaxed);
        let bucket = match severity {
            Severity::Debug => &self.counters.debug,
            Severity::Info => &self.counters.info,
            Severity::Warning => &self.counters.warning,
            Severity::Error => &self.counters.error,
        };
        bucket.fetch_add(1, Ordering::Relaxed);

        for sink in &self.sinks {
            if let Err(err) = sink.record(&record, severity) {
                self.counters.sink_failures.fetch_add(1, Ordering::Relaxed);
                let payload = serde_json::to_string(&record)
                    .unwrap_or_else(|e| format!("<unserializable {} record: {}>", record.kind(), e));
                error!(
                    target: FALLBACK_TARGET,
                    sink = sink.name(),
                    severity = %severity,
                    error = %err,
                    record = %payload,
                    "audit sink failed; record diverted to fallback channel"
                );
            }
        }

        severity
    }

    pub fn authorization(&self, event: AuthorizationEvent) -> Severity {
        self.emit(event)
    }

    pub fn sync(&self, event: SyncEvent) -> Severity {
        self.emit(event)
    }

    pub fn performance(&self, metric: PerformanceMetric) -> Severity {
        self.emit(metric)
    }

    pub fn stats(&self) -> AuditStats {
        AuditStats {
            records: self.counters.records.load(Ordering::Relaxed),
            debug: self.counters.debug.load(Ordering::Relaxed),
            info: self.counters.info.load(Ordering::Relaxed),
            warning: self.counters.warning.load(Ordering::Relaxed),
            error: self.counters.error.load(Ordering::Relaxed),
            sink_failures: self.counters.sink_failures.load(Ordering::Relaxed),
        }
    }
}

impl Default for Auditor {
    fn default() -> Self {
        Self::with_tracing(AuditConfig::default())
    }
}

impl std::fmt::Debug for Auditor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.sinks.iter().map(|s| s.name()).collect();
        f.debug_struct("Auditor")
            .field("config", &self.config)
            .field("sinks", &names)
            .finish()
    }
}
