// SPDX-License-Identifier: PMPL-1.0-or-later
//! Prometheus export of the audit stream.

use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry};

use rolegate_model::role_label;

use crate::error::AuditError;
use crate::event::AuditRecord;
use crate::severity::Severity;
use crate::sink::AuditSink;

/// Latency buckets in milliseconds, bracketing the fast/slow thresholds.
const DURATION_BUCKETS_MS: &[f64] = &[0.1, 0.5, 1.0, 5.0, 10.0, 25.0, 50.0, 100.0, 200.0, 300.0, 500.0, 1000.0];

/// Turns audit records into Prometheus counters and a latency histogram.
#[derive(Clone)]
pub struct PrometheusSink {
    authorizations: IntCounterVec,
    syncs: IntCounterVec,
    records_by_severity: IntCounterVec,
    durations: HistogramVec,
}

impl PrometheusSink {
    /// Create the collectors and register them in `registry`.
    pub fn register(registry: &Registry) -> Result<Self, AuditError> {
        let authorizations = IntCounterVec::new(
            Opts::new("rolegate_authorizations_total", "Authorization events by result, cache state and role"),
            &["result", "cache_state", "role"],
        )?;
        let syncs = IntCounterVec::new(
            Opts::new("rolegate_cache_syncs_total", "Cache invalidation and refresh events by outcome"),
            &["sync_type", "success"],
        )?;
        let records_by_severity = IntCounterVec::new(
            Opts::new("rolegate_audit_records_total", "Audit records by routed severity"),
            &["severity"],
        )?;
        let durations = HistogramVec::new(
            HistogramOpts::new("rolegate_operation_duration_ms", "Measured operation latency in milliseconds")
                .buckets(DURATION_BUCKETS_MS.to_vec()),
            &["operation", "cache_hit"],
        )?;

        registry.register(Box::new(authorizations.clone()))?;
        registry.register(Box::new(syncs.clone()))?;
        registry.register(Box::new(records_by_severity.clone()))?;
        registry.register(Box::new(durations.clone()))?;

        Ok(Self {
            authorizations,
            syncs,
            records_by_severity,
            durations,
        })
    }
}

impl AuditSink for PrometheusSink {
    fn name(&self) -> &str {
        "prometheus"
    }

    fn record(&self, record: &AuditRecord, severity: Severity) -> Result<(), AuditError> {
        self.records_by_severity
            .with_label_values(&[severity.as_str()])
            .inc();

        match record {
            AuditRecord::Authorization(ev) => {
                self.authorizations
                    .with_label_values(&[ev.result.as_str(), ev.cache_state.as_str(), role_label(ev.resolved_role)])
                    .inc();
            }
            AuditRecord::Sync(ev) => {
                let success = if ev.success { "true" } else { "false" };
                self.syncs
                    .with_label_values(&[ev.sync_type.as_str(), success])
                    .inc();
            }
            AuditRecord::Performance(m) => {
                let hit = if m.cache_hit { "true" } else { "false" };
                self.durations
                    .with_label_values(&[m.operation.as_str(), hit])
                    .observe(m.duration_ms);
            }
        }
        Ok(())
    }
}
