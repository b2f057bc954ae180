// SPDX-License-Identifier: PMPL-1.0-or-later
//! RoleGate Audit
//!
//! Structured security-event logging for role resolution. Every
//! authorization decision, cache synchronization and timed operation becomes
//! an immutable record, is classified into a severity by [`AuditConfig`], and
//! is committed synchronously to every configured [`AuditSink`] before the
//! emitting call returns.
//!
//! A failing sink never blocks an authorization decision: the [`Auditor`]
//! swallows the error, writes the record to a fallback `tracing` channel and
//! counts the failure.

pub mod auditor;
pub mod error;
pub mod event;
pub mod metrics;
pub mod severity;
pub mod sink;

pub use auditor::{AuditStats, Auditor, FALLBACK_TARGET};
pub use error::AuditError;
pub use event::{AccessResult, AuditRecord, AuthorizationEvent, PerformanceMetric, SyncEvent};
pub use metrics::PrometheusSink;
pub use severity::{AuditConfig, Severity};
pub use sink::{AuditEntry, AuditSink, JsonLinesSink, MemoryAuditLog, TracingSink, AUDIT_TARGET};
