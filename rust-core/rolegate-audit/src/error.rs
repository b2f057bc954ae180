// SPDX-License-Identifier: PMPL-1.0-or-later
//! Audit error types.

use thiserror::Error;

/// Errors a sink can report while committing a record.
#[derive(Error, Debug)]
pub enum AuditError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("metrics registration failed: {0}")]
    Metrics(String),

    #[error("audit sink unavailable: {0}")]
    Unavailable(String),
}

impl From<prometheus::Error> for AuditError {
    fn from(err: prometheus::Error) -> Self {
        AuditError::Metrics(err.to_string())
    }
}
