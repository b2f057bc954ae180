// SPDX-License-Identifier: PMPL-1.0-or-later
//! Error types for role resolution and configuration.

use std::time::Duration;

use thiserror::Error;

/// Failure while reading the authoritative role lists.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("role store unavailable: {0}")]
    Unavailable(String),

    #[error("role store did not answer within {0:?}")]
    Timeout(Duration),
}

/// Invalid or unparseable configuration.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?} ({reason})")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Errors surfaced by resolution and access checks.
///
/// Malformed identifiers and missing roles are not errors; they resolve to
/// "no role" and a denied decision.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error(transparent)]
    Store(#[from] StoreError),
}
