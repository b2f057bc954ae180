// SPDX-License-Identifier: PMPL-1.0-or-later
//! Model error types.

use thiserror::Error;

/// Errors raised while normalizing identifiers and role names.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    #[error("empty user id")]
    Empty,

    #[error("user id is not an integer: {0:?}")]
    NotNumeric(String),

    #[error("user id out of range for a signed 64-bit integer: {0}")]
    OutOfRange(String),

    #[error("user id of type {0} is not accepted")]
    UnsupportedType(&'static str),

    #[error("unknown role: {0}")]
    UnknownRole(String),
}
