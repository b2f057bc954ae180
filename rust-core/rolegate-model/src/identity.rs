// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//! User identifier normalization.
//!
//! Chat platforms hand us user ids in whatever shape the transport produced:
//! integers, numeric strings, JSON values. Everything is normalized to a
//! signed 64-bit [`UserId`] or rejected. Nothing is ever coerced into a valid
//! id from garbage input: floats, booleans and nulls are refused even when
//! they would convert cleanly.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::IdentityError;

/// A normalized user identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(i64);

impl UserId {
    /// `i64::MIN` is reserved and never produced by normalization.
    pub const RESERVED: i64 = i64::MIN;

    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    pub const fn get(self) -> i64 {
        self.0
    }

    /// Normalize a raw identifier.
    pub fn parse(raw: &RawUserId) -> Result<Self, IdentityError> {
        let id = match raw {
            RawUserId::Int(v) => *v,
            RawUserId::Unsigned(v) => {
                i64::try_from(*v).map_err(|_| IdentityError::OutOfRange(v.to_string()))?
            }
            RawUserId::Str(s) => parse_str(s)?,
            RawUserId::Float(_) => return Err(IdentityError::UnsupportedType("float")),
            RawUserId::Bool(_) => return Err(IdentityError::UnsupportedType("bool")),
            RawUserId::Null => return Err(IdentityError::UnsupportedType("null")),
            RawUserId::Other(kind) => return Err(IdentityError::UnsupportedType(kind)),
        };
        if id == Self::RESERVED {
            return Err(IdentityError::OutOfRange(id.to_string()));
        }
        Ok(Self(id))
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for UserId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<UserId> for i64 {
    fn from(id: UserId) -> Self {
        id.0
    }
}

fn parse_str(s: &str) -> Result<i64, IdentityError> {
    let trimmed = s.trim_matches(|c: char| c.is_ascii_whitespace());
    if trimmed.is_empty() {
        return Err(IdentityError::Empty);
    }
    match trimmed.parse::<i64>() {
        Ok(v) => Ok(v),
        Err(_) => {
            let digits = trimmed
                .strip_prefix(['+', '-'])
                .unwrap_or(trimmed);
            if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
                Err(IdentityError::OutOfRange(trimmed.to_string()))
            } else {
                Err(IdentityError::NotNumeric(trimmed.to_string()))
            }
        }
    }
}

/// A user identifier as received from a caller, before normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum RawUserId {
    Int(i64),
    Unsigned(u64),
    Float(f64),
    Bool(bool),
    Str(String),
    Null,
    /// Structured values (arrays, objects) that can never be an id.
    Other(&'static str),
}

impl RawUserId {
    /// Normalize into a [`UserId`].
    pub fn normalize(&self) -> Result<UserId, IdentityError> {
        UserId::parse(self)
    }
}

impl fmt::Display for RawUserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawUserId::Int(v) => write!(f, "{}", v),
            RawUserId::Unsigned(v) => write!(f, "{}", v),
            RawUserId::Float(v) => write!(f, "{}", v),
            RawUserId::Bool(v) => write!(f, "{}", v),
            RawUserId::Str(s) => write!(f, "{:?}", s),
            RawUserId::Null => write!(f, "null"),
            RawUserId::Other(kind) => write!(f, "<{}>", kind),
        }
    }
}

impl From<UserId> for RawUserId {
    fn from(id: UserId) -> Self {
        RawUserId::Int(id.get())
    }
}

impl From<i64> for RawUserId {
    fn from(v: i64) -> Self {
        RawUserId::Int(v)
    }
}

impl From<i32> for RawUserId {
    fn from(v: i32) -> Self {
        RawUserId::Int(i64::from(v))
    }
}

impl From<u64> for RawUserId {
    fn from(v: u64) -> Self {
        RawUserId::Unsigned(v)
    }
}

impl From<u32> for RawUserId {
    fn from(v: u32) -> Self {
        RawUserId::Int(i64::from(v))
    }
}

impl From<f64> for RawUserId {
    fn from(v: f64) -> Self {
        RawUserId::Float(v)
    }
}

impl From<bool> for RawUserId {
    fn from(v: bool) -> Self {
        RawUserId::Bool(v)
    }
}

impl From<&str> for RawUserId {
    fn from(v: &str) -> Self {
        RawUserId::Str(v.to_string())
    }
}

impl From<String> for RawUserId {
    fn from(v: String) -> Self {
        RawUserId::Str(v)
    }
}

impl<T: Into<RawUserId>> From<Option<T>> for RawUserId {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(RawUserId::Null)
    }
}

impl From<&serde_json::Value> for RawUserId {
    fn from(v: &serde_json::Value) -> Self {
        use serde_json::Value;
        match v {
            Value::Null => RawUserId::Null,
            Value::Bool(b) => RawUserId::Bool(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    RawUserId::Int(i)
                } else if let Some(u) = n.as_u64() {
                    RawUserId::Unsigned(u)
                } else {
                    RawUserId::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Value::String(s) => RawUserId::Str(s.clone()),
            Value::Array(_) => RawUserId::Other("array"),
            Value::Object(_) => RawUserId::Other("object"),
        }
    }
}

impl From<serde_json::Value> for RawUserId {
    fn from(v: serde_json::Value) -> Self {
        RawUserId::from(&v)
    }
}
