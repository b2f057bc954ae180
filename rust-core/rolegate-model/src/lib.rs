// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//! RoleGate Model
//!
//! Shared vocabulary for the RoleGate crates: the role hierarchy, user
//! identifier normalization, cache lookup states and the clock abstraction
//! that lets the cache run against simulated time in tests.

pub mod clock;
pub mod error;
pub mod identity;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use error::IdentityError;
pub use identity::{RawUserId, UserId};

/// The three roles a user can hold.
///
/// Declaration order is the hierarchy: `Viewer < Coordinator < Admin`.
/// A higher role carries every privilege of the roles below it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Viewer = 1,
    Coordinator = 2,
    Admin = 3,
}

impl Role {
    /// All roles, lowest privilege first.
    pub const ALL: [Role; 3] = [Role::Viewer, Role::Coordinator, Role::Admin];

    /// All roles in lookup precedence: the first membership list that
    /// contains a user decides their role.
    pub const BY_PRECEDENCE: [Role; 3] = [Role::Admin, Role::Coordinator, Role::Viewer];

    /// Numeric hierarchy level (viewer = 1, coordinator = 2, admin = 3).
    pub fn level(self) -> u8 {
        self as u8
    }

    /// Whether a holder of `self` satisfies a requirement for `required`.
    pub fn satisfies(self, required: Role) -> bool {
        self.level() >= required.level()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Viewer => "viewer",
            Role::Coordinator => "coordinator",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "viewer" => Ok(Role::Viewer),
            "coordinator" => Ok(Role::Coordinator),
            "admin" => Ok(Role::Admin),
            _ => Err(IdentityError::UnknownRole(s.to_string())),
        }
    }
}

/// How a role lookup was served.
///
/// `Hit`, `Miss` and `Expired` come straight from the cache. The remaining
/// states describe resolutions that never got a usable cache answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheState {
    Hit,
    Miss,
    Expired,
    Refresh,
    Error,
    InvalidUserId,
}

impl CacheState {
    pub fn as_str(self) -> &'static str {
        match self {
            CacheState::Hit => "hit",
            CacheState::Miss => "miss",
            CacheState::Expired => "expired",
            CacheState::Refresh => "refresh",
            CacheState::Error => "error",
            CacheState::InvalidUserId => "invalid_user_id",
        }
    }
}

impl fmt::Display for CacheState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Format an optional role for logs and metric labels.
pub fn role_label(role: Option<Role>) -> &'static str {
    role.map(Role::as_str).unwrap_or("none")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_hierarchy_ordering() {
        assert!(Role::Admin > Role::Coordinator);
        assert!(Role::Coordinator > Role::Viewer);
        assert_eq!(Role::Viewer.level(), 1);
        assert_eq!(Role::Coordinator.level(), 2);
        assert_eq!(Role::Admin.level(), 3);
    }

    #[test]
    fn test_satisfies() {
        assert!(Role::Admin.satisfies(Role::Viewer));
        assert!(Role::Admin.satisfies(Role::Admin));
        assert!(Role::Coordinator.satisfies(Role::Viewer));
        assert!(!Role::Coordinator.satisfies(Role::Admin));
        assert!(!Role::Viewer.satisfies(Role::Coordinator));
    }

    #[test]
    fn test_role_display_roundtrip() {
        for role in Role::ALL {
            let parsed: Role = role.to_string().parse().unwrap();
            assert_eq!(role, parsed);
        }
        assert_eq!("ADMIN".parse::<Role>().unwrap(), Role::Admin);
        assert!("superuser".parse::<Role>().is_err());
    }

    #[test]
    fn test_precedence_is_descending() {
        let mut sorted = Role::BY_PRECEDENCE;
        sorted.sort();
        sorted.reverse();
        assert_eq!(sorted, Role::BY_PRECEDENCE);
    }

    #[test]
    fn test_cache_state_serde_names() {
        let json = serde_json::to_string(&CacheState::InvalidUserId).unwrap();
        assert_eq!(json, "\"invalid_user_id\"");
        assert_eq!(CacheState::Expired.to_string(), "expired");
        assert_eq!(role_label(None), "none");
        assert_eq!(role_label(Some(Role::Coordinator)), "coordinator");
    }
}
