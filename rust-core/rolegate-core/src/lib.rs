// SPDX-License-Identifier: PMPL-1.0-or-later
//! RoleGate Core
//!
//! Answers "what role does this caller have right now?" for chat-bot command
//! handlers, and "may they run this command?".
//!
//! ```text
//! request -> AccessGate -> RoleResolver -> RoleCache hit
//!                                       -> RoleCache miss/expired -> RoleStore -> RoleCache::set
//!         -> hierarchy comparison -> Auditor (event + latency) -> Decision
//! ```
//!
//! [`RoleAuthority`] wires the pieces together from a [`RoleGateConfig`].

pub mod authority;
pub mod config;
pub mod error;
pub mod gate;
pub mod resolver;
pub mod store;
pub mod telemetry;

pub use authority::RoleAuthority;
pub use config::RoleGateConfig;
pub use error::{AuthError, ConfigError, StoreError};
pub use gate::{AccessGate, Decision, DenialReason, CHECK_ACTION};
pub use resolver::{RoleResolver, RESOLVE_ACTION};
pub use store::{InMemoryRoleStore, RoleSnapshot, RoleStore, TimeoutRoleStore};
pub use telemetry::{init_tracing, LogFormat};

pub use rolegate_audit as audit;
pub use rolegate_cache as cache;
pub use rolegate_model as model;
pub use rolegate_model::{RawUserId, Role, UserId};
