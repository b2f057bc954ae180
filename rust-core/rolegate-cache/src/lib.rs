// SPDX-License-Identifier: PMPL-1.0-or-later
//! RoleGate Cache
//!
//! A bounded role cache keyed by [`UserId`](rolegate_model::UserId):
//!
//! - **TTL classification**: entries older than `ttl_seconds` are reported as
//!   expired on read, with their stale value, but are not deleted.
//! - **LRU eviction**: inserting a new key at capacity removes the entry with
//!   the oldest `last_access` first.
//! - **Invalidation**: single-user and global, each reported as a sync event.
//! - **Statistics**: cumulative hit/miss/expired, eviction and invalidation
//!   counters.

pub mod cache;
pub mod config;

pub use cache::{CacheEntry, CacheLookup, CacheStats, RoleCache};
pub use config::CacheConfig;
