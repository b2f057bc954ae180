// SPDX-License-Identifier: PMPL-1.0-or-later
//! Cache configuration.

use serde::{Deserialize, Serialize};

/// TTLs are capped at roughly a century.
const MAX_TTL_SECONDS: u64 = 100 * 365 * 24 * 60 * 60;

/// Configuration for the role cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Entries older than this many seconds are reported as expired.
    /// Default: 60.
    pub ttl_seconds: u64,
    /// Maximum number of cached users. Values below 1 are treated as 1.
    /// Default: 10000.
    pub max_size: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: 60,
            max_size: 10_000,
        }
    }
}

impl CacheConfig {
    pub fn new(ttl_seconds: u64, max_size: usize) -> Self {
        Self { ttl_seconds, max_size }
    }

    pub(crate) fn effective_max_size(&self) -> usize {
        self.max_size.max(1)
    }

    pub(crate) fn ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.ttl_seconds.min(MAX_TTL_SECONDS) as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CacheConfig::default();
        assert_eq!(config.ttl_seconds, 60);
        assert_eq!(config.max_size, 10_000);
        assert_eq!(config.ttl(), chrono::Duration::seconds(60));
    }

    #[test]
    fn test_zero_max_size_clamped() {
        assert_eq!(CacheConfig::new(60, 0).effective_max_size(), 1);
    }

    #[test]
    fn test_huge_ttl_does_not_panic() {
        let config = CacheConfig::new(u64::MAX, 1);
        assert!(config.ttl() > chrono::Duration::days(365));
    }
}
