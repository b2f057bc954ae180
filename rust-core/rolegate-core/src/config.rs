// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//! Runtime configuration.
//!
//! Everything is read once into an immutable [`RoleGateConfig`] and handed to
//! the constructors that need it. Unset variables fall back to the defaults;
//! set but unparseable ones are errors.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use rolegate_audit::AuditConfig;
use rolegate_cache::CacheConfig;

use crate::error::ConfigError;
use crate::telemetry::LogFormat;

pub const ENV_TTL_SECONDS: &str = "ROLEGATE_TTL_SECONDS";
pub const ENV_MAX_CACHE_SIZE: &str = "ROLEGATE_MAX_CACHE_SIZE";
pub const ENV_SLOW_THRESHOLD_MS: &str = "ROLEGATE_SLOW_THRESHOLD_MS";
pub const ENV_FAST_THRESHOLD_MS: &str = "ROLEGATE_FAST_THRESHOLD_MS";
pub const ENV_LOG_FORMAT: &str = "ROLEGATE_LOG_FORMAT";

/// Settings for the cache, the audit thresholds and log output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoleGateConfig {
    pub ttl_seconds: u64,
    pub max_cache_size: usize,
    /// Operations slower than this are audited at warning.
    pub slow_threshold_ms: f64,
    /// Operations faster than this are audited at debug.
    pub fast_threshold_ms: f64,
    pub log_format: LogFormat,
}

impl Default for RoleGateConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: 60,
            max_cache_size: 10_000,
            slow_threshold_ms: 300.0,
            fast_threshold_ms: 100.0,
            log_format: LogFormat::Plain,
        }
    }
}

impl RoleGateConfig {
    /// Load from `ROLEGATE_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using `lookup` in place of the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let config = Self {
            ttl_seconds: read(&lookup, ENV_TTL_SECONDS, defaults.ttl_seconds)?,
            max_cache_size: read(&lookup, ENV_MAX_CACHE_SIZE, defaults.max_cache_size)?,
            slow_threshold_ms: read(&lookup, ENV_SLOW_THRESHOLD_MS, defaults.slow_threshold_ms)?,
            fast_threshold_ms: read(&lookup, ENV_FAST_THRESHOLD_MS, defaults.fast_threshold_ms)?,
            log_format: read(&lookup, ENV_LOG_FORMAT, defaults.log_format)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_cache_size == 0 {
            return Err(ConfigError::Invalid("max_cache_size must be at least 1".to_string()));
        }
        for (name, value) in [
            ("slow_threshold_ms", self.slow_threshold_ms),
            ("fast_threshold_ms", self.fast_threshold_ms),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "{} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }
        if self.fast_threshold_ms > self.slow_threshold_ms {
            return Err(ConfigError::Invalid(format!(
                "fast_threshold_ms ({}) exceeds slow_threshold_ms ({})",
                self.fast_threshold_ms, self.slow_threshold_ms
            )));
        }
        Ok(())
    }

    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig::new(self.ttl_seconds, self.max_cache_size)
    }

    pub fn audit_config(&self) -> AuditConfig {
        AuditConfig::with_thresholds(self.slow_threshold_ms, self.fast_threshold_ms)
    }
}

fn read<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(value) if !value.trim().is_empty() => {
            value
                .trim()
                .parse()
                .map_err(|e: T::Err| ConfigError::InvalidValue {
                    key,
                    value: value.clone(),
                    reason: e.to_string(),
                })
        }
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = RoleGateConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, RoleGateConfig::default());
        assert_eq!(config.cache_config(), CacheConfig::default());
        assert_eq!(config.audit_config().slow_threshold_ms, 300.0);
    }

    #[test]
    fn test_overrides() {
        let config = RoleGateConfig::from_lookup(lookup(&[
            (ENV_TTL_SECONDS, "5"),
            (ENV_MAX_CACHE_SIZE, " 2 "),
            (ENV_SLOW_THRESHOLD_MS, "250.5"),
            (ENV_FAST_THRESHOLD_MS, "10"),
            (ENV_LOG_FORMAT, "json"),
        ]))
        .unwrap();

        assert_eq!(config.ttl_seconds, 5);
        assert_eq!(config.max_cache_size, 2);
        assert_eq!(config.slow_threshold_ms, 250.5);
        assert_eq!(config.fast_threshold_ms, 10.0);
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_unparseable_value_names_key() {
        let err = RoleGateConfig::from_lookup(lookup(&[(ENV_TTL_SECONDS, "soon")])).unwrap_err();
        match err {
            ConfigError::InvalidValue { key, value, .. } => {
                assert_eq!(key, ENV_TTL_SECONDS);
                assert_eq!(value, "soon");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_validation() {
        assert!(RoleGateConfig::from_lookup(lookup(&[(ENV_MAX_CACHE_SIZE, "0")])).is_err());
        assert!(RoleGateConfig::from_lookup(lookup(&[(ENV_FAST_THRESHOLD_MS, "400")])).is_err());
        assert!(RoleGateConfig::from_lookup(lookup(&[(ENV_SLOW_THRESHOLD_MS, "NaN")])).is_err());
    }

    #[test]
    fn test_serde_fills_missing_fields() {
        let config: RoleGateConfig = serde_json::from_str(r#"{"ttl_seconds": 30}"#).unwrap();
        assert_eq!(config.ttl_seconds, 30);
        assert_eq!(config.max_cache_size, 10_000);
    }
}
