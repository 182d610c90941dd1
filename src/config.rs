//! Environment-driven configuration.

use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

/// How strictly the order and review workflows guard their state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WorkflowMode {
    /// Enforced status transitions, guarded cancellation, ratings recomputed on every review change.
    #[default]
    Strict,
    /// Legacy API semantics: unconstrained status overwrite, unguarded cancellation,
    /// ratings recomputed only when a review is created.
    Lenient,
}

impl FromStr for WorkflowMode {
    type Err = ConfigError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "lenient" => Ok(Self::Lenient),
            other => Err(ConfigError::Invalid { key: "WORKFLOW_MODE", value: other.to_string() }),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub nats_url: Option<String>,
    pub jwt_secret: String,
    pub token_ttl: chrono::Duration,
    pub request_timeout: Duration,
    pub workflow_mode: WorkflowMode,
}

const DEV_JWT_SECRET: &str = "dev-secret";

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8083,
            database_url: None,
            max_connections: 10,
            nats_url: None,
            jwt_secret: DEV_JWT_SECRET.to_string(),
            token_ttl: chrono::Duration::days(7),
            request_timeout: Duration::from_secs(30),
            workflow_mode: WorkflowMode::Strict,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let jwt_secret = lookup("JWT_SECRET").unwrap_or_else(|| {
            tracing::warn!("JWT_SECRET not set; using insecure dev default");
            defaults.jwt_secret.clone()
        });
        Ok(Self {
            port: parse(&lookup, "PORT")?.unwrap_or(defaults.port),
            database_url: lookup("DATABASE_URL").filter(|v| !v.is_empty()),
            max_connections: parse(&lookup, "DATABASE_MAX_CONNECTIONS")?.unwrap_or(defaults.max_connections),
            nats_url: lookup("NATS_URL").filter(|v| !v.is_empty()),
            jwt_secret,
            token_ttl: parse::<i64, _>(&lookup, "TOKEN_TTL_DAYS")?.map(chrono::Duration::days).unwrap_or(defaults.token_ttl),
            request_timeout: parse(&lookup, "REQUEST_TIMEOUT_SECS")?.map(Duration::from_secs).unwrap_or(defaults.request_timeout),
            workflow_mode: lookup("WORKFLOW_MODE").map(|v| v.parse()).transpose()?.unwrap_or_default(),
        })
    }
}

fn parse<T: FromStr, F: Fn(&str) -> Option<String>>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError> {
    lookup(key)
        .map(|value| value.trim().parse().map_err(|_| ConfigError::Invalid { key, value }))
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.port, 8083);
        assert!(cfg.database_url.is_none());
        assert_eq!(cfg.token_ttl, chrono::Duration::days(7));
        assert_eq!(cfg.workflow_mode, WorkflowMode::Strict);
    }

    #[test]
    fn test_overrides() {
        let cfg = config(&[("PORT", "9000"), ("WORKFLOW_MODE", "Lenient"), ("REQUEST_TIMEOUT_SECS", "5"), ("DATABASE_URL", "postgres://x")]).unwrap();
        assert_eq!(cfg.port, 9000);
        assert_eq!(cfg.workflow_mode, WorkflowMode::Lenient);
        assert_eq!(cfg.request_timeout, Duration::from_secs(5));
        assert_eq!(cfg.database_url.as_deref(), Some("postgres://x"));
    }

    #[test]
    fn test_invalid_values() {
        assert_eq!(config(&[("PORT", "eighty")]).unwrap_err(), ConfigError::Invalid { key: "PORT", value: "eighty".into() });
        assert!(config(&[("WORKFLOW_MODE", "yolo")]).is_err());
    }
}
