//! Server configuration from environment variables.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use visionboard_core::remote::RepositoryLimits;

const DEFAULT_UNFURL_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    pub limits: RepositoryLimits,
    pub unfurl_timeout: Duration,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset keys take their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let limits = RepositoryLimits {
            max_boards: parse_or(&lookup, "VISIONBOARD_MAX_BOARDS", defaults.limits.max_boards)?,
            max_payload_bytes: parse_or(&lookup, "VISIONBOARD_MAX_PAYLOAD_BYTES", defaults.limits.max_payload_bytes)?,
            history_cap: parse_or(&lookup, "VISIONBOARD_HISTORY_CAP", defaults.limits.history_cap)?,
        };
        let timeout_secs = parse_or(&lookup, "VISIONBOARD_UNFURL_TIMEOUT_SECS", DEFAULT_UNFURL_TIMEOUT_SECS)?;

        Ok(Self {
            addr: parse_or(&lookup, "VISIONBOARD_ADDR", defaults.addr)?,
            limits,
            unfurl_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 3030)),
            limits: RepositoryLimits::default(),
            unfurl_timeout: Duration::from_secs(DEFAULT_UNFURL_TIMEOUT_SECS),
        }
    }
}

fn parse_or<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &'static str, default: T) -> Result<T, ConfigError> {
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw.trim().parse().map_err(|_| ConfigError::Invalid { key, value: raw }),
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
    fn test_defaults() {
        let config = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.limits.max_boards, 3);
        assert_eq!(config.unfurl_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_overrides() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("VISIONBOARD_ADDR", "127.0.0.1:8080"),
            ("VISIONBOARD_MAX_BOARDS", "5"),
            ("VISIONBOARD_HISTORY_CAP", " 7 "),
        ]))
        .unwrap();
        assert_eq!(config.addr, SocketAddr::from(([127, 0, 0, 1], 8080)));
        assert_eq!(config.limits.max_boards, 5);
        assert_eq!(config.limits.history_cap, 7);
    }

    #[test]
    fn test_invalid_value() {
        let err = ServerConfig::from_lookup(lookup(&[("VISIONBOARD_MAX_PAYLOAD_BYTES", "lots")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid {
                key: "VISIONBOARD_MAX_PAYLOAD_BYTES",
                value: "lots".to_string()
            }
        );
    }
}
