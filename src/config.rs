//! Configuration management for the reader bridge

use std::env;
use std::time::Duration;

use crate::error::BridgeError;

#[derive(Debug, Clone)]
pub struct Config {
    pub bridge: BridgeConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Requests allowed in flight across all views (0 = unlimited)
    pub max_in_flight: usize,
    /// Age after which an unanswered request is reported by the sweeper
    pub stale_request_after: Duration,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub filter: String,
}

pub const DEFAULT_LOG_FILTER: &str = "book_reader_bridge=info";

impl Default for BridgeConfig {
    fn default() -> Self {
        BridgeConfig {
            max_in_flight: 0,
            stale_request_after: Duration::from_secs(30),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bridge: BridgeConfig::default(),
            logging: LoggingConfig {
                filter: DEFAULT_LOG_FILTER.to_string(),
            },
        }
    }
}

impl Config {
    /// Read `BRIDGE_*` variables from the process environment
    pub fn from_env() -> Result<Self, BridgeError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; unset keys keep their defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self, BridgeError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();
        Ok(Config {
            bridge: BridgeConfig {
                max_in_flight: parse_var(&lookup, "BRIDGE_MAX_IN_FLIGHT")?
                    .unwrap_or(defaults.bridge.max_in_flight),
                stale_request_after: parse_var(&lookup, "BRIDGE_STALE_REQUEST_SECS")?
                    .map(Duration::from_secs)
                    .unwrap_or(defaults.bridge.stale_request_after),
            },
            logging: LoggingConfig {
                filter: lookup("BRIDGE_LOG_FILTER").unwrap_or(defaults.logging.filter),
            },
        })
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Result<Option<T>, BridgeError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| BridgeError::Config(format!("{}={:?}: {}", key, raw, e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.bridge.max_in_flight, 0);
        assert_eq!(config.bridge.stale_request_after, Duration::from_secs(30));
        assert_eq!(config.logging.filter, DEFAULT_LOG_FILTER);
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("BRIDGE_MAX_IN_FLIGHT", "64"),
            ("BRIDGE_STALE_REQUEST_SECS", " 5 "),
            ("BRIDGE_LOG_FILTER", "book_reader_bridge=debug"),
        ]))
        .unwrap();
        assert_eq!(config.bridge.max_in_flight, 64);
        assert_eq!(config.bridge.stale_request_after, Duration::from_secs(5));
        assert_eq!(config.logging.filter, "book_reader_bridge=debug");
    }

    #[test]
    fn test_invalid_number_is_an_error() {
        let err = Config::from_lookup(lookup_from(&[("BRIDGE_MAX_IN_FLIGHT", "lots")])).unwrap_err();
        assert!(err.to_string().contains("BRIDGE_MAX_IN_FLIGHT"));
    }
}
