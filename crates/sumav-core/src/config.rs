//! Environment-overridable configuration, read once at process start.
//!
//! Threaded as an explicit struct rather than read piecemeal from
//! environment variables scattered through the call sites that need them.

use std::env;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Threshold τ used for relation classification and alias detection.
    pub intersection_ratio: f64,
    /// Informational only; the core itself is single-threaded.
    pub worker_concurrency: usize,
    /// Seconds to wait before a store reconnect attempt is considered stale.
    pub wait_for_reconnection_secs: u64,
    /// Default `weight_param` for representative-token selection.
    pub weight_param: f64,
    /// Default `general_param` for representative-token selection.
    pub general_param: f64,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("environment variable {name} has an invalid value {value:?}: {source}")]
    InvalidFloat {
        name: &'static str,
        value: String,
        #[source]
        source: std::num::ParseFloatError,
    },
    #[error("environment variable {name} has an invalid value {value:?}: {source}")]
    InvalidInt {
        name: &'static str,
        value: String,
        #[source]
        source: std::num::ParseIntError,
    },
}

impl Default for Config {
    fn default() -> Self {
        Self {
            intersection_ratio: 0.9,
            worker_concurrency: default_worker_concurrency(),
            wait_for_reconnection_secs: 60,
            weight_param: 4.1,
            general_param: 225.0,
        }
    }
}

impl Config {
    /// Load configuration from environment variables, falling back to the
    /// defaults in [`Config::default`] when a variable is unset.
    ///
    /// A variable that IS set but fails to parse is a hard configuration
    /// error, not a silent fallback to the default.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        Ok(Self {
            intersection_ratio: parse_env_f64(
                "INTERSECTION_RATIO",
                defaults.intersection_ratio,
            )?,
            worker_concurrency: parse_env_usize(
                "WORKER_CONCURRENCY",
                defaults.worker_concurrency,
            )?,
            wait_for_reconnection_secs: parse_env_u64(
                "WAIT_FOR_RECONNECTION",
                defaults.wait_for_reconnection_secs,
            )?,
            weight_param: parse_env_f64("WEIGHT_PARAM", defaults.weight_param)?,
            general_param: parse_env_f64("GENERAL_PARAM", defaults.general_param)?,
        })
    }
}

fn default_worker_concurrency() -> usize {
    let cpus = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    if cpus <= 8 {
        cpus
    } else {
        cpus / 2
    }
}

fn parse_env_f64(name: &'static str, default: f64) -> Result<f64, ConfigError> {
    match env::var(name) {
        Err(_) => Ok(default),
        Ok(value) => value
            .parse::<f64>()
            .map_err(|source| ConfigError::InvalidFloat {
                name,
                value,
                source,
            }),
    }
}

fn parse_env_u64(name: &'static str, default: u64) -> Result<u64, ConfigError> {
    match env::var(name) {
        Err(_) => Ok(default),
        Ok(value) => value
            .parse::<u64>()
            .map_err(|source| ConfigError::InvalidInt {
                name,
                value,
                source,
            }),
    }
}

fn parse_env_usize(name: &'static str, default: usize) -> Result<usize, ConfigError> {
    match env::var(name) {
        Err(_) => Ok(default),
        Ok(value) => value
            .parse::<usize>()
            .map_err(|source| ConfigError::InvalidInt {
                name,
                value,
                source,
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_values() {
        let cfg = Config::default();
        assert_eq!(cfg.intersection_ratio, 0.9);
        assert_eq!(cfg.weight_param, 4.1);
        assert_eq!(cfg.general_param, 225.0);
        assert_eq!(cfg.wait_for_reconnection_secs, 60);
    }
}
