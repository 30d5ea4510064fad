//! Server configuration from environment variables.
//!
//! - `COEDIT_PORT`: listen port (default: 3000)
//! - `COEDIT_LOCK_TTL_SECS`: lock time-to-live in seconds (default: 300)
//! - `COEDIT_SWEEP_INTERVAL_SECS`: expiry sweep period in seconds (default: 60)

use std::time::Duration;

/// Longest accepted lock TTL: one day.
const MAX_TTL_SECS: u64 = 24 * 60 * 60;

/// Errors from reading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A variable was set but could not be parsed.
    #[error("invalid value for {var}: '{value}' ({reason})")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Runtime configuration for the lock server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub port: u16,
    pub lock_ttl: Duration,
    pub sweep_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            port: 3000,
            lock_ttl: Duration::from_secs(5 * 60),
            sweep_interval: Duration::from_secs(60),
        }
    }
}

impl ServerConfig {
    /// Reads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Reads configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = ServerConfig::default();

        let port = match lookup("COEDIT_PORT") {
            Some(value) => value.trim().parse::<u16>().map_err(|e| ConfigError::Invalid {
                var: "COEDIT_PORT",
                value: value.clone(),
                reason: e.to_string(),
            })?,
            None => defaults.port,
        };

        let lock_ttl = match lookup("COEDIT_LOCK_TTL_SECS") {
            Some(value) => parse_secs("COEDIT_LOCK_TTL_SECS", &value)?,
            None => defaults.lock_ttl,
        };

        let sweep_interval = match lookup("COEDIT_SWEEP_INTERVAL_SECS") {
            Some(value) => parse_secs("COEDIT_SWEEP_INTERVAL_SECS", &value)?,
            None => defaults.sweep_interval,
        };

        Ok(ServerConfig {
            port,
            lock_ttl,
            sweep_interval,
        })
    }
}

fn parse_secs(var: &'static str, value: &str) -> Result<Duration, ConfigError> {
    let invalid = |reason: String| ConfigError::Invalid {
        var,
        value: value.to_string(),
        reason,
    };
    let secs = value.trim().parse::<u64>().map_err(|e| invalid(e.to_string()))?;
    if secs == 0 || secs > MAX_TTL_SECS {
        return Err(invalid(format!("must be between 1 and {MAX_TTL_SECS}")));
    }
    Ok(Duration::from_secs(secs))
}
