//! Server configuration, loaded once from the environment at startup.

use std::net::SocketAddr;
use thiserror::Error;
use tracing::warn;

/// Maximum accepted webhook body size (10 MB).
pub const DEFAULT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Deployment environment.
///
/// Production is the only environment where broker test traffic is skipped;
/// everywhere else test events flow through the full pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Production,
    Development,
}

impl Environment {
    pub fn is_production(self) -> bool {
        self == Environment::Production
    }
}

/// Errors from configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid listen address {addr:?}: {source}")]
    InvalidAddr {
        addr: String,
        source: std::net::AddrParseError,
    },
}

/// Runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the HTTP server binds to.
    pub bind_addr: SocketAddr,

    /// Shared secret for webhook signature verification. `None` enables open
    /// mode: unauthenticated requests are accepted with a warning.
    pub webhook_secret: Option<Vec<u8>>,

    pub environment: Environment,

    /// Maximum accepted webhook body size in bytes.
    pub max_body_bytes: usize,
}

impl Config {
    /// Loads configuration from environment variables:
    ///
    /// - `CARDIOGUARD_ADDR` - listen address (default `0.0.0.0:3000`)
    /// - `CARDIOGUARD_WEBHOOK_SECRET` - shared HMAC secret (optional)
    /// - `CARDIOGUARD_ENV` - `production` enables production behavior;
    ///   anything else (or unset) is development
    pub fn from_env() -> Result<Config, ConfigError> {
        let addr = std::env::var("CARDIOGUARD_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_addr = addr.parse().map_err(|source| ConfigError::InvalidAddr {
            addr: addr.clone(),
            source,
        })?;

        let webhook_secret = std::env::var("CARDIOGUARD_WEBHOOK_SECRET")
            .ok()
            .filter(|s| !s.is_empty())
            .map(String::into_bytes);

        let environment = match std::env::var("CARDIOGUARD_ENV").as_deref() {
            Ok("production") => Environment::Production,
            _ => Environment::Development,
        };

        let config = Config {
            bind_addr,
            webhook_secret,
            environment,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        };
        config.warn_if_open_mode();
        Ok(config)
    }

    /// Convenience constructor for tests and embedded use.
    pub fn new(
        bind_addr: SocketAddr,
        webhook_secret: Option<Vec<u8>>,
        environment: Environment,
    ) -> Config {
        Config {
            bind_addr,
            webhook_secret,
            environment,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    /// Logs a prominent warning when signature verification is disabled.
    /// Open mode must never be silent.
    pub fn warn_if_open_mode(&self) {
        if self.webhook_secret.is_none() {
            warn!(
                environment = ?self.environment,
                "CARDIOGUARD_WEBHOOK_SECRET is not set: webhook signature verification is DISABLED"
            );
        }
    }

    pub fn signature_verification_enabled(&self) -> bool {
        self.webhook_secret.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environment_production_flag() {
        assert!(Environment::Production.is_production());
        assert!(!Environment::Development.is_production());
    }

    #[test]
    fn new_config_defaults_body_limit() {
        let config = Config::new(
            "127.0.0.1:0".parse().unwrap(),
            Some(b"secret".to_vec()),
            Environment::Development,
        );
        assert_eq!(config.max_body_bytes, DEFAULT_MAX_BODY_BYTES);
        assert!(config.signature_verification_enabled());
    }
}
