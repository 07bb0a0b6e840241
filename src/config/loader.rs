//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable overriding `auth.secret`.
pub const ENV_JWT_SECRET: &str = "GATEWAY_JWT_SECRET";
/// Environment variable overriding `redis.url`.
pub const ENV_REDIS_URL: &str = "GATEWAY_REDIS_URL";
/// Environment variable overriding `listener.bind_address`.
pub const ENV_BIND_ADDRESS: &str = "GATEWAY_BIND_ADDRESS";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load configuration from an optional TOML file, apply environment
/// overrides, then validate.
pub fn load_config(path: Option<&Path>) -> Result<GatewayConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => GatewayConfig::default(),
    };

    apply_env_overrides(&mut config, |name| std::env::var(name).ok());

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Overlay deploy-time values that should not live in the config file.
pub fn apply_env_overrides<F>(config: &mut GatewayConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let lookup = |name: &str| lookup(name).filter(|value| !value.is_empty());

    if let Some(secret) = lookup(ENV_JWT_SECRET) {
        config.auth.secret = secret;
    }
    if let Some(url) = lookup(ENV_REDIS_URL) {
        config.redis.url = url;
    }
    if let Some(addr) = lookup(ENV_BIND_ADDRESS) {
        config.listener.bind_address = addr;
    }
}
