//! Configuration loader with layered sources
//!
//! Loads configuration from multiple sources with the following precedence
//! (highest to lowest):
//! 1. Environment variables (FINERACT_GATE__*)
//! 2. Configuration file (TOML)
//! 3. Default values
//!
//! A configuration without endpoint or authorization rules gets the bundled
//! Fineract policy.

use crate::access_control::RequestPattern;
use crate::config::types::AppConfig;
use crate::error::ConfigError;
use axum::http::HeaderName;
use config::{Config, Environment, File, FileFormat};
use std::path::Path;
use tracing::debug;

/// Default configuration file paths to check (in order)
const DEFAULT_CONFIG_PATHS: &[&str] = &[
    "fineract-gate.toml",
    ".fineract-gate.toml",
    "~/.config/fineract-gate/config.toml",
    "/etc/fineract-gate/config.toml",
];

/// Rule tables used when the configuration defines none
pub const BUNDLED_POLICY: &str = include_str!("../../policy/fineract-rbac.toml");

/// Load configuration from a TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<AppConfig, ConfigError> {
    let app_config = parse_toml(toml_str)?;
    let app_config = with_bundled_policy(app_config)?;
    validate_config(&app_config)?;
    Ok(app_config)
}

/// The bundled policy on its own, with default server settings
pub fn bundled_policy() -> Result<AppConfig, ConfigError> {
    parse_toml(BUNDLED_POLICY)
}

/// Load configuration from files and environment
pub fn load_config(config_path: Option<&str>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();

    // 1. Start with defaults (handled by serde defaults on AppConfig)

    // 2. Add configuration file
    if let Some(path) = config_path {
        // Explicit path provided - must exist
        if !Path::new(path).exists() {
            return Err(ConfigError::Load(format!(
                "Configuration file not found: {}",
                path
            )));
        }
        builder = builder.add_source(File::new(path, FileFormat::Toml));
    } else {
        // Try default paths (first existing one wins)
        for path in DEFAULT_CONFIG_PATHS {
            let expanded = shellexpand::tilde(path);
            if Path::new(expanded.as_ref()).exists() {
                debug!(path = %expanded, "Using configuration file");
                builder = builder.add_source(File::new(&expanded, FileFormat::Toml));
                break;
            }
        }
    }

    // 3. Add environment variables with FINERACT_GATE__ prefix
    // e.g., FINERACT_GATE__SERVER__PORT, FINERACT_GATE__LOGGING__FORMAT
    // Double underscore (__) maps to nested keys (server.port)
    builder = builder.add_source(
        Environment::with_prefix("FINERACT_GATE")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder
        .build()
        .map_err(|e| ConfigError::Load(e.to_string()))?;

    let app_config: AppConfig = config
        .try_deserialize()
        .map_err(|e| ConfigError::Load(e.to_string()))?;

    let app_config = with_bundled_policy(app_config)?;
    validate_config(&app_config)?;

    Ok(app_config)
}

fn parse_toml(toml_str: &str) -> Result<AppConfig, ConfigError> {
    let config = Config::builder()
        .add_source(File::from_str(toml_str, FileFormat::Toml))
        .build()
        .map_err(|e| ConfigError::Load(e.to_string()))?;

    config
        .try_deserialize()
        .map_err(|e| ConfigError::Load(e.to_string()))
}

fn with_bundled_policy(mut config: AppConfig) -> Result<AppConfig, ConfigError> {
    if config.has_rules() {
        return Ok(config);
    }

    debug!("No rules configured, using bundled Fineract policy");
    let bundled = bundled_policy()?;
    config.endpoints = bundled.endpoints;
    config.authorization = bundled.authorization;
    if config.roles.aliases.is_empty() {
        config.roles.aliases = bundled.roles.aliases;
    }
    Ok(config)
}

/// Validate configuration values
fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    // Validate port
    if config.server.port == 0 {
        return Err(ConfigError::Invalid {
            message: "server.port must be greater than 0".to_string(),
        });
    }

    if config.server.roles_header.is_empty() {
        return Err(ConfigError::Missing {
            field: "server.roles_header".to_string(),
        });
    }

    if HeaderName::from_bytes(config.server.roles_header.as_bytes()).is_err() {
        return Err(ConfigError::Invalid {
            message: format!(
                "server.roles_header is not a valid header name: {}",
                config.server.roles_header
            ),
        });
    }

    // Validate endpoint patterns
    for (index, rule) in config.endpoints.iter().enumerate() {
        if let Err(e) = RequestPattern::new(&rule.pattern) {
            let reason = match e {
                ConfigError::InvalidPattern { reason, .. } => reason,
                other => other.to_string(),
            };
            return Err(ConfigError::InvalidPattern {
                pattern: rule.pattern.clone(),
                reason: format!("in endpoints[{}]: {}", index, reason),
            });
        }
    }

    Ok(())
}
