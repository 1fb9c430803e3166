//! Configuration types for fineract-gate
//!
//! This module defines the configuration structure that can be loaded from
//! TOML files and/or environment variables.

use serde::Deserialize;
use std::collections::HashMap;

/// Default port for the forward-auth server
pub const DEFAULT_PORT: u16 = 9180;

/// Default header carrying the caller's roles
pub const DEFAULT_ROLES_HEADER: &str = "X-Auth-Roles";

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Server settings
    pub server: ServerConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Role name handling
    pub roles: RoleConfig,

    /// Ordered endpoint classification rules (first match wins)
    pub endpoints: Vec<EndpointRuleConfig>,

    /// Ordered authorization rules
    pub authorization: Vec<AuthorizationRuleConfig>,
}

impl AppConfig {
    /// Whether the configuration carries its own rule tables
    pub fn has_rules(&self) -> bool {
        !self.endpoints.is_empty() || !self.authorization.is_empty()
    }
}

/// Forward-auth server configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind host
    pub host: String,

    /// Bind port
    pub port: u16,

    /// Request header the authentication layer puts the role list in
    pub roles_header: String,

    /// Number of recent decisions kept for `/api/metrics`
    pub recent_decisions: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            roles_header: DEFAULT_ROLES_HEADER.to_string(),
            recent_decisions: 100,
        }
    }
}

/// Role name handling
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RoleConfig {
    /// Lower-case role names and turn spaces/underscores into `-`
    pub normalize: bool,

    /// Incoming role name → canonical role name
    pub aliases: HashMap<String, String>,
}

impl Default for RoleConfig {
    fn default() -> Self {
        Self {
            normalize: true,
            aliases: HashMap::new(),
        }
    }
}

/// One endpoint classification rule
#[derive(Debug, Clone, Deserialize)]
pub struct EndpointRuleConfig {
    /// Request pattern over `METHOD:PATH`
    pub pattern: String,

    /// Category label assigned on match
    pub category: String,

    /// Request keys this rule must classify, and no other rule may match
    #[serde(default)]
    pub examples: Vec<String>,

    /// Catch-all for what earlier rules leave over; exempt from the overlap
    /// check against earlier rules' examples
    #[serde(default)]
    pub fallback: bool,
}

/// One authorization rule
#[derive(Debug, Clone, Deserialize)]
pub struct AuthorizationRuleConfig {
    /// Category label this rule applies to
    pub category: String,

    /// Roles permitted (any one suffices)
    pub roles: Vec<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Output format (pretty, json)
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable output
    #[default]
    Pretty,
    /// JSON structured output
    Json,
}
