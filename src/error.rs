//! Error types for fineract-gate
//!
//! Request evaluation itself never fails: unmatched endpoints are public and
//! unmatched authorizations are denied. Every error here therefore surfaces
//! while loading configuration or running the server.

use crate::access_control::EndpointCategory;
use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Access denied: {0}")]
    AccessDenied(#[from] AccessDeniedError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(String),

    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Missing required configuration: {field}")]
    Missing { field: String },

    #[error("Invalid regex pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("Invalid policy: {0}")]
    Policy(#[from] PolicyError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Rule table defects detected before serving traffic
#[derive(Error, Debug, PartialEq, Eq)]
pub enum PolicyError {
    #[error("unknown category '{label}' in {table}")]
    UnknownCategory { table: &'static str, label: String },

    #[error(
        "category '{0}' is produced by an endpoint rule but has no authorization rule, every request to it would be denied"
    )]
    UnreachableCategory(EndpointCategory),

    #[error("authorization rule #{index} for category '{category}' lists no roles")]
    EmptyRoles {
        index: usize,
        category: EndpointCategory,
    },

    #[error("authorization rule #{index} targets 'public', which is always allowed")]
    PublicAuthorization { index: usize },

    #[error("endpoint pattern '{pattern}' is declared twice (rules #{first} and #{second})")]
    DuplicatePattern {
        pattern: String,
        first: usize,
        second: usize,
    },

    #[error("endpoint rule #{index} '{pattern}' can never match, rule '{shadowed_by}' matches first")]
    ShadowedPattern {
        index: usize,
        pattern: String,
        shadowed_by: String,
    },

    #[error("example '{example}' of rule '{pattern}' is classified by '{matched}' instead")]
    ExampleMismatch {
        example: String,
        pattern: String,
        matched: String,
    },

    #[error("example '{example}' matches both '{pattern}' and '{other}'")]
    OverlappingRules {
        example: String,
        pattern: String,
        other: String,
    },
}

/// Access control errors
#[derive(Error, Debug)]
#[error("Access denied to '{category}' endpoint: {reason}")]
pub struct AccessDeniedError {
    pub category: EndpointCategory,
    pub reason: String,
}

impl AccessDeniedError {
    pub fn new(category: EndpointCategory, reason: impl Into<String>) -> Self {
        Self {
            category,
            reason: reason.into(),
        }
    }
}

/// Transport layer errors
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid bind address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("HTTP server error: {0}")]
    Http(String),
}

/// Result type alias for the application
pub type Result<T> = std::result::Result<T, AppError>;
