//! Fineract Gate
//!
//! Role-based endpoint access authorizer for Apache Fineract, deployed behind
//! NGINX `auth_request`.
//!
//! ## Features
//!
//! - **Endpoint classification** of `METHOD:PATH` into twelve access
//!   categories with an ordered, first-match-wins rule table
//! - **Role authorization** with any-of semantics, default deny and an
//!   always-allowed `public` category
//! - **Startup validation** rejecting unknown or unreachable categories and
//!   detectable rule overlaps
//! - **Atomic reload** of the rule tables on SIGHUP
//! - **Flexible configuration** via TOML files and environment variables,
//!   with a bundled Fineract policy
//!
//! ## Decision Model
//!
//! ```text
//! (method, path) → category → (category, roles) → allow / deny
//! ```
//!
//! ## Example Configuration
//!
//! ```toml
//! [server]
//! port = 9180
//! roles_header = "X-Auth-Roles"
//!
//! [roles.aliases]
//! teller = "cashier"
//!
//! [[endpoints]]
//! pattern = "~^GET:/fineract-provider/api/v1/offices(/.*)?$"
//! category = "common-offices"
//!
//! [[authorization]]
//! category = "common-offices"
//! roles = ["admin", "branch-manager"]
//! ```

pub mod access_control;
pub mod config;
pub mod error;
pub mod metrics;
pub mod server;
pub mod transport;

// Re-export main types
pub use access_control::{AccessPolicy, Decision, EndpointCategory, PolicyStore, RoleSet};
pub use config::{AppConfig, load_config};
pub use error::{AppError, Result};
pub use metrics::DecisionMetrics;
pub use server::{GateState, router};
