//! Forward-auth HTTP surface
//!
//! Exposes `/auth` for NGINX `auth_request` plus health, metrics and policy
//! endpoints.

pub mod handler;

pub use handler::{
    CATEGORY_HEADER, GateState, ORIGINAL_METHOD_HEADER, ORIGINAL_URI_HEADER, router,
};
