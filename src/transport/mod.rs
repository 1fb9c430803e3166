//! Transport module
//!
//! Binds the forward-auth router to a TCP listener and drives shutdown and
//! reload signals.

pub mod http;

pub use http::{
    DEFAULT_HTTP_PORT, HttpConfig, run_http, run_http_blocking, serve, spawn_reload_on_sighup,
};
