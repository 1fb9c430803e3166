//! Forward-auth request handlers
//!
//! Implements the NGINX `auth_request` contract: the original request line
//! arrives in `X-Original-Method` / `X-Original-URI`, the caller's roles in a
//! configurable header, and the answer is an empty 200 or 403.

use crate::access_control::{PolicyStore, SnapshotSummary, normalize_path};
use crate::error::ConfigError;
use crate::metrics::{DecisionMetrics, MetricsSnapshot};
use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, HeaderName, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, get},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{debug, warn};

/// Header carrying the original request method
pub const ORIGINAL_METHOD_HEADER: &str = "x-original-method";

/// Header carrying the original request URI
pub const ORIGINAL_URI_HEADER: &str = "x-original-uri";

/// Response header naming the category a request was classified into
pub const CATEGORY_HEADER: &str = "x-endpoint-category";

/// Shared state for the forward-auth handlers
#[derive(Clone)]
pub struct GateState {
    pub policy: Arc<PolicyStore>,
    pub metrics: Arc<DecisionMetrics>,
    roles_header: HeaderName,
}

impl GateState {
    pub fn new(
        policy: Arc<PolicyStore>,
        metrics: Arc<DecisionMetrics>,
        roles_header: &str,
    ) -> Result<Self, ConfigError> {
        let roles_header =
            HeaderName::from_bytes(roles_header.as_bytes()).map_err(|e| ConfigError::Invalid {
                message: format!("invalid roles header '{}': {}", roles_header, e),
            })?;
        Ok(Self {
            policy,
            metrics,
            roles_header,
        })
    }

    pub fn roles_header(&self) -> &HeaderName {
        &self.roles_header
    }
}

/// Build the forward-auth router
pub fn router(state: GateState) -> Router {
    Router::new()
        .route("/auth", any(forward_auth))
        .route("/healthz", get(healthz))
        .route("/api/metrics", get(api_metrics))
        .route("/api/policy", get(api_policy))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Decide one forwarded request
async fn forward_auth(State(state): State<GateState>, headers: HeaderMap) -> Response {
    let method = header_str(&headers, ORIGINAL_METHOD_HEADER).unwrap_or("GET");

    let Some(uri) = header_str(&headers, ORIGINAL_URI_HEADER) else {
        warn!("Forward-auth request without {}", ORIGINAL_URI_HEADER);
        state.metrics.record_rejected();
        return StatusCode::BAD_REQUEST.into_response();
    };

    let path = match forwarded_path(uri) {
        Ok(path) => path,
        Err(reason) => {
            warn!(uri, reason, "Rejected forwarded URI");
            state.metrics.record_rejected();
            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    let roles = headers
        .get(&state.roles_header)
        .and_then(|v| v.to_str().ok());

    let snapshot = state.policy.load();
    let decision = snapshot.policy.decide_header(method, &path, roles);
    state.metrics.record(method, &path, &decision);

    let status = if decision.is_allowed() {
        StatusCode::OK
    } else {
        debug!(
            method,
            path = %path,
            category = %decision.category,
            generation = snapshot.generation,
            "Denied request"
        );
        StatusCode::FORBIDDEN
    };

    (status, [(CATEGORY_HEADER, decision.category.as_str())]).into_response()
}

async fn healthz() -> &'static str {
    "ok"
}

/// API endpoint for decision metrics
async fn api_metrics(State(state): State<GateState>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}

/// API endpoint describing the serving policy
async fn api_policy(State(state): State<GateState>) -> Json<SnapshotSummary> {
    Json(state.policy.load().summary())
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Canonical path of a forwarded URI
///
/// The query string is cut before percent-decoding, then the decoded path is
/// canonicalized so the classifier sees the path the backend routes on.
/// Decoded `?` and `#` are re-encoded so they stay part of the path.
fn forwarded_path(uri: &str) -> Result<String, &'static str> {
    let raw = uri.split(['?', '#']).next().unwrap_or_default();
    let decoded =
        urlencoding::decode(raw).map_err(|_| "path is not valid percent-encoded UTF-8")?;
    let path = normalize_path(&decoded).ok_or("path climbs above the root")?;
    Ok(path.replace('?', "%3F").replace('#', "%23"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forwarded_path() {
        assert_eq!(
            forwarded_path("/v1/clients?fields=id").as_deref(),
            Ok("/v1/clients")
        );
        assert_eq!(forwarded_path("/v1/a%20b").as_deref(), Ok("/v1/a b"));
        assert_eq!(forwarded_path("/v1/a%3Fb").as_deref(), Ok("/v1/a%3Fb"));
        assert_eq!(forwarded_path("/v1/%2e/users").as_deref(), Ok("/v1/users"));
        assert_eq!(
            forwarded_path("/v1/clients%3F/../users").as_deref(),
            Ok("/v1/users")
        );
        assert!(forwarded_path("/v1/%FF").is_err());
        assert!(forwarded_path("/v1/%2e%2e/%2e%2e/users").is_err());
    }

    #[test]
    fn test_invalid_roles_header_name() {
        let store = Arc::new(PolicyStore::new(
            crate::access_control::AccessPolicy::new(
                Default::default(),
                Default::default(),
                Default::default(),
            )
            .unwrap(),
        ));
        let result = GateState::new(store, Arc::new(DecisionMetrics::new()), "bad header");
        assert!(result.is_err());
    }
}
