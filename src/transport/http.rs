//! HTTP transport
//!
//! Serves the forward-auth router over plain HTTP. NGINX reaches it through
//! `auth_request`, so the listener binds exactly the configured address.

use crate::access_control::{AccessPolicy, PolicyStore};
use crate::config::DEFAULT_PORT;
use crate::error::{ConfigError, TransportError};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Default port for the forward-auth listener
pub const DEFAULT_HTTP_PORT: u16 = DEFAULT_PORT;

/// Configuration for the HTTP server
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Address to bind to (e.g., "127.0.0.1:9180")
    pub bind: SocketAddr,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], DEFAULT_HTTP_PORT)),
        }
    }
}

impl HttpConfig {
    pub fn new(bind: SocketAddr) -> Self {
        Self { bind }
    }

    /// Create config from host and port strings
    pub fn from_host_port(host: &str, port: u16) -> Result<Self, TransportError> {
        let address = format!("{}:{}", host, port);
        let bind = address
            .parse()
            .map_err(|e: std::net::AddrParseError| TransportError::InvalidAddress {
                address: address.clone(),
                reason: e.to_string(),
            })?;
        Ok(Self::new(bind))
    }
}

/// Serve `router` on an already bound listener until `ct` is cancelled
pub async fn serve(
    listener: TcpListener,
    router: Router,
    ct: CancellationToken,
) -> Result<(), TransportError> {
    let local = listener.local_addr()?;
    info!("Forward-auth server listening on http://{}", local);
    info!("  Auth endpoint: http://{}/auth", local);

    axum::serve(listener, router)
        .with_graceful_shutdown(ct.cancelled_owned())
        .await?;

    info!("HTTP server stopped");
    Ok(())
}

/// Bind the configured address and serve until `ct` is cancelled
pub async fn run_http(
    router: Router,
    config: HttpConfig,
    ct: CancellationToken,
) -> Result<(), TransportError> {
    let listener = TcpListener::bind(config.bind).await?;
    serve(listener, router, ct).await
}

/// Run the HTTP server and wait for a shutdown signal
///
/// Stops on Ctrl+C, on SIGTERM (unix) or when `ct` is cancelled. The token is
/// cancelled on the way out so sibling tasks stop too.
pub async fn run_http_blocking(
    router: Router,
    config: HttpConfig,
    ct: CancellationToken,
) -> Result<(), TransportError> {
    let signal_ct = ct.clone();
    let signals = tokio::spawn(async move {
        tokio::select! {
            _ = shutdown_signal() => {
                info!("Received shutdown signal");
                signal_ct.cancel();
            }
            _ = signal_ct.cancelled() => {}
        }
    });

    let result = run_http(router, config, ct.clone()).await;
    ct.cancel();
    signals.abort();
    result
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

/// Rebuild the policy with `build` on every SIGHUP until `ct` is cancelled
///
/// A failed rebuild is logged and the serving policy stays in place. On
/// non-unix targets the task only waits for cancellation.
pub fn spawn_reload_on_sighup<F>(
    store: Arc<PolicyStore>,
    build: F,
    ct: CancellationToken,
) -> JoinHandle<()>
where
    F: Fn() -> Result<AccessPolicy, ConfigError> + Send + Sync + 'static,
{
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};

            let mut hangup = match signal(SignalKind::hangup()) {
                Ok(hangup) => hangup,
                Err(e) => {
                    warn!(error = %e, "Failed to listen for SIGHUP, reload disabled");
                    return;
                }
            };

            loop {
                tokio::select! {
                    _ = ct.cancelled() => break,
                    received = hangup.recv() => {
                        if received.is_none() {
                            break;
                        }
                        info!("Received SIGHUP, reloading access policy");
                        // Failure is already logged by the store.
                        let _ = store.reload_from(&build);
                    }
                }
            }
        }

        #[cfg(not(unix))]
        {
            let _ = (&store, &build);
            ct.cancelled().await;
        }
    })
}
