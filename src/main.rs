//! Fineract Gate
//!
//! Forward-auth server deciding which Fineract endpoints a caller's roles may
//! reach.

use clap::{Parser, Subcommand};
use fineract_gate::{
    access_control::{AccessDecision, AccessPolicy, PolicyStore},
    config::{AppConfig, LogFormat, load_config},
    metrics::DecisionMetrics,
    server::{GateState, router},
    transport::{HttpConfig, run_http_blocking, spawn_reload_on_sighup},
};
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Fineract Gate - role-based endpoint access for Apache Fineract behind NGINX
#[derive(Parser, Debug)]
#[command(name = "fineract-gate")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, global = true, env = "FINERACT_GATE_CONFIG")]
    config: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "FINERACT_GATE_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log output format
    #[arg(long, global = true, value_enum)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the forward-auth server (default)
    Serve {
        /// Bind host, overrides server.host
        #[arg(long)]
        host: Option<String>,

        /// Bind port, overrides server.port
        #[arg(long)]
        port: Option<u16>,
    },

    /// Evaluate one request against the configured policy
    Check {
        /// Request method (e.g. GET)
        method: String,

        /// Request path, query string allowed
        path: String,

        /// Caller roles, comma separated
        #[arg(long, default_value = "")]
        roles: String,
    },

    /// Load and validate the configuration, then print a policy summary
    Validate,
}

fn init_logging(level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match format {
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr))
            .with(filter)
            .init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(filter)
            .init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Parse CLI arguments
    let args = Args::parse();

    // Configuration decides the log settings, so load it before logging is up
    // and report a failure afterwards.
    let loaded = load_config(args.config.as_deref());

    let (level, format) = match &loaded {
        Ok(config) => (
            args.log_level
                .clone()
                .unwrap_or_else(|| config.logging.level.clone()),
            args.log_format.unwrap_or(config.logging.format),
        ),
        Err(_) => (
            args.log_level.clone().unwrap_or_else(|| "info".to_string()),
            args.log_format.unwrap_or_default(),
        ),
    };
    init_logging(&level, format);

    let config = loaded.inspect_err(|e| error!(error = %e, "Failed to load configuration"))?;

    let policy = AccessPolicy::from_config(&config)
        .inspect_err(|e| error!(error = %e, "Invalid access policy"))?;

    match args.command.unwrap_or(Command::Serve {
        host: None,
        port: None,
    }) {
        Command::Serve { host, port } => {
            serve(config, policy, args.config, host, port).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Check {
            method,
            path,
            roles,
        } => {
            let decision = policy.decide_header(&method, &path, Some(&roles));
            match &decision.access {
                AccessDecision::Allowed => {
                    println!("{} {} -> {}: allowed", method, path, decision.category);
                    Ok(ExitCode::SUCCESS)
                }
                AccessDecision::Denied(reason) => {
                    println!(
                        "{} {} -> {}: denied ({})",
                        method, path, decision.category, reason
                    );
                    Ok(ExitCode::FAILURE)
                }
            }
        }
        Command::Validate => {
            let summary = policy.summary();
            println!("{}", serde_json::to_string_pretty(&summary)?);
            info!(
                endpoint_rules = summary.endpoint_rules,
                authorization_rules = summary.authorization_rules,
                "Configuration is valid"
            );
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn serve(
    config: AppConfig,
    policy: AccessPolicy,
    config_path: Option<String>,
    host: Option<String>,
    port: Option<u16>,
) -> anyhow::Result<()> {
    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting Fineract gate"
    );

    let summary = policy.summary();
    info!(
        endpoint_rules = summary.endpoint_rules,
        authorization_rules = summary.authorization_rules,
        "Loaded access policy"
    );

    let store = Arc::new(PolicyStore::new(policy));
    let metrics = Arc::new(DecisionMetrics::with_capacity(
        config.server.recent_decisions,
    ));
    let state = GateState::new(store.clone(), metrics, &config.server.roles_header)
        .inspect_err(|e| error!(error = %e, "Invalid server configuration"))?;

    let http_config = HttpConfig::from_host_port(
        host.as_deref().unwrap_or(&config.server.host),
        port.unwrap_or(config.server.port),
    )?;

    let ct = CancellationToken::new();

    let reload = spawn_reload_on_sighup(
        store,
        move || load_config(config_path.as_deref()).and_then(|c| AccessPolicy::from_config(&c)),
        ct.clone(),
    );

    let result = run_http_blocking(router(state), http_config, ct).await;
    reload.abort();

    result.inspect_err(|e| error!(error = %e, "HTTP server error"))?;
    Ok(())
}
