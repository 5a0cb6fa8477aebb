use clap::Parser;
use std::env;
use std::path::PathBuf;
use tracing::info;

use error_common::{log_error, Result, SessionGateError};
use gateway_server::{build_gateway, create_app};
use logger_redacted::{init_tracing, LoggerConfig};

/// SessionGate authentication gateway
#[derive(Parser, Debug)]
#[command(name = "gateway-server")]
#[command(about = "Turns a domain handshake into short-lived signed session credentials")]
struct Args {
    /// Configuration file path
    #[arg(short, long, env = "SESSIONGATE_CONFIG", default_value = "sessiongate.yaml")]
    config: PathBuf,

    /// Server bind address, overrides `listen.host`
    #[arg(long)]
    host: Option<String>,

    /// Server port, overrides `listen.port`
    #[arg(short, long)]
    port: Option<u16>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    setup_tracing(args.verbose)?;

    if let Err(err) = run(args).await {
        log_error("gateway-server", &err).await;
        return Err(err);
    }
    Ok(())
}

async fn run(args: Args) -> Result<()> {
    info!(version = env!("CARGO_PKG_VERSION"), "Starting SessionGate");

    let mut config = config_engine::load(Some(args.config.as_path()))?;
    if let Some(host) = args.host {
        config.listen.host = host;
    }
    if let Some(port) = args.port {
        config.listen.port = port;
    }

    let gateway = build_gateway(&config).map_err(|e| SessionGateError::ConfigError(e.to_string()))?;
    info!(
        own_host = %gateway.own_host(),
        role_flags = gateway.role_set().len(),
        "Gateway configured"
    );

    let app = create_app(gateway);

    let addr = format!("{}:{}", config.listen.host, config.listen.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| SessionGateError::NetworkError(format!("Failed to bind to {addr}: {e}")))?;

    info!(address = %addr, "SessionGate listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| SessionGateError::ServerError(format!("HTTP server error: {e}")))?;

    info!("SessionGate stopped");
    Ok(())
}

fn setup_tracing(verbose: bool) -> Result<()> {
    let level = if verbose { "debug" } else { "info" };
    let default_filter = format!(
        "gateway_server={level},auth_gateway={level},auth_identity={level},config_engine={level},tower_http=info"
    );

    // Readable output in development, JSON everywhere else
    let is_development = env::var("SESSIONGATE_ENV").unwrap_or_else(|_| "development".to_string()) == "development";
    let config = if is_development {
        LoggerConfig::development(default_filter)
    } else {
        LoggerConfig::production(default_filter)
    };

    init_tracing(&config).map_err(|e| SessionGateError::LoggingError(e.to_string()))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
