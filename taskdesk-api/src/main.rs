//! taskdesk-api - contacts, tasks and projects REST service
//!
//! Configuration priority: CLI flag, environment variable, TOML file,
//! compiled default.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use taskdesk_api::{build_router, AppState};
use taskdesk_common::config::{
    default_config_path, load_toml_config, ConfigOverrides, Environment, ServerConfig,
};
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for taskdesk-api
#[derive(Parser, Debug)]
#[command(name = "taskdesk-api")]
#[command(about = "Contacts, tasks and projects REST service")]
#[command(version)]
struct Args {
    /// Path to TOML config file
    #[arg(short, long, env = "TASKDESK_CONFIG")]
    config: Option<PathBuf>,

    /// Address to bind
    #[arg(long, env = "TASKDESK_HOST")]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "TASKDESK_PORT")]
    port: Option<u16>,

    /// SQLite database file (created if missing)
    #[arg(short, long, env = "TASKDESK_DATABASE")]
    database: Option<PathBuf>,

    /// development | production
    #[arg(short, long, env = "TASKDESK_ENV")]
    environment: Option<Environment>,

    /// Allowed CORS origin (any origin when unset)
    #[arg(long, env = "TASKDESK_CORS_ORIGIN")]
    cors_origin: Option<String>,

    /// Directory holding a built client bundle to serve
    #[arg(long, env = "TASKDESK_STATIC_DIR")]
    static_dir: Option<PathBuf>,

    /// Log level when RUST_LOG is unset
    #[arg(long, env = "TASKDESK_LOG_LEVEL")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = args.config.clone().or_else(default_config_path);
    let file_config = match &config_path {
        Some(path) => load_toml_config(path).context("Failed to load config file")?,
        None => Default::default(),
    };

    let config = ServerConfig::resolve(
        ConfigOverrides {
            database_path: args.database,
            host: args.host,
            port: args.port,
            environment: args.environment,
            cors_origin: args.cors_origin,
            static_dir: args.static_dir,
            log_level: args.log_level,
        },
        file_config,
    );

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "taskdesk_api={level},taskdesk_common={level},tower_http={level}",
                    level = config.log_level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting taskdesk-api v{} ({})",
        env!("CARGO_PKG_VERSION"),
        config.environment
    );
    match &config_path {
        Some(path) if path.exists() => info!("Config file: {}", path.display()),
        _ => info!("No config file found, using defaults"),
    }
    info!("Database path: {}", config.database_path.display());

    let pool = taskdesk_common::db::init_database(&config.database_path)
        .await
        .context("Failed to initialize database")?;

    let bind_address = config.bind_address();
    let state = AppState::new(pool, config);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_address))?;
    info!("taskdesk-api listening on http://{}", bind_address);
    info!("Health check: http://{}/health", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received SIGTERM, shutting down");
        },
    }
}
