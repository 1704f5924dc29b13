//! quantrackd - Quantrack volunteer backend daemon.

use clap::{Parser, ValueEnum};
use quantrack_service::config::{ServiceConfig, StorageSettings};
use quantrack_service::{build_router, ServiceState};
use std::net::SocketAddr;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StorageMode {
    Auto,
    Memory,
    Postgres,
}

#[derive(Debug, Parser)]
#[command(name = "quantrackd", version, about = "Quantrack volunteer backend REST service")]
struct Cli {
    /// Configuration file (TOML, YAML or JSON).
    #[arg(short, long, env = "QUANTRACK_CONFIG")]
    config: Option<String>,

    /// REST socket address to bind; overrides the config file.
    #[arg(short, long, env = "QUANTRACK_LISTEN_ADDR")]
    listen: Option<SocketAddr>,

    /// Storage backend. `auto` picks postgres when a database url is given.
    #[arg(long, value_enum, default_value_t = StorageMode::Auto, env = "QUANTRACK_STORAGE")]
    storage: StorageMode,

    /// PostgreSQL url.
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Max PostgreSQL pool connections.
    #[arg(long, default_value_t = 10, env = "QUANTRACK_PG_MAX_CONNECTIONS")]
    pg_max_connections: u32,

    /// Log level used when RUST_LOG is unset; overrides the config file.
    #[arg(long, env = "QUANTRACK_LOG_LEVEL")]
    log_level: Option<String>,

    /// Emit JSON logs.
    #[arg(long, env = "QUANTRACK_LOG_JSON")]
    json: bool,
}

fn resolve_storage(cli: &Cli, configured: &StorageSettings) -> anyhow::Result<StorageSettings> {
    let storage = match cli.storage {
        StorageMode::Memory => StorageSettings::Memory,
        StorageMode::Postgres => {
            let url = cli
                .database_url
                .clone()
                .or_else(|| match configured {
                    StorageSettings::Postgres { url, .. } => Some(url.clone()),
                    StorageSettings::Memory => None,
                })
                .ok_or_else(|| {
                    anyhow::anyhow!("storage=postgres requires --database-url or DATABASE_URL")
                })?;
            StorageSettings::Postgres {
                url,
                max_connections: cli.pg_max_connections,
            }
        }
        StorageMode::Auto => match &cli.database_url {
            Some(url) => StorageSettings::Postgres {
                url: url.clone(),
                max_connections: cli.pg_max_connections,
            },
            None => configured.clone(),
        },
    };
    Ok(storage)
}

fn init_tracing(level: &str, json: bool) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = ServiceConfig::load(cli.config.as_deref())?;
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
    config.logging.json |= cli.json;
    init_tracing(&config.logging.level, config.logging.json);

    if let Some(listen) = cli.listen {
        config.server.listen_addr = listen;
    }
    config.storage = resolve_storage(&cli, &config.storage)?;

    let state = ServiceState::bootstrap(&config).await?;
    info!(
        backend = state.engine.backend_label(),
        "quantrack storage initialized"
    );
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(config.server.listen_addr).await?;
    info!("quantrack-service REST listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("quantrack-service shutting down");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("received terminate signal, initiating graceful shutdown");
        }
    }
}
