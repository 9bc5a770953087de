//! songflow-server - Host-driven song submission and voting server
//!
//! Serves the participant, admin and presentation pages plus the JSON API
//! for a single active flow.

use anyhow::{Context, Result};
use clap::Parser;
use songflow_common::config::{
    database_path, load_config, resolve_root_folder, DEFAULT_ADMIN_PASSWORD, DEFAULT_BIND,
    DEFAULT_PORT, ROOT_FOLDER_ENV,
};
use songflow_common::db::init_database;
use songflow_server::{build_router, AppState};
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Command-line arguments for songflow-server
#[derive(Parser, Debug)]
#[command(name = "songflow-server")]
#[command(about = "Song submission and voting server")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "SONGFLOW_PORT")]
    port: Option<u16>,

    /// Address to bind
    #[arg(short, long, env = "SONGFLOW_BIND")]
    bind: Option<String>,

    /// Folder holding the database
    #[arg(short, long, env = ROOT_FOLDER_ENV)]
    root_folder: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Admin password
    #[arg(long, env = "SONGFLOW_ADMIN_PASSWORD", hide_env_values = true)]
    admin_password: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "songflow_server=info,songflow_common=info,tower_http=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    info!("Starting SongFlow server v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(args.config.as_deref()).context("Failed to load configuration")?;

    let root_folder = resolve_root_folder(args.root_folder.as_deref(), ROOT_FOLDER_ENV, &config);
    let db_path = database_path(&root_folder);
    info!("Database path: {}", db_path.display());

    let pool = match init_database(&db_path).await {
        Ok(pool) => {
            info!("✓ Database ready");
            pool
        }
        Err(e) => {
            error!("Failed to open database: {}", e);
            return Err(e).context("Failed to initialize database");
        }
    };

    let admin_password = args
        .admin_password
        .or_else(|| config.admin_password.clone())
        .unwrap_or_else(|| {
            warn!("No admin password configured, using the default; set SONGFLOW_ADMIN_PASSWORD");
            DEFAULT_ADMIN_PASSWORD.to_string()
        });

    if config.rate_limits.enabled {
        info!(
            "Rate limits: {} submissions/min, {} reads/min, {} logins/15min per client",
            config.rate_limits.submissions_per_minute,
            config.rate_limits.reads_per_minute,
            config.rate_limits.logins_per_15_minutes
        );
        info!(
            "Submissions slowed after {}/min per client (up to {} ms)",
            config.rate_limits.slow_down_after_per_minute,
            config.rate_limits.slow_down_max_delay_ms
        );
    } else {
        warn!("Rate limiting disabled");
    }

    let state = AppState::new(pool, &admin_password, &config.rate_limits);
    let app = build_router(state);

    let bind = args
        .bind
        .or_else(|| config.bind.clone())
        .unwrap_or_else(|| DEFAULT_BIND.to_string());
    let port = args.port.or(config.port).unwrap_or(DEFAULT_PORT);
    let addr = format!("{}:{}", bind, port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("SongFlow listening on http://{}", addr);
    info!("Admin page: http://{}/admin", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
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
            info!("Received terminate signal, shutting down");
        },
    }
}
