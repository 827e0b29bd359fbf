//! Khata API server binary.
//!
//! Connects and pings the database, runs migrations, seeds the built-in tax
//! models and serves the API until Ctrl-C or SIGTERM.

use clap::Parser;
use khata_api::config::{ApiConfig, apply_database_name};
use khata_core::models::tax::seed_models;
use khata_core::stores::Stores;
use khata_core::tax::store::seed;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

const DEFAULT_LOG_FILTER: &str = "info,khata_api=debug,khata_core=debug";

/// CLI arguments for the API server.
#[derive(Parser, Debug)]
#[command(name = "khata_server", about = "Khata API server")]
struct Args {
    /// Address to listen on. Overrides `BIND_ADDR`.
    #[arg(long, env = "BIND_ADDR")]
    bind_addr: Option<String>,

    /// PostgreSQL connection URL. `DATABASE_NAME` still replaces its path.
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Maximum number of database connections in the pool.
    #[arg(long, env = "DATABASE_MAX_CONNECTIONS", default_value_t = 5)]
    max_connections: u32,

    /// Keep everything in process memory instead of PostgreSQL.
    #[arg(long, default_value_t = false)]
    in_memory: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let args = Args::parse();

    let mut config = ApiConfig::from_env();
    if let Some(bind_addr) = args.bind_addr {
        config.bind_addr = bind_addr;
    }
    if let Some(database_url) = args.database_url {
        config.database_url = apply_database_name(database_url);
    }

    info!(
        version = khata_core::version(),
        bind_addr = %config.bind_addr,
        api_prefix = %config.api_prefix,
        in_memory = args.in_memory,
        "starting khata_server"
    );

    let (stores, pool) = if args.in_memory {
        warn!("in-memory stores: data is lost on exit");
        (Stores::in_memory(), None)
    } else {
        info!(
            max_connections = args.max_connections,
            "configuring connection pool"
        );
        let pool = khata_core::db::connect(&config.database_url, args.max_connections).await?;

        info!("running database migrations");
        khata_api::migrate(&pool).await?;
        (Stores::postgres(pool.clone()), Some(pool))
    };

    seed(stores.tax_models.as_ref(), &seed_models()).await?;

    let bind_addr = config.bind_addr.clone();
    let state = khata_api::AppState::new(config, stores);
    let app = khata_api::router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(addr = %listener.local_addr()?, "REST API listening");

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            wait_for_signal().await;
            info!("shutdown signal received");
            shutdown.cancel();
        }
    });

    let result = axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await;

    if let Some(pool) = pool {
        khata_core::db::close(&pool).await;
    }
    result?;
    info!("khata_server stopped");
    Ok(())
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = term.recv() => {}
            }
        }
        Err(e) => {
            warn!(error = %e, "cannot listen for SIGTERM; waiting for Ctrl-C only");
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
