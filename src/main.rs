use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info};

use restaurant_sql_admin::api::{create_router, AppState};
use restaurant_sql_admin::config::{Config, StorageBackend};
use restaurant_sql_admin::services::database::NativeDriver;
use restaurant_sql_admin::storage::{MemoryStore, SqliteStore, Store};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;

    // RUST_LOG directives win; otherwise the configured level
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level)),
        )
        .init();

    let store: Arc<dyn Store> = match config.storage.backend {
        StorageBackend::Memory => {
            info!("Using in-memory storage; connections and history are lost on exit");
            Arc::new(MemoryStore::new())
        }
        StorageBackend::Sqlite => {
            info!("Using SQLite storage at {}", config.storage.url);
            let store = SqliteStore::new(&config.storage.url).await.map_err(|e| {
                error!("Failed to initialize storage: {}", e);
                e
            })?;
            Arc::new(store)
        }
    };

    let driver = Arc::new(NativeDriver::new(config.connect_timeout()));

    let addr: SocketAddr = config
        .server_address()
        .parse()
        .with_context(|| format!("Invalid listen address {}", config.server_address()))?;
    let app = create_router(AppState::new(store, driver));

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
