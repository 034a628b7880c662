use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use overcastly::auth::LogPinDelivery;
use overcastly::config::{Cli, Config, StorageBackend};
use overcastly::db;
use overcastly::routes;
use overcastly::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Parse CLI args and load config
    let cli = Cli::parse();
    let config = Config::load(&cli)?;

    let pins = Arc::new(LogPinDelivery);
    let state = match config.database.backend {
        StorageBackend::Sqlite => {
            let db_path = config
                .db_path()
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("No database path configured"))?;
            tracing::info!("Database: {}", db_path.display());

            let pool = db::create_pool(&db_path)?;
            db::run_migrations(&pool)?;
            AppState::with_sqlite(config.clone(), pool, pins)
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; data is lost on shutdown");
            AppState::in_memory(config.clone(), pins)
        }
    };

    let app = routes::app(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
