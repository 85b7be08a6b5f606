use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

mod analytics;
mod api;
mod auth;
mod config;
mod db;

use api::AppState;
use auth::Pbkdf2Hasher;
use config::Config;
use db::{Database, DatasetAccessor, MemoryDataset};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise tracing / logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();
    config.validate()?;

    // Accounts always live in SQLite, even when views read a snapshot.
    let db = Database::open(&config.database_path)
        .with_context(|| format!("opening database {}", config.database_path))?;
    info!("Database opened: {}", config.database_path);

    let dataset: Arc<dyn DatasetAccessor> = match &config.snapshot_path {
        Some(path) => {
            let snapshot = MemoryDataset::load(path)?;
            info!(
                "Loaded snapshot {} ({} players, {} weekly rows, {} games, {} injuries)",
                path.display(),
                snapshot.players.len(),
                snapshot.weekly_stats.len(),
                snapshot.weather.len(),
                snapshot.injuries.len()
            );
            Arc::new(snapshot)
        }
        None => Arc::new(db.clone()),
    };
    info!(
        "Serving views from {} (default window ±{} weeks)",
        dataset.name(),
        config.default_window_half_width
    );

    let state = AppState {
        dataset,
        db,
        hasher: Pbkdf2Hasher::new(config.password_hash_iterations),
        default_window: config.default_window_half_width,
    };
    let app = api::router(state);
    let addr: SocketAddr = config.listen_addr.parse()?;
    info!("Listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app).await?;

    Ok(())
}
