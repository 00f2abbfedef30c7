mod api;
pub mod catalog;
pub mod config;
pub mod database;
pub mod memory;
pub mod models;
pub mod query;
pub mod repo;
mod schema;
pub mod views;

use anyhow::{Context, Result};
use axum::{serve::Serve, Router};
use tokio::net::TcpListener;
use tracing::{info, warn};

pub use api::build_app;
pub use config::Config;

use database::{create_db_pool, DatabaseBookRepo};
use memory::MemoryBookRepo;
use repo::BookRepo;

pub async fn start_server(config: Config) -> Result<Serve<TcpListener, Router, Router>> {
    let listener = TcpListener::bind((config.host.as_str(), config.port))
        .await
        .with_context(|| format!("Failed to bind {}:{}", config.host, config.port))?;

    serve(listener, config).await
}

/// Serves the catalog on an already bound listener, backed by PostgreSQL when a database URL is
/// configured and by an in-memory store otherwise.
pub async fn serve(
    listener: TcpListener,
    config: Config,
) -> Result<Serve<TcpListener, Router, Router>> {
    let router = match &config.database_url {
        Some(database_url) => {
            let pool = create_db_pool(database_url.clone())
                .await
                .context("Failed to create DB connection pool")?;
            let repo = DatabaseBookRepo::new(pool);
            log_connection_check(&repo).await;
            build_app(repo, &config)
        }
        None => {
            warn!("DATABASE_URL is not set, books will be kept in memory");
            build_app(MemoryBookRepo::new(), &config)
        }
    };

    let local_addr = listener.local_addr()?;
    info!("Listening on {}", local_addr);

    Ok(axum::serve(listener, router))
}

async fn log_connection_check<R: BookRepo>(repo: &R) {
    match catalog::check_store(repo).await {
        Ok(()) => info!("Database connection established successfully"),
        Err(error) => warn!("Database connection failed: {}", error),
    }
}
