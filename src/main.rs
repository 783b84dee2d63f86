mod chemicals;
mod common;
mod config;
mod customer_samples;
mod external;
mod references;
mod routes;
mod samples;
mod users;

#[cfg(test)]
mod test_helpers;

use crate::config::Config;
use anyhow::Context;
use migration::{Migrator, MigratorTrait};
use sea_orm::{Database, DatabaseConnection};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Set up tracing/logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration and environment variables to pass to the application
    let config: Config = Config::from_env()?;
    let db_url = config
        .db_url
        .as_deref()
        .context("database URL could not be determined")?;

    let db: DatabaseConnection = Database::connect(db_url)
        .await
        .context("Could not connect to the database")?;
    tracing::info!("Connected to the database");

    Migrator::up(&db, None)
        .await
        .context("Failed to run migrations")?;
    tracing::info!("DB migrations complete");

    users::services::ensure_bootstrap_admin(&db, &config)
        .await
        .context("Failed to create the bootstrap administrator")?;

    let released = samples::services::release_stale_deliveries(&db)
        .await
        .context("Failed to release report delivery claims")?;
    if released > 0 {
        tracing::warn!(released, "Released report deliveries interrupted by a previous shutdown");
    }

    tracing::info!(
        "Starting server {} ({} deployment) ...",
        config.app_name,
        config.deployment.to_uppercase()
    );

    let router = routes::build_router(&db, &config)?;
    let listener = tokio::net::TcpListener::bind(&config.bind_address)
        .await
        .with_context(|| format!("Could not bind {}", config.bind_address))?;
    tracing::info!("Listening on {}", config.bind_address);

    axum::serve(listener, router.into_make_service()).await?;
    Ok(())
}
