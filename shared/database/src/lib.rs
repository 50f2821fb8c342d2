pub mod postgres;
pub mod migrations;
pub mod tables;
pub mod repositories;

pub use postgres::{PostgresPool, create_postgres_pool};
pub use repositories::*;

use anyhow::Result;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub postgres_url: String,
    pub schema: String,
    pub max_connections: u32,
    pub connection_timeout: Duration,
}

/// Connect and make sure the BOM tables exist
pub async fn initialize_database(settings: &DatabaseSettings) -> Result<PostgresPool> {
    let pool = create_postgres_pool(
        &settings.postgres_url,
        settings.max_connections,
        settings.connection_timeout,
    )
    .await?;

    migrations::run_postgres_migrations(&pool, &settings.schema).await?;

    Ok(pool)
}
