use sqlx::{postgres::PgPoolOptions, Pool, Postgres};
use std::time::Duration;
use tracing::info;

use crate::config::DatabaseConfig;

#[derive(Clone)]
pub struct Database {
    pub pool: Pool<Postgres>,
}

impl Database {
    pub async fn new(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let pool = Self::options(config).connect(&config.url).await?;
        info!("Connected to PostgreSQL (pool size {})", config.pool_size);
        Ok(Database { pool })
    }

    /// Pool that opens connections on first use. Handlers that never reach
    /// the database can be exercised without a server.
    pub fn lazy(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let pool = Self::options(config).connect_lazy(&config.url)?;
        Ok(Database { pool })
    }

    fn options(config: &DatabaseConfig) -> PgPoolOptions {
        PgPoolOptions::new()
            .max_connections(config.pool_size)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_seconds))
    }

    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        info!("Running database migrations...");
        sqlx::migrate!("./src/migrations")
            .run(&self.pool)
            .await?;
        info!("Migrations completed");
        Ok(())
    }
}
