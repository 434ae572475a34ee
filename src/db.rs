use std::time::Duration;

use anyhow::{Context, Result};
use confab_config::Config;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};

pub type DbPool = Pool<Postgres>;

pub async fn create_pool(config: &Config) -> Result<DbPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.db.max_connections)
        .acquire_timeout(Duration::from_secs(config.db.acquire_timeout_secs))
        .idle_timeout(Some(Duration::from_secs(config.db.idle_timeout_secs)))
        .test_before_acquire(true)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to Postgres")?;

    Ok(pool)
}
