// ============================================================================
// Confab Configuration
// Everything comes from the environment, with a .env file honored for local
// development. Missing optional values fall back to defaults; only
// DATABASE_URL is required.
// ============================================================================

mod database;
mod mqtt;

pub use database::DbConfig;
pub use mqtt::MqttConfig;

use anyhow::Context;

#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres connection string. Required.
    pub database_url: String,
    /// Port the HTTP listener binds on.
    pub port: u16,
    /// Full bind address derived from `port`.
    pub bind_address: String,
    /// Log filter handed to tracing-subscriber.
    pub rust_log: String,
    pub db: DbConfig,
    pub mqtt: MqttConfig,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url =
            std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

        let port = std::env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(8080);

        let rust_log = std::env::var("RUST_LOG")
            .unwrap_or_else(|_| "info,confab_server=debug".to_string());

        Ok(Config {
            database_url,
            port,
            bind_address: bind_address(port),
            rust_log,
            db: DbConfig::from_env(),
            mqtt: MqttConfig::from_env(),
        })
    }
}

fn bind_address(port: u16) -> String {
    format!("0.0.0.0:{}", port)
}
