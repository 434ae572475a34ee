// ============================================================================
// Confab Server - entry point
// ============================================================================

use std::sync::Arc;

use anyhow::{Context, Result};
use confab_config::Config;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use confab_server::mqtt::{spawn_event_loop, FanoutPublisher};
use confab_server::{db, routes, shutdown_signal, AppContext};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Config::from_env()?;
    let config = Arc::new(config);

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.rust_log.clone()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("=== Confab Server Starting ===");
    info!("Port: {}", config.port);

    // Initialize database
    info!("Connecting to database...");
    let pool = db::create_pool(&config)
        .await
        .context("Failed to connect to database")?;
    info!("Connected to database");

    // Apply database migrations
    info!("Applying database migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to apply database migrations")?;
    info!("Database migrations applied successfully");

    // Start MQTT fan-out
    let (publisher, event_loop) = FanoutPublisher::connect(&config.mqtt);
    let publisher = Arc::new(publisher);
    if let Some(event_loop) = event_loop {
        spawn_event_loop(event_loop);
    }

    // Wire stores and services
    let ctx = Arc::new(AppContext::new(config.clone(), pool, publisher.clone()));

    let app = routes::create_router(ctx);

    // Start server
    info!("Listening on {}", config.bind_address);

    let listener = tokio::net::TcpListener::bind(&config.bind_address)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Failed to start server")?;

    publisher.disconnect().await;
    info!("Confab Server stopped");

    Ok(())
}
