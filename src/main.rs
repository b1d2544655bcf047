//! Magazzino Server - Tool Inventory Ledger
//!
//! REST API over a CSV-backed tool inventory.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use magazzino_server::{
    api, config::AppConfig, repository::Repository, services::Services, AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load().context("Failed to load configuration")?;

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("magazzino_server={},tower_http=debug", config.logging.level).into()
    });

    let json = config.logging.format.eq_ignore_ascii_case("json");
    let (file_writer, _file_guard) = match &config.logging.directory {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "magazzino.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(writer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(|| tracing_subscriber::fmt::layer()))
        .with(file_writer.map(|writer| {
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
        }))
        .init();

    tracing::info!("Starting Magazzino Server v{}", env!("CARGO_PKG_VERSION"));

    // Create repository and services
    let repository = Repository::csv(&config.store.path);
    let services = Services::new(repository, &config.labels);

    match services.inventory.check_store().await {
        Ok(count) => tracing::info!("Inventory {} loaded: {} tool(s)", config.store.path, count),
        Err(e) => tracing::warn!("Inventory {} not readable yet: {}", config.store.path, e),
    }

    let addr = SocketAddr::new(
        config
            .server
            .host
            .parse()
            .context("Invalid host address")?,
        config.server.port,
    );

    // Create application state
    let state = AppState {
        config: Arc::new(config),
        services: Arc::new(services),
    };

    // Build router
    let app = api::create_router(state);

    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
