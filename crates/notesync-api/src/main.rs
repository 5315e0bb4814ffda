mod auth;
mod config;
mod error;
mod rate_limit;
mod routes;

use config::AppConfig;
use notesync_core::db::{Database, LibSqlNoteStore};
use routes::{app_router, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Only load .env in development; production uses platform-native env injection.
    #[cfg(debug_assertions)]
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "notesync_api=info,notesync_core=info".into()),
        )
        .init();

    let config = AppConfig::from_env()?;
    tracing::info!("Starting notesync-api with config: {:?}", config);

    let database = Database::connect(&config.store_config()).await?;
    tracing::info!(
        replicated = database.is_replicated(),
        "Opened note store at {}",
        config.db_path.display()
    );

    let state = AppState::from_config(&config, LibSqlNoteStore::new(database));
    let router = app_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("notesync-api listening on {}", config.bind_addr);
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("notesync-api stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(%error, "Failed to listen for shutdown signal");
    }
}
