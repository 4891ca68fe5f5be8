use std::sync::Arc;

use flagpole::config::{Config, FlagSource};
use flagpole::routes;
use flagpole::state::AppState;
use flagpole::store::{FlagStore, InMemoryFlagStore, PgFlagStore};
use flagpole::telemetry;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    telemetry::init();

    let config = Config::from_env()?;

    let store: Arc<dyn FlagStore> = match &config.flag_source {
        FlagSource::File(path) => {
            let store = InMemoryFlagStore::from_json_file(path).await?;
            tracing::info!(path = %path.display(), flags = store.count().await, "Loaded flags file");
            Arc::new(store)
        }
        FlagSource::Database { url, max_connections } => {
            let store = PgFlagStore::connect(url, *max_connections).await?;
            tracing::info!(max_connections, "Connected to flag database");
            Arc::new(store)
        }
    };

    let app = routes::app(AppState::new(store), &config.cors_origins);

    let listener = tokio::net::TcpListener::bind(config.addr()).await?;
    tracing::info!(addr = %config.addr(), "Flag service listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}
