use std::sync::Arc;

use tokio::net::TcpListener;

use wagerwave_store::{logging, routes, AppState, Config, SharedStorage, SupabaseAuthority};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::load()?;

    logging::init(&config.logging.level);

    tracing::info!("Starting WagerWave session store");

    let storage = SharedStorage::open(&config.storage)?;
    let authority = SupabaseAuthority::new(
        &config.authority.base_url,
        &config.authority.api_key,
        config.authority.timeout(),
    )?;
    if config.authority.api_key.is_empty() {
        tracing::warn!("No authority API key configured; RPC calls will be anonymous");
    }
    tracing::info!("Using authority at {}", config.authority.base_url);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = Arc::new(AppState::new(config, &storage, Arc::new(authority)));
    let app = routes::app(state);

    tracing::info!("Listening on {}", addr);

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
