use dotenvy::dotenv;
use log::{error, info};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use learnserver::config::{AppConfig, BackendKind};
use learnserver::learn::{
    self, spawn_event_consumer, spawn_event_logger, EventQueue, HttpLearnClient, InMemoryBackend,
    LearnBackend, LearnEngine, ProgressStore,
};
use learnserver::shared::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .write_style(env_logger::WriteStyle::Always)
        .init();

    let config = AppConfig::load()?;

    let backend: Arc<dyn LearnBackend> = match config.backend.kind {
        BackendKind::Http => {
            info!("Using LMS collaborator at {}", config.backend.base_url);
            Arc::new(HttpLearnClient::new(
                &config.backend.base_url,
                config.backend.api_token.clone(),
                config.backend.timeout(),
            )?)
        }
        BackendKind::Memory => {
            info!("Using in-memory collaborator");
            Arc::new(InMemoryBackend::new())
        }
    };

    let store = Arc::new(ProgressStore::new(config.events.broadcast_capacity));
    let engine = Arc::new(LearnEngine::with_store(backend, store));

    let logger = spawn_event_logger(engine.subscribe());
    let (events, rx) = EventQueue::channel(config.events.queue_capacity);
    let consumer = spawn_event_consumer(Arc::clone(&engine), rx);

    let bind_address = config.bind_address();
    let state = Arc::new(AppState::new(config, engine, events));

    let app = learn::configure(axum::Router::new())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    info!("learnserver listening on {}", bind_address);

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {}", e);
            }
        })
        .await
    {
        error!("Server error: {}", e);
    }

    consumer.abort();
    logger.abort();
    info!("learnserver stopped");
    Ok(())
}
