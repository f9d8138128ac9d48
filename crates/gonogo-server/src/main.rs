use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

mod handlers;
mod routes;
mod state;

use gonogo_extraction::HybridExtractionPipeline;
use gonogo_polling::{PollingCoordinator, SupabaseSource};
use state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("gonogo=info".parse()?))
        .init();

    let config = gonogo_core::AppConfig::from_env();
    let host = config.server_host.clone();
    let port = config.server_port;

    let source = Arc::new(SupabaseSource::new(&config)?);
    let coordinator = PollingCoordinator::new(source.clone(), source);
    let extraction = Arc::new(HybridExtractionPipeline::new(&config));
    let body_limit = config.max_upload_bytes;

    let state = AppState {
        config,
        extraction,
        coordinator,
        sessions: Arc::new(RwLock::new(HashMap::new())),
    };

    let app = routes::create_router()
        .with_state(state)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr = format!("{host}:{port}");
    tracing::info!("gonogo server listening on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
