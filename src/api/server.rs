use std::sync::Arc;

use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;

use crate::api::handlers;
use crate::config::Config;
use crate::pipeline::PipelineCell;
use crate::runner::RunLoop;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<PipelineCell>,
    pub runner: Arc<RunLoop>,
    pub config: Arc<Config>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/analysis", post(handlers::create_analysis))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn serve(state: AppState, port: u16) -> Result<()> {
    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    println!("Murmuration API server listening on port {}", port);

    axum::serve(listener, app).await?;
    Ok(())
}
