use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::routes;
use super::state::{AppState, SharedState};
use crate::storage::config::ServerConfig;

pub fn app(shared_state: SharedState) -> Router {
    Router::new()
        .nest("/api", routes::router())
        .layer(TraceLayer::new_for_http())
        .with_state(shared_state)
}

// Run the server
pub async fn serve(server: &ServerConfig, state: AppState) -> std::io::Result<()> {
    let app = app(Arc::new(state));

    let listener = tokio::net::TcpListener::bind((server.host.as_str(), server.port)).await?;
    tracing::info!("Server started. Listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await
}
