//! HTTP API
//!
//! - `routes/`: handlers, one file per resource
//! - `dto.rs`: request/response bodies and their mapping onto service inputs
//! - `error.rs`: error responses
//! - `auth.rs`: bearer-token extractor for protected routes

use std::time::Duration;

use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::services::Services;

pub mod auth;
pub mod dto;
pub mod error;
pub mod routes;

#[derive(Clone)]
pub struct AppState {
    pub services: Services,
}

impl AppState {
    pub fn new(services: Services) -> Self {
        Self { services }
    }
}

/// Full router: `/health` plus the API under `/api/v1`, with tracing, CORS
/// and a per-request deadline (408 once exceeded).
pub fn router(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", routes::router())
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(TimeoutLayer::new(request_timeout)),
        )
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({"status": "healthy", "service": "catalog-orders"}))
}
