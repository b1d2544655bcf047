//! API handlers for Magazzino REST endpoints

pub mod health;
pub mod openapi;
pub mod tools;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::AppState;

/// Create the application router with all routes
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // API v1 routes
    let api_v1 = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Tools
        .route("/tools", get(tools::list_tools).post(tools::create_tool))
        .route("/tools/:codice", get(tools::get_tool).delete(tools::delete_tool))
        .route("/tools/:codice/checkout", post(tools::checkout_tool))
        .route("/tools/:codice/return", post(tools::return_tool))
        // Label sheet
        .route("/labels", get(tools::list_labels))
        .with_state(state);

    // OpenAPI documentation
    let openapi = openapi::create_openapi_router();

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi)
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
}
