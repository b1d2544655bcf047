//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{health, tools};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Magazzino API",
        version = "0.1.0",
        description = "Tool inventory ledger: checkout, return and stock of workshop tools"
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Tools
        tools::list_tools,
        tools::get_tool,
        tools::create_tool,
        tools::checkout_tool,
        tools::return_tool,
        tools::delete_tool,
        tools::list_labels,
    ),
    components(
        schemas(
            crate::models::Tool,
            crate::models::ToolView,
            crate::models::ToolStatus,
            crate::models::ToolQuery,
            crate::models::CreateTool,
            crate::models::CheckoutRequest,
            crate::models::ReturnRequest,
            crate::models::LabelEntry,
            crate::models::HistoryEvent,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "tools", description = "Tool inventory, checkout and return")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
