//! Tool inventory endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::{CheckoutRequest, CreateTool, LabelEntry, ReturnRequest, ToolQuery, ToolView},
};

/// List tools, optionally filtered
#[utoipa::path(
    get,
    path = "/tools",
    tag = "tools",
    params(ToolQuery),
    responses(
        (status = 200, description = "Matching tools in inventory order", body = Vec<ToolView>)
    )
)]
pub async fn list_tools(
    State(state): State<crate::AppState>,
    Query(query): Query<ToolQuery>,
) -> AppResult<Json<Vec<ToolView>>> {
    let tools = state.services.inventory.list(&query).await?;
    Ok(Json(tools))
}

/// Get a tool by code
#[utoipa::path(
    get,
    path = "/tools/{codice}",
    tag = "tools",
    params(("codice" = String, Path, description = "Tool code")),
    responses(
        (status = 200, description = "Tool details", body = ToolView),
        (status = 404, description = "Tool not found")
    )
)]
pub async fn get_tool(
    State(state): State<crate::AppState>,
    Path(codice): Path<String>,
) -> AppResult<Json<ToolView>> {
    let tool = state.services.inventory.get(&codice).await?;
    Ok(Json(tool))
}

/// Create a tool, or restock the one with the same code
#[utoipa::path(
    post,
    path = "/tools",
    tag = "tools",
    request_body = CreateTool,
    responses(
        (status = 201, description = "Tool created", body = ToolView),
        (status = 200, description = "Existing tool restocked", body = ToolView),
        (status = 400, description = "Invalid code or quantity")
    )
)]
pub async fn create_tool(
    State(state): State<crate::AppState>,
    Json(data): Json<CreateTool>,
) -> AppResult<(StatusCode, Json<ToolView>)> {
    let (tool, created) = state.services.inventory.create_or_restock(data).await?;
    let status = if created { StatusCode::CREATED } else { StatusCode::OK };
    Ok((status, Json(tool)))
}

/// Check out units of a tool (prelievo)
#[utoipa::path(
    post,
    path = "/tools/{codice}/checkout",
    tag = "tools",
    params(("codice" = String, Path, description = "Tool code")),
    request_body = CheckoutRequest,
    responses(
        (status = 200, description = "Units checked out", body = ToolView),
        (status = 400, description = "Missing operator or non-positive quantity"),
        (status = 404, description = "Tool not found"),
        (status = 409, description = "Not enough units available")
    )
)]
pub async fn checkout_tool(
    State(state): State<crate::AppState>,
    Path(codice): Path<String>,
    Json(request): Json<CheckoutRequest>,
) -> AppResult<Json<ToolView>> {
    let tool = state.services.inventory.checkout(&codice, &request).await?;
    Ok(Json(tool))
}

/// Return units of a tool (restituzione)
#[utoipa::path(
    post,
    path = "/tools/{codice}/return",
    tag = "tools",
    params(("codice" = String, Path, description = "Tool code")),
    request_body = ReturnRequest,
    responses(
        (status = 200, description = "Units returned", body = ToolView),
        (status = 400, description = "Missing operator or non-positive quantity"),
        (status = 404, description = "Tool not found"),
        (status = 409, description = "Operator does not hold that many units")
    )
)]
pub async fn return_tool(
    State(state): State<crate::AppState>,
    Path(codice): Path<String>,
    Json(request): Json<ReturnRequest>,
) -> AppResult<Json<ToolView>> {
    let tool = state.services.inventory.return_tool(&codice, &request).await?;
    Ok(Json(tool))
}

/// Delete a tool
#[utoipa::path(
    delete,
    path = "/tools/{codice}",
    tag = "tools",
    params(("codice" = String, Path, description = "Tool code")),
    responses(
        (status = 204, description = "Tool deleted"),
        (status = 404, description = "Tool not found")
    )
)]
pub async fn delete_tool(
    State(state): State<crate::AppState>,
    Path(codice): Path<String>,
) -> AppResult<StatusCode> {
    state.services.inventory.delete(&codice).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Label sheet: every tool with its QR target
#[utoipa::path(
    get,
    path = "/labels",
    tag = "tools",
    responses(
        (status = 200, description = "Label entries", body = Vec<LabelEntry>)
    )
)]
pub async fn list_labels(State(state): State<crate::AppState>) -> AppResult<Json<Vec<LabelEntry>>> {
    let labels = state.services.inventory.labels().await?;
    Ok(Json(labels))
}
