//! Error types for the Magazzino server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Stable numeric codes carried in every error body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Failure = 1,
    StoreFailure = 3,
    NoSuchTool = 5,
    NotAvailable = 7,
    BadValue = 18,
    NotHeld = 21,
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Insufficient stock for {codice}: requested {requested}, available {available}")]
    InsufficientStock {
        codice: String,
        requested: i64,
        available: i64,
    },

    #[error("Operator {operatore} holds {held} unit(s) of {codice}, cannot return {requested}")]
    NotHeld {
        codice: String,
        operatore: String,
        requested: i64,
        held: i64,
    },

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.to_string())
    }
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub code: u32,
    pub error: String,
    pub message: String,
}

impl AppError {
    /// HTTP status and numeric code for this error
    pub fn classify(&self) -> (StatusCode, ErrorCode) {
        match self {
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, ErrorCode::BadValue),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, ErrorCode::NoSuchTool),
            AppError::InsufficientStock { .. } => (StatusCode::CONFLICT, ErrorCode::NotAvailable),
            AppError::NotHeld { .. } => (StatusCode::CONFLICT, ErrorCode::NotHeld),
            AppError::Io(_) | AppError::Csv(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::StoreFailure)
            }
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::Failure),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.classify();

        let message = match &self {
            AppError::Io(e) => {
                tracing::error!("Store I/O error: {:?}", e);
                "Inventory store error".to_string()
            }
            AppError::Csv(e) => {
                tracing::error!("Store CSV error: {:?}", e);
                "Inventory store error".to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(ErrorResponse {
            code: code as u32,
            error: format!("{:?}", code),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
