use axum::{
    extract::{rejection::JsonRejection, FromRequest},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::content::BlockType;

/// Synchronous rejection of an edit. The operation that produced it is a no-op:
/// no partial state change is ever left behind.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("block '{id}' of type {block_type} expects {expected}")]
    ShapeMismatch {
        id: String,
        block_type: BlockType,
        expected: &'static str,
    },

    #[error("block '{id}' of type {block_type} is missing required field '{field}'")]
    MissingField {
        id: String,
        block_type: BlockType,
        field: &'static str,
    },

    #[error("duplicate block id '{0}'")]
    DuplicateId(String),

    #[error("duplicate order value {0}")]
    DuplicateOrder(u32),

    #[error("block '{0}' does not exist")]
    UnknownBlock(String),

    #[error("reorder id set does not match the document blocks (expected {expected}, got {actual})")]
    ReorderMismatch { expected: usize, actual: usize },

    #[error("{field} = {value} is outside [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("{field} must be a #RRGGBB hex colour, got '{value}'")]
    InvalidColor { field: &'static str, value: String },

    #[error("unknown template '{0}'")]
    UnknownTemplate(String),

    #[error("version {0} does not exist")]
    UnknownVersion(u32),

    #[error("{0}")]
    Message(String),
}

/// `Json` whose rejections come back as `AppError` bodies instead of axum's
/// plain-text responses.
#[derive(Debug, FromRequest)]
#[from_request(via(Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A second AI iteration was requested while one is still in flight.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A request body that could not be decoded, including a block whose payload
    /// does not match its declared type.
    #[error("Invalid request body: {0}")]
    InvalidBody(#[from] JsonRejection),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Template engine error: {0}")]
    TemplateEngine(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Cache error: {0}")]
    Cache(#[from] redis::RedisError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(e) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                e.to_string(),
            ),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
            AppError::InvalidBody(rejection) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                rejection.body_text(),
            ),
            AppError::Persistence(msg) => {
                tracing::error!("Persistence error: {msg}");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "PERSISTENCE_ERROR",
                    "Changes could not be saved".to_string(),
                )
            }
            AppError::Generation(msg) => {
                tracing::error!("Generation error: {msg}");
                (
                    StatusCode::BAD_GATEWAY,
                    "GENERATION_ERROR",
                    "The AI generation backend failed".to_string(),
                )
            }
            AppError::TemplateEngine(msg) => {
                tracing::error!("Template engine error: {msg}");
                (
                    StatusCode::BAD_GATEWAY,
                    "TEMPLATE_ENGINE_ERROR",
                    "The document template engine failed".to_string(),
                )
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "A database error occurred".to_string(),
                )
            }
            AppError::Cache(e) => {
                tracing::error!("Cache error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "CACHE_ERROR",
                    "A cache error occurred".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_maps_to_bad_request() {
        let err = AppError::from(ValidationError::UnknownBlock("b-1".to_string()));
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_conflict_maps_to_409() {
        let err = AppError::Conflict("iteration already in flight".to_string());
        assert_eq!(err.into_response().status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_generation_maps_to_bad_gateway() {
        let err = AppError::Generation("timeout".to_string());
        assert_eq!(err.into_response().status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_validation_message_names_block() {
        let err = ValidationError::ShapeMismatch {
            id: "s-3".to_string(),
            block_type: BlockType::List,
            expected: "a sequence of strings",
        };
        let msg = err.to_string();
        assert!(msg.contains("s-3"));
        assert!(msg.contains("list"));
    }
}
