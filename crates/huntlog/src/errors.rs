use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

use crate::{garmin::GarminError, geometry::GeometryError, gpx_processor::TrackDecodeError};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("GPX parsing error: {0}")]
    GpxParsing(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found")]
    NotFound,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal server error")]
    Internal,

    #[error(transparent)]
    Garmin(#[from] GarminError),
}

impl From<TrackDecodeError> for AppError {
    fn from(e: TrackDecodeError) -> Self {
        AppError::GpxParsing(e.to_string())
    }
}

impl From<GeometryError> for AppError {
    fn from(e: GeometryError) -> Self {
        error!("Stored geometry is malformed: {e}");
        AppError::Internal
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        error!("Serialization error: {e}");
        AppError::Internal
    }
}

/// Runs `validator` checks and folds the field messages into one `InvalidInput`.
pub fn validate_request<T: Validate>(req: &T) -> Result<(), AppError> {
    req.validate().map_err(|e| {
        let mut messages = Vec::new();
        collect_messages(&e, &mut messages);
        messages.sort();
        AppError::InvalidInput(messages.join(", "))
    })
}

fn collect_messages(errors: &ValidationErrors, out: &mut Vec<String>) {
    for kind in errors.errors().values() {
        match kind {
            ValidationErrorsKind::Field(errors) => out.extend(
                errors
                    .iter()
                    .filter_map(|e| e.message.as_ref().map(|m| m.to_string())),
            ),
            ValidationErrorsKind::Struct(inner) => collect_messages(inner, out),
            ValidationErrorsKind::List(items) => {
                for inner in items.values() {
                    collect_messages(inner, out);
                }
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::Database(e) => {
                error!("Database error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            AppError::GpxParsing(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::NotFound => (StatusCode::NOT_FOUND, "Not found".to_string()),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
            AppError::Garmin(e) => {
                let status = match e {
                    GarminError::AuthenticationFailed(_) => StatusCode::UNAUTHORIZED,
                    GarminError::ConnectionFailed(_) | GarminError::InvalidResponse(_) => {
                        StatusCode::BAD_GATEWAY
                    }
                };
                tracing::warn!("Garmin request failed: {e}");
                (status, e.to_string())
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}
