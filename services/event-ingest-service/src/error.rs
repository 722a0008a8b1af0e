use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::logic::ValidationError;
use crate::models::ErrorResponse;

// Every variant is caller-attributable and maps to a 4xx status.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("request body too large")]
    PayloadTooLarge { limit: usize },
    #[error("failed to read request body")]
    Body(String),
    #[error("invalid JSON body")]
    Decode(#[source] serde_json::Error),
    #[error("request body must contain a single JSON value")]
    TrailingContent(#[source] serde_json::Error),
    #[error("event validation failed")]
    Validation(#[from] ValidationError),
}

impl IngestError {
    pub fn status(&self) -> StatusCode {
        match self {
            IngestError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            IngestError::Body(_)
            | IngestError::Decode(_)
            | IngestError::TrailingContent(_)
            | IngestError::Validation(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Underlying cause, surfaced to the caller as `details`.
    pub fn details(&self) -> String {
        match self {
            IngestError::PayloadTooLarge { limit } => {
                format!("body exceeds the {limit} byte limit")
            }
            IngestError::Body(reason) => reason.clone(),
            IngestError::Decode(err) | IngestError::TrailingContent(err) => err.to_string(),
            IngestError::Validation(err) => err.to_string(),
        }
    }
}

impl IntoResponse for IngestError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: self.to_string(),
            details: self.details(),
        };
        (self.status(), Json(body)).into_response()
    }
}
