//! Handler error responses

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use sitelapse_common::Error;

/// API errors
#[derive(Debug)]
pub enum ApiError {
    /// Requested project id does not match the served project
    UnknownProject(String),
    /// Layer route parameter is not a known asset kind
    UnknownLayer(String),
    /// Malformed query parameter
    BadRequest(String),
    /// Project configuration prevents serving the request
    Config(String),
    /// No progress plan is published for this project
    NoProgressPlan,
    Internal(String),
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        match e {
            Error::Config(msg) => ApiError::Config(msg),
            Error::NotFound(msg) => ApiError::UnknownProject(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::UnknownProject(id) => {
                (StatusCode::NOT_FOUND, format!("Unknown project: {}", id))
            }
            ApiError::UnknownLayer(layer) => {
                (StatusCode::BAD_REQUEST, format!("Invalid layer type: {}", layer))
            }
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Config(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, format!("Configuration error: {}", msg))
            }
            ApiError::NoProgressPlan => (
                StatusCode::NOT_FOUND,
                "Project has no published progress plan".to_string(),
            ),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}
