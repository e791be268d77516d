//! # API Error Handling
//!
//! Shared error type for the HTTP surface, emitted as
//! `application/problem+json`, plus database error helpers used by the
//! repositories and the dispatch pipeline.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::DbErr;
use serde::Serialize;
use serde_json::Value as JsonValue;
use utoipa::ToSchema;

use crate::telemetry::current_trace_id;

/// Error response payload for API consumers
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiError {
    /// HTTP status code
    #[serde(skip)]
    pub status: StatusCode,
    /// Stable machine-readable error code
    pub code: Box<str>,
    /// Human-readable message
    pub message: String,
    /// Optional structured details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<JsonValue>,
    /// Request correlation identifier, when available
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &str, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.into(),
            message: message.into(),
            details: None,
            trace_id: current_trace_id(),
        }
    }

    pub fn with_details(mut self, details: JsonValue) -> Self {
        self.details = Some(details);
        self
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_SERVER_ERROR",
            message,
        )
    }
}

/// Build a 400 validation error with a field pointer in the details.
pub fn validation_error(field: &str, message: impl Into<String>) -> ApiError {
    ApiError::new(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message)
        .with_details(serde_json::json!({ "field": field }))
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status;
        let mut response = (status, Json(self)).into_response();
        response.headers_mut().insert(
            axum::http::header::CONTENT_TYPE,
            axum::http::HeaderValue::from_static("application/problem+json"),
        );
        response
    }
}

/// Returns true when a database error is a unique constraint violation.
///
/// Covers Postgres (SQLSTATE 23505) and SQLite ("UNIQUE constraint failed"),
/// the two backends the service runs against.
pub fn is_unique_violation(err: &DbErr) -> bool {
    let text = err.to_string();
    text.contains("23505")
        || text.contains("duplicate key value")
        || text.contains("UNIQUE constraint failed")
}

/// Map a database error into an opaque 500, logging the original.
pub fn map_db_err(context: &str, err: DbErr) -> ApiError {
    tracing::error!(error = %err, "{context}");
    ApiError::internal(context.to_string())
}
