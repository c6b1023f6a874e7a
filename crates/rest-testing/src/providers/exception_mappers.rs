//! Exception mapping.
//!
//! Handlers, extractors and provider layers fail by returning a
//! [`ResourceError`]. Its response carries the error as an extension; the
//! mapping layer installed around the deployment offers the error to every
//! registered provider in order and replaces the response with the first
//! mapped one. Unclaimed errors keep the container's unmapped response.
//!
//! # Default Mappers
//!
//! | Mapper | Handles | HTTP Status |
//! |--------|---------|-------------|
//! | [`ValidationExceptionMapper`] | Validation | 422 |
//! | [`JsonProcessingExceptionMapper`] | MalformedEntity | 400 |
//! | [`LoggingExceptionMapper`] | NotFound, WebApplication | own status |
//! | [`LoggingExceptionMapper`] | Internal | 500 |

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};
use uuid::Uuid;

use super::Provider;
use crate::error::{RaisedFailure, ResourceError};

/// Structured error body produced by the default mappers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorMessage {
    /// HTTP status code.
    pub code: u16,
    /// Human-readable message.
    pub message: String,
    /// Individual problems, e.g. constraint violations.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    /// Additional detail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorMessage {
    /// Creates a message for `status`.
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            code: status.as_u16(),
            message: message.into(),
            errors: Vec::new(),
            details: None,
        }
    }

    /// Attaches individual problems.
    pub fn with_errors(mut self, errors: Vec<String>) -> Self {
        self.errors = errors;
        self
    }

    /// Attaches detail text.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

impl IntoResponse for ErrorMessage {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

/// Maps constraint violations to `422 Unprocessable Entity`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidationExceptionMapper;

impl Provider for ValidationExceptionMapper {
    fn map_exception(&self, error: &ResourceError) -> Option<Response> {
        let ResourceError::Validation(errors) = error else {
            return None;
        };
        Some(
            ErrorMessage::new(
                StatusCode::UNPROCESSABLE_ENTITY,
                "The request entity failed validation",
            )
            .with_errors(errors.messages())
            .into_response(),
        )
    }
}

/// Maps unreadable request entities to `400 Bad Request`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonProcessingExceptionMapper;

impl Provider for JsonProcessingExceptionMapper {
    fn map_exception(&self, error: &ResourceError) -> Option<Response> {
        let ResourceError::MalformedEntity { message } = error else {
            return None;
        };
        debug!(error = %message, "Unable to process request entity");
        Some(
            ErrorMessage::new(StatusCode::BAD_REQUEST, "Unable to process JSON")
                .with_details(message.clone())
                .into_response(),
        )
    }
}

/// Catch-all mapper. Errors that carry a status keep it; anything else is
/// logged with a generated id and reported as `500` quoting that id.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingExceptionMapper;

impl Provider for LoggingExceptionMapper {
    fn map_exception(&self, error: &ResourceError) -> Option<Response> {
        let response = match error {
            ResourceError::NotFound { path } => {
                ErrorMessage::new(StatusCode::NOT_FOUND, format!("HTTP 404 Not Found: {}", path))
            }
            ResourceError::WebApplication { status, message } => {
                ErrorMessage::new(*status, message.clone())
            }
            other => {
                let error_id = Uuid::new_v4().simple().to_string();
                error!(error_id = %error_id, error = %other, "Error handling a request");
                ErrorMessage::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!(
                        "There was an error processing your request. It has been logged (ID {}).",
                        error_id
                    ),
                )
            }
        };
        Some(response.into_response())
    }
}

/// The baseline mappers, most specific first.
pub fn default_exception_mappers() -> Vec<Arc<dyn Provider>> {
    vec![
        Arc::new(ValidationExceptionMapper),
        Arc::new(JsonProcessingExceptionMapper),
        Arc::new(LoggingExceptionMapper),
    ]
}

#[derive(Clone)]
struct ExceptionMappers(Arc<[Arc<dyn Provider>]>);

/// Wraps `router` with the mapping layer over `mappers`.
pub(crate) fn install(router: Router, mappers: Vec<Arc<dyn Provider>>) -> Router {
    let mappers = ExceptionMappers(mappers.into());
    router.layer(middleware::from_fn_with_state(mappers, map_raised_failure))
}

async fn map_raised_failure(
    State(mappers): State<ExceptionMappers>,
    request: Request,
    next: Next,
) -> Response {
    let response = next.run(request).await;
    let Some(RaisedFailure(failure)) = response.extensions().get::<RaisedFailure>().cloned()
    else {
        return response;
    };

    mappers
        .0
        .iter()
        .find_map(|mapper| mapper.map_exception(&failure))
        .unwrap_or(response)
}
