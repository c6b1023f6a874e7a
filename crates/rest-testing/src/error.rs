//! Error types for the resource test harness.
//!
//! Three families of errors exist:
//!
//! - [`TestingError`] - lifecycle failures raised by the harness, the
//!   deployment adapter and the test containers.
//! - [`ClientError`] - failures of the test client while issuing a request.
//! - [`ResourceError`] - request-time failures raised by resources, providers
//!   and extractors inside a deployment.
//!
//! # Request-time Error Mapping
//!
//! A [`ResourceError`] turned into a response first produces the container's
//! *unmapped* response. When the deployment has exception mappers installed,
//! the mapping layer replaces it with a structured JSON
//! [`ErrorMessage`](crate::providers::ErrorMessage):
//!
//! | Error | Unmapped | Default mapper |
//! |-------|----------|----------------|
//! | Validation | 500 | 422 with violations |
//! | MalformedEntity | 500 | 400 |
//! | NotFound | 404 | 404 |
//! | WebApplication | its status | its status |
//! | Internal | 500 | 500 with a logged error id |

use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::configuration::ConfigurationId;
use crate::harness::HarnessState;
use crate::validation::ValidationErrors;

/// Boxed error used for failures coming from arbitrary container
/// implementations.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result alias for harness operations.
pub type TestingResult<T> = Result<T, TestingError>;

/// Lifecycle errors of the harness and its containers.
#[derive(Error, Debug)]
pub enum TestingError {
    /// The deployment adapter could not find its configuration. This means the
    /// container instantiated the application before the harness registered it.
    #[error("no test configuration registered under id {id}")]
    ConfigurationNotFound {
        /// The id passed through the init parameters.
        id: ConfigurationId,
    },

    /// A required init parameter was not supplied to the application.
    #[error("missing init parameter `{name}`")]
    MissingInitParameter {
        /// Name of the parameter.
        name: &'static str,
    },

    /// The configuration id init parameter is not a valid id.
    #[error("invalid configuration id `{value}`")]
    InvalidConfigurationId {
        /// The raw parameter value.
        value: String,
    },

    /// The socket container could not bind its listener.
    #[error("failed to bind test container to {address}: {source}")]
    Bind {
        /// The address that was requested.
        address: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A container implementation failed to start or stop.
    #[error("test container failure: {0}")]
    Container(#[source] BoxError),

    /// The container did not finish its shutdown in time.
    #[error("test container did not shut down within {timeout:?}")]
    ShutdownTimeout {
        /// The configured shutdown timeout.
        timeout: Duration,
    },

    /// An operation was attempted in a state that does not allow it.
    #[error("cannot {operation} a harness in state {state}")]
    InvalidState {
        /// The attempted operation.
        operation: &'static str,
        /// The state the harness was in.
        state: HarnessState,
    },

    /// The client was requested from a harness that is not running.
    #[error("harness is not running")]
    NotRunning,

    /// A test body run by a rule was cancelled before completing.
    #[error("test body was aborted: {0}")]
    TestAborted(#[source] tokio::task::JoinError),
}

impl TestingError {
    /// Wraps an arbitrary error as a container failure.
    pub fn container(err: impl Into<BoxError>) -> Self {
        TestingError::Container(err.into())
    }
}

/// Errors raised by the [`TestClient`](crate::client::TestClient).
#[derive(Error, Debug)]
pub enum ClientError {
    /// The request path could not be resolved against the base URI.
    #[error("invalid request uri `{uri}`: {message}")]
    InvalidUri {
        /// The offending path or URI.
        uri: String,
        /// Why it was rejected.
        message: String,
    },

    /// The request could not be assembled.
    #[error("invalid request: {0}")]
    Http(#[from] http::Error),

    /// The socket transport failed.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The request did not complete within the configured timeout.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// A body could not be written or read as JSON.
    #[error("JSON processing failed: {0}")]
    Json(#[from] serde_json::Error),

    /// The deployment behind an in-memory connector has been stopped.
    #[error("the deployment is no longer running")]
    Disconnected,

    /// The response body could not be collected.
    #[error("failed to read response body: {0}")]
    Body(#[source] axum::Error),
}

/// Request-time failures raised inside a deployment.
#[derive(Error, Debug)]
pub enum ResourceError {
    /// The request entity violated its constraints.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    /// The request entity could not be read.
    #[error("malformed request entity: {message}")]
    MalformedEntity {
        /// Parser message.
        message: String,
    },

    /// No resource matched the request path.
    #[error("no resource found for {path}")]
    NotFound {
        /// The request path.
        path: String,
    },

    /// A failure that carries its own HTTP status.
    #[error("{status}: {message}")]
    WebApplication {
        /// Status to respond with.
        status: StatusCode,
        /// Message for the response body.
        message: String,
    },

    /// Any other failure.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ResourceError {
    /// Creates a failure with an explicit status.
    pub fn with_status(status: StatusCode, message: impl Into<String>) -> Self {
        ResourceError::WebApplication {
            status,
            message: message.into(),
        }
    }

    /// Creates a malformed entity failure.
    pub fn malformed(message: impl Into<String>) -> Self {
        ResourceError::MalformedEntity {
            message: message.into(),
        }
    }

    /// The status the container responds with when no mapper handles the error.
    pub fn unmapped_status(&self) -> StatusCode {
        match self {
            ResourceError::NotFound { .. } => StatusCode::NOT_FOUND,
            ResourceError::WebApplication { status, .. } => *status,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Response extension carrying the error that produced an unmapped response.
#[derive(Debug, Clone)]
pub(crate) struct RaisedFailure(pub(crate) Arc<ResourceError>);

impl IntoResponse for ResourceError {
    fn into_response(self) -> Response {
        let status = self.unmapped_status();
        let body = match &self {
            ResourceError::WebApplication { message, .. } => message.clone(),
            _ => status
                .canonical_reason()
                .unwrap_or("Unknown Error")
                .to_string(),
        };

        let mut response = (status, body).into_response();
        response
            .extensions_mut()
            .insert(RaisedFailure(Arc::new(self)));
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::ConstraintViolation;

    #[test]
    fn test_unmapped_statuses() {
        let validation: ResourceError =
            ValidationErrors::new(vec![ConstraintViolation::new("name", "must not be blank")])
                .into();
        assert_eq!(
            validation.unmapped_status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );

        let not_found = ResourceError::NotFound {
            path: "/missing".to_string(),
        };
        assert_eq!(not_found.unmapped_status(), StatusCode::NOT_FOUND);

        let teapot = ResourceError::with_status(StatusCode::IM_A_TEAPOT, "short and stout");
        assert_eq!(teapot.unmapped_status(), StatusCode::IM_A_TEAPOT);
    }

    #[test]
    fn test_into_response_attaches_failure() {
        let response = ResourceError::malformed("unexpected end of input").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let failure = response
            .extensions()
            .get::<RaisedFailure>()
            .expect("failure extension");
        assert!(matches!(
            failure.0.as_ref(),
            ResourceError::MalformedEntity { .. }
        ));
    }

    #[test]
    fn test_anyhow_converts_to_internal() {
        let err: ResourceError = anyhow::anyhow!("database on fire").into();
        assert!(matches!(err, ResourceError::Internal(_)));
        assert_eq!(err.to_string(), "database on fire");
    }

    #[test]
    fn test_container_error_keeps_message() {
        let err = TestingError::container("port already in use");
        assert_eq!(err.to_string(), "test container failure: port already in use");
    }
}
