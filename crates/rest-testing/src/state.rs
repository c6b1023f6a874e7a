//! Per-deployment services available to handlers.
//!
//! The deployment adapter installs one [`DeploymentServices`] value as a
//! request extension. Handlers take it as an extractor to reach the
//! configured JSON mapper, validator and properties.

use std::fmt;
use std::sync::Arc;

use axum::{
    extract::FromRequestParts,
    http::{Extensions, StatusCode, header, request::Parts},
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::configuration::{Properties, TestConfiguration};
use crate::error::ResourceError;
use crate::json::{JsonMapper, StandardJsonMapper};
use crate::validation::{StandardValidator, Validator};

/// Shared services of one deployment.
///
/// # Example
///
/// ```rust,ignore
/// async fn limit(services: DeploymentServices) -> String {
///     services.properties().get_as::<u32>("limit").unwrap_or(10).to_string()
/// }
/// ```
#[derive(Clone)]
pub struct DeploymentServices {
    json_mapper: Arc<dyn JsonMapper>,
    validator: Arc<dyn Validator>,
    properties: Arc<Properties>,
}

impl Default for DeploymentServices {
    fn default() -> Self {
        Self {
            json_mapper: Arc::new(StandardJsonMapper::default()),
            validator: Arc::new(StandardValidator::default()),
            properties: Arc::new(Properties::default()),
        }
    }
}

impl DeploymentServices {
    /// Creates the services of a deployment.
    pub fn new(
        json_mapper: Arc<dyn JsonMapper>,
        validator: Arc<dyn Validator>,
        properties: Arc<Properties>,
    ) -> Self {
        Self {
            json_mapper,
            validator,
            properties,
        }
    }

    /// The services described by `configuration`.
    pub fn from_configuration(configuration: &TestConfiguration) -> Self {
        Self::new(
            Arc::clone(configuration.json_mapper()),
            Arc::clone(configuration.validator()),
            Arc::clone(configuration.properties()),
        )
    }

    /// The deployment's JSON mapper.
    pub fn json_mapper(&self) -> &Arc<dyn JsonMapper> {
        &self.json_mapper
    }

    /// The deployment's validator.
    pub fn validator(&self) -> &Arc<dyn Validator> {
        &self.validator
    }

    /// The deployment's properties.
    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    /// Writes `value` with the deployment's JSON mapper as a JSON response.
    pub fn json<T: Serialize + ?Sized>(
        &self,
        status: StatusCode,
        value: &T,
    ) -> Result<Response, ResourceError> {
        let body = self
            .json_mapper
            .to_vec(value)
            .map_err(|e| ResourceError::Internal(e.into()))?;
        Ok((
            status,
            [(header::CONTENT_TYPE, "application/json")],
            body,
        )
            .into_response())
    }

    /// Services of the request, or defaults when none are installed.
    pub(crate) fn from_extensions_or_default(extensions: &Extensions) -> Self {
        extensions
            .get::<DeploymentServices>()
            .cloned()
            .unwrap_or_default()
    }
}

impl fmt::Debug for DeploymentServices {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeploymentServices")
            .field("json_mapper", &self.json_mapper)
            .field("validator", &self.validator)
            .field("properties", &self.properties)
            .finish()
    }
}

impl<S> FromRequestParts<S> for DeploymentServices
where
    S: Send + Sync,
{
    type Rejection = ResourceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<DeploymentServices>()
            .cloned()
            .ok_or_else(|| {
                ResourceError::Internal(anyhow::anyhow!(
                    "deployment services are not installed on this router"
                ))
            })
    }
}
