//! JSON entity extractors.

use std::ops::Deref;

use axum::{
    body::Bytes,
    extract::{FromRequest, Request},
    http::{StatusCode, header},
};
use serde::de::DeserializeOwned;

use crate::error::ResourceError;
use crate::state::DeploymentServices;
use crate::validation::Validate;

/// Axum extractor for JSON request entities.
///
/// The body is read with the deployment's [`JsonMapper`](crate::json::JsonMapper).
/// Requests without a content type are treated as JSON; any other non-JSON
/// media type is rejected with `415 Unsupported Media Type`. Unreadable bodies
/// raise [`ResourceError::MalformedEntity`].
///
/// # Example
///
/// ```rust,ignore
/// async fn create(Entity(person): Entity<Person>) -> String {
///     person.name
/// }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Entity<T>(pub T);

impl<T> Entity<T> {
    /// Consumes the extractor and returns the entity.
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for Entity<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

fn check_content_type(req: &Request) -> Result<(), ResourceError> {
    let Some(value) = req.headers().get(header::CONTENT_TYPE) else {
        return Ok(());
    };

    let unsupported = || {
        ResourceError::with_status(
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            format!("Unsupported media type: {}", value.to_str().unwrap_or("<binary>")),
        )
    };

    let media_type: mime::Mime = value
        .to_str()
        .ok()
        .and_then(|v| v.parse().ok())
        .ok_or_else(unsupported)?;

    let is_json = media_type.type_() == mime::APPLICATION
        && (media_type.subtype() == mime::JSON || media_type.suffix() == Some(mime::JSON));
    if is_json { Ok(()) } else { Err(unsupported()) }
}

impl<T, S> FromRequest<S> for Entity<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ResourceError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        check_content_type(&req)?;
        let services = DeploymentServices::from_extensions_or_default(req.extensions());

        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| ResourceError::with_status(e.status(), e.body_text()))?;

        services
            .json_mapper()
            .from_slice(&bytes)
            .map(Entity)
            .map_err(|e| ResourceError::malformed(e.to_string()))
    }
}

/// A JSON entity whose constraints held.
///
/// Violations are checked by the deployment's
/// [`Validator`](crate::validation::Validator) and raised as
/// [`ResourceError::Validation`].
#[derive(Debug, Clone, PartialEq)]
pub struct Valid<T>(pub T);

impl<T> Valid<T> {
    /// Consumes the extractor and returns the entity.
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for Valid<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T, S> FromRequest<S> for Valid<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ResourceError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let services = DeploymentServices::from_extensions_or_default(req.extensions());
        let Entity(entity) = Entity::<T>::from_request(req, state).await?;
        services.validator().validate(&entity)?;
        Ok(Valid(entity))
    }
}
