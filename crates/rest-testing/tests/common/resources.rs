//! Resources and providers deployed by the integration tests.

use std::sync::Arc;

use axum::{
    Router,
    body::{Body, HttpBody},
    extract::{Path, Request},
    http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use helios_rest_testing::{
    DeploymentServices, Provider, Resource, ResourceError, Valid, Validate, ViolationReport,
    validation::{ConstraintViolation, ValidationErrors},
};
use serde::{Deserialize, Serialize};

/// `GET /echo` answers `test`.
pub struct EchoResource;

impl Resource for EchoResource {
    fn routes(self: Arc<Self>) -> Router {
        Router::new().route("/echo", get(|| async { "test" }))
    }
}

/// `GET /headers/{name}` answers the value of a request header.
pub struct HeaderEchoResource;

impl Resource for HeaderEchoResource {
    fn routes(self: Arc<Self>) -> Router {
        Router::new().route("/headers/{name}", get(header_value))
    }
}

async fn header_value(
    Path(name): Path<String>,
    headers: HeaderMap,
) -> Result<String, ResourceError> {
    headers
        .get(name.as_str())
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .ok_or_else(|| ResourceError::with_status(StatusCode::NOT_FOUND, format!("no {} header", name)))
}

/// A validated entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    /// Display name, must not be blank.
    pub name: String,
    /// Age in years, at most 150.
    pub age: u32,
    /// Optional nickname.
    pub nickname: Option<String>,
}

impl Validate for Person {
    fn constraints(&self, report: &mut ViolationReport) {
        report
            .check(!self.name.trim().is_empty(), "name", "must not be blank")
            .check(self.age <= 150, "age", "must be at most 150");
    }
}

/// `POST /people` echoes a valid person, `GET /people/{name}` returns one
/// without nickname, `GET /people/boom` fails internally.
pub struct PeopleResource;

impl Resource for PeopleResource {
    fn routes(self: Arc<Self>) -> Router {
        Router::new()
            .route("/people", post(create_person))
            .route("/people/boom", get(boom))
            .route("/people/{name}", get(read_person))
    }
}

async fn create_person(
    services: DeploymentServices,
    Valid(person): Valid<Person>,
) -> Result<Response, ResourceError> {
    services.json(StatusCode::CREATED, &person)
}

async fn read_person(
    services: DeploymentServices,
    Path(name): Path<String>,
) -> Result<Response, ResourceError> {
    let person = Person {
        name,
        age: 42,
        nickname: None,
    };
    services.json(StatusCode::OK, &person)
}

async fn boom() -> Result<String, ResourceError> {
    Err(anyhow::anyhow!("connection pool exhausted").into())
}

/// `GET /properties/{key}` answers a deployment property as JSON.
pub struct PropertiesResource;

impl Resource for PropertiesResource {
    fn routes(self: Arc<Self>) -> Router {
        Router::new().route("/properties/{key}", get(property))
    }
}

async fn property(
    services: DeploymentServices,
    Path(key): Path<String>,
) -> Result<Response, ResourceError> {
    match services.properties().get(&key) {
        Some(value) => services.json(StatusCode::OK, value),
        None => Err(ResourceError::NotFound {
            path: format!("/properties/{}", key),
        }),
    }
}

/// Rejects write requests without a body with a validation failure.
#[derive(Debug, Default)]
pub struct StrictBodyProvider;

impl Provider for StrictBodyProvider {
    fn configure(self: Arc<Self>, router: Router) -> Router {
        router.layer(middleware::from_fn(require_body))
    }
}

async fn require_body(request: Request, next: Next) -> Response {
    let writes = [Method::POST, Method::PUT, Method::PATCH].contains(request.method());
    let empty = request.body().size_hint().exact() == Some(0);

    if writes && empty {
        return ResourceError::from(ValidationErrors::new(vec![ConstraintViolation::new(
            "body",
            "must not be empty",
        )]))
        .into_response();
    }
    next.run(request).await
}

/// Maps malformed entities to `418` before the default mappers see them.
#[derive(Debug, Default)]
pub struct TeapotMapper;

impl Provider for TeapotMapper {
    fn map_exception(&self, error: &ResourceError) -> Option<Response> {
        matches!(error, ResourceError::MalformedEntity { .. })
            .then(|| (StatusCode::IM_A_TEAPOT, Body::from("short and stout")).into_response())
    }
}

/// `GET /panic` panics inside the handler.
pub struct PanickingResource;

impl Resource for PanickingResource {
    fn routes(self: Arc<Self>) -> Router {
        Router::new().route("/panic", get(panicking))
    }
}

async fn panicking() -> String {
    let names: Vec<String> = Vec::new();
    names[0].clone()
}

/// Stamps every response with `x-provided: stamp`.
#[derive(Debug, Default)]
pub struct StampProvider;

impl StampProvider {
    /// Header added to every response.
    pub const HEADER: HeaderName = HeaderName::from_static("x-provided");
}

impl Provider for StampProvider {
    fn configure(self: Arc<Self>, router: Router) -> Router {
        router.layer(middleware::from_fn(stamp))
    }
}

async fn stamp(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    response
        .headers_mut()
        .insert(StampProvider::HEADER, HeaderValue::from_static("stamp"));
    response
}
