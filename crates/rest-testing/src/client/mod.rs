//! HTTP client bound to a running deployment.
//!
//! The harness builds one [`TestClient`] per deployment from a
//! [`ClientConfig`]: the deployment's JSON mapper is installed first, then the
//! configured client customizer runs, so customizers can add default headers,
//! timeouts or replace the mapper.
//!
//! # Example
//!
//! ```rust,ignore
//! let response = harness.client().get("/echo").send().await?;
//! assert_eq!(response.status(), StatusCode::OK);
//! assert_eq!(response.text(), "test");
//! ```

pub mod connector;
pub mod response;

pub use connector::{Connector, HttpConnector, InMemoryConnector};
pub use response::TestResponse;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use http::{
    HeaderMap, HeaderName, HeaderValue, Method, Request,
    header::{AUTHORIZATION, CONTENT_TYPE},
};
use serde::Serialize;
use url::Url;

use crate::error::ClientError;
use crate::json::{JsonMapper, StandardJsonMapper};

/// Client-side settings applied to every request.
#[derive(Clone)]
pub struct ClientConfig {
    default_headers: HeaderMap,
    timeout: Option<Duration>,
    json_mapper: Arc<dyn JsonMapper>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            default_headers: HeaderMap::new(),
            timeout: None,
            json_mapper: Arc::new(StandardJsonMapper::default()),
        }
    }
}

impl ClientConfig {
    /// Creates an empty configuration with the standard JSON mapper.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a header sent with every request, replacing earlier values.
    pub fn header(&mut self, name: HeaderName, value: HeaderValue) -> &mut Self {
        self.default_headers.insert(name, value);
        self
    }

    /// Sends `Authorization: Bearer <token>` with every request.
    pub fn bearer_auth(&mut self, token: &str) -> Result<&mut Self, ClientError> {
        let value = HeaderValue::from_str(&format!("Bearer {}", token)).map_err(|e| {
            ClientError::Http(http::Error::from(e))
        })?;
        Ok(self.header(AUTHORIZATION, value))
    }

    /// Fails requests that take longer than `timeout`.
    pub fn timeout(&mut self, timeout: Duration) -> &mut Self {
        self.timeout = Some(timeout);
        self
    }

    /// Installs the mapper used to write request bodies and read responses.
    pub fn register_json_mapper(&mut self, json_mapper: Arc<dyn JsonMapper>) -> &mut Self {
        self.json_mapper = json_mapper;
        self
    }

    /// Headers sent with every request.
    pub fn default_headers(&self) -> &HeaderMap {
        &self.default_headers
    }

    /// The request timeout, if any.
    pub fn request_timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// The installed JSON mapper.
    pub fn json_mapper(&self) -> &Arc<dyn JsonMapper> {
        &self.json_mapper
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("default_headers", &self.default_headers)
            .field("timeout", &self.timeout)
            .field("json_mapper", &self.json_mapper)
            .finish()
    }
}

/// Client for one deployment. Cheap to clone.
#[derive(Debug, Clone)]
pub struct TestClient {
    connector: Arc<dyn Connector>,
    config: Arc<ClientConfig>,
}

impl TestClient {
    /// Creates a client sending requests through `connector`.
    pub fn new(connector: Arc<dyn Connector>, config: ClientConfig) -> Self {
        Self {
            connector,
            config: Arc::new(config),
        }
    }

    /// Root URI of the deployment.
    pub fn base_uri(&self) -> &Url {
        self.connector.base_uri()
    }

    /// The client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Resolves a path against the deployment root. Absolute URIs are
    /// rejected.
    pub fn target(&self, path: &str) -> Result<Url, ClientError> {
        if let Ok(absolute) = Url::parse(path) {
            return Err(ClientError::InvalidUri {
                uri: path.to_string(),
                message: format!(
                    "`{}` URI is not relative to the deployment root",
                    absolute.scheme()
                ),
            });
        }
        self.base_uri()
            .join(path.trim_start_matches('/'))
            .map_err(|e| ClientError::InvalidUri {
                uri: path.to_string(),
                message: e.to_string(),
            })
    }

    /// Starts a request with an arbitrary method.
    pub fn request(&self, method: Method, path: &str) -> TestRequestBuilder {
        TestRequestBuilder {
            client: self.clone(),
            method,
            path: path.to_string(),
            headers: HeaderMap::new(),
            body: Ok(Bytes::new()),
        }
    }

    /// Starts a `GET` request.
    pub fn get(&self, path: &str) -> TestRequestBuilder {
        self.request(Method::GET, path)
    }

    /// Starts a `POST` request.
    pub fn post(&self, path: &str) -> TestRequestBuilder {
        self.request(Method::POST, path)
    }

    /// Starts a `PUT` request.
    pub fn put(&self, path: &str) -> TestRequestBuilder {
        self.request(Method::PUT, path)
    }

    /// Starts a `PATCH` request.
    pub fn patch(&self, path: &str) -> TestRequestBuilder {
        self.request(Method::PATCH, path)
    }

    /// Starts a `DELETE` request.
    pub fn delete(&self, path: &str) -> TestRequestBuilder {
        self.request(Method::DELETE, path)
    }

    /// Starts a `HEAD` request.
    pub fn head(&self, path: &str) -> TestRequestBuilder {
        self.request(Method::HEAD, path)
    }
}

/// A request under construction.
#[derive(Debug)]
#[must_use = "requests are only sent by calling `send`"]
pub struct TestRequestBuilder {
    client: TestClient,
    method: Method,
    path: String,
    headers: HeaderMap,
    body: Result<Bytes, ClientError>,
}

impl TestRequestBuilder {
    /// Adds a header, overriding a default header of the same name.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Sets a raw body.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Ok(body.into());
        self
    }

    /// Serializes `value` with the client's JSON mapper and sets the JSON
    /// content type.
    pub fn json<T: Serialize + ?Sized>(mut self, value: &T) -> Self {
        self.body = self
            .client
            .config
            .json_mapper()
            .to_vec(value)
            .map(Bytes::from)
            .map_err(ClientError::from);
        self.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        self
    }

    /// Sends the request and collects the response.
    pub async fn send(self) -> Result<TestResponse, ClientError> {
        let TestRequestBuilder {
            client,
            method,
            path,
            headers,
            body,
        } = self;

        let uri = client.target(&path)?;
        let mut request = Request::builder()
            .method(method)
            .uri(uri.as_str())
            .body(body?)?;

        let request_headers = request.headers_mut();
        for (name, value) in client.config.default_headers() {
            request_headers.insert(name.clone(), value.clone());
        }
        for (name, value) in &headers {
            request_headers.insert(name.clone(), value.clone());
        }

        let response = match client.config.request_timeout() {
            Some(timeout) => tokio::time::timeout(timeout, client.connector.execute(request))
                .await
                .map_err(|_| ClientError::Timeout(timeout))??,
            None => client.connector.execute(request).await?,
        };

        Ok(TestResponse::new(
            response,
            Arc::clone(client.config.json_mapper()),
        ))
    }
}
