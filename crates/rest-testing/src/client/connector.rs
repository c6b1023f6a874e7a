//! Transports used by the test client.

use std::fmt;

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, Bytes},
};
use http::{Request, Response};
use parking_lot::Mutex;
use tower::ServiceExt;
use url::Url;

use crate::error::ClientError;

/// Sends fully-formed requests to a deployment.
#[async_trait]
pub trait Connector: Send + Sync + fmt::Debug {
    /// Root URI of the deployment. Request paths are resolved against it.
    fn base_uri(&self) -> &Url;

    /// Sends a request and collects the whole response.
    async fn execute(&self, request: Request<Bytes>) -> Result<Response<Bytes>, ClientError>;
}

/// Dispatches requests directly into a router.
pub struct InMemoryConnector {
    router: Mutex<Option<Router>>,
    base_uri: Url,
}

impl InMemoryConnector {
    /// Creates a connector serving `router`.
    pub fn new(router: Router, base_uri: Url) -> Self {
        Self {
            router: Mutex::new(Some(router)),
            base_uri,
        }
    }

    /// Drops the router; later requests fail with
    /// [`ClientError::Disconnected`].
    pub fn disconnect(&self) {
        self.router.lock().take();
    }
}

impl fmt::Debug for InMemoryConnector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryConnector")
            .field("base_uri", &self.base_uri.as_str())
            .field("connected", &self.router.lock().is_some())
            .finish()
    }
}

#[async_trait]
impl Connector for InMemoryConnector {
    fn base_uri(&self) -> &Url {
        &self.base_uri
    }

    async fn execute(&self, request: Request<Bytes>) -> Result<Response<Bytes>, ClientError> {
        let router = self
            .router
            .lock()
            .clone()
            .ok_or(ClientError::Disconnected)?;

        let response = match router.oneshot(request.map(Body::from)).await {
            Ok(response) => response,
            Err(never) => match never {},
        };

        let (parts, body) = response.into_parts();
        let bytes = axum::body::to_bytes(body, usize::MAX)
            .await
            .map_err(ClientError::Body)?;
        Ok(Response::from_parts(parts, bytes))
    }
}

/// Sends requests over HTTP with `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpConnector {
    client: reqwest::Client,
    base_uri: Url,
}

impl HttpConnector {
    /// Creates a connector for the server at `base_uri`.
    pub fn new(base_uri: Url) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_uri,
        }
    }
}

#[async_trait]
impl Connector for HttpConnector {
    fn base_uri(&self) -> &Url {
        &self.base_uri
    }

    async fn execute(&self, request: Request<Bytes>) -> Result<Response<Bytes>, ClientError> {
        let (parts, body) = request.into_parts();

        let response = self
            .client
            .request(parts.method, parts.uri.to_string())
            .headers(parts.headers)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.bytes().await?;

        let mut collected = Response::new(bytes);
        *collected.status_mut() = status;
        *collected.headers_mut() = headers;
        Ok(collected)
    }
}
