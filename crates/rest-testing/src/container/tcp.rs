//! Socket-backed test container.
//!
//! Binds a loopback listener (an ephemeral port unless configured otherwise)
//! and serves the deployed router with `axum::serve` on a background task.
//! Stopping sends the graceful shutdown signal and waits for the server task,
//! aborting it when the shutdown timeout elapses.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;

use super::{DeploymentContext, TestContainer, TestContainerFactory};
use crate::client::{Connector, HttpConnector};
use crate::config::HarnessSettings;
use crate::error::{TestingError, TestingResult};

/// Creates [`TcpTestContainer`]s.
#[derive(Debug, Clone)]
pub struct TcpTestContainerFactory {
    host: String,
    port: u16,
    shutdown_timeout: Duration,
}

impl Default for TcpTestContainerFactory {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0,
            shutdown_timeout: Duration::from_secs(5),
        }
    }
}

impl TcpTestContainerFactory {
    /// Creates a factory binding `127.0.0.1` on an ephemeral port.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a factory from harness settings.
    pub fn from_settings(settings: &HarnessSettings) -> Self {
        Self {
            host: settings.host.clone(),
            port: settings.port,
            shutdown_timeout: settings.shutdown_timeout(),
        }
    }

    /// Sets the host to bind.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Sets the port to bind; `0` picks a free port.
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets how long `stop` waits for the server to finish.
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }
}

impl TestContainerFactory for TcpTestContainerFactory {
    fn name(&self) -> &'static str {
        "tcp"
    }

    fn create(&self, context: DeploymentContext) -> TestingResult<Box<dyn TestContainer>> {
        Ok(Box::new(TcpTestContainer {
            context,
            address: format!("{}:{}", self.host, self.port),
            shutdown_timeout: self.shutdown_timeout,
            server: None,
        }))
    }
}

struct RunningServer {
    base_uri: Url,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<std::io::Result<()>>,
}

/// A deployment served over a loopback socket.
pub struct TcpTestContainer {
    context: DeploymentContext,
    address: String,
    shutdown_timeout: Duration,
    server: Option<RunningServer>,
}

#[async_trait]
impl TestContainer for TcpTestContainer {
    async fn start(&mut self) -> TestingResult<Arc<dyn Connector>> {
        let router = self.context.instantiate()?;

        let listener = TcpListener::bind(&self.address)
            .await
            .map_err(|source| TestingError::Bind {
                address: self.address.clone(),
                source,
            })?;
        let local_addr = listener.local_addr().map_err(|source| TestingError::Bind {
            address: self.address.clone(),
            source,
        })?;
        let base_uri =
            Url::parse(&format!("http://{}/", local_addr)).map_err(TestingError::container)?;

        let (shutdown, signal) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    // A dropped sender counts as a shutdown request too.
                    let _ = signal.await;
                })
                .await
        });

        info!(
            application = self.context.application_name(),
            address = %local_addr,
            "TCP test container started"
        );

        let connector: Arc<dyn Connector> = Arc::new(HttpConnector::new(base_uri.clone()));
        self.server = Some(RunningServer {
            base_uri,
            shutdown,
            task,
        });
        Ok(connector)
    }

    async fn stop(&mut self) -> TestingResult<()> {
        let Some(server) = self.server.take() else {
            return Ok(());
        };

        let RunningServer {
            base_uri,
            shutdown,
            mut task,
        } = server;
        let _ = shutdown.send(());

        match tokio::time::timeout(self.shutdown_timeout, &mut task).await {
            Ok(Ok(Ok(()))) => {
                debug!(base_uri = %base_uri, "TCP test container stopped");
                Ok(())
            }
            Ok(Ok(Err(err))) => Err(TestingError::container(err)),
            Ok(Err(join_err)) => Err(TestingError::container(join_err)),
            Err(_) => {
                warn!(
                    base_uri = %base_uri,
                    timeout = ?self.shutdown_timeout,
                    "TCP test container did not stop in time, aborting"
                );
                task.abort();
                Err(TestingError::ShutdownTimeout {
                    timeout: self.shutdown_timeout,
                })
            }
        }
    }
}

impl Drop for TcpTestContainer {
    fn drop(&mut self) {
        if let Some(server) = self.server.take() {
            let _ = server.shutdown.send(());
            server.task.abort();
        }
    }
}
