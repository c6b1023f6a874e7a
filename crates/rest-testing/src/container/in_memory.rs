//! In-memory test container.
//!
//! Requests never touch a socket: the connector clones the deployed router
//! and drives it with `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use tracing::{debug, info};
use url::Url;

use super::{DeploymentContext, TestContainer, TestContainerFactory};
use crate::client::{Connector, InMemoryConnector};
use crate::error::{TestingError, TestingResult};

const IN_MEMORY_BASE_URI: &str = "http://localhost/";

/// Creates [`InMemoryTestContainer`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct InMemoryTestContainerFactory;

impl InMemoryTestContainerFactory {
    /// Creates the factory.
    pub fn new() -> Self {
        Self
    }
}

impl TestContainerFactory for InMemoryTestContainerFactory {
    fn name(&self) -> &'static str {
        "in-memory"
    }

    fn create(&self, context: DeploymentContext) -> TestingResult<Box<dyn TestContainer>> {
        Ok(Box::new(InMemoryTestContainer {
            context,
            connector: None,
        }))
    }
}

/// A deployment served without a transport.
pub struct InMemoryTestContainer {
    context: DeploymentContext,
    connector: Option<Arc<InMemoryConnector>>,
}

#[async_trait]
impl TestContainer for InMemoryTestContainer {
    async fn start(&mut self) -> TestingResult<Arc<dyn Connector>> {
        let router: Router = self.context.instantiate()?;
        let base_uri = Url::parse(IN_MEMORY_BASE_URI).map_err(TestingError::container)?;

        let connector = Arc::new(InMemoryConnector::new(router, base_uri));
        self.connector = Some(Arc::clone(&connector));
        let connector: Arc<dyn Connector> = connector;
        info!(
            application = self.context.application_name(),
            "In-memory test container started"
        );
        Ok(connector)
    }

    async fn stop(&mut self) -> TestingResult<()> {
        if let Some(connector) = self.connector.take() {
            connector.disconnect();
            debug!(
                application = self.context.application_name(),
                "In-memory test container stopped"
            );
        }
        Ok(())
    }
}

impl Drop for InMemoryTestContainer {
    fn drop(&mut self) {
        if let Some(connector) = self.connector.take() {
            connector.disconnect();
        }
    }
}
