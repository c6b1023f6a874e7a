//! Container factories with injected behavior.

use std::sync::Arc;

use async_trait::async_trait;
use helios_rest_testing::{
    CONFIGURATION_ID_PARAM, ConfigurationId, ConfigurationRegistry, TestingError, TestingResult,
    client::Connector,
    container::{DeploymentContext, TestContainer, TestContainerFactory},
};
use parking_lot::Mutex;

/// What a [`FailingContainerFactory`] observed while starting.
#[derive(Debug, Default)]
pub struct Observed {
    /// The id passed through the init parameters.
    pub id: Option<ConfigurationId>,
    /// Whether the id was registered when the container started.
    pub registered_at_start: bool,
}

/// Creates containers whose start fails after checking the registry.
#[derive(Debug, Clone, Default)]
pub struct FailingContainerFactory {
    observed: Arc<Mutex<Observed>>,
}

impl FailingContainerFactory {
    /// The message of the injected failure.
    pub const MESSAGE: &'static str = "injected start failure";

    /// Creates the factory.
    pub fn new() -> Self {
        Self::default()
    }

    /// What the last container observed.
    pub fn observed(&self) -> Arc<Mutex<Observed>> {
        Arc::clone(&self.observed)
    }
}

impl TestContainerFactory for FailingContainerFactory {
    fn name(&self) -> &'static str {
        "failing"
    }

    fn create(&self, context: DeploymentContext) -> TestingResult<Box<dyn TestContainer>> {
        Ok(Box::new(FailingContainer {
            context,
            observed: Arc::clone(&self.observed),
        }))
    }
}

struct FailingContainer {
    context: DeploymentContext,
    observed: Arc<Mutex<Observed>>,
}

#[async_trait]
impl TestContainer for FailingContainer {
    async fn start(&mut self) -> TestingResult<Arc<dyn Connector>> {
        let id: Option<ConfigurationId> = self
            .context
            .init_params()
            .get(CONFIGURATION_ID_PARAM)
            .and_then(|raw| raw.parse().ok());

        {
            let mut observed = self.observed.lock();
            observed.id = id;
            observed.registered_at_start =
                id.is_some_and(|id| ConfigurationRegistry::global().contains(id));
        }

        Err(TestingError::container(FailingContainerFactory::MESSAGE))
    }

    async fn stop(&mut self) -> TestingResult<()> {
        Ok(())
    }
}

/// Creates containers that start normally but fail to stop.
#[derive(Debug, Clone, Default)]
pub struct UnstoppableContainerFactory;

impl TestContainerFactory for UnstoppableContainerFactory {
    fn name(&self) -> &'static str {
        "unstoppable"
    }

    fn create(&self, context: DeploymentContext) -> TestingResult<Box<dyn TestContainer>> {
        let inner = helios_rest_testing::InMemoryTestContainerFactory::new().create(context)?;
        Ok(Box::new(UnstoppableContainer { inner }))
    }
}

struct UnstoppableContainer {
    inner: Box<dyn TestContainer>,
}

#[async_trait]
impl TestContainer for UnstoppableContainer {
    async fn start(&mut self) -> TestingResult<Arc<dyn Connector>> {
        self.inner.start().await
    }

    async fn stop(&mut self) -> TestingResult<()> {
        self.inner.stop().await?;
        Err(TestingError::container("injected stop failure"))
    }
}
