//! Test harness lifecycle.
//!
//! A [`ResourceTestHarness`] owns one deployment for the duration of a test:
//!
//! ```text
//! Created ──start──▶ Starting ──▶ Running ──close──▶ Stopping ──▶ Closed
//!                        │
//!                        └──(error)──▶ Failed
//! ```
//!
//! The configuration is registered before the container starts and
//! unregistered after it stopped, whichever way the harness exits. Start
//! failures are returned unmodified and leave nothing registered.
//!
//! # Example
//!
//! ```rust,ignore
//! let mut harness = ResourceTestHarness::start_with(
//!     TestConfiguration::builder()
//!         .add_resource(Arc::new(EchoResource))
//!         .build(),
//! )
//! .await?;
//!
//! let response = harness.client().get("/echo").send().await?;
//! assert_eq!(response.text(), "test");
//!
//! harness.close().await?;
//! ```

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};
use url::Url;

use crate::application::{CONFIGURATION_ID_PARAM, TestResourceApplication};
use crate::client::{ClientConfig, TestClient};
use crate::configuration::{
    ClientCustomizer, ConfigurationId, ConfigurationRegistry, Registration, TestConfiguration,
};
use crate::container::{DeploymentContext, TestContainer};
use crate::error::{TestingError, TestingResult};
use crate::json::JsonMapper;
use crate::validation::Validator;

/// Lifecycle state of a [`ResourceTestHarness`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HarnessState {
    /// Constructed, nothing registered or running.
    Created,
    /// Registration done, container starting.
    Starting,
    /// The deployment serves requests.
    Running,
    /// The container is stopping.
    Stopping,
    /// Stopped and unregistered.
    Closed,
    /// Start failed; nothing is registered.
    Failed,
}

impl fmt::Display for HarnessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HarnessState::Created => "created",
            HarnessState::Starting => "starting",
            HarnessState::Running => "running",
            HarnessState::Stopping => "stopping",
            HarnessState::Closed => "closed",
            HarnessState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Runs one test deployment.
pub struct ResourceTestHarness {
    client: Option<TestClient>,
    container: Option<Box<dyn TestContainer>>,
    registration: Option<Registration<'static>>,
    configuration: Arc<TestConfiguration>,
    state: HarnessState,
}

impl ResourceTestHarness {
    /// Creates a harness for `configuration`. Nothing is started yet.
    pub fn new(configuration: TestConfiguration) -> Self {
        Self {
            client: None,
            container: None,
            registration: None,
            configuration: Arc::new(configuration),
            state: HarnessState::Created,
        }
    }

    /// Creates and starts a harness.
    pub async fn start_with(configuration: TestConfiguration) -> TestingResult<Self> {
        let mut harness = Self::new(configuration);
        harness.start().await?;
        Ok(harness)
    }

    /// Registers the configuration, starts the container and builds the
    /// client. Returns once the deployment accepts requests.
    pub async fn start(&mut self) -> TestingResult<()> {
        if self.state != HarnessState::Created {
            return Err(TestingError::InvalidState {
                operation: "start",
                state: self.state,
            });
        }

        self.state = HarnessState::Starting;
        let registration = ConfigurationRegistry::global().register(Arc::clone(&self.configuration));

        match self.deploy().await {
            Ok((container, client)) => {
                info!(
                    id = %self.configuration.id(),
                    container = self.configuration.container_factory().name(),
                    base_uri = %client.base_uri(),
                    "Test harness running"
                );
                self.container = Some(container);
                self.client = Some(client);
                self.registration = Some(registration);
                self.state = HarnessState::Running;
                Ok(())
            }
            Err(err) => {
                drop(registration);
                self.state = HarnessState::Failed;
                warn!(id = %self.configuration.id(), error = %err, "Test harness failed to start");
                Err(err)
            }
        }
    }

    async fn deploy(&self) -> TestingResult<(Box<dyn TestContainer>, TestClient)> {
        let context = DeploymentContext::for_application::<TestResourceApplication>()
            .init_param(CONFIGURATION_ID_PARAM, self.configuration.id().to_string());

        let mut container = self.configuration.container_factory().create(context)?;
        let connector = container.start().await?;

        let mut client_config = ClientConfig::new();
        client_config.register_json_mapper(Arc::clone(self.configuration.json_mapper()));
        (self.configuration.client_customizer())(&mut client_config);
        debug!(config = ?client_config, "Built test client configuration");

        Ok((container, TestClient::new(connector, client_config)))
    }

    /// The client of the running deployment.
    ///
    /// # Panics
    ///
    /// Panics when the harness is not running.
    pub fn client(&self) -> &TestClient {
        match self.try_client() {
            Ok(client) => client,
            Err(_) => panic!("test client requested from a harness in state {}", self.state),
        }
    }

    /// The client of the running deployment, or [`TestingError::NotRunning`].
    pub fn try_client(&self) -> TestingResult<&TestClient> {
        match (&self.client, self.state) {
            (Some(client), HarnessState::Running) => Ok(client),
            _ => Err(TestingError::NotRunning),
        }
    }

    /// Stops the container, then unregisters the configuration. Deregistration
    /// happens even when stopping fails; the stop error is returned afterwards.
    /// Closing a harness that is not running does nothing.
    pub async fn close(&mut self) -> TestingResult<()> {
        if !matches!(self.state, HarnessState::Running | HarnessState::Stopping) {
            return Ok(());
        }

        self.state = HarnessState::Stopping;
        self.client = None;

        let stopped = match self.container.as_mut() {
            Some(container) => container.stop().await,
            None => Ok(()),
        };
        self.container = None;
        self.registration = None;
        self.state = HarnessState::Closed;

        match &stopped {
            Ok(()) => info!(id = %self.configuration.id(), "Test harness closed"),
            Err(err) => warn!(
                id = %self.configuration.id(),
                error = %err,
                "Test container failed to stop cleanly"
            ),
        }
        stopped
    }

    /// Id of the configuration.
    pub fn id(&self) -> ConfigurationId {
        self.configuration.id()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> HarnessState {
        self.state
    }

    /// The deployed configuration.
    pub fn configuration(&self) -> &Arc<TestConfiguration> {
        &self.configuration
    }

    /// The JSON mapper shared by deployment and client.
    pub fn json_mapper(&self) -> &Arc<dyn JsonMapper> {
        self.configuration.json_mapper()
    }

    /// The deployment's validator.
    pub fn validator(&self) -> &Arc<dyn Validator> {
        self.configuration.validator()
    }

    /// The client customizer.
    pub fn client_customizer(&self) -> &ClientCustomizer {
        self.configuration.client_customizer()
    }

    /// Root URI of the running deployment.
    pub fn base_uri(&self) -> Option<&Url> {
        self.client.as_ref().map(TestClient::base_uri)
    }
}

impl Drop for ResourceTestHarness {
    fn drop(&mut self) {
        if self.state == HarnessState::Running {
            debug!(id = %self.configuration.id(), "Test harness dropped while running");
        }
        self.client = None;
        self.container = None;
        self.registration = None;
    }
}

impl fmt::Debug for ResourceTestHarness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceTestHarness")
            .field("id", &self.configuration.id())
            .field("state", &self.state)
            .field("base_uri", &self.base_uri().map(Url::as_str))
            .finish()
    }
}
