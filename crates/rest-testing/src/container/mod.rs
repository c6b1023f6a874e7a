//! Test containers.
//!
//! A container runs one deployment. The harness never builds the deployed
//! [`Router`] itself: it hands the container a [`DeploymentContext`] naming
//! the [`Application`] type and its string init parameters, and the container
//! instantiates the application when it starts.
//!
//! Two containers are provided:
//!
//! - [`InMemoryTestContainerFactory`] - dispatches requests straight into the
//!   router through `tower::Service`, no socket involved. The default.
//! - [`TcpTestContainerFactory`] - binds a loopback listener and serves the
//!   router with `axum::serve`.

pub mod in_memory;
pub mod tcp;

pub use in_memory::InMemoryTestContainerFactory;
pub use tcp::TcpTestContainerFactory;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use tracing::debug;

use crate::application::Application;
use crate::client::Connector;
use crate::error::TestingResult;

/// String init parameters passed to the deployed application.
pub type InitParams = BTreeMap<String, String>;

/// Entry point a container calls to instantiate the deployed application.
pub type ApplicationEntryPoint = fn(&InitParams) -> TestingResult<Router>;

fn instantiate<A: Application>(params: &InitParams) -> TestingResult<Router> {
    A::from_init_params(params).map(A::into_router)
}

/// Describes what a container deploys: an application type and its init
/// parameters.
#[derive(Clone)]
pub struct DeploymentContext {
    application_name: &'static str,
    entry_point: ApplicationEntryPoint,
    init_params: InitParams,
}

impl DeploymentContext {
    /// Creates a context deploying the application type `A`.
    pub fn for_application<A: Application>() -> Self {
        Self {
            application_name: std::any::type_name::<A>(),
            entry_point: instantiate::<A>,
            init_params: InitParams::new(),
        }
    }

    /// Adds an init parameter.
    pub fn init_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.init_params.insert(name.into(), value.into());
        self
    }

    /// Type name of the deployed application.
    pub fn application_name(&self) -> &'static str {
        self.application_name
    }

    /// The init parameters.
    pub fn init_params(&self) -> &InitParams {
        &self.init_params
    }

    /// Instantiates the application and returns its router.
    pub fn instantiate(&self) -> TestingResult<Router> {
        debug!(
            application = self.application_name,
            params = ?self.init_params,
            "Instantiating deployed application"
        );
        (self.entry_point)(&self.init_params)
    }
}

impl fmt::Debug for DeploymentContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeploymentContext")
            .field("application", &self.application_name)
            .field("init_params", &self.init_params)
            .finish_non_exhaustive()
    }
}

/// Creates containers for a deployment.
pub trait TestContainerFactory: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Creates a container for `context`. The container is not started yet.
    fn create(&self, context: DeploymentContext) -> TestingResult<Box<dyn TestContainer>>;
}

/// A running (or runnable) deployment.
///
/// Dropping a container must release everything it holds, even when
/// [`stop`](TestContainer::stop) was never called.
#[async_trait]
pub trait TestContainer: Send + Sync {
    /// Instantiates the application and starts serving it. Returns the
    /// connector the client uses to reach the deployment.
    async fn start(&mut self) -> TestingResult<Arc<dyn Connector>>;

    /// Stops serving. Stopping a container that is not running is a no-op.
    async fn stop(&mut self) -> TestingResult<()>;
}
