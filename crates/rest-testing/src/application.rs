//! Deployment adapter.
//!
//! Containers instantiate the deployed application from string init
//! parameters only. [`TestResourceApplication`] bridges that boundary: it
//! reads the configuration id from its init parameters, looks the
//! configuration up in the global [`ConfigurationRegistry`] and assembles the
//! deployed [`Router`] from it.
//!
//! # Router Assembly
//!
//! Layers are applied inside out:
//!
//! 1. Routes of every resource, merged in registration order
//! 2. A fallback raising [`ResourceError::NotFound`]
//! 3. Provider classes (instantiated here), then provider instances
//! 4. [`DeploymentServices`] as a request extension
//! 5. Panic recovery, raising [`ResourceError::Internal`]
//! 6. Exception mapping over all providers, plus the default mappers
//! 7. Request tracing

use std::any::Any;
use std::sync::Arc;

use axum::{
    Extension, Router,
    extract::OriginalUri,
    response::{IntoResponse, Response},
};
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};
use tracing::debug;

use crate::configuration::{ConfigurationId, ConfigurationRegistry, TestConfiguration};
use crate::container::InitParams;
use crate::error::{ResourceError, TestingError, TestingResult};
use crate::providers::{Provider, default_exception_mappers, exception_mappers};
use crate::state::DeploymentServices;

/// Name of the init parameter carrying the configuration id.
pub const CONFIGURATION_ID_PARAM: &str = "configuration.id";

/// An application a container can instantiate from init parameters.
pub trait Application: Sized + Send + 'static {
    /// Constructs the application. This is the only way a container creates
    /// it, so everything it needs must be reachable from `params`.
    fn from_init_params(params: &InitParams) -> TestingResult<Self>;

    /// Assembles the router to serve.
    fn into_router(self) -> Router;
}

/// The application deployed by the test harness.
#[derive(Debug)]
pub struct TestResourceApplication {
    configuration: Arc<TestConfiguration>,
}

impl TestResourceApplication {
    /// The configuration this application was built from.
    pub fn configuration(&self) -> &Arc<TestConfiguration> {
        &self.configuration
    }
}

impl Application for TestResourceApplication {
    fn from_init_params(params: &InitParams) -> TestingResult<Self> {
        let raw = params
            .get(CONFIGURATION_ID_PARAM)
            .ok_or(TestingError::MissingInitParameter {
                name: CONFIGURATION_ID_PARAM,
            })?;
        let id: ConfigurationId =
            raw.parse()
                .map_err(|_| TestingError::InvalidConfigurationId { value: raw.clone() })?;

        let configuration = ConfigurationRegistry::global()
            .get(id)
            .ok_or(TestingError::ConfigurationNotFound { id })?;

        Ok(Self { configuration })
    }

    fn into_router(self) -> Router {
        let configuration = self.configuration;

        let mut router = configuration
            .resources()
            .iter()
            .fold(Router::new(), |router, resource| {
                router.merge(Arc::clone(resource).routes())
            })
            .fallback(not_found);

        let mut providers: Vec<Arc<dyn Provider>> = Vec::new();
        for class in configuration.provider_classes() {
            debug!(provider = class.name(), "Instantiating provider class");
            providers.push(class.instantiate());
        }
        providers.extend(configuration.provider_instances().iter().cloned());

        for provider in &providers {
            router = Arc::clone(provider).configure(router);
        }

        let mut mappers = providers;
        if configuration.register_default_exception_mappers() {
            mappers.extend(default_exception_mappers());
        }

        debug!(
            id = %configuration.id(),
            resources = configuration.resources().len(),
            mappers = mappers.len(),
            "Assembled test deployment"
        );

        let router = router
            .layer(Extension(DeploymentServices::from_configuration(
                &configuration,
            )))
            .layer(CatchPanicLayer::custom(panic_response));
        exception_mappers::install(router, mappers).layer(TraceLayer::new_for_http())
    }
}

async fn not_found(OriginalUri(uri): OriginalUri) -> ResourceError {
    ResourceError::NotFound {
        path: uri.path().to_string(),
    }
}

fn panic_response(payload: Box<dyn Any + Send + 'static>) -> Response {
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string());
    ResourceError::Internal(anyhow::anyhow!("handler panicked: {}", message)).into_response()
}
