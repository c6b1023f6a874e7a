//! # helios-rest-testing - Ephemeral REST Resource Test Harness
//!
//! This crate spins up a short-lived deployment of REST resources inside a
//! test, hands the test an HTTP client bound to it and tears the deployment
//! down again afterwards. Resources are ordinary axum routers; the harness
//! assembles them with providers, exception mappers and shared services the
//! same way a real deployment would.
//!
//! ## Features
//!
//! - **Builder**: collect resources, providers, properties, a JSON mapper and a
//!   validator into an immutable [`TestConfiguration`]
//! - **Two Containers**: in-memory dispatch through `tower::Service`, or a real
//!   loopback socket served by `axum::serve`
//! - **Exception Mapping**: request-time failures become structured JSON error
//!   responses, with user mappers taking precedence over the defaults
//! - **Isolation**: concurrent harnesses never observe each other's
//!   configuration
//! - **Lifecycle Binding**: [`ResourceTestRule`] runs a test body between start
//!   and close, even when the body panics
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use axum::{Router, routing::get};
//! use helios_rest_testing::{Resource, ResourceTestHarness, TestConfiguration};
//!
//! struct EchoResource;
//!
//! impl Resource for EchoResource {
//!     fn routes(self: Arc<Self>) -> Router {
//!         Router::new().route("/echo", get(|| async { "test" }))
//!     }
//! }
//!
//! #[tokio::test]
//! async fn echo() -> anyhow::Result<()> {
//!     let mut harness = ResourceTestHarness::start_with(
//!         TestConfiguration::builder()
//!             .add_resource(Arc::new(EchoResource))
//!             .build(),
//!     )
//!     .await?;
//!
//!     let response = harness.client().get("/echo").send().await?;
//!     assert_eq!(response.text(), "test");
//!
//!     harness.close().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## How a Deployment Is Wired
//!
//! Containers create the deployed application themselves and can only pass it
//! string init parameters. The harness therefore registers its configuration
//! in a process-wide [`ConfigurationRegistry`] under a unique id, passes the id
//! as an init parameter, and [`TestResourceApplication`] looks the
//! configuration up again when the container instantiates it. The entry is
//! removed once the container has stopped.
//!
//! ## Configuration
//!
//! Harness defaults are read from the environment:
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `REST_TESTING_CONTAINER` | in-memory | Default container (`in-memory` or `tcp`) |
//! | `REST_TESTING_HOST` | 127.0.0.1 | Host the TCP container binds |
//! | `REST_TESTING_PORT` | 0 | Port the TCP container binds |
//! | `REST_TESTING_SHUTDOWN_TIMEOUT` | 5 | TCP shutdown timeout (seconds) |
//! | `REST_TESTING_LOG_LEVEL` | info | Level of the log subscriber installed when settings are read |
//!
//! ## Architecture
//!
//! - [`configuration`] - Test configuration, builder and registry
//! - [`application`] - The deployment adapter
//! - [`container`] - In-memory and TCP test containers
//! - [`harness`] - Harness lifecycle
//! - [`rule`] - Lifecycle binding for test bodies
//! - [`client`] - Test client and transports
//! - [`providers`] - Resources, providers and exception mappers
//! - [`extractors`] - Axum extractors for request entities
//! - [`state`] - Per-deployment services
//! - [`json`] - JSON mapping
//! - [`validation`] - Entity validation
//! - [`config`] - Harness settings
//! - [`error`] - Error types

// Enforce documentation
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod application;
pub mod client;
pub mod config;
pub mod configuration;
pub mod container;
pub mod error;
pub mod extractors;
pub mod harness;
pub mod json;
pub mod providers;
pub mod rule;
pub mod state;
pub mod validation;

// Re-export commonly used types
pub use application::{Application, CONFIGURATION_ID_PARAM, TestResourceApplication};
pub use client::{ClientConfig, TestClient, TestResponse};
pub use config::{ContainerKind, HarnessSettings};
pub use configuration::{
    ConfigurationId, ConfigurationRegistry, Properties, TestConfiguration,
    TestConfigurationBuilder,
};
pub use container::{InMemoryTestContainerFactory, TcpTestContainerFactory, TestContainerFactory};
pub use error::{ClientError, ResourceError, TestingError, TestingResult};
pub use extractors::{Entity, Valid};
pub use harness::{HarnessState, ResourceTestHarness};
pub use json::{JsonMapper, StandardJsonMapper};
pub use providers::{ErrorMessage, Provider, Resource};
pub use rule::ResourceTestRule;
pub use state::DeploymentServices;
pub use validation::{Validate, Validator, ViolationReport};

/// Initializes logging for tests.
///
/// `RUST_LOG` takes precedence; otherwise the crate logs at `level` and
/// `tower_http` request traces at debug. Calling this more than once is
/// harmless, so every test may call it. [`HarnessSettings::from_env`] calls it
/// with `REST_TESTING_LOG_LEVEL`; the first call wins.
///
/// # Example
///
/// ```rust
/// helios_rest_testing::init_logging("debug");
/// helios_rest_testing::init_logging("debug");
/// ```
pub fn init_logging(level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("helios_rest_testing={},tower_http=debug", level))
    });

    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_test_writer())
        .with(filter)
        .try_init();
}
