//! Common test utilities for the harness integration tests.
//!
//! - [`resources`] - Resources and providers deployed by the tests
//! - [`containers`] - Container factories with injected behavior

#![allow(dead_code)]

pub mod containers;
pub mod resources;

use std::sync::Arc;

use helios_rest_testing::{InMemoryTestContainerFactory, TestConfigurationBuilder};

/// A builder with the echo resource on the in-memory container.
pub fn echo_builder() -> TestConfigurationBuilder {
    helios_rest_testing::init_logging("debug");
    TestConfigurationBuilder::new()
        .add_resource(Arc::new(resources::EchoResource))
        .container_factory(Arc::new(InMemoryTestContainerFactory::new()))
}
