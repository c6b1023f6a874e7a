//! Fluent builder for [`TestConfiguration`].

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use super::{ClientCustomizer, ConfigurationId, Properties, TestConfiguration};
use crate::client::ClientConfig;
use crate::config::HarnessSettings;
use crate::container::TestContainerFactory;
use crate::json::{JsonMapper, StandardJsonMapper};
use crate::providers::{Provider, ProviderClass, Resource};
use crate::validation::{StandardValidator, Validator};

/// Accumulates the pieces of a test deployment.
///
/// Unset fields fall back to defaults: a [`StandardJsonMapper`], a
/// [`StandardValidator`], a no-op client customizer, the container factory
/// selected by [`HarnessSettings::from_env`] (in-memory unless overridden) and
/// the default exception mappers enabled. Reading the settings also sets up
/// logging at `REST_TESTING_LOG_LEVEL`.
///
/// [`build`](Self::build) can be called any number of times; each call yields
/// an independent configuration with its own id.
#[derive(Clone)]
pub struct TestConfigurationBuilder {
    resources: Vec<Arc<dyn Resource>>,
    provider_classes: Vec<ProviderClass>,
    provider_instances: Vec<Arc<dyn Provider>>,
    properties: Properties,
    json_mapper: Arc<dyn JsonMapper>,
    validator: Arc<dyn Validator>,
    client_customizer: ClientCustomizer,
    container_factory: Arc<dyn TestContainerFactory>,
    register_default_exception_mappers: bool,
}

impl Default for TestConfigurationBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestConfigurationBuilder {
    /// Creates a builder with default settings.
    pub fn new() -> Self {
        Self {
            resources: Vec::new(),
            provider_classes: Vec::new(),
            provider_instances: Vec::new(),
            properties: Properties::default(),
            json_mapper: Arc::new(StandardJsonMapper::default()),
            validator: Arc::new(StandardValidator::default()),
            client_customizer: Arc::new(|_: &mut ClientConfig| {}),
            container_factory: HarnessSettings::from_env().container_factory(),
            register_default_exception_mappers: true,
        }
    }

    /// Sets the JSON mapper used by the deployment and the client.
    pub fn json_mapper(mut self, json_mapper: Arc<dyn JsonMapper>) -> Self {
        self.json_mapper = json_mapper;
        self
    }

    /// Sets the validator used for request entities.
    pub fn validator(mut self, validator: Arc<dyn Validator>) -> Self {
        self.validator = validator;
        self
    }

    /// Sets a hook that adjusts the client configuration (headers, timeouts)
    /// before the client is built.
    pub fn client_customizer<F>(mut self, customizer: F) -> Self
    where
        F: Fn(&mut ClientConfig) + Send + Sync + 'static,
    {
        self.client_customizer = Arc::new(customizer);
        self
    }

    /// Adds a resource singleton. Adding the same instance twice has no effect.
    pub fn add_resource(mut self, resource: Arc<dyn Resource>) -> Self {
        if !self.resources.iter().any(|r| Arc::ptr_eq(r, &resource)) {
            self.resources.push(resource);
        }
        self
    }

    /// Adds a provider type for the container to instantiate.
    pub fn add_provider_class<P>(mut self) -> Self
    where
        P: Provider + Default,
    {
        let class = ProviderClass::of::<P>();
        if !self.provider_classes.contains(&class) {
            self.provider_classes.push(class);
        }
        self
    }

    /// Adds a provider singleton. Adding the same instance twice has no effect.
    pub fn add_provider(mut self, provider: Arc<dyn Provider>) -> Self {
        if !self
            .provider_instances
            .iter()
            .any(|p| Arc::ptr_eq(p, &provider))
        {
            self.provider_instances.push(provider);
        }
        self
    }

    /// Sets a property, replacing any previous value for `key`.
    pub fn add_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Selects the container the deployment runs in.
    pub fn container_factory(mut self, factory: Arc<dyn TestContainerFactory>) -> Self {
        self.container_factory = factory;
        self
    }

    /// Enables or disables the baseline exception mappers.
    pub fn register_default_exception_mappers(mut self, register: bool) -> Self {
        self.register_default_exception_mappers = register;
        self
    }

    pub(crate) fn current_json_mapper(&self) -> &Arc<dyn JsonMapper> {
        &self.json_mapper
    }

    pub(crate) fn current_validator(&self) -> &Arc<dyn Validator> {
        &self.validator
    }

    pub(crate) fn current_client_customizer(&self) -> &ClientCustomizer {
        &self.client_customizer
    }

    /// Snapshots the builder into a configuration with a fresh id.
    pub fn build(&self) -> TestConfiguration {
        TestConfiguration {
            id: ConfigurationId::generate(),
            resources: self.resources.clone(),
            provider_classes: self.provider_classes.clone(),
            provider_instances: self.provider_instances.clone(),
            properties: Arc::new(self.properties.clone()),
            json_mapper: Arc::clone(&self.json_mapper),
            validator: Arc::clone(&self.validator),
            client_customizer: Arc::clone(&self.client_customizer),
            container_factory: Arc::clone(&self.container_factory),
            register_default_exception_mappers: self.register_default_exception_mappers,
        }
    }
}

impl fmt::Debug for TestConfigurationBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestConfigurationBuilder")
            .field("resources", &self.resources.len())
            .field("provider_classes", &self.provider_classes)
            .field("provider_instances", &self.provider_instances.len())
            .field("properties", &self.properties)
            .field("container_factory", &self.container_factory.name())
            .field(
                "register_default_exception_mappers",
                &self.register_default_exception_mappers,
            )
            .finish_non_exhaustive()
    }
}
