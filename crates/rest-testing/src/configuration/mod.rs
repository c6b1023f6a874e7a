//! Test deployment configuration.
//!
//! A [`TestConfiguration`] captures everything needed to build one test
//! deployment. It is assembled with a [`TestConfigurationBuilder`], is
//! immutable once built and is handed to the container through the
//! [`ConfigurationRegistry`], keyed by its [`ConfigurationId`].
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use helios_rest_testing::TestConfiguration;
//!
//! let configuration = TestConfiguration::builder()
//!     .add_resource(Arc::new(EchoResource))
//!     .add_property("greeting", "hello")
//!     .build();
//! ```

pub mod builder;
pub mod registry;

pub use builder::TestConfigurationBuilder;
pub use registry::{ConfigurationRegistry, Registration};

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use uuid::Uuid;

use crate::client::ClientConfig;
use crate::container::TestContainerFactory;
use crate::json::JsonMapper;
use crate::providers::{Provider, ProviderClass, Resource};
use crate::validation::Validator;

/// Hook applied to the client configuration before the client is built.
pub type ClientCustomizer = Arc<dyn Fn(&mut ClientConfig) + Send + Sync>;

/// Identifier of a built configuration, unique among live configurations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConfigurationId(Uuid);

impl ConfigurationId {
    pub(crate) fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ConfigurationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for ConfigurationId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Free-form properties published to the deployment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Properties(BTreeMap<String, Value>);

impl Properties {
    /// Returns the raw value of a property.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Deserializes a property into `T`. Missing or mistyped properties
    /// yield `None`.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.0
            .get(key)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    /// Returns true if the property is set.
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Number of properties.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if no property is set.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates properties in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub(crate) fn insert(&mut self, key: String, value: Value) {
        self.0.insert(key, value);
    }
}

/// An immutable test deployment configuration.
pub struct TestConfiguration {
    id: ConfigurationId,
    resources: Vec<Arc<dyn Resource>>,
    provider_classes: Vec<ProviderClass>,
    provider_instances: Vec<Arc<dyn Provider>>,
    properties: Arc<Properties>,
    json_mapper: Arc<dyn JsonMapper>,
    validator: Arc<dyn Validator>,
    client_customizer: ClientCustomizer,
    container_factory: Arc<dyn TestContainerFactory>,
    register_default_exception_mappers: bool,
}

impl TestConfiguration {
    /// Starts a new builder with default settings.
    pub fn builder() -> TestConfigurationBuilder {
        TestConfigurationBuilder::new()
    }

    /// The id this configuration is registered under.
    pub fn id(&self) -> ConfigurationId {
        self.id
    }

    /// Resource singletons, in registration order.
    pub fn resources(&self) -> &[Arc<dyn Resource>] {
        &self.resources
    }

    /// Provider types the container instantiates itself.
    pub fn provider_classes(&self) -> &[ProviderClass] {
        &self.provider_classes
    }

    /// Provider singletons, in registration order.
    pub fn provider_instances(&self) -> &[Arc<dyn Provider>] {
        &self.provider_instances
    }

    /// Properties published to the deployment.
    pub fn properties(&self) -> &Arc<Properties> {
        &self.properties
    }

    /// The JSON mapper shared by the deployment and the client.
    pub fn json_mapper(&self) -> &Arc<dyn JsonMapper> {
        &self.json_mapper
    }

    /// The validator used for request entities.
    pub fn validator(&self) -> &Arc<dyn Validator> {
        &self.validator
    }

    /// The client customizer.
    pub fn client_customizer(&self) -> &ClientCustomizer {
        &self.client_customizer
    }

    /// The container factory used to run the deployment.
    pub fn container_factory(&self) -> &Arc<dyn TestContainerFactory> {
        &self.container_factory
    }

    /// Whether the baseline exception mappers are installed.
    pub fn register_default_exception_mappers(&self) -> bool {
        self.register_default_exception_mappers
    }
}

impl fmt::Debug for TestConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestConfiguration")
            .field("id", &self.id)
            .field("resources", &self.resources.len())
            .field("provider_classes", &self.provider_classes)
            .field("provider_instances", &self.provider_instances.len())
            .field("properties", &self.properties)
            .field("json_mapper", &self.json_mapper)
            .field("validator", &self.validator)
            .field("container_factory", &self.container_factory.name())
            .field(
                "register_default_exception_mappers",
                &self.register_default_exception_mappers,
            )
            .finish_non_exhaustive()
    }
}
