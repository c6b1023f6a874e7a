//! Process-wide configuration registry.
//!
//! The container instantiates the deployed application itself and can only
//! pass it string init parameters. The harness therefore registers its
//! configuration here before the container starts, and the application looks
//! it up again by id.
//!
//! Entries are bracketed by a [`Registration`] guard: the entry exists exactly
//! as long as the guard does, whichever way the owning harness exits.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use parking_lot::RwLock;
use tracing::{debug, warn};

use super::{ConfigurationId, TestConfiguration};

static GLOBAL_REGISTRY: LazyLock<ConfigurationRegistry> = LazyLock::new(ConfigurationRegistry::new);

/// Thread-safe map from [`ConfigurationId`] to configuration.
#[derive(Debug, Default)]
pub struct ConfigurationRegistry {
    entries: RwLock<HashMap<ConfigurationId, Arc<TestConfiguration>>>,
}

impl ConfigurationRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry shared by every harness in the process.
    pub fn global() -> &'static ConfigurationRegistry {
        &GLOBAL_REGISTRY
    }

    /// Inserts a configuration. An existing entry for the same id is replaced.
    pub fn put(&self, id: ConfigurationId, configuration: Arc<TestConfiguration>) {
        if self.entries.write().insert(id, configuration).is_some() {
            warn!(id = %id, "Replaced an already registered test configuration");
        }
    }

    /// Looks up a configuration.
    pub fn get(&self, id: ConfigurationId) -> Option<Arc<TestConfiguration>> {
        self.entries.read().get(&id).cloned()
    }

    /// Removes a configuration. Returns whether an entry was present.
    pub fn remove(&self, id: ConfigurationId) -> bool {
        self.entries.write().remove(&id).is_some()
    }

    /// Returns true if `id` is registered.
    pub fn contains(&self, id: ConfigurationId) -> bool {
        self.entries.read().contains_key(&id)
    }

    /// Number of registered configurations.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Registers `configuration` under its own id and returns the guard that
    /// removes it again.
    pub fn register(&self, configuration: Arc<TestConfiguration>) -> Registration<'_> {
        let id = configuration.id();
        self.put(id, configuration);
        debug!(id = %id, "Registered test configuration");
        Registration { registry: self, id }
    }
}

/// Keeps a configuration registered while alive.
#[derive(Debug)]
#[must_use = "the configuration is unregistered when the registration is dropped"]
pub struct Registration<'a> {
    registry: &'a ConfigurationRegistry,
    id: ConfigurationId,
}

impl Registration<'_> {
    /// The registered id.
    pub fn id(&self) -> ConfigurationId {
        self.id
    }
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        if self.registry.remove(self.id) {
            debug!(id = %self.id, "Unregistered test configuration");
        }
    }
}
