//! Resources and providers.
//!
//! A [`Resource`] contributes HTTP-addressable routes to a deployment. A
//! [`Provider`] is a cross-cutting component registered with the container
//! rather than addressed by clients: it may wrap the deployed router (filters,
//! body checks) and it may map request-time failures to responses.
//!
//! Providers are registered either as instances or as a [`ProviderClass`], in
//! which case the container creates the instance itself when it deploys.

pub mod exception_mappers;

pub use exception_mappers::{
    ErrorMessage, JsonProcessingExceptionMapper, LoggingExceptionMapper,
    ValidationExceptionMapper, default_exception_mappers,
};

use std::any::TypeId;
use std::fmt;
use std::sync::Arc;

use axum::{Router, response::Response};

use crate::error::ResourceError;

/// A REST resource handler.
pub trait Resource: Send + Sync + 'static {
    /// Returns the routes served by this resource. Paths of different
    /// resources in one deployment must not overlap.
    fn routes(self: Arc<Self>) -> Router;
}

/// A cross-cutting component of a deployment.
pub trait Provider: Send + Sync + 'static {
    /// Applies the provider to the deployed router, typically by adding a
    /// layer. Providers are applied in registration order, so later providers
    /// wrap earlier ones.
    fn configure(self: Arc<Self>, router: Router) -> Router {
        router
    }

    /// Maps a request-time failure to a response. Returning `None` lets the
    /// next registered mapper try.
    fn map_exception(&self, error: &ResourceError) -> Option<Response> {
        let _ = error;
        None
    }
}

/// A provider type the container instantiates itself.
#[derive(Clone, Copy)]
pub struct ProviderClass {
    type_id: TypeId,
    name: &'static str,
    construct: fn() -> Arc<dyn Provider>,
}

fn construct<P: Provider + Default>() -> Arc<dyn Provider> {
    Arc::new(P::default())
}

impl ProviderClass {
    /// The class of provider type `P`.
    pub fn of<P: Provider + Default>() -> Self {
        Self {
            type_id: TypeId::of::<P>(),
            name: std::any::type_name::<P>(),
            construct: construct::<P>,
        }
    }

    /// Type name of the provider.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Creates a fresh provider instance.
    pub fn instantiate(&self) -> Arc<dyn Provider> {
        (self.construct)()
    }
}

impl PartialEq for ProviderClass {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for ProviderClass {}

impl fmt::Debug for ProviderClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}
