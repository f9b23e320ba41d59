use std::sync::Arc;

use crate::config::Config;
use crate::core::registry::ServiceRegistry;
use crate::core::runtime::Runtime;
use crate::error::RegistryError;
use crate::services::{ServiceFactory, ServiceSpec};
use crate::subscribers::Subscribe;

/// Builder for a [`Runtime`].
///
/// Registration happens here and only here: `build` freezes the registry.
pub struct RuntimeBuilder {
    cfg: Config,
    registry: ServiceRegistry,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl RuntimeBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            registry: ServiceRegistry::new(),
            subscribers: Vec::new(),
        }
    }

    /// Registers a service spec; a taken name is [`RegistryError::DuplicateName`].
    pub fn register(mut self, spec: ServiceSpec) -> Result<Self, RegistryError> {
        self.registry.register_spec(spec)?;
        Ok(self)
    }

    /// Registers `factory` under `name` with default policies.
    pub fn register_factory(
        mut self,
        name: impl Into<String>,
        factory: impl ServiceFactory,
    ) -> Result<Self, RegistryError> {
        self.registry.register(name, factory)?;
        Ok(self)
    }

    /// Registers `spec`, overwriting any service with the same name.
    pub fn replace(mut self, spec: ServiceSpec) -> Self {
        self.registry.replace(spec);
        self
    }

    /// Uses a pre-populated registry instead of the builder's own.
    pub fn with_registry(mut self, registry: ServiceRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Sets event subscribers.
    ///
    /// Subscribers receive runtime events through dedicated workers with
    /// bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Builds the runtime.
    ///
    /// Must be called inside a Tokio runtime: subscriber workers and the bus
    /// listener are spawned here.
    pub fn build(self) -> Arc<Runtime> {
        Arc::new(Runtime::new_internal(
            self.cfg,
            self.registry,
            self.subscribers,
        ))
    }
}
