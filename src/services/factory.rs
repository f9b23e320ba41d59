//! # Service factories.
//!
//! A [`ServiceFactory`] turns a [`ServiceContext`] into a fresh
//! [`RunnableRef`]. The supervision tree calls it on admission and again on
//! every restart, so factories must be stateless and cheap to invoke.
//!
//! Any `Fn(&ServiceContext) -> RunnableRef` closure is a factory.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::services::runnable::RunnableRef;

/// Shared handle to a factory.
pub type FactoryRef = Arc<dyn ServiceFactory>;

/// Builds a runnable for one start of a service.
pub trait ServiceFactory: Send + Sync + 'static {
    /// Constructs a new, independent runnable.
    fn build(&self, ctx: &ServiceContext) -> RunnableRef;
}

impl<F> ServiceFactory for F
where
    F: Fn(&ServiceContext) -> RunnableRef + Send + Sync + 'static,
{
    fn build(&self, ctx: &ServiceContext) -> RunnableRef {
        self(ctx)
    }
}

/// What a factory gets to see when it builds a runnable.
///
/// The token is a child of the shared context scoped to one instance:
/// cancelling it stops only that instance, never its siblings.
#[derive(Clone)]
pub struct ServiceContext {
    name: Arc<str>,
    token: CancellationToken,
    config: Arc<Config>,
}

impl ServiceContext {
    pub(crate) fn new(name: Arc<str>, token: CancellationToken, config: Arc<Config>) -> Self {
        Self {
            name,
            token,
            config,
        }
    }

    /// Name the service was registered under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Cancellation scoped to this instance (cancelled on removal and on shutdown).
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Shared runtime configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Deserializes this service's section of [`Config::services`].
    ///
    /// Returns `Ok(None)` when the section is absent.
    pub fn settings<T: DeserializeOwned>(&self) -> Result<Option<T>, serde_json::Error> {
        self.config
            .services
            .get(&*self.name)
            .map(|raw| T::deserialize(raw))
            .transpose()
    }
}
