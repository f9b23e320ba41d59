//! # Service specification.
//!
//! [`ServiceSpec`] is what gets registered: a name, the factory that builds the
//! runnable, and optional per-service restart/backoff overrides. Services
//! without overrides inherit [`Config::restart`](crate::Config::restart) and
//! [`Config::backoff`](crate::Config::backoff).

use std::future::Future;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::error::ServiceError;
use crate::policies::{BackoffPolicy, RestartPolicy};
use crate::services::{FactoryRef, RunnableRef, ServiceContext, ServiceFactory, ServiceFn};

/// Registration entry for one service.
///
/// ## Example
/// ```rust
/// use tokio_util::sync::CancellationToken;
/// use servicevisor::{RestartPolicy, ServiceError, ServiceSpec};
///
/// let spec = ServiceSpec::from_fn("ticker", |ctx: CancellationToken| async move {
///     ctx.cancelled().await;
///     Ok::<_, ServiceError>(())
/// })
/// .with_restart(RestartPolicy::Never);
///
/// assert_eq!(spec.name(), "ticker");
/// ```
#[derive(Clone)]
pub struct ServiceSpec {
    name: Arc<str>,
    factory: FactoryRef,
    restart: Option<RestartPolicy>,
    backoff: Option<BackoffPolicy>,
}

impl ServiceSpec {
    /// Creates a spec from a factory.
    pub fn new(name: impl Into<Arc<str>>, factory: impl ServiceFactory) -> Self {
        Self {
            name: name.into(),
            factory: Arc::new(factory),
            restart: None,
            backoff: None,
        }
    }

    /// Creates a spec whose factory wraps `f` in a [`ServiceFn`] on every start.
    pub fn from_fn<F, Fut>(name: impl Into<Arc<str>>, f: F) -> Self
    where
        F: Fn(CancellationToken) -> Fut + Clone + Send + Sync + 'static,
        Fut: Future<Output = Result<(), ServiceError>> + Send + 'static,
    {
        let name: Arc<str> = name.into();
        let label = name.to_string();
        Self::new(name, move |_ctx: &ServiceContext| -> RunnableRef {
            ServiceFn::arc(label.clone(), f.clone())
        })
    }

    /// Returns the service name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn name_arc(&self) -> Arc<str> {
        Arc::clone(&self.name)
    }

    /// Returns the factory.
    pub fn factory(&self) -> &FactoryRef {
        &self.factory
    }

    /// Restart policy for this service, falling back to `cfg`.
    pub fn restart(&self, cfg: &Config) -> RestartPolicy {
        self.restart.unwrap_or(cfg.restart)
    }

    /// Backoff policy for this service, falling back to `cfg`.
    pub fn backoff(&self, cfg: &Config) -> BackoffPolicy {
        self.backoff.unwrap_or(cfg.backoff)
    }

    /// Returns a new spec with a restart policy override.
    pub fn with_restart(mut self, restart: RestartPolicy) -> Self {
        self.restart = Some(restart);
        self
    }

    /// Returns a new spec with a backoff override.
    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = Some(backoff);
        self
    }
}

impl std::fmt::Debug for ServiceSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceSpec")
            .field("name", &self.name)
            .field("restart", &self.restart)
            .field("backoff", &self.backoff)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_fall_back_to_config() {
        let cfg = Config::default();
        let spec = ServiceSpec::from_fn("a", |_ctx: CancellationToken| async {
            Ok::<_, ServiceError>(())
        });
        assert_eq!(spec.restart(&cfg), cfg.restart);
        assert_eq!(spec.backoff(&cfg), cfg.backoff);

        let spec = spec
            .with_restart(RestartPolicy::Never)
            .with_backoff(BackoffPolicy::immediate());
        assert_eq!(spec.restart(&cfg), RestartPolicy::Never);
        assert_eq!(spec.backoff(&cfg), BackoffPolicy::immediate());
    }

    #[test]
    fn from_fn_builds_fresh_runnables() {
        let spec = ServiceSpec::from_fn("svc", |_ctx: CancellationToken| async {
            Ok::<_, ServiceError>(())
        });
        let ctx = ServiceContext::new(
            spec.name_arc(),
            CancellationToken::new(),
            Arc::new(Config::default()),
        );
        let a = spec.factory().build(&ctx);
        let b = spec.factory().build(&ctx);
        assert_eq!(a.name(), "svc");
        assert!(!Arc::ptr_eq(&a, &b));
    }
}
