//! # Service registry: name → factory.
//!
//! Populated once while the runtime is being built, then frozen behind an
//! `Arc` and read without locking. Mutation after `RuntimeBuilder::build`
//! is impossible by construction, which serializes the registration phase
//! before the admission phase.
//!
//! ## Rules
//! - `register` / `register_spec` never overwrite: a taken name is `DuplicateName`.
//! - `replace` is the explicit "force" variant and always wins.
//! - `resolve` of an absent name is `UnknownService`.

use std::collections::BTreeMap;

use crate::error::RegistryError;
use crate::services::{ServiceFactory, ServiceSpec};

/// Registry of startable services.
#[derive(Default, Debug)]
pub struct ServiceRegistry {
    specs: BTreeMap<String, ServiceSpec>,
}

impl ServiceRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `factory` under `name` with default policies.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        factory: impl ServiceFactory,
    ) -> Result<(), RegistryError> {
        let name = name.into();
        let spec = ServiceSpec::new(name.as_str(), factory);
        self.register_spec(spec)
    }

    /// Registers a full spec.
    pub fn register_spec(&mut self, spec: ServiceSpec) -> Result<(), RegistryError> {
        if self.specs.contains_key(spec.name()) {
            return Err(RegistryError::DuplicateName {
                name: spec.name().to_string(),
            });
        }
        self.specs.insert(spec.name().to_string(), spec);
        Ok(())
    }

    /// Registers `spec`, overwriting any previous entry with the same name.
    ///
    /// Returns the replaced spec.
    pub fn replace(&mut self, spec: ServiceSpec) -> Option<ServiceSpec> {
        self.specs.insert(spec.name().to_string(), spec)
    }

    /// Looks up the spec registered under `name`.
    pub fn resolve(&self, name: &str) -> Result<&ServiceSpec, RegistryError> {
        self.specs
            .get(name)
            .ok_or_else(|| RegistryError::UnknownService {
                name: name.to_string(),
            })
    }

    /// Returns true if `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.specs.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        self.specs.keys().cloned().collect()
    }

    /// Number of registered services.
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    /// Returns true if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceError;
    use crate::policies::RestartPolicy;
    use crate::services::{RunnableRef, ServiceContext, ServiceFn};
    use tokio_util::sync::CancellationToken;

    fn idle(_ctx: &ServiceContext) -> RunnableRef {
        ServiceFn::arc("idle", |ctx: CancellationToken| async move {
            ctx.cancelled().await;
            Ok::<_, ServiceError>(())
        })
    }

    #[test]
    fn duplicate_name_is_rejected() {
        let mut reg = ServiceRegistry::new();
        reg.register("alpha", idle).unwrap();

        let err = reg.register("alpha", idle).unwrap_err();
        assert_eq!(err, RegistryError::DuplicateName { name: "alpha".into() });
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn replace_overwrites_and_returns_previous() {
        let mut reg = ServiceRegistry::new();
        assert!(reg.replace(ServiceSpec::new("alpha", idle)).is_none());

        let prev = reg
            .replace(ServiceSpec::new("alpha", idle).with_restart(RestartPolicy::Never))
            .expect("previous spec");
        assert_eq!(prev.name(), "alpha");

        let cfg = crate::Config::default();
        assert_eq!(reg.resolve("alpha").unwrap().restart(&cfg), RestartPolicy::Never);
    }

    #[test]
    fn resolve_unknown() {
        let reg = ServiceRegistry::new();
        assert!(reg.is_empty());
        assert_eq!(
            reg.resolve("ghost").unwrap_err(),
            RegistryError::UnknownService { name: "ghost".into() }
        );
    }

    #[test]
    fn names_are_sorted() {
        let mut reg = ServiceRegistry::new();
        reg.register("beta", idle).unwrap();
        reg.register("alpha", idle).unwrap();
        assert_eq!(reg.names(), vec!["alpha".to_string(), "beta".to_string()]);
        assert!(reg.contains("beta"));
    }
}
