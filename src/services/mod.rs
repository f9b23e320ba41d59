//! # Service abstractions and specifications.
//!
//! This module provides the contract every supervised unit satisfies and the
//! types used to register it:
//! - [`Runnable`] - trait for async, cancelable long-running services
//! - [`ServiceFn`] - closure-backed [`Runnable`]
//! - [`RunnableRef`] - shared handle (`Arc<dyn Runnable>`)
//! - [`ServiceFactory`] / [`ServiceContext`] - builds a fresh runnable per start
//! - [`ServiceSpec`] - name + factory + optional policy overrides

mod factory;
mod runnable;
mod service_fn;
mod spec;

pub use factory::{FactoryRef, ServiceContext, ServiceFactory};
pub use runnable::{Runnable, RunnableRef};
pub use service_fn::ServiceFn;
pub use spec::ServiceSpec;
