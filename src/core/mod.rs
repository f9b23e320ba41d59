//! Runtime core: registry, supervision and lifecycle.
//!
//! - [`registry`]: name → factory map, frozen at build time;
//! - [`tree`]: live instances keyed by run token (admit/list/remove);
//! - [`actor`]: restart loop of one admitted instance;
//! - [`runner`]: executes one run with panic isolation and event publishing;
//! - [`lifecycle`]: Running → Draining → Terminated;
//! - [`shutdown`]: cross-platform termination signal handling;
//! - [`builder`] / [`runtime`]: assembly.

mod actor;
mod builder;
mod lifecycle;
mod registry;
pub(crate) mod runner;
mod runtime;
mod shutdown;
mod tree;

pub use actor::ActorExit;
pub use builder::RuntimeBuilder;
pub use lifecycle::{LifecycleCoordinator, Phase};
pub use registry::ServiceRegistry;
pub use runtime::Runtime;
pub use shutdown::wait_for_shutdown_signal;
pub use tree::{InstanceState, RunToken, ServiceStatus, SupervisionTree};
