//! # servicevisor
//!
//! **Servicevisor** is an in-process supervisor for long-running services.
//!
//! Services are registered by name, admitted into a supervision tree (each
//! admission gets its own [`RunToken`]), restarted on failure under a bounded
//! policy, started and stopped at runtime through a small control endpoint,
//! and drained in order when the process is asked to terminate.
//!
//! ## Architecture
//! ```text
//!   RuntimeBuilder ──register──► ServiceRegistry (frozen by build)
//!         │
//!         ▼
//! ┌──────────────────────────────────────────────────────────────────┐
//! │  Runtime                                                         │
//! │   ├─ SupervisionTree   (one lock: admit / list / remove)         │
//! │   ├─ LifecycleCoordinator (Running → Draining → Terminated)      │
//! │   ├─ Bus               (broadcast events, per-bus seq)           │
//! │   └─ SubscriberSet     (per-subscriber queues)                   │
//! └───────┬──────────────────────────────┬───────────────────────────┘
//!         ▼                              ▲
//!   ServiceActor × N               Control (HTTP/JSON)
//!   (restart loop,                 POST   /services/{name}
//!    fresh Runnable per run)       GET    /services
//!                                  DELETE /services/{name}
//! ```
//!
//! ### Lifecycle of an instance
//! ```text
//! admit(name) ──► token ──► ServiceActor::run(child of root)
//!
//! loop {
//!   ├─► runnable = factory.build(ctx)
//!   ├─► run_once()
//!   │     ├─ Ok / Canceled / context cancelled ─► exit (never restarted)
//!   │     ├─ Fatal                              ─► ServiceDead, exit
//!   │     └─ Fail ─► restarts < max ? sleep(backoff) : RestartsExhausted
//! }
//! ```
//!
//! ## Features
//! | Area              | Description                                          | Key types / traits                          |
//! |-------------------|------------------------------------------------------|---------------------------------------------|
//! | **Services**      | Long-running units and their factories.              | [`Runnable`], [`ServiceFn`], [`ServiceSpec`] |
//! | **Registry**      | Name → factory, duplicate-safe.                      | [`ServiceRegistry`]                          |
//! | **Supervision**   | Admit, list and remove instances.                    | [`SupervisionTree`], [`RunToken`]            |
//! | **Policies**      | Bounded restarts with backoff.                       | [`RestartPolicy`], [`BackoffPolicy`]         |
//! | **Control**       | Remote start / list / stop.                          | [`Control`], [`control::router`]             |
//! | **Lifecycle**     | Signal trapping, idempotent drain.                   | [`LifecycleCoordinator`], [`Phase`]          |
//! | **Subscribers**   | Event hooks (logging, metrics).                      | [`Subscribe`], [`LogWriter`]                 |
//! | **Configuration** | Defaults, JSON file, environment overlay.            | [`Config`]                                   |
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use servicevisor::{Config, ControlConfig, Runtime, ServiceError, ServiceSpec};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cfg = Config {
//!         control: ControlConfig { enabled: false, ..ControlConfig::default() },
//!         ..Config::default()
//!     };
//!
//!     let rt = Runtime::builder(cfg)
//!         .register(ServiceSpec::from_fn("ticker", |ctx: CancellationToken| async move {
//!             ctx.cancelled().await;
//!             Ok::<_, ServiceError>(())
//!         }))?
//!         .build();
//!
//!     let token = rt.start(["ticker"]).await?[0];
//!     assert_eq!(rt.control().list_services().await[0].token, token);
//!
//!     rt.shutdown().await?;
//!     Ok(())
//! }
//! ```

mod config;
mod core;
mod error;
mod events;
mod policies;
mod services;
mod subscribers;

pub mod control;

// ---- Public re-exports ----

pub use config::{Config, ConfigError, ControlConfig};
pub use control::Control;
pub use crate::core::{
    ActorExit, InstanceState, LifecycleCoordinator, Phase, RunToken, Runtime, RuntimeBuilder,
    ServiceRegistry, ServiceStatus, SupervisionTree, wait_for_shutdown_signal,
};
pub use error::{ControlError, RegistryError, RuntimeError, ServiceError};
pub use events::{Bus, Event, EventKind};
pub use policies::{BackoffPolicy, JitterPolicy, RestartPolicy};
pub use services::{
    FactoryRef, Runnable, RunnableRef, ServiceContext, ServiceFactory, ServiceFn, ServiceSpec,
};
pub use subscribers::{LogWriter, Subscribe, SubscriberSet};
