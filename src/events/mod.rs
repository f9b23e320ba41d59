//! Runtime events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to lifecycle events emitted by the supervision tree,
//! service actors, the lifecycle coordinator and subscriber workers.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast` that stamps sequence numbers
//!
//! ## Quick reference
//! - **Publishers**: `SupervisionTree`, `ServiceActor`, `LifecycleCoordinator`,
//!   `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: the runtime's fan-out listener (feeds `SubscriberSet`), tests.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
