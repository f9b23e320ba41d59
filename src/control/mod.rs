//! # Control endpoint.
//!
//! [`Control`] is the transport-independent façade: name resolution and
//! delegation to the [`SupervisionTree`], nothing more. [`router`] adapts it
//! to HTTP/JSON:
//!
//! | Route                    | Operation        | Replies                                  |
//! |--------------------------|------------------|------------------------------------------|
//! | `POST /services/{name}`  | `StartService`   | 200 `{status,token}` / 404 / 503         |
//! | `GET /services`          | `ListServices`   | 200 `[{name,token,state}]`               |
//! | `DELETE /services/{name}`| `StopService`    | 200 `{status,stopped}` / 404             |
//! | `GET /health`            | -                | 200 `{status,phase}`                     |
//!
//! Concurrent calls are ordered by the tree's own lock; the endpoint adds no
//! locking of its own.

mod server;
mod wire;

use std::sync::Arc;

use crate::core::{LifecycleCoordinator, Phase, RunToken, ServiceStatus, SupervisionTree};
use crate::error::ControlError;

pub use server::{router, serve};
pub use wire::{ErrorReply, HealthReply, StartReply, StopReply};

/// Remote-callable operations over a running supervision tree.
#[derive(Clone)]
pub struct Control {
    tree: Arc<SupervisionTree>,
    lifecycle: Arc<LifecycleCoordinator>,
}

impl Control {
    /// Creates a façade over `tree`, reporting the phase of `lifecycle`.
    pub fn new(tree: Arc<SupervisionTree>, lifecycle: Arc<LifecycleCoordinator>) -> Self {
        Self { tree, lifecycle }
    }

    /// Admits a new instance of `name`.
    pub async fn start_service(&self, name: &str) -> Result<RunToken, ControlError> {
        self.tree.admit(name).await
    }

    /// Snapshot of every held instance.
    pub async fn list_services(&self) -> Vec<ServiceStatus> {
        self.tree.list().await
    }

    /// Removes every instance held for `name`; returns how many were removed.
    pub async fn stop_service(&self, name: &str) -> Result<usize, ControlError> {
        self.tree.stop_name(name).await
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> Phase {
        self.lifecycle.phase()
    }
}
