//! # Supervision tree: admission, listing and removal of service instances.
//!
//! The tree owns every admitted instance. Each one runs as its own tokio task
//! (a [`ServiceActor`]) under a child of the shared context, so a failing or
//! panicking instance never takes down siblings or the tree.
//!
//! ## Architecture
//! ```text
//! admit(name) ──► lock(state) ─► registry.resolve(name)
//!                              ─► token = next RunToken
//!                              ─► tracker.spawn(ServiceActor::run(root.child_token()))
//!                              ─► state.by_name[name].push(token)
//!
//! remove(token) ─► lock(state) ─► claim (take join handle) ─► unlock
//!                ─► cancel instance token ─► await exit (≤ grace)
//!                ─► exited: lock(state) ─► forget token ─► ServiceRemoved
//!                ─► grace elapsed: keep listed as running ─► ServiceRemoved("abandoned")
//!
//! list() ───────► lock(state) ─► snapshot (name, token, running|exited)
//! ```
//!
//! ## Rules
//! - One mutex guards `SupervisionState`; admit, remove, list and
//!   `close_admission` are linearizable with respect to each other.
//! - The lock is never held across a service's lifetime, only for map updates.
//! - An instance that exits on its own stays listed as `exited` until removed.
//! - A removed instance leaves the state only once its task has exited. Until
//!   then it is listed as `running` but can no longer be removed again; an
//!   abandoned one is reported as stuck on drain.
//! - The tree never cancels the shared context; only the lifecycle coordinator does.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::{AbortHandle, JoinHandle};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::config::Config;
use crate::core::actor::{ActorExit, ServiceActor};
use crate::core::registry::ServiceRegistry;
use crate::error::ControlError;
use crate::events::{Bus, Event, EventKind};
use crate::services::ServiceContext;

/// Opaque handle of one admitted instance.
///
/// Tokens are unique within a tree and never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RunToken(u64);

impl RunToken {
    #[cfg(test)]
    pub(crate) const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw token value.
    pub const fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RunToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Observed state of an instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InstanceState {
    /// The restart loop is alive (running, waiting out a backoff, or still
    /// winding down after removal was requested).
    Running,
    /// The restart loop returned; the token is still held.
    Exited,
}

/// One row of a [`SupervisionTree::list`] snapshot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ServiceStatus {
    /// Service name.
    pub name: String,
    /// Instance token.
    pub token: RunToken,
    /// Running or exited.
    pub state: InstanceState,
}

struct Instance {
    name: Arc<str>,
    cancel: CancellationToken,
    task: AbortHandle,
    /// Taken by the remover; `None` means removal is in progress.
    join: Option<JoinHandle<ActorExit>>,
}

impl Instance {
    fn state(&self) -> InstanceState {
        if self.task.is_finished() {
            InstanceState::Exited
        } else {
            InstanceState::Running
        }
    }
}

/// An instance claimed by a remover.
struct Retiring {
    token: RunToken,
    name: Arc<str>,
    cancel: CancellationToken,
    join: JoinHandle<ActorExit>,
}

struct State {
    accepting: bool,
    by_name: BTreeMap<Arc<str>, Vec<RunToken>>,
    instances: HashMap<RunToken, Instance>,
}

impl State {
    /// Claims `token` for removal. `None` if absent or already being removed.
    fn claim(&mut self, token: RunToken) -> Option<Retiring> {
        let inst = self.instances.get_mut(&token)?;
        let join = inst.join.take()?;
        Some(Retiring {
            token,
            name: Arc::clone(&inst.name),
            cancel: inst.cancel.clone(),
            join,
        })
    }

    /// Removes `token` from both maps; drops the name entry with its last token.
    fn forget(&mut self, token: RunToken) {
        let Some(inst) = self.instances.remove(&token) else {
            return;
        };
        if let Some(tokens) = self.by_name.get_mut(&inst.name) {
            tokens.retain(|t| *t != token);
            if tokens.is_empty() {
                self.by_name.remove(&inst.name);
            }
        }
    }

    /// Forgets abandoned instances whose task has returned since.
    fn prune(&mut self) {
        let done: Vec<RunToken> = self
            .instances
            .iter()
            .filter(|(_, inst)| inst.join.is_none() && inst.task.is_finished())
            .map(|(token, _)| *token)
            .collect();
        for token in done {
            self.forget(token);
        }
    }
}

/// Owner of all admitted service instances.
pub struct SupervisionTree {
    registry: Arc<ServiceRegistry>,
    config: Arc<Config>,
    bus: Bus,
    root: CancellationToken,
    tracker: TaskTracker,
    next_token: AtomicU64,
    state: Mutex<State>,
}

impl SupervisionTree {
    /// Creates an empty tree whose instances run under `root`.
    pub fn new(
        registry: Arc<ServiceRegistry>,
        config: Arc<Config>,
        bus: Bus,
        root: CancellationToken,
    ) -> Self {
        Self {
            registry,
            config,
            bus,
            root,
            tracker: TaskTracker::new(),
            next_token: AtomicU64::new(0),
            state: Mutex::new(State {
                accepting: true,
                by_name: BTreeMap::new(),
                instances: HashMap::new(),
            }),
        }
    }

    /// Builds and launches a new instance of `name`.
    ///
    /// Returns as soon as the instance task is spawned; it does not wait for the
    /// service to initialize.
    pub async fn admit(&self, name: &str) -> Result<RunToken, ControlError> {
        let mut state = self.state.lock().await;
        if !state.accepting {
            return Err(ControlError::Draining);
        }
        let spec = self.registry.resolve(name)?;

        let token = RunToken(self.next_token.fetch_add(1, Ordering::Relaxed) + 1);
        let service = spec.name_arc();
        let cancel = self.root.child_token();
        let actor = ServiceActor {
            factory: Arc::clone(spec.factory()),
            ctx: ServiceContext::new(
                Arc::clone(&service),
                cancel.clone(),
                Arc::clone(&self.config),
            ),
            token,
            restart: spec.restart(&self.config),
            backoff: spec.backoff(&self.config),
            bus: self.bus.clone(),
        };

        self.bus.publish(
            Event::new(EventKind::ServiceAdmitted)
                .with_service(Arc::clone(&service))
                .with_token(token),
        );
        let join = self.tracker.spawn(actor.run(cancel.clone()));

        state
            .by_name
            .entry(Arc::clone(&service))
            .or_default()
            .push(token);
        state.instances.insert(
            token,
            Instance {
                name: service,
                cancel,
                task: join.abort_handle(),
                join: Some(join),
            },
        );
        Ok(token)
    }

    /// Snapshot of every held token, sorted by (name, token).
    pub async fn list(&self) -> Vec<ServiceStatus> {
        let mut state = self.state.lock().await;
        state.prune();
        let mut out = Vec::with_capacity(state.instances.len());
        for (name, tokens) in &state.by_name {
            for token in tokens {
                let Some(inst) = state.instances.get(token) else {
                    continue;
                };
                out.push(ServiceStatus {
                    name: name.to_string(),
                    token: *token,
                    state: inst.state(),
                });
            }
        }
        out
    }

    /// Tokens currently held for `name`, in admission order.
    #[cfg(test)]
    pub(crate) async fn tokens(&self, name: &str) -> Vec<RunToken> {
        let state = self.state.lock().await;
        state.by_name.get(name).cloned().unwrap_or_default()
    }

    /// Cancels one instance and waits (up to the grace period) for it to exit.
    pub async fn remove(&self, token: RunToken) -> Result<(), ControlError> {
        let retiring = {
            let mut state = self.state.lock().await;
            state.claim(token).ok_or_else(|| ControlError::NotFound {
                what: token.to_string(),
            })?
        };
        self.retire(retiring).await;
        Ok(())
    }

    /// Removes every token held for `name`.
    ///
    /// Returns how many instances were retired; `NotFound` if none was held
    /// (instances whose removal is in progress do not count).
    pub async fn stop_name(&self, name: &str) -> Result<usize, ControlError> {
        let claimed: Vec<Retiring> = {
            let mut state = self.state.lock().await;
            let tokens = state.by_name.get(name).cloned().unwrap_or_default();
            tokens.into_iter().filter_map(|t| state.claim(t)).collect()
        };
        if claimed.is_empty() {
            return Err(ControlError::NotFound {
                what: name.to_string(),
            });
        }

        let count = claimed.len();
        for r in &claimed {
            r.cancel.cancel();
        }
        futures::future::join_all(claimed.into_iter().map(|r| self.retire(r))).await;
        Ok(count)
    }

    /// Stops admitting new instances. Idempotent.
    pub async fn close_admission(&self) {
        self.state.lock().await.accepting = false;
    }

    /// Returns false once admission is closed.
    pub async fn is_accepting(&self) -> bool {
        self.state.lock().await.accepting
    }

    /// Number of held tokens.
    pub async fn len(&self) -> usize {
        let mut state = self.state.lock().await;
        state.prune();
        state.instances.len()
    }

    /// Returns true if no token is held.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// `name#token` of every instance whose task has not exited yet,
    /// including abandoned ones.
    pub async fn running(&self) -> Vec<String> {
        self.list()
            .await
            .into_iter()
            .filter(|s| s.state != InstanceState::Exited)
            .map(|s| format!("{}{}", s.name, s.token))
            .collect()
    }

    pub(crate) fn root(&self) -> &CancellationToken {
        &self.root
    }

    /// Waits until every instance task ever spawned has exited, bounded by `grace`.
    ///
    /// Closes the task tracker: call only while draining.
    pub(crate) async fn wait_all(&self, grace: Duration) -> Result<(), Vec<String>> {
        self.tracker.close();
        match tokio::time::timeout(grace, self.tracker.wait()).await {
            Ok(()) => Ok(()),
            Err(_) => Err(self.running().await),
        }
    }

    /// Cancels the instance and waits for it within the grace period.
    ///
    /// Forgets the token once the task has exited; an abandoned instance stays
    /// listed as running. Publishes `ServiceRemoved` either way.
    async fn retire(&self, r: Retiring) {
        let Retiring {
            token,
            name,
            cancel,
            join,
        } = r;
        cancel.cancel();

        let reason = match tokio::time::timeout(self.config.grace, join).await {
            Ok(Ok(exit)) => Some(exit.as_label().to_string()),
            Ok(Err(join_err)) => {
                tracing::error!(service = %name, %token, error = %join_err, "service task aborted");
                Some("task_aborted".to_string())
            }
            Err(_) => None,
        };

        let reason = match reason {
            Some(reason) => {
                self.state.lock().await.forget(token);
                reason
            }
            None => {
                tracing::warn!(
                    service = %name,
                    %token,
                    grace = ?self.config.grace,
                    "service ignored cancellation; abandoning"
                );
                "abandoned".to_string()
            }
        };

        self.bus.publish(
            Event::new(EventKind::ServiceRemoved)
                .with_service(name)
                .with_token(token)
                .with_reason(reason),
        );
    }
}
