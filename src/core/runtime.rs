//! # Runtime: the assembled supervisor.
//!
//! [`Runtime`] wires the frozen registry, the supervision tree, the lifecycle
//! coordinator, the event bus and the subscriber fan-out together.
//!
//! ```text
//! Runtime::run(initial)
//!   ├─► admit every initial service         (failure → drain, Err)
//!   ├─► bind + spawn control endpoint       (failure → drain, Err(Bind))
//!   ├─► wait: OS signal | shutdown() called elsewhere
//!   ├─► lifecycle.shutdown()                (Draining → Terminated)
//!   └─► stop control endpoint, flush subscribers
//! ```
//!
//! ## Example
//! ```rust,no_run
//! use servicevisor::{Config, LogWriter, Runtime, ServiceError, ServiceSpec};
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let heartbeat = ServiceSpec::from_fn("heartbeat", |ctx: CancellationToken| async move {
//!         ctx.cancelled().await;
//!         Ok::<_, ServiceError>(())
//!     });
//!
//!     let rt = Runtime::builder(Config::default())
//!         .register(heartbeat)?
//!         .with_subscribers(vec![Arc::new(LogWriter::new())])
//!         .build();
//!
//!     rt.run(["heartbeat"]).await?;
//!     Ok(())
//! }
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, broadcast};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::control::{self, Control};
use crate::core::builder::RuntimeBuilder;
use crate::core::lifecycle::{LifecycleCoordinator, Phase};
use crate::core::registry::ServiceRegistry;
use crate::core::shutdown;
use crate::core::tree::{RunToken, SupervisionTree};
use crate::error::RuntimeError;
use crate::events::{Bus, Event};
use crate::subscribers::{Subscribe, SubscriberSet};

/// Assembled service runtime.
pub struct Runtime {
    cfg: Arc<Config>,
    bus: Bus,
    registry: Arc<ServiceRegistry>,
    tree: Arc<SupervisionTree>,
    lifecycle: Arc<LifecycleCoordinator>,
    listener: Mutex<Option<(CancellationToken, JoinHandle<()>)>>,
}

impl Runtime {
    /// Starts building a runtime.
    pub fn builder(cfg: Config) -> RuntimeBuilder {
        RuntimeBuilder::new(cfg)
    }

    pub(crate) fn new_internal(
        cfg: Config,
        registry: ServiceRegistry,
        subscribers: Vec<Arc<dyn Subscribe>>,
    ) -> Self {
        let cfg = Arc::new(cfg);
        let bus = Bus::new(cfg.bus_capacity_clamped());
        let registry = Arc::new(registry);
        let root = CancellationToken::new();

        let tree = Arc::new(SupervisionTree::new(
            Arc::clone(&registry),
            Arc::clone(&cfg),
            bus.clone(),
            root.clone(),
        ));
        let lifecycle = Arc::new(LifecycleCoordinator::new(
            Arc::clone(&tree),
            root,
            bus.clone(),
            cfg.grace,
        ));

        let stop = CancellationToken::new();
        let subs = SubscriberSet::new(subscribers, bus.clone());
        let handle = tokio::spawn(forward_events(bus.subscribe(), subs, stop.clone()));

        Self {
            cfg,
            bus,
            registry,
            tree,
            lifecycle,
            listener: Mutex::new(Some((stop, handle))),
        }
    }

    /// Effective configuration.
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Event bus.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Subscribes to runtime events directly.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// Frozen service registry.
    pub fn registry(&self) -> &ServiceRegistry {
        &self.registry
    }

    /// Supervision tree.
    pub fn tree(&self) -> &Arc<SupervisionTree> {
        &self.tree
    }

    /// Lifecycle coordinator.
    pub fn lifecycle(&self) -> &Arc<LifecycleCoordinator> {
        &self.lifecycle
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> Phase {
        self.lifecycle.phase()
    }

    /// Control façade over this runtime.
    pub fn control(&self) -> Control {
        Control::new(Arc::clone(&self.tree), Arc::clone(&self.lifecycle))
    }

    /// Admits one instance of each name, in order.
    pub async fn start<I, S>(&self, names: I) -> Result<Vec<RunToken>, RuntimeError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut tokens = Vec::new();
        for name in names {
            tokens.push(self.tree.admit(name.as_ref()).await?);
        }
        Ok(tokens)
    }

    /// Starts `initial`, serves the control endpoint and blocks until a
    /// termination signal or a [`shutdown`](Self::shutdown) call has drained
    /// the runtime.
    pub async fn run<I, S>(&self, initial: I) -> Result<(), RuntimeError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if let Err(e) = self.start(initial).await {
            tracing::error!(error = %e, "initial admission failed");
            let _ = self.shutdown().await;
            return Err(e);
        }

        let server = match self.spawn_control().await {
            Ok(server) => server,
            Err(e) => {
                tracing::error!(error = %e, "control endpoint unavailable");
                let _ = self.shutdown().await;
                return Err(e);
            }
        };

        let signal = async {
            match shutdown::wait_for_shutdown_signal().await {
                Ok(sig) => tracing::info!(signal = sig, "termination signal received"),
                Err(e) => {
                    tracing::warn!(error = %e, "signal handlers unavailable");
                    std::future::pending::<()>().await
                }
            }
        };
        tokio::select! {
            _ = signal => {}
            _ = self.lifecycle.wait_draining() => {}
        }

        let res = self.shutdown().await;

        if let Some(handle) = server {
            match tokio::time::timeout(Duration::from_secs(1), handle).await {
                Ok(Ok(Err(e))) => tracing::warn!(error = %e, "control endpoint stopped with error"),
                Err(_) => tracing::warn!("control endpoint did not stop in time"),
                _ => {}
            }
        }
        res
    }

    /// Drains the runtime and flushes subscribers. Idempotent.
    pub async fn shutdown(&self) -> Result<(), RuntimeError> {
        let res = self.lifecycle.shutdown().await;
        self.flush_subscribers().await;
        res
    }

    async fn spawn_control(
        &self,
    ) -> Result<Option<JoinHandle<std::io::Result<()>>>, RuntimeError> {
        let Some(addr) = self.cfg.control_addr() else {
            return Ok(None);
        };
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| RuntimeError::Bind {
                addr: addr.clone(),
                reason: e.to_string(),
            })?;
        let local = listener.local_addr().map(|a| a.to_string()).unwrap_or(addr);
        tracing::info!(addr = %local, "control endpoint listening");

        // Stops accepting once the shared context is cancelled.
        let stop = self.tree.root().clone();
        Ok(Some(tokio::spawn(control::serve(
            listener,
            self.control(),
            stop,
        ))))
    }

    async fn flush_subscribers(&self) {
        let Some((stop, handle)) = self.listener.lock().await.take() else {
            return;
        };
        stop.cancel();
        if tokio::time::timeout(self.cfg.grace, handle).await.is_err() {
            tracing::warn!("subscribers did not drain in time");
        }
    }
}

/// Forwards bus events to the subscriber set until `stop`, then drains what is
/// already queued and waits for the subscriber workers.
async fn forward_events(
    mut rx: broadcast::Receiver<Event>,
    subs: SubscriberSet,
    stop: CancellationToken,
) {
    use broadcast::error::{RecvError, TryRecvError};

    loop {
        tokio::select! {
            biased;
            res = rx.recv() => match res {
                Ok(ev) => subs.emit(ev),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "subscriber listener lagged");
                }
                Err(RecvError::Closed) => break,
            },
            _ = stop.cancelled() => {
                loop {
                    match rx.try_recv() {
                        Ok(ev) => subs.emit(ev),
                        Err(TryRecvError::Lagged(_)) => continue,
                        Err(_) => break,
                    }
                }
                break;
            }
        }
    }
    subs.shutdown().await;
}
