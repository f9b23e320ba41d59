//! # Lifecycle coordinator: Running → Draining → Terminated.
//!
//! ```text
//!   Running ──(signal | shutdown())──► Draining ──(all exited | grace elapsed)──► Terminated
//!
//! Draining:
//!   1. tree.close_admission()        control calls now get `Draining`
//!   2. publish ShutdownRequested
//!   3. root.cancel()                 every instance token is a child of root
//!   4. tree.wait_all(grace)
//!        ├─ Ok    → publish AllStoppedWithin, Ok(())
//!        └─ stuck → publish GraceExceeded,    Err(RuntimeError::GraceExceeded)
//!   5. phase = Terminated
//! ```
//!
//! ## Rules
//! - The drain runs **at most once**: concurrent and repeated `shutdown()` calls
//!   await the first one and receive the same result.
//! - Only the coordinator cancels the shared context.
//! - Services still running when the grace period ends are abandoned.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{OnceCell, watch};
use tokio_util::sync::CancellationToken;

use crate::core::tree::SupervisionTree;
use crate::error::RuntimeError;
use crate::events::{Bus, Event, EventKind};

/// Lifecycle phase of the runtime.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Admitting and running services.
    Running,
    /// Shutdown in progress.
    Draining,
    /// Shutdown finished (final).
    Terminated,
}

/// Drives the orderly, idempotent shutdown of a runtime.
pub struct LifecycleCoordinator {
    tree: Arc<SupervisionTree>,
    root: CancellationToken,
    bus: Bus,
    grace: Duration,
    phase: watch::Sender<Phase>,
    outcome: OnceCell<Result<(), RuntimeError>>,
}

impl LifecycleCoordinator {
    /// Creates a coordinator in [`Phase::Running`].
    pub fn new(
        tree: Arc<SupervisionTree>,
        root: CancellationToken,
        bus: Bus,
        grace: Duration,
    ) -> Self {
        let (phase, _rx) = watch::channel(Phase::Running);
        Self {
            tree,
            root,
            bus,
            grace,
            phase,
            outcome: OnceCell::new(),
        }
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        *self.phase.borrow()
    }

    /// Receiver observing phase changes.
    pub fn watch(&self) -> watch::Receiver<Phase> {
        self.phase.subscribe()
    }

    /// Completes once the phase has left [`Phase::Running`].
    pub async fn wait_draining(&self) {
        let mut rx = self.phase.subscribe();
        let _ = rx.wait_for(|p| *p != Phase::Running).await;
    }

    /// Completes once the phase is [`Phase::Terminated`].
    pub async fn wait_terminated(&self) {
        let mut rx = self.phase.subscribe();
        let _ = rx.wait_for(|p| *p == Phase::Terminated).await;
    }

    /// Drains the runtime. Idempotent.
    ///
    /// Returns `Err(GraceExceeded)` if services were still running when the
    /// grace period ended.
    pub async fn shutdown(&self) -> Result<(), RuntimeError> {
        self.outcome.get_or_init(|| self.drain()).await.clone()
    }

    async fn drain(&self) -> Result<(), RuntimeError> {
        self.phase.send_replace(Phase::Draining);
        self.tree.close_admission().await;
        self.bus.publish(Event::new(EventKind::ShutdownRequested));
        tracing::info!(grace = ?self.grace, "draining services");

        self.root.cancel();

        let res = match self.tree.wait_all(self.grace).await {
            Ok(()) => {
                self.bus.publish(Event::new(EventKind::AllStoppedWithin));
                Ok(())
            }
            Err(stuck) => {
                self.bus.publish(
                    Event::new(EventKind::GraceExceeded).with_reason(stuck.join(",")),
                );
                Err(RuntimeError::GraceExceeded {
                    grace: self.grace,
                    stuck,
                })
            }
        };

        self.phase.send_replace(Phase::Terminated);
        res
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::core::registry::ServiceRegistry;
    use crate::error::ServiceError;
    use crate::services::{RunnableRef, ServiceContext, ServiceFn};

    fn idle(_ctx: &ServiceContext) -> RunnableRef {
        ServiceFn::arc("idle", |ctx: CancellationToken| async move {
            ctx.cancelled().await;
            Ok::<_, ServiceError>(())
        })
    }

    fn stubborn(_ctx: &ServiceContext) -> RunnableRef {
        ServiceFn::arc("stubborn", |_ctx: CancellationToken| async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok::<_, ServiceError>(())
        })
    }

    fn setup(grace: Duration) -> (Arc<SupervisionTree>, LifecycleCoordinator, Bus) {
        let mut reg = ServiceRegistry::new();
        reg.register("idle", idle).unwrap();
        reg.register("stubborn", stubborn).unwrap();

        let bus = Bus::new(256);
        let root = CancellationToken::new();
        let tree = Arc::new(SupervisionTree::new(
            Arc::new(reg),
            Arc::new(Config::default()),
            bus.clone(),
            root.clone(),
        ));
        let lc = LifecycleCoordinator::new(tree.clone(), root, bus.clone(), grace);
        (tree, lc, bus)
    }

    #[tokio::test]
    async fn drains_once_even_when_called_concurrently() {
        let (tree, lc, bus) = setup(Duration::from_secs(2));
        let mut rx = bus.subscribe();
        tree.admit("idle").await.unwrap();
        tree.admit("idle").await.unwrap();
        assert_eq!(lc.phase(), Phase::Running);

        let (a, b) = tokio::join!(lc.shutdown(), lc.shutdown());
        assert!(a.is_ok() && b.is_ok());
        assert!(lc.shutdown().await.is_ok());
        assert_eq!(lc.phase(), Phase::Terminated);

        let mut requested = 0;
        let mut finished = 0;
        while let Ok(ev) = rx.try_recv() {
            match ev.kind {
                EventKind::ShutdownRequested => requested += 1,
                EventKind::AllStoppedWithin => finished += 1,
                _ => {}
            }
        }
        assert_eq!(requested, 1);
        assert_eq!(finished, 1);
    }

    #[tokio::test]
    async fn admission_closed_after_drain() {
        let (tree, lc, _bus) = setup(Duration::from_secs(1));
        lc.shutdown().await.unwrap();
        assert!(tree.admit("idle").await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn grace_exceeded_still_terminates() {
        let (tree, lc, _bus) = setup(Duration::from_secs(2));
        tree.admit("idle").await.unwrap();
        let t = tree.admit("stubborn").await.unwrap();

        let err = lc.shutdown().await.unwrap_err();
        match &err {
            RuntimeError::GraceExceeded { grace, stuck } => {
                assert_eq!(*grace, Duration::from_secs(2));
                assert_eq!(stuck, &vec![format!("stubborn{t}")]);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(lc.phase(), Phase::Terminated);
        // Second call replays the same outcome without draining again.
        assert!(matches!(
            lc.shutdown().await,
            Err(RuntimeError::GraceExceeded { .. })
        ));
    }

    #[tokio::test]
    async fn watchers_observe_transitions() {
        let (_tree, lc, _bus) = setup(Duration::from_secs(1));
        let lc = Arc::new(lc);

        let waiter = {
            let lc = Arc::clone(&lc);
            tokio::spawn(async move {
                lc.wait_draining().await;
                lc.wait_terminated().await;
                lc.phase()
            })
        };
        tokio::task::yield_now().await;
        lc.shutdown().await.unwrap();
        assert_eq!(waiter.await.unwrap(), Phase::Terminated);
    }
}
