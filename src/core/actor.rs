//! # ServiceActor: restart loop of one admitted instance.
//!
//! Builds a fresh runnable from the service factory for every run and applies
//! the instance's [`RestartPolicy`] and [`BackoffPolicy`] when a run fails.
//!
//! ## Architecture
//! ```text
//! SupervisionTree::admit ──► tracker.spawn(ServiceActor::run(instance_token))
//!
//! loop {
//!   ├─► instance_token cancelled? ─► Cancelled
//!   ├─► publish ServiceStarting{ attempt }
//!   ├─► runnable = build_once(factory, ctx)   (panic → Fail)
//!   ├─► run_once()
//!   │     ├─ Ok / Canceled            ─► Stopped
//!   │     ├─ Err while token cancelled ─► Cancelled
//!   │     ├─ Fatal                     ─► publish ServiceDead, Dead
//!   │     └─ Fail:
//!   │          ├─ ran >= reset_after   ─► restarts = 0
//!   │          ├─ !policy.permits(restarts) ─► publish RestartsExhausted, Exhausted
//!   │          ├─ delay = backoff.next(restarts); restarts += 1
//!   │          ├─ publish RestartScheduled{ delay }
//!   │          └─ sleep(delay) (cancellable) ─► next run
//! }
//! ```
//!
//! ## Rules
//! - Runs of one instance are **sequential**, never overlapping.
//! - Clean exits are never restarted, whether or not the shared context is live.
//! - The run token stays the same across restarts.

use std::sync::Arc;

use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

use crate::core::runner::{RunLabel, build_once, run_once};
use crate::core::tree::RunToken;
use crate::error::ServiceError;
use crate::events::{Bus, EventKind};
use crate::policies::{BackoffPolicy, RestartPolicy};
use crate::services::{FactoryRef, ServiceContext};

/// Why an actor loop returned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActorExit {
    /// The last run ended cleanly.
    Stopped,
    /// The instance token was cancelled (removal or shutdown).
    Cancelled,
    /// The restart policy refused another run.
    Exhausted,
    /// A fatal error ended the instance.
    Dead,
}

impl ActorExit {
    /// Short stable label for logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            ActorExit::Stopped => "stopped",
            ActorExit::Cancelled => "cancelled",
            ActorExit::Exhausted => "restarts_exhausted",
            ActorExit::Dead => "dead",
        }
    }
}

/// Restart loop for one instance.
pub(crate) struct ServiceActor {
    pub factory: FactoryRef,
    pub ctx: ServiceContext,
    pub token: RunToken,
    pub restart: RestartPolicy,
    pub backoff: BackoffPolicy,
    pub bus: Bus,
}

impl ServiceActor {
    /// Runs until a clean stop, cancellation, restart exhaustion or a fatal error.
    pub async fn run(self, cancel: CancellationToken) -> ActorExit {
        let service: Arc<str> = Arc::from(self.ctx.name());
        let mut restarts: u32 = 0;
        let mut attempt: u32 = 0;

        loop {
            if cancel.is_cancelled() {
                return ActorExit::Cancelled;
            }

            attempt = attempt.saturating_add(1);
            let label = RunLabel {
                service: &service,
                token: self.token,
                attempt,
            };

            self.bus.publish(label.event(EventKind::ServiceStarting));
            let started = Instant::now();

            let res = match build_once(self.factory.as_ref(), &self.ctx, &label, &self.bus) {
                Ok(runnable) => run_once(runnable.as_ref(), &cancel, &label, &self.bus).await,
                Err(e) => Err(e),
            };
            let err = match res {
                Ok(()) | Err(ServiceError::Canceled) => return ActorExit::Stopped,
                Err(_) if cancel.is_cancelled() => return ActorExit::Cancelled,
                Err(e) => e,
            };

            if !err.is_retryable() {
                self.bus.publish(
                    label
                        .event(EventKind::ServiceDead)
                        .with_reason(err.to_string()),
                );
                return ActorExit::Dead;
            }

            if self.restart.resets_after(started.elapsed()) {
                restarts = 0;
            }
            if !self.restart.permits(restarts) {
                self.bus.publish(
                    label
                        .event(EventKind::RestartsExhausted)
                        .with_reason(format!("{restarts} restarts; last error: {err}")),
                );
                return ActorExit::Exhausted;
            }

            let delay = self.backoff.next(restarts);
            restarts += 1;
            self.bus.publish(
                label
                    .event(EventKind::RestartScheduled)
                    .with_delay(delay)
                    .with_reason(err.to_string()),
            );

            let sleep = time::sleep(delay);
            tokio::pin!(sleep);
            tokio::select! {
                _ = &mut sleep => {}
                _ = cancel.cancelled() => return ActorExit::Cancelled,
            }
        }
    }
}
