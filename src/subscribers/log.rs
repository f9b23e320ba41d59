//! # LogWriter: runtime events as `tracing` records.
//!
//! Failures and grace overruns are logged at `warn`/`error`, everything else at
//! `info` (admission) or `debug` (individual runs).
//!
//! ## Example output
//! ```text
//! INFO  service admitted service="alpha" token=#1
//! WARN  service failed service="beta" token=#2 attempt=1 reason="service failed: backend unreachable"
//! INFO  restart scheduled service="beta" token=#2 attempt=1 delay_ms=500
//! ERROR grace exceeded stuck="gamma#3"
//! ```

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Subscriber forwarding events to `tracing`.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let service = e.service.as_deref().unwrap_or("-");
        let token = e.token.map(|t| t.to_string()).unwrap_or_default();
        let reason = e.reason.as_deref().unwrap_or("");

        match e.kind {
            EventKind::ShutdownRequested => info!(seq = e.seq, "shutdown requested"),
            EventKind::AllStoppedWithin => info!(seq = e.seq, "all services stopped within grace"),
            EventKind::GraceExceeded => error!(seq = e.seq, stuck = reason, "grace exceeded"),
            EventKind::ServiceAdmitted => info!(service, %token, "service admitted"),
            EventKind::ServiceRemoved => info!(service, %token, reason, "service removed"),
            EventKind::ServiceStarting => {
                debug!(service, %token, attempt = ?e.attempt, "service starting")
            }
            EventKind::ServiceStopped => {
                debug!(service, %token, attempt = ?e.attempt, "service stopped")
            }
            EventKind::ServiceFailed => {
                warn!(service, %token, attempt = ?e.attempt, reason, "service failed")
            }
            EventKind::RestartScheduled => info!(
                service,
                %token,
                attempt = ?e.attempt,
                delay_ms = ?e.delay_ms,
                "restart scheduled"
            ),
            EventKind::RestartsExhausted => {
                error!(service, %token, reason, "restarts exhausted")
            }
            EventKind::ServiceDead => error!(service, %token, reason, "service dead"),
            EventKind::SubscriberOverflow => {
                warn!(subscriber = service, reason, "subscriber overflow")
            }
            EventKind::SubscriberPanicked => {
                warn!(subscriber = service, reason, "subscriber panicked")
            }
        }
    }

    fn name(&self) -> &'static str {
        "log_writer"
    }
}
