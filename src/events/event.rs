//! # Lifecycle events emitted by the runtime.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Admission events**: an instance entered or left the supervision tree
//! - **Run events**: one run of an instance (starting, stopped, failed)
//! - **Restart events**: restart scheduled, restart budget exhausted, fatal stop
//! - **Shutdown events**: draining requested, finished, or timed out
//!
//! ## Example
//! ```rust
//! use servicevisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::ServiceFailed)
//!     .with_service("thumbnails")
//!     .with_attempt(2)
//!     .with_reason("disk full");
//!
//! assert_eq!(ev.service.as_deref(), Some("thumbnails"));
//! assert_eq!(ev.attempt, Some(2));
//! ```

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use crate::core::RunToken;

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked while handling an event (`service` = subscriber name).
    SubscriberPanicked,
    /// Subscriber queue was full or closed; the event was dropped for it.
    SubscriberOverflow,

    // === Shutdown events ===
    /// Draining started (signal or explicit shutdown).
    ShutdownRequested,
    /// Every instance exited within the grace period.
    AllStoppedWithin,
    /// Grace period elapsed with instances still running (`reason` lists them).
    GraceExceeded,

    // === Admission events ===
    /// Instance admitted into the tree.
    ///
    /// Sets `service`, `token`.
    ServiceAdmitted,
    /// Instance removed from the tree after its task exited (or was abandoned).
    ///
    /// Sets `service`, `token`, optional `reason`.
    ServiceRemoved,

    // === Run events ===
    /// A run is starting.
    ///
    /// Sets `service`, `token`, `attempt` (1-based).
    ServiceStarting,
    /// A run ended cleanly (returned `Ok`, `Canceled`, or observed shutdown).
    ///
    /// Sets `service`, `token`, `attempt`.
    ServiceStopped,
    /// A run failed.
    ///
    /// Sets `service`, `token`, `attempt`, `reason`.
    ServiceFailed,

    // === Restart events ===
    /// The next run is scheduled after a failure.
    ///
    /// Sets `service`, `token`, `attempt` (the failed one), `delay_ms`, `reason`.
    RestartScheduled,
    /// Restart budget exhausted; the instance stays exited.
    ///
    /// Sets `service`, `token`, `attempt`, `reason`.
    RestartsExhausted,
    /// The instance stopped for good on a fatal error or panic.
    ///
    /// Sets `service`, `token`, `attempt`, `reason`.
    ServiceDead,
}

impl EventKind {
    /// Short stable label for logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            EventKind::SubscriberPanicked => "subscriber_panicked",
            EventKind::SubscriberOverflow => "subscriber_overflow",
            EventKind::ShutdownRequested => "shutdown_requested",
            EventKind::AllStoppedWithin => "all_stopped_within_grace",
            EventKind::GraceExceeded => "grace_exceeded",
            EventKind::ServiceAdmitted => "service_admitted",
            EventKind::ServiceRemoved => "service_removed",
            EventKind::ServiceStarting => "service_starting",
            EventKind::ServiceStopped => "service_stopped",
            EventKind::ServiceFailed => "service_failed",
            EventKind::RestartScheduled => "restart_scheduled",
            EventKind::RestartsExhausted => "restarts_exhausted",
            EventKind::ServiceDead => "service_dead",
        }
    }
}

/// Runtime event with optional metadata.
///
/// `seq` is assigned by [`Bus::publish`](crate::Bus::publish); events that were
/// never published carry `seq == 0`.
#[derive(Clone, Debug)]
pub struct Event {
    /// Per-bus monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Service (or subscriber) name.
    pub service: Option<Arc<str>>,
    /// Instance handle.
    pub token: Option<RunToken>,
    /// Run number within the instance (starting from 1).
    pub attempt: Option<u32>,
    /// Restart delay in milliseconds.
    pub delay_ms: Option<u32>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind stamped with the current time.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: 0,
            at: SystemTime::now(),
            kind,
            service: None,
            token: None,
            attempt: None,
            delay_ms: None,
            reason: None,
        }
    }

    /// Attaches a service name.
    #[inline]
    pub fn with_service(mut self, name: impl Into<Arc<str>>) -> Self {
        self.service = Some(name.into());
        self
    }

    /// Attaches an instance token.
    #[inline]
    pub fn with_token(mut self, token: RunToken) -> Self {
        self.token = Some(token);
        self
    }

    /// Attaches a run number.
    #[inline]
    pub fn with_attempt(mut self, n: u32) -> Self {
        self.attempt = Some(n);
        self
    }

    /// Attaches a restart delay (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        self.delay_ms = Some(d.as_millis().min(u128::from(u32::MAX)) as u32);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Creates a subscriber overflow event.
    pub(crate) fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_service(subscriber)
            .with_reason(reason)
    }

    /// Creates a subscriber panic event.
    pub(crate) fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_service(subscriber)
            .with_reason(info)
    }
}
