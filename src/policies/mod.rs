//! Restart and backoff policies.
//!
//! These knobs decide **whether** a failed service instance is started again and
//! **how long** the supervision tree waits before doing so.
//!
//! ## Contents
//! - [`RestartPolicy`] never restart, or restart on failure up to a cap
//! - [`BackoffPolicy`] delay growth between restarts (first / factor / max + jitter)
//! - [`JitterPolicy`]  randomization to spread simultaneous restarts
//!
//! ## Quick wiring
//! ```text
//! ServiceSpec { restart: Option<RestartPolicy>, backoff: Option<BackoffPolicy> }
//!      └─► core::actor::ServiceActor uses:
//!           - restart.permits(restarts) to decide restart/exit
//!           - backoff.next(restarts) to schedule the next start
//! ```
//!
//! ## Defaults
//! - `RestartPolicy::OnFailure { max_restarts: 5, reset_after: Some(30s) }`
//! - `BackoffPolicy::default()` → first=500ms, factor=2.0, max=15s, jitter=None.

mod backoff;
mod jitter;
mod restart;

pub use backoff::BackoffPolicy;
pub use jitter::JitterPolicy;
pub use restart::RestartPolicy;
