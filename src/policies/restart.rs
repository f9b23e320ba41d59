//! # Restart policy for supervised services.
//!
//! [`RestartPolicy`] decides whether an instance that returned
//! [`ServiceError::Fail`](crate::ServiceError::Fail) while the shared context
//! is still live is started again.
//!
//! Restarts are always bounded. Unbounded immediate restarts of a service that
//! fails persistently turn into a crash loop that starves the host.
//!
//! ```text
//! RestartPolicy::Never                     → one run, then exited
//! RestartPolicy::OnFailure {
//!     max_restarts: 3,                     → at most 3 consecutive restarts
//!     reset_after: Some(30s),              → a run that lasted >= 30s clears the count
//! }
//! ```
//!
//! Clean exits (`Ok(())`, `Canceled`, cancelled shared context) and
//! [`ServiceError::Fatal`](crate::ServiceError::Fatal) are never restarted.

use std::time::Duration;

use serde::Deserialize;
use serde_with::{DurationSeconds, serde_as};

/// Policy controlling whether a failed service is restarted.
#[serde_as]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RestartPolicy {
    /// Never restart: the instance runs once and then reports `exited`.
    Never,
    /// Restart on retryable failure while the restart count is below `max_restarts`.
    OnFailure {
        /// Maximum number of consecutive restarts.
        max_restarts: u32,
        /// A failed run that lasted at least this long resets the restart count.
        #[serde_as(as = "Option<DurationSeconds<u64>>")]
        reset_after: Option<Duration>,
    },
}

impl RestartPolicy {
    /// Returns true if another restart is allowed after `restarts` consecutive ones.
    ///
    /// # Example
    /// ```
    /// use servicevisor::RestartPolicy;
    ///
    /// let p = RestartPolicy::OnFailure { max_restarts: 2, reset_after: None };
    /// assert!(p.permits(0));
    /// assert!(p.permits(1));
    /// assert!(!p.permits(2));
    /// assert!(!RestartPolicy::Never.permits(0));
    /// ```
    pub fn permits(&self, restarts: u32) -> bool {
        match self {
            RestartPolicy::Never => false,
            RestartPolicy::OnFailure { max_restarts, .. } => restarts < *max_restarts,
        }
    }

    /// Returns true if a run of length `ran_for` clears the restart count.
    pub fn resets_after(&self, ran_for: Duration) -> bool {
        match self {
            RestartPolicy::Never => false,
            RestartPolicy::OnFailure { reset_after, .. } => {
                reset_after.is_some_and(|window| ran_for >= window)
            }
        }
    }
}

impl Default for RestartPolicy {
    /// Returns `OnFailure { max_restarts: 5, reset_after: Some(30s) }`.
    fn default() -> Self {
        RestartPolicy::OnFailure {
            max_restarts: 5,
            reset_after: Some(Duration::from_secs(30)),
        }
    }
}
