//! Error types used by the servicevisor runtime and its services.
//!
//! This module defines the error enums of the runtime:
//!
//! - [`RegistryError`]: registration and name resolution failures.
//! - [`ControlError`]: failures surfaced to control-plane callers.
//! - [`ServiceError`]: errors returned by an individual [`Runnable`](crate::Runnable).
//! - [`RuntimeError`]: errors raised by the orchestration runtime itself.
//!
//! Every type provides `as_label` (stable snake_case label for logs/metrics).

use std::time::Duration;
use thiserror::Error;

/// # Errors produced by the service registry.
///
/// `DuplicateName` is a programming/config error and is fatal at startup.
/// `UnknownService` is a caller error and is never fatal.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// A service with this name is already registered.
    #[error("service {name:?} is already registered")]
    DuplicateName {
        /// The conflicting name.
        name: String,
    },

    /// No service is registered under this name.
    #[error("unknown service {name:?}")]
    UnknownService {
        /// The requested name.
        name: String,
    },
}

impl RegistryError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use servicevisor::RegistryError;
    ///
    /// let err = RegistryError::DuplicateName { name: "alpha".into() };
    /// assert_eq!(err.as_label(), "duplicate_name");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RegistryError::DuplicateName { .. } => "duplicate_name",
            RegistryError::UnknownService { .. } => "unknown_service",
        }
    }
}

/// # Errors returned to control-plane callers.
///
/// None of these is fatal to the process.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ControlError {
    /// The name is not present in the registry.
    #[error("unknown service {name:?}")]
    UnknownService {
        /// The requested name.
        name: String,
    },

    /// No live instance is held for the name or token.
    #[error("service {what} not found")]
    NotFound {
        /// Name or token that was looked up.
        what: String,
    },

    /// The runtime is draining and no longer admits services.
    #[error("runtime is draining; admission closed")]
    Draining,
}

impl ControlError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ControlError::UnknownService { .. } => "unknown_service",
            ControlError::NotFound { .. } => "not_found",
            ControlError::Draining => "draining",
        }
    }
}

impl From<RegistryError> for ControlError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::UnknownService { name } | RegistryError::DuplicateName { name } => {
                ControlError::UnknownService { name }
            }
        }
    }
}

/// # Errors produced by a running service.
///
/// `Fail` is recovered locally by the restart policy; `Fatal` stops the instance
/// permanently; `Canceled` is a clean stop.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Non-recoverable error (never restarted).
    #[error("fatal error (no restart): {error}")]
    Fatal {
        /// The underlying error message.
        error: String,
    },

    /// The service failed but may succeed if started again.
    #[error("service failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// The service observed cancellation and stopped.
    #[error("context cancelled")]
    Canceled,
}

impl ServiceError {
    /// Shorthand for [`ServiceError::Fail`].
    pub fn fail(error: impl Into<String>) -> Self {
        ServiceError::Fail {
            error: error.into(),
        }
    }

    /// Shorthand for [`ServiceError::Fatal`].
    pub fn fatal(error: impl Into<String>) -> Self {
        ServiceError::Fatal {
            error: error.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use servicevisor::ServiceError;
    ///
    /// assert_eq!(ServiceError::fail("boom").as_label(), "service_failed");
    /// assert_eq!(ServiceError::Canceled.as_label(), "service_canceled");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ServiceError::Fatal { .. } => "service_fatal",
            ServiceError::Fail { .. } => "service_failed",
            ServiceError::Canceled => "service_canceled",
        }
    }

    /// Indicates whether the restart policy may act on this error.
    ///
    /// Only [`ServiceError::Fail`] is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ServiceError::Fail { .. })
    }
}

/// # Errors produced by the runtime.
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum RuntimeError {
    /// Shutdown grace period was exceeded; some services did not exit and were abandoned.
    #[error("shutdown timeout {grace:?} exceeded; stuck: {stuck:?}; abandoning")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Services (name#token) that were still running.
        stuck: Vec<String>,
    },

    /// Registry failure during startup.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Initial admission failed.
    #[error(transparent)]
    Control(#[from] ControlError),

    /// The control endpoint could not bind its listener.
    #[error("control endpoint failed to bind {addr}: {reason}")]
    Bind {
        /// Address that was requested.
        addr: String,
        /// I/O error message.
        reason: String,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use servicevisor::RuntimeError;
    /// use std::time::Duration;
    ///
    /// let err = RuntimeError::GraceExceeded { grace: Duration::from_secs(5), stuck: vec![] };
    /// assert_eq!(err.as_label(), "runtime_grace_exceeded");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
            RuntimeError::Registry(e) => e.as_label(),
            RuntimeError::Control(e) => e.as_label(),
            RuntimeError::Bind { .. } => "runtime_bind_failed",
        }
    }
}
