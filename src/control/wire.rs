//! JSON bodies of the control endpoint.

use serde::{Deserialize, Serialize};

use crate::core::{Phase, RunToken};

/// Reply to a successful `StartService`.
#[derive(Debug, Serialize)]
pub struct StartReply {
    /// Always `"ok"`.
    pub status: &'static str,
    /// Handle of the admitted instance.
    pub token: RunToken,
}

/// Reply to a successful `StopService`.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct StopReply {
    /// Always `"ok"`.
    pub status: String,
    /// Number of instances removed.
    pub stopped: usize,
}

/// Error body; `error` is the [`ControlError`](crate::ControlError) label.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorReply {
    /// Stable snake_case label.
    pub error: String,
    /// Human-readable message.
    pub message: String,
}

/// Reply to `GET /health`.
#[derive(Debug, Serialize)]
pub struct HealthReply {
    /// Always `"healthy"` while the endpoint answers.
    pub status: &'static str,
    /// Lifecycle phase of the runtime.
    pub phase: Phase,
}
