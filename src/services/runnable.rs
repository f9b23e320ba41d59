//! # The runnable contract.
//!
//! A [`Runnable`] has a stable [`name`](Runnable::name) and one blocking entry
//! point, [`run`](Runnable::run), that lasts until the given
//! [`CancellationToken`] is cancelled or the service fails.
//!
//! Once admitted, a runnable is owned by the supervision tree; nothing else
//! calls `run`.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::ServiceError;

/// Shared handle to a runnable.
pub type RunnableRef = Arc<dyn Runnable>;

/// # Long-running, cancelable service.
///
/// # Example
/// ```
/// use tokio_util::sync::CancellationToken;
/// use async_trait::async_trait;
/// use servicevisor::{Runnable, ServiceError};
///
/// struct Heartbeat;
///
/// #[async_trait]
/// impl Runnable for Heartbeat {
///     fn name(&self) -> &str { "heartbeat" }
///
///     async fn run(&self, ctx: CancellationToken) -> Result<(), ServiceError> {
///         loop {
///             tokio::select! {
///                 _ = ctx.cancelled() => return Ok(()),
///                 _ = tokio::time::sleep(std::time::Duration::from_secs(1)) => {}
///             }
///         }
///     }
/// }
/// ```
#[async_trait]
pub trait Runnable: Send + Sync + 'static {
    /// Returns the service name.
    fn name(&self) -> &str;

    /// Runs until `ctx` is cancelled (return `Ok(())` or `Err(Canceled)`) or the
    /// service fails.
    ///
    /// Implementations must observe `ctx` promptly: instances still running when
    /// the shutdown grace period ends are abandoned.
    async fn run(&self, ctx: CancellationToken) -> Result<(), ServiceError>;
}
