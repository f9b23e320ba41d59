//! # One run of a service instance.
//!
//! Builds the runnable from its factory, executes [`Runnable::run`] once,
//! isolating panics in both, and publishes the terminal event of the run to
//! the [`Bus`].
//!
//! ## Event flow
//! ```text
//! factory panic     → ServiceFailed (converted to ServiceError::Fail)
//! Ok(())            → ServiceStopped
//! Err(Canceled)     → ServiceStopped (graceful exit)
//! Err(Fail/Fatal)   → ServiceFailed
//! panic             → ServiceFailed (converted to ServiceError::Fail)
//! ```
//!
//! ## Rules
//! - Exactly **one** terminal event per run.
//! - The runnable receives the instance token unchanged; the runner never cancels it.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio_util::sync::CancellationToken;

use crate::core::tree::RunToken;
use crate::error::ServiceError;
use crate::events::{Bus, Event, EventKind};
use crate::services::{Runnable, RunnableRef, ServiceContext, ServiceFactory};

/// Identity of the run being executed, used to label events.
pub(crate) struct RunLabel<'a> {
    pub service: &'a Arc<str>,
    pub token: RunToken,
    pub attempt: u32,
}

impl RunLabel<'_> {
    pub(crate) fn event(&self, kind: EventKind) -> Event {
        Event::new(kind)
            .with_service(Arc::clone(self.service))
            .with_token(self.token)
            .with_attempt(self.attempt)
    }
}

/// Builds a fresh runnable; a panicking factory counts as a failed run.
pub(crate) fn build_once(
    factory: &dyn ServiceFactory,
    ctx: &ServiceContext,
    label: &RunLabel<'_>,
    bus: &Bus,
) -> Result<RunnableRef, ServiceError> {
    std::panic::catch_unwind(AssertUnwindSafe(|| factory.build(ctx))).map_err(|panic| {
        let err = ServiceError::fail(format!("factory panicked: {}", panic_message(&*panic)));
        bus.publish(label.event(EventKind::ServiceFailed).with_reason(err.to_string()));
        err
    })
}

/// Runs `runnable` once and publishes its terminal event.
pub(crate) async fn run_once(
    runnable: &dyn Runnable,
    ctx: &CancellationToken,
    label: &RunLabel<'_>,
    bus: &Bus,
) -> Result<(), ServiceError> {
    let res = match AssertUnwindSafe(runnable.run(ctx.clone()))
        .catch_unwind()
        .await
    {
        Ok(res) => res,
        Err(panic) => Err(ServiceError::fail(format!("panicked: {}", panic_message(&*panic)))),
    };

    match &res {
        Ok(()) | Err(ServiceError::Canceled) => {
            bus.publish(label.event(EventKind::ServiceStopped));
        }
        Err(e) => {
            bus.publish(label.event(EventKind::ServiceFailed).with_reason(e.to_string()));
        }
    }
    res
}

pub(crate) fn panic_message(any: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = any.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = any.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
