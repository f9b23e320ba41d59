//! # Event subscribers.
//!
//! ```text
//!   ServiceActor / SupervisionTree / LifecycleCoordinator
//!        │ publish(Event)
//!        ▼
//!       Bus ──► listener (Runtime) ──► SubscriberSet ──┬──► LogWriter
//!                                                      └──► custom Subscribe impls
//! ```
//!
//! Implement [`Subscribe`] and pass it to
//! [`RuntimeBuilder::with_subscribers`](crate::RuntimeBuilder::with_subscribers).

mod log;
mod set;
mod subscribe;

pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;
