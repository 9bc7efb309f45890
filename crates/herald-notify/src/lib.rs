//! # herald-notify
//!
//! Notification fan-out for social interactions. For every event the
//! pipeline decides:
//!
//! - **who** is notified ([`resolver`]),
//! - **how** each recipient is reached ([`selector`]),
//! - **what** was attempted, and with which outcome ([`dispatcher`], [`log`]),
//! - **when** failed pushes are retried or given up on ([`retry`]).
//!
//! [`NotificationService`] ties the stages together behind a
//! fire-and-forget `notify` call.

pub mod dedup;
pub mod directory;
pub mod dispatcher;
pub mod formatter;
pub mod log;
pub mod push;
pub mod resolver;
pub mod retry;
pub mod selector;
pub mod service;

pub use dispatcher::{DeliveryDispatcher, DispatchOutcome};
pub use log::DeliveryLog;
pub use retry::{RetryCoordinator, RetryTicket};
pub use service::{DeliveryReport, NotificationService};
