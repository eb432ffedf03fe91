//! Runtime events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to runtime events emitted by the supervisor, the signal
//! bridge, the error escalator, worker runners and the shutdown sequencer.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Supervisor`, `SignalBridge`, `Escalator`, `runner::run_worker`,
//!   `Sequencer`.
//! - **Consumer**: the supervisor's subscriber listener, which fans out to the
//!   [`SubscriberSet`](crate::SubscriberSet) (including the built-in `LogWriter`).

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
