//! # Event subscribers for the gracevisor runtime.
//!
//! This module provides the [`Subscribe`] trait, the [`SubscriberSet`] fan-out
//! and the built-in [`LogWriter`].
//!
//! ## Architecture
//! ```text
//!   Supervisor / SignalBridge / Escalator / Runner / Sequencer
//!        │ publish(Event)
//!        ▼
//!       Bus ──► subscriber listener ──► SubscriberSet::emit(&Event)
//!                                          ├──► LogWriter (tracing)
//!                                          └──► user subscribers ...
//! ```
//!
//! The `LogWriter` is always installed by the
//! [`SupervisorBuilder`](crate::SupervisorBuilder); it is how phase transitions,
//! signals and faults end up in the application's `tracing` output.

mod embedded;
mod set;
mod subscribe;

pub use embedded::LogWriter;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;
