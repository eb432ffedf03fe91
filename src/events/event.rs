//! # Runtime events emitted by the supervisor and its collaborators.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Lifecycle events**: supervisor phase transitions and final termination
//! - **Shutdown events**: signals, shutdown requests, cancellation requests, drain results
//! - **Worker events**: spawn, cooperative stop, fault
//! - **Hook events**: finalize hook execution
//!
//! The [`Event`] struct carries additional metadata such as timestamps, worker
//! name, signal, phase and reasons.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//!
//! ## Example
//! ```rust
//! use gracevisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::WorkerFailed)
//!     .with_worker("ticker")
//!     .with_reason("index out of bounds");
//!
//! assert_eq!(ev.kind, EventKind::WorkerFailed);
//! assert_eq!(ev.worker.as_deref(), Some("ticker"));
//! assert_eq!(ev.reason.as_deref(), Some("index out of bounds"));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

use crate::core::{Phase, SignalKind};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `worker`: subscriber name
    /// - `reason`: panic info/message
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `worker`: subscriber name
    /// - `reason`: reason string (e.g., "full", "closed")
    SubscriberOverflow,

    // === Lifecycle events ===
    /// Supervisor moved to a new phase.
    ///
    /// Sets:
    /// - `phase`: the phase just entered
    PhaseChanged,

    /// Run reached its terminal phase; the last event of every run.
    Terminated,

    // === Shutdown events ===
    /// A termination signal was delivered (OS or programmatic).
    ///
    /// Sets:
    /// - `signal`: the signal kind
    SignalReceived,

    /// The shutdown flag was latched. Published exactly once per run.
    ///
    /// Sets:
    /// - `reason`: rendered [`ShutdownCause`](crate::ShutdownCause)
    ShutdownRequested,

    /// Cancellation was requested for a batch of still-running workers.
    ///
    /// Sets:
    /// - `reason`: comma-separated names of the workers cancelled in this batch
    CancelRequested,

    /// Every worker reached a terminal state.
    AllStopped,

    /// Drain exceeded the configured grace period; workers were abandoned.
    ///
    /// Sets:
    /// - `grace_ms`: configured grace (ms)
    /// - `reason`: comma-separated abandoned worker names
    GraceExceeded,

    // === Worker events ===
    /// Worker was spawned and is running.
    ///
    /// Sets:
    /// - `worker`: worker name
    WorkerSpawned,

    /// Worker reached a clean terminal state.
    ///
    /// Sets:
    /// - `worker`: worker name
    /// - `reason`: `"cancelled"` or `"completed"`
    WorkerStopped,

    /// Worker fault observed by the escalator (fatal).
    ///
    /// Sets:
    /// - `worker`: worker name
    /// - `reason`: error message
    WorkerFailed,

    // === Hook events ===
    /// Finalize hook is about to run.
    ///
    /// Sets:
    /// - `hook`: `"sync"` or `"async"`
    HookStarted,

    /// Finalize hook finished successfully.
    ///
    /// Sets:
    /// - `hook`: `"sync"` or `"async"`
    HookCompleted,

    /// Finalize hook failed or panicked (fatal).
    ///
    /// Sets:
    /// - `hook`: `"sync"` or `"async"`
    /// - `reason`: error message
    HookFailed,

    /// Finalize hooks were skipped because workers were abandoned.
    HooksSkipped,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Name of the worker (or subscriber), if applicable.
    pub worker: Option<Arc<str>>,
    /// Human-readable reason (errors, causes, overflow details).
    pub reason: Option<Arc<str>>,
    /// Signal that triggered the event.
    pub signal: Option<SignalKind>,
    /// Phase entered.
    pub phase: Option<Phase>,
    /// Finalize hook flavor.
    pub hook: Option<&'static str>,
    /// Grace period in milliseconds (compact).
    pub grace_ms: Option<u32>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            worker: None,
            reason: None,
            signal: None,
            phase: None,
            hook: None,
            grace_ms: None,
        }
    }

    /// Attaches a worker name.
    #[inline]
    pub fn with_worker(mut self, worker: impl Into<Arc<str>>) -> Self {
        self.worker = Some(worker.into());
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a signal kind.
    #[inline]
    pub fn with_signal(mut self, signal: SignalKind) -> Self {
        self.signal = Some(signal);
        self
    }

    /// Attaches a phase.
    #[inline]
    pub fn with_phase(mut self, phase: Phase) -> Self {
        self.phase = Some(phase);
        self
    }

    /// Attaches a hook flavor.
    #[inline]
    pub fn with_hook(mut self, hook: &'static str) -> Self {
        self.hook = Some(hook);
        self
    }

    /// Attaches a grace duration (stored as milliseconds).
    #[inline]
    pub fn with_grace(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.grace_ms = Some(ms);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_worker(subscriber)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_worker(subscriber)
            .with_reason(info)
    }

    /// True for events that report a fault (worker or hook).
    #[inline]
    pub fn is_fatal(&self) -> bool {
        matches!(self.kind, EventKind::WorkerFailed | EventKind::HookFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_is_monotonic() {
        let a = Event::new(EventKind::PhaseChanged);
        let b = Event::new(EventKind::PhaseChanged);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn grace_is_clamped_to_u32() {
        let ev = Event::new(EventKind::GraceExceeded).with_grace(Duration::from_secs(u64::MAX / 4));
        assert_eq!(ev.grace_ms, Some(u32::MAX));
    }

    #[test]
    fn only_faults_are_fatal() {
        assert!(Event::new(EventKind::WorkerFailed).is_fatal());
        assert!(Event::new(EventKind::HookFailed).is_fatal());
        assert!(!Event::new(EventKind::WorkerStopped).is_fatal());
        assert!(!Event::new(EventKind::SignalReceived).is_fatal());
    }
}
