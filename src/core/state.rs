//! # Shared run state: phase machine, shutdown latch, fault counter.
//!
//! One [`SupervisorState`] exists per run, shared (`Arc`) by the signal bridge,
//! the escalator, worker runners and the supervisor itself.
//!
//! ```text
//!  INIT ─► RUNNING ─► SHUTTING_DOWN ─► DRAINING ─► FINALIZING ─► TERMINATED
//! ```
//!
//! ## Rules
//! - The shutdown flag flips false→true exactly once (compare-and-swap); the
//!   winner latches the [`ShutdownCause`] and broadcasts cancellation.
//! - Later requests are no-ops; faults are still counted by the escalator.
//! - Phases advance one step at a time; skipping is a bug.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use tokio::sync::watch;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

use crate::core::registry::Registry;
use crate::core::signals::SignalKind;
use crate::events::{Bus, Event, EventKind};

/// Supervisor lifecycle phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    /// Created, nothing spawned yet.
    Init,
    /// Workers spawned; waiting for the first terminal event.
    Running,
    /// Shutdown triggered; cancellation being requested.
    ShuttingDown,
    /// Waiting for every worker to reach a terminal state.
    Draining,
    /// Running finalize hooks.
    Finalizing,
    /// Done.
    Terminated,
}

impl Phase {
    /// The only phase reachable from `self`.
    pub fn next(self) -> Option<Phase> {
        match self {
            Phase::Init => Some(Phase::Running),
            Phase::Running => Some(Phase::ShuttingDown),
            Phase::ShuttingDown => Some(Phase::Draining),
            Phase::Draining => Some(Phase::Finalizing),
            Phase::Finalizing => Some(Phase::Terminated),
            Phase::Terminated => None,
        }
    }

    /// Upper-case name used in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Init => "INIT",
            Phase::Running => "RUNNING",
            Phase::ShuttingDown => "SHUTTING_DOWN",
            Phase::Draining => "DRAINING",
            Phase::Finalizing => "FINALIZING",
            Phase::Terminated => "TERMINATED",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a run began shutting down. Latched once per run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ShutdownCause {
    /// A termination signal was delivered.
    SignalReceived(SignalKind),
    /// A worker failed (or returned early under
    /// [`CompletionPolicy::Escalate`](crate::CompletionPolicy::Escalate)).
    WorkerFault {
        /// Worker name.
        worker: Arc<str>,
        /// Rendered error.
        error: Arc<str>,
    },
    /// Every worker returned on its own under
    /// [`CompletionPolicy::Tolerate`](crate::CompletionPolicy::Tolerate).
    AllCompletedNormally,
}

impl ShutdownCause {
    /// True for [`ShutdownCause::WorkerFault`].
    pub fn is_fault(&self) -> bool {
        matches!(self, ShutdownCause::WorkerFault { .. })
    }
}

impl fmt::Display for ShutdownCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownCause::SignalReceived(kind) => write!(f, "signal {kind}"),
            ShutdownCause::WorkerFault { worker, error } => {
                write!(f, "worker {worker:?} faulted: {error}")
            }
            ShutdownCause::AllCompletedNormally => f.write_str("all workers completed"),
        }
    }
}

/// State shared by every component of one run.
pub(crate) struct SupervisorState {
    pub(crate) bus: Bus,
    pub(crate) registry: Registry,
    triggered: AtomicBool,
    cause: OnceLock<ShutdownCause>,
    shutdown: CancellationToken,
    faults: AtomicUsize,
    phase: watch::Sender<Phase>,
}

impl SupervisorState {
    pub(crate) fn new(bus: Bus) -> Self {
        let (phase, _rx) = watch::channel(Phase::Init);
        Self {
            bus,
            registry: Registry::new(),
            triggered: AtomicBool::new(false),
            cause: OnceLock::new(),
            shutdown: CancellationToken::new(),
            faults: AtomicUsize::new(0),
            phase,
        }
    }

    /// Latches `cause` and cancels every live worker, unless already latched.
    ///
    /// Returns `true` for the single call that won the latch.
    pub(crate) fn request_shutdown(&self, cause: ShutdownCause) -> bool {
        if self
            .triggered
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        self.bus
            .publish(Event::new(EventKind::ShutdownRequested).with_reason(cause.to_string()));
        let _ = self.cause.set(cause);
        self.cancel_remaining();
        self.shutdown.cancel();
        true
    }

    /// Requests cancellation of every Pending/Running worker. Idempotent.
    ///
    /// One `CancelRequested` event covers the whole batch, so a large group
    /// cannot push earlier events out of the bus.
    pub(crate) fn cancel_remaining(&self) -> usize {
        let cancelled = self.registry.cancel_all();
        if !cancelled.is_empty() {
            let names: Vec<&str> = cancelled.iter().map(|n| &**n).collect();
            self.bus.publish(
                Event::new(EventKind::CancelRequested)
                    .with_reason(names.join(",")),
            );
        }
        cancelled.len()
    }

    pub(crate) fn is_shutdown_requested(&self) -> bool {
        self.triggered.load(Ordering::Acquire)
    }

    /// Resolves once the shutdown flag is latched.
    pub(crate) fn shutdown_requested(&self) -> WaitForCancellationFuture<'_> {
        self.shutdown.cancelled()
    }

    pub(crate) fn cause(&self) -> Option<ShutdownCause> {
        self.cause.get().cloned()
    }

    pub(crate) fn record_faults(&self, n: usize) {
        self.faults.fetch_add(n, Ordering::AcqRel);
    }

    pub(crate) fn faults(&self) -> usize {
        self.faults.load(Ordering::Acquire)
    }

    pub(crate) fn phase(&self) -> Phase {
        *self.phase.borrow()
    }

    pub(crate) fn watch_phase(&self) -> watch::Receiver<Phase> {
        self.phase.subscribe()
    }

    /// Moves to `next`, which must directly follow the current phase.
    pub(crate) fn advance(&self, next: Phase) {
        let moved = self.phase.send_if_modified(|current| {
            if current.next() == Some(next) {
                *current = next;
                true
            } else {
                false
            }
        });
        debug_assert!(moved, "illegal phase transition to {next}");
        if moved {
            self.bus
                .publish(Event::new(EventKind::PhaseChanged).with_phase(next));
        }
    }
}
