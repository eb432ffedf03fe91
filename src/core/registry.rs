//! # Task registry: handles and states of the workers of one run.
//!
//! The registry owns one handle per spawned worker (identity, state,
//! cancellation token, terminal outcome). It is the only mutable state shared
//! between the signal bridge, the escalator and the supervisor; every access
//! goes through one `std::sync::Mutex` that is never held across an `.await`.
//!
//! ## State machine (per handle)
//! ```text
//!   Pending ──► Running ──► Cancelling ──► Completed | Failed
//!      │           └──────────────────────► Completed | Failed
//!      └──► Cancelling (registered after shutdown was latched)
//! ```
//!
//! ## Rules
//! - Handles are stored in spawn order; [`WorkerId`] is the index.
//! - `cancel_all` closes the registry: handles registered afterwards start
//!   in `Cancelling` with an already-cancelled token.
//! - Terminal states are final; the terminal counter is published through a
//!   `watch` channel so waiters never poll.

use std::any::Any;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::core::config::CompletionPolicy;
use crate::core::state::ShutdownCause;
use crate::error::{WorkerError, panic_message};

/// Identity of a worker within one run (spawn order).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkerId(usize);

impl WorkerId {
    /// Zero-based spawn index.
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// State of one worker handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskState {
    /// Registered, future not yet polled.
    Pending,
    /// Worker future is executing.
    Running,
    /// Cancellation requested, worker not finished yet.
    Cancelling,
    /// Finished cleanly (cancelled cooperatively or returned).
    Completed,
    /// Finished with an error or a panic.
    Failed,
}

impl TaskState {
    /// True for `Completed` and `Failed`.
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Completed | TaskState::Failed)
    }
}

/// Terminal outcome of one worker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WorkerOutcome {
    /// Worker acknowledged a cancellation request.
    Cancelled,
    /// Worker returned on its own, without a cancellation request.
    Completed,
    /// Worker returned an error or panicked.
    Failed {
        /// Rendered error or panic message.
        reason: Arc<str>,
    },
}

impl WorkerOutcome {
    /// Classifies what a worker future produced.
    ///
    /// `requested` tells whether cancellation had been requested by the time
    /// the worker returned.
    pub(crate) fn classify(
        res: Result<Result<(), WorkerError>, Box<dyn Any + Send>>,
        requested: bool,
    ) -> Self {
        match res {
            Err(panic) => WorkerOutcome::Failed {
                reason: format!("panicked: {}", panic_message(&*panic)).into(),
            },
            Ok(Ok(())) | Ok(Err(WorkerError::Canceled)) => {
                if requested {
                    WorkerOutcome::Cancelled
                } else {
                    WorkerOutcome::Completed
                }
            }
            Ok(Err(e)) => WorkerOutcome::Failed {
                reason: e.to_string().into(),
            },
        }
    }

    /// Handle state this outcome settles into.
    pub fn terminal_state(&self) -> TaskState {
        match self {
            WorkerOutcome::Cancelled | WorkerOutcome::Completed => TaskState::Completed,
            WorkerOutcome::Failed { .. } => TaskState::Failed,
        }
    }

    /// Error text when this outcome must escalate under `policy`.
    pub(crate) fn escalation(&self, policy: CompletionPolicy) -> Option<Arc<str>> {
        match (self, policy) {
            (WorkerOutcome::Failed { reason }, _) => Some(Arc::clone(reason)),
            (WorkerOutcome::Completed, CompletionPolicy::Escalate) => {
                Some(Arc::from("exited before shutdown was requested"))
            }
            _ => None,
        }
    }

    /// Short label for logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            WorkerOutcome::Cancelled => "cancelled",
            WorkerOutcome::Completed => "completed",
            WorkerOutcome::Failed { .. } => "failed",
        }
    }
}

/// Point-in-time view of one handle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkerSnapshot {
    /// Worker identity.
    pub id: WorkerId,
    /// Worker name.
    pub name: Arc<str>,
    /// Current state.
    pub state: TaskState,
}

struct TaskHandle {
    name: Arc<str>,
    state: TaskState,
    token: CancellationToken,
    outcome: Option<WorkerOutcome>,
    /// Position in the order handles became terminal.
    finished: usize,
}

#[derive(Default)]
struct Inner {
    handles: Vec<TaskHandle>,
    closed: bool,
    next_finished: usize,
}

/// Registry of the worker handles of one run.
pub(crate) struct Registry {
    inner: Mutex<Inner>,
    terminal: watch::Sender<usize>,
}

impl Registry {
    pub(crate) fn new() -> Self {
        let (terminal, _rx) = watch::channel(0);
        Self {
            inner: Mutex::new(Inner::default()),
            terminal,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds a `Pending` handle and returns its identity and token.
    pub(crate) fn register(&self, name: &str) -> (WorkerId, CancellationToken) {
        let mut inner = self.lock();
        let id = WorkerId(inner.handles.len());
        let token = CancellationToken::new();
        let state = if inner.closed {
            token.cancel();
            TaskState::Cancelling
        } else {
            TaskState::Pending
        };
        inner.handles.push(TaskHandle {
            name: Arc::from(name),
            state,
            token: token.clone(),
            outcome: None,
            finished: usize::MAX,
        });
        (id, token)
    }

    /// `Pending → Running`. Other states are left untouched.
    pub(crate) fn mark_running(&self, id: WorkerId) {
        let mut inner = self.lock();
        if let Some(h) = inner.handles.get_mut(id.0) {
            if h.state == TaskState::Pending {
                h.state = TaskState::Running;
            }
        }
    }

    /// Requests cancellation of every `Pending`/`Running` handle and closes the
    /// registry. Returns the names that were newly moved to `Cancelling`.
    pub(crate) fn cancel_all(&self) -> Vec<Arc<str>> {
        let mut inner = self.lock();
        inner.closed = true;
        inner
            .handles
            .iter_mut()
            .filter(|h| matches!(h.state, TaskState::Pending | TaskState::Running))
            .map(|h| {
                h.state = TaskState::Cancelling;
                h.token.cancel();
                Arc::clone(&h.name)
            })
            .collect()
    }

    /// Records the terminal outcome of `id`. Repeated calls are ignored.
    pub(crate) fn mark_terminal(&self, id: WorkerId, outcome: WorkerOutcome) {
        let newly_terminal = {
            let mut guard = self.lock();
            let inner = &mut *guard;
            let order = inner.next_finished;
            match inner.handles.get_mut(id.0) {
                Some(h) if !h.state.is_terminal() => {
                    h.state = outcome.terminal_state();
                    h.outcome = Some(outcome);
                    h.finished = order;
                    inner.next_finished += 1;
                    true
                }
                _ => false,
            }
        };
        if newly_terminal {
            self.terminal.send_modify(|n| *n += 1);
        }
    }

    /// Earliest recorded outcome (in terminal order) that escalates under `policy`.
    pub(crate) fn escalation_cause(&self, policy: CompletionPolicy) -> Option<ShutdownCause> {
        let inner = self.lock();
        inner
            .handles
            .iter()
            .filter_map(|h| {
                let error = h.outcome.as_ref()?.escalation(policy)?;
                Some((h.finished, h, error))
            })
            .min_by_key(|(finished, _, _)| *finished)
            .map(|(_, h, error)| ShutdownCause::WorkerFault {
                worker: Arc::clone(&h.name),
                error,
            })
    }

    /// True when every registered handle is terminal.
    pub(crate) fn all_terminal(&self) -> bool {
        self.lock().handles.iter().all(|h| h.state.is_terminal())
    }

    /// Names of handles that have not reached a terminal state.
    pub(crate) fn non_terminal(&self) -> Vec<Arc<str>> {
        self.lock()
            .handles
            .iter()
            .filter(|h| !h.state.is_terminal())
            .map(|h| Arc::clone(&h.name))
            .collect()
    }

    pub(crate) fn snapshot(&self) -> Vec<WorkerSnapshot> {
        self.lock()
            .handles
            .iter()
            .enumerate()
            .map(|(i, h)| WorkerSnapshot {
                id: WorkerId(i),
                name: Arc::clone(&h.name),
                state: h.state,
            })
            .collect()
    }

    /// Receiver of the terminal-handle counter.
    pub(crate) fn watch_terminal(&self) -> watch::Receiver<usize> {
        self.terminal.subscribe()
    }
}
