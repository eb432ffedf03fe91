//! # Error escalator: turns one worker's fault into group cancellation.
//!
//! Every worker runner holds a sender of the completion channel created when
//! the run spawns its workers. The escalator consumes that channel on its own
//! task, so a fault is escalated as soon as it is observed, regardless of what
//! the supervisor loop is doing (waiting, cancelling, draining).
//!
//! ```text
//! Completion { outcome }
//!   ├─ Cancelled                       ─► WorkerStopped (clean)
//!   ├─ Completed + Tolerate            ─► WorkerStopped (clean)
//!   └─ Failed | Completed + Escalate   ─► error!(fatal = true) + WorkerFailed
//!                                         record fault
//!                                         request_shutdown(WorkerFault)  (no-op if latched)
//! ```

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::core::config::CompletionPolicy;
use crate::core::registry::WorkerOutcome;
use crate::core::state::{ShutdownCause, SupervisorState};
use crate::events::{Event, EventKind};

/// Terminal notification sent by a worker runner.
#[derive(Debug)]
pub(crate) struct Completion {
    pub(crate) worker: Arc<str>,
    pub(crate) outcome: WorkerOutcome,
}

pub(crate) struct Escalator {
    state: Arc<SupervisorState>,
    policy: CompletionPolicy,
}

impl Escalator {
    /// Starts the escalator task.
    ///
    /// The task ends when every sender is dropped, or when `stop` is cancelled
    /// (after handling whatever is already queued).
    pub(crate) fn spawn(
        state: Arc<SupervisorState>,
        policy: CompletionPolicy,
        stop: CancellationToken,
    ) -> (mpsc::UnboundedSender<Completion>, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<Completion>();
        let me = Self { state, policy };

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    msg = rx.recv() => match msg {
                        Some(c) => me.observe(c),
                        None => break,
                    },
                    _ = stop.cancelled() => {
                        while let Ok(c) = rx.try_recv() {
                            me.observe(c);
                        }
                        break;
                    }
                }
            }
        });
        (tx, handle)
    }

    fn observe(&self, c: Completion) {
        let Some(error) = c.outcome.escalation(self.policy) else {
            self.state.bus.publish(
                Event::new(EventKind::WorkerStopped)
                    .with_worker(c.worker)
                    .with_reason(c.outcome.as_label()),
            );
            return;
        };

        tracing::error!(fatal = true, worker = &*c.worker, error = &*error, "worker failed");
        self.state.bus.publish(
            Event::new(EventKind::WorkerFailed)
                .with_worker(Arc::clone(&c.worker))
                .with_reason(Arc::clone(&error)),
        );
        self.state.record_faults(1);
        self.state.request_shutdown(ShutdownCause::WorkerFault {
            worker: c.worker,
            error,
        });
    }
}
