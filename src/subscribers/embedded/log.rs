//! # LogWriter: event renderer for `tracing`
//!
//! Turns incoming [`Event`]s into `tracing` records. Cancellation requests and
//! cooperative stops never reach `error`.
//!
//! The fatal worker log and the `Received exit signal` line are written at the
//! source (escalator and signal delivery), so they survive a lagging bus. Here
//! those two events are only echoed at `debug`.
//!
//! ## Example output (fmt subscriber)
//! ```text
//! INFO  phase=RUNNING supervisor phase changed
//! INFO  signal=SIGTERM Received exit signal SIGTERM=15 Terminated
//! INFO  cause="signal SIGTERM" shutdown requested
//! DEBUG workers="listener,ticker" cancellation requested
//! INFO  worker="ticker" reason="cancelled" worker stopped
//! ERROR fatal=true worker="listener" error="index out of bounds" worker failed
//! DEBUG hook="sync" running shutdown hook
//! ```

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;
use async_trait::async_trait;

/// `tracing` writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let worker = e.worker.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("-");
        match e.kind {
            EventKind::PhaseChanged => {
                if let Some(phase) = e.phase {
                    tracing::info!(%phase, "supervisor phase changed");
                }
            }
            EventKind::SignalReceived => {
                if let Some(signal) = e.signal {
                    tracing::debug!(signal = signal.name(), "signal event");
                }
            }
            EventKind::ShutdownRequested => {
                tracing::info!(cause = reason, "shutdown requested");
            }
            EventKind::CancelRequested => {
                tracing::debug!(workers = reason, "cancellation requested");
            }
            EventKind::WorkerSpawned => {
                tracing::debug!(worker, "worker spawned");
            }
            EventKind::WorkerStopped => {
                tracing::info!(worker, reason, "worker stopped");
            }
            EventKind::WorkerFailed => {
                tracing::debug!(worker, error = reason, "worker failure event");
            }
            EventKind::AllStopped => {
                tracing::info!("all workers stopped");
            }
            EventKind::GraceExceeded => {
                tracing::warn!(
                    grace_ms = e.grace_ms.unwrap_or_default(),
                    abandoned = reason,
                    "grace period exceeded; abandoning workers"
                );
            }
            EventKind::HookStarted => {
                tracing::debug!(hook = e.hook.unwrap_or("-"), "running shutdown hook");
            }
            EventKind::HookCompleted => {
                tracing::debug!(hook = e.hook.unwrap_or("-"), "shutdown hook finished");
            }
            EventKind::HookFailed => {
                tracing::error!(
                    fatal = true,
                    hook = e.hook.unwrap_or("-"),
                    error = reason,
                    "shutdown hook failed"
                );
            }
            EventKind::HooksSkipped => {
                tracing::warn!("shutdown hooks skipped: workers still running");
            }
            EventKind::Terminated => {
                tracing::info!("supervisor terminated");
            }
            EventKind::SubscriberOverflow => {
                tracing::warn!(subscriber = worker, reason, "subscriber overflow");
            }
            EventKind::SubscriberPanicked => {
                tracing::error!(subscriber = worker, info = reason, "subscriber panicked");
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
