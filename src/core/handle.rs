use std::sync::Arc;

use crate::core::registry::WorkerSnapshot;
use crate::core::signals::{self, SignalKind};
use crate::core::state::{Phase, ShutdownCause, SupervisorState};

/// Cloneable control handle for a [`Supervisor`](crate::Supervisor).
///
/// Obtained before `run` consumes the supervisor; stays valid for the whole
/// run and after it (reporting the final state).
#[derive(Clone)]
pub struct SupervisorHandle {
    state: Arc<SupervisorState>,
}

impl SupervisorHandle {
    pub(crate) fn new(state: Arc<SupervisorState>) -> Self {
        Self { state }
    }

    /// Delivers `kind` exactly as if the OS had sent it.
    ///
    /// Calling this before `run` is allowed: the run starts already latched and
    /// every worker is cancelled as soon as it is registered.
    pub fn shutdown(&self, kind: SignalKind) {
        signals::deliver(&self.state, kind);
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    /// Waits until the run reached `phase` (or any later one).
    pub async fn wait_for_phase(&self, phase: Phase) {
        let mut rx = self.state.watch_phase();
        let _ = rx.wait_for(|p| *p >= phase).await;
    }

    /// Point-in-time view of every registered worker.
    pub fn workers(&self) -> Vec<WorkerSnapshot> {
        self.state.registry.snapshot()
    }

    /// True once a signal or fault latched the shutdown flag.
    pub fn is_shutdown_requested(&self) -> bool {
        self.state.is_shutdown_requested()
    }

    /// Latched shutdown cause, if any.
    pub fn cause(&self) -> Option<ShutdownCause> {
        self.state.cause()
    }
}
