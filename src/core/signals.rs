//! # Signal bridge: OS termination signals → one cancellation request.
//!
//! The bridge registers its listeners synchronously, before any worker is
//! spawned, and keeps them for the whole run. Every delivery goes through
//! [`deliver`], which logs the signal and latches the shutdown flag. Only the
//! first delivery (or the first fault, whichever wins the latch) broadcasts
//! cancellation; the rest are no-ops.
//!
//! ## Signals
//! **Unix platforms:**
//! - `SIGINT` (Ctrl-C in terminal)
//! - `SIGTERM` (default kill signal, used by systemd/Kubernetes)
//! - `SIGQUIT` (opt-in via [`SupervisorConfig::signals`](crate::SupervisorConfig))
//!
//! **Windows platforms:**
//! - `Ctrl-C` maps to [`SignalKind::Interrupt`]; other kinds are ignored.
//!
//! Listeners are tokio tasks, so the delivery path runs in normal async
//! context; it still does nothing but an atomic compare-and-swap and a short
//! mutex-guarded pass over the registry.
//!
//! ## After the run
//! Uninstalling only stops this run's listeners. tokio keeps its process-wide
//! handler for every signal it has registered, so the OS default disposition
//! is **not** restored: a later `SIGINT`/`SIGTERM` no longer kills the process.
//! Programs that keep running after [`Supervisor::run`](crate::Supervisor::run)
//! must handle or exit on those signals themselves.

use std::fmt;
use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::core::state::{ShutdownCause, SupervisorState};
use crate::error::RuntimeError;
use crate::events::{Event, EventKind};

/// Termination signal classes handled by the supervisor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SignalKind {
    /// `SIGINT` / Ctrl-C.
    Interrupt,
    /// `SIGTERM`.
    Terminate,
    /// `SIGQUIT`.
    Quit,
}

impl SignalKind {
    /// Symbolic name, e.g. `"SIGTERM"`.
    pub fn name(self) -> &'static str {
        match self {
            SignalKind::Interrupt => "SIGINT",
            SignalKind::Terminate => "SIGTERM",
            SignalKind::Quit => "SIGQUIT",
        }
    }

    /// POSIX signal number.
    pub fn number(self) -> i32 {
        match self {
            SignalKind::Interrupt => 2,
            SignalKind::Quit => 3,
            SignalKind::Terminate => 15,
        }
    }

    /// Short description as printed by `strsignal(3)`.
    pub fn description(self) -> &'static str {
        match self {
            SignalKind::Interrupt => "Interrupt",
            SignalKind::Terminate => "Terminated",
            SignalKind::Quit => "Quit",
        }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Delivers one termination request into the run.
///
/// Shared by OS listeners and [`SupervisorHandle::shutdown`](crate::SupervisorHandle::shutdown).
pub(crate) fn deliver(state: &SupervisorState, kind: SignalKind) {
    tracing::info!(
        signal = kind.name(),
        "Received exit signal {}={} {}",
        kind.name(),
        kind.number(),
        kind.description()
    );
    state
        .bus
        .publish(Event::new(EventKind::SignalReceived).with_signal(kind));
    state.request_shutdown(ShutdownCause::SignalReceived(kind));
}

#[cfg(unix)]
type SignalStream = tokio::signal::unix::Signal;

#[cfg(unix)]
fn listen(kind: SignalKind) -> std::io::Result<Option<SignalStream>> {
    use tokio::signal::unix::{SignalKind as OsSignal, signal};

    let os = match kind {
        SignalKind::Interrupt => OsSignal::interrupt(),
        SignalKind::Terminate => OsSignal::terminate(),
        SignalKind::Quit => OsSignal::quit(),
    };
    signal(os).map(Some)
}

#[cfg(windows)]
type SignalStream = tokio::signal::windows::CtrlC;

#[cfg(windows)]
fn listen(kind: SignalKind) -> std::io::Result<Option<SignalStream>> {
    match kind {
        SignalKind::Interrupt => tokio::signal::windows::ctrl_c().map(Some),
        SignalKind::Terminate | SignalKind::Quit => Ok(None),
    }
}

/// Registered OS listeners for one run.
pub(crate) struct SignalBridge {
    listeners: Vec<JoinHandle<()>>,
}

impl SignalBridge {
    /// Registers listeners for `kinds` and starts forwarding deliveries.
    ///
    /// All OS registrations happen before the first listener task is spawned,
    /// so a failure leaves nothing behind.
    pub(crate) fn install(
        kinds: &[SignalKind],
        state: &Arc<SupervisorState>,
    ) -> Result<Self, RuntimeError> {
        let mut streams = Vec::with_capacity(kinds.len());
        for &kind in kinds {
            if streams.iter().any(|(k, _)| *k == kind) {
                continue;
            }
            let stream = listen(kind).map_err(|source| RuntimeError::SignalRegistration {
                signal: kind.name(),
                source,
            })?;
            match stream {
                Some(stream) => streams.push((kind, stream)),
                None => tracing::debug!(signal = kind.name(), "signal not supported on this platform"),
            }
        }

        let listeners = streams
            .into_iter()
            .map(|(kind, mut stream)| {
                let state = Arc::clone(state);
                tokio::spawn(async move {
                    while stream.recv().await.is_some() {
                        deliver(&state, kind);
                    }
                })
            })
            .collect();

        Ok(Self { listeners })
    }

    /// Deregisters every listener; later deliveries no longer reach this run.
    ///
    /// tokio's process-level handler stays installed, so deliveries after this
    /// point are swallowed rather than terminating the process.
    pub(crate) fn uninstall(self) {
        for listener in self.listeners {
            listener.abort();
        }
    }
}
