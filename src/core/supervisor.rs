//! # Supervisor: one run of a worker group, from spawn to finalize hooks.
//!
//! The [`Supervisor`] owns the configuration, the shared run state, the event
//! subscribers and the finalize hooks. [`Supervisor::run`] consumes it, so one
//! instance serves exactly one run.
//!
//! ## Key responsibilities
//! - subscribe to the [`Bus`](crate::Bus) and **fan-out** events via [`SubscriberSet`]
//! - register OS termination signals before any worker starts
//! - spawn every worker, wired to the escalator's completion channel
//! - wait for the first trigger (signal, fault, or all workers completed)
//! - cancel, drain (honouring [`SupervisorConfig::grace`]), run hooks, report
//!
//! ## High-level architecture
//! ```text
//! Inputs to run():
//!   Vec<WorkerRef>  ──►  Supervisor::run(workers)
//!
//! Preparation:
//!   - subscriber_listener(): Bus.subscribe() ─► SubscriberSet::emit(&Event)
//!   - SignalBridge::install(cfg.signals)          (registration errors abort the run)
//!   - Escalator::spawn() ─► completion sender
//!
//! Spawn workers:
//!   WorkerRef[0]  WorkerRef[1]  ...  WorkerRef[N-1]
//!       │             │                    │
//!       └──► registry.register(name) ─► (WorkerId, CancellationToken)
//!            set.spawn(run_worker(worker, id, token, state, completion sender))
//!
//! Phases:
//!   INIT ─► RUNNING ─────────────► SHUTTING_DOWN ─► DRAINING ─► FINALIZING ─► TERMINATED
//!              │                        │                │            │
//!        wait_for_trigger()     cancel_remaining()    drain()    hooks | skip
//!        (latch | escalation |                     (JoinSet,
//!         all completed)                            grace)
//! ```
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//! use gracevisor::{SignalKind, Supervisor, SupervisorConfig, WorkerError, WorkerFn, WorkerRef};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cfg = SupervisorConfig {
//!         signals: vec![],
//!         ..SupervisorConfig::default()
//!     };
//!     let sup = Supervisor::builder(cfg)
//!         .on_shutdown(|| Ok(()))
//!         .build();
//!     let handle = sup.handle();
//!
//!     let ticker: WorkerRef = WorkerFn::arc("ticker", |ctx: CancellationToken| async move {
//!         ctx.cancelled().await;
//!         Ok::<_, WorkerError>(())
//!     });
//!
//!     tokio::spawn(async move {
//!         tokio::time::sleep(Duration::from_millis(10)).await;
//!         handle.shutdown(SignalKind::Terminate);
//!     });
//!
//!     let report = sup.run(vec![ticker]).await?;
//!     assert_eq!(report.exit_code(), 0);
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;

use crate::core::{
    SupervisorBuilder, SupervisorConfig,
    escalator::Escalator,
    handle::SupervisorHandle,
    report::ShutdownReport,
    runner::run_worker,
    sequencer::Sequencer,
    signals::SignalBridge,
    state::{Phase, ShutdownCause, SupervisorState},
};
use crate::error::RuntimeError;
use crate::events::{Event, EventKind};
use crate::subscribers::{Subscribe, SubscriberSet};
use crate::workers::WorkerRef;

/// Coordinates one worker group through its lifecycle and graceful shutdown.
pub struct Supervisor {
    cfg: SupervisorConfig,
    state: Arc<SupervisorState>,
    subscribers: Vec<Arc<dyn Subscribe>>,
    hooks: Sequencer,
}

impl Supervisor {
    /// Returns a builder for subscribers and finalize hooks.
    pub fn builder(cfg: SupervisorConfig) -> SupervisorBuilder {
        SupervisorBuilder::new(cfg)
    }

    /// Creates a supervisor with only the built-in [`LogWriter`](crate::LogWriter)
    /// and no finalize hooks.
    pub fn new(cfg: SupervisorConfig) -> Self {
        SupervisorBuilder::new(cfg).build()
    }

    pub(crate) fn new_internal(
        cfg: SupervisorConfig,
        state: Arc<SupervisorState>,
        subscribers: Vec<Arc<dyn Subscribe>>,
        hooks: Sequencer,
    ) -> Self {
        Self {
            cfg,
            state,
            subscribers,
            hooks,
        }
    }

    /// Returns a control handle usable while `run` is in progress.
    pub fn handle(&self) -> SupervisorHandle {
        SupervisorHandle::new(Arc::clone(&self.state))
    }

    /// Runs `workers` until a termination signal, a worker fault or (under
    /// [`CompletionPolicy::Tolerate`](crate::CompletionPolicy::Tolerate)) natural
    /// completion of every worker; then cancels, drains and finalizes.
    ///
    /// Returns `Err` only when the run could not start. Worker and hook faults
    /// are reported through [`ShutdownReport::exit_code`].
    pub async fn run(self, workers: Vec<WorkerRef>) -> Result<ShutdownReport, RuntimeError> {
        if workers.is_empty() {
            return Err(RuntimeError::NoWorkers);
        }
        let Supervisor {
            cfg,
            state,
            subscribers,
            hooks,
        } = self;
        let listener = subscriber_listener(&state, subscribers);

        let bridge = match SignalBridge::install(&cfg.signals, &state) {
            Ok(bridge) => bridge,
            Err(e) => {
                state
                    .bus
                    .publish(Event::new(EventKind::Terminated).with_reason(e.as_message()));
                join_listener(listener).await;
                return Err(e);
            }
        };

        let stop = CancellationToken::new();
        let (completions, escalator) = Escalator::spawn(Arc::clone(&state), cfg.completion, stop.clone());

        let mut set = JoinSet::new();
        for worker in workers {
            let (id, token) = state.registry.register(worker.name());
            set.spawn(run_worker(
                worker,
                id,
                token,
                Arc::clone(&state),
                completions.clone(),
            ));
        }
        drop(completions);
        state.advance(Phase::Running);

        wait_for_trigger(&state, &cfg).await;

        state.advance(Phase::ShuttingDown);
        state.cancel_remaining();
        state.advance(Phase::Draining);

        let abandoned = drain(&state, &cfg, &mut set).await;

        stop.cancel();
        if let Err(e) = escalator.await {
            tracing::error!(error = %e, "escalator task failed");
        }

        state.advance(Phase::Finalizing);
        if abandoned.is_empty() {
            let faults = hooks.run(&state.bus).await;
            state.record_faults(faults);
        } else {
            hooks.skip(&state.bus);
        }
        state.advance(Phase::Terminated);
        bridge.uninstall();

        let cause = state.cause().unwrap_or(ShutdownCause::AllCompletedNormally);
        let report = ShutdownReport::new(cause, state.faults(), abandoned, cfg.fault_exit_code());

        state.bus.publish(
            Event::new(EventKind::Terminated).with_reason(report.cause().to_string()),
        );
        join_listener(listener).await;
        Ok(report)
    }
}

/// Subscribes to the bus and forwards events to the subscriber set until
/// `Terminated`, then flushes every subscriber queue.
fn subscriber_listener(
    state: &SupervisorState,
    subscribers: Vec<Arc<dyn Subscribe>>,
) -> JoinHandle<()> {
    let mut rx = state.bus.subscribe();
    let set = SubscriberSet::new(subscribers, state.bus.clone());
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(ev) => {
                    let last = ev.kind == EventKind::Terminated;
                    set.emit(&ev);
                    if last {
                        break;
                    }
                }
                Err(RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "subscriber listener lagged behind the bus");
                }
                Err(RecvError::Closed) => break,
            }
        }
        set.shutdown().await;
    })
}

async fn join_listener(listener: JoinHandle<()>) {
    if let Err(e) = listener.await {
        tracing::error!(error = %e, "subscriber listener failed");
    }
}

/// Returns once the shutdown flag is latched, latching it first when the
/// registry already holds a triggering outcome.
async fn wait_for_trigger(state: &SupervisorState, cfg: &SupervisorConfig) {
    let mut terminal = state.registry.watch_terminal();
    loop {
        let _ = terminal.borrow_and_update();
        if state.is_shutdown_requested() {
            return;
        }
        if let Some(cause) = state.registry.escalation_cause(cfg.completion) {
            state.request_shutdown(cause);
            return;
        }
        if state.registry.all_terminal() {
            state.request_shutdown(ShutdownCause::AllCompletedNormally);
            return;
        }

        tokio::select! {
            _ = state.shutdown_requested() => return,
            changed = terminal.changed() => {
                if changed.is_err() {
                    return;
                }
            }
        }
    }
}

/// Waits for every worker task to finish.
///
/// With a bounded grace, workers still running at the deadline are detached
/// (never aborted) and their names returned.
async fn drain(
    state: &SupervisorState,
    cfg: &SupervisorConfig,
    set: &mut JoinSet<()>,
) -> Vec<Arc<str>> {
    let Some(grace) = cfg.grace_limit() else {
        while set.join_next().await.is_some() {}
        state.bus.publish(Event::new(EventKind::AllStopped));
        return Vec::new();
    };

    let done = async { while set.join_next().await.is_some() {} };
    if tokio::time::timeout(grace, done).await.is_ok() {
        state.bus.publish(Event::new(EventKind::AllStopped));
        return Vec::new();
    }

    let stuck = state.registry.non_terminal();
    if stuck.is_empty() {
        // every runner already recorded its outcome; only task teardown remains
        while set.join_next().await.is_some() {}
        state.bus.publish(Event::new(EventKind::AllStopped));
        return stuck;
    }
    let names: Vec<&str> = stuck.iter().map(|n| n.as_ref()).collect();
    state.bus.publish(
        Event::new(EventKind::GraceExceeded)
            .with_grace(grace)
            .with_reason(names.join(", ")),
    );
    set.detach_all();
    state.record_faults(1);
    stuck
}
