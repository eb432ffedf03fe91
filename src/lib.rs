//! # gracevisor
//!
//! **Gracevisor** supervises a fixed group of long-running async workers for
//! the lifetime of a process and shuts them down together.
//!
//! A run ends on the first of: a termination signal, a worker fault, or
//! (optionally) every worker completing on its own. Whatever the trigger, every
//! remaining worker gets exactly one cooperative cancellation request, the run
//! waits until all of them are terminal, runs finalize hooks, and reports an
//! exit code that tells clean shutdowns from faulted ones.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │  WorkerRef   │   │  WorkerRef   │   │  WorkerRef   │
//!     │  (listener)  │   │   (ticker)   │   │     ...      │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Supervisor::run (one run per instance)                           │
//! │  - SignalBridge (SIGINT/SIGTERM → one cancellation request)       │
//! │  - Registry (task handles, one CancellationToken each)            │
//! │  - Escalator (completion channel → fault → group cancellation)    │
//! │  - Sequencer (sync hook, then async hook, after full drain)       │
//! └──────┬──────────────────┬──────────────────┬───────────────┬──────┘
//!        ▼                  ▼                  ▼               │
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐   │
//!     │  run_worker  │   │  run_worker  │   │  run_worker  │   │
//!     │ (catch_unwind│   │ (catch_unwind│   │ (catch_unwind│   │
//!     │  + classify) │   │  + classify) │   │  + classify) │   │
//!     └┬─────────────┘   └┬─────────────┘   └┬─────────────┘   │
//!      │ WorkerSpawned    │ Completion       │                 │
//!      ▼                  ▼                  ▼                 ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                        Bus (broadcast channel)                    │
//! │              (capacity: SupervisorConfig::bus_capacity)           │
//! └─────────────────────────────────┬─────────────────────────────────┘
//!                                   ▼
//!                       ┌────────────────────────┐
//!                       │  subscriber_listener   │
//!                       └───────────┬────────────┘
//!                                   ▼
//!                             SubscriberSet
//!                          ┌────────┼─────────┐
//!                          ▼        ▼         ▼
//!                      LogWriter   sub1  ...  subN
//! ```
//!
//! ### Lifecycle
//! ```text
//! INIT ──► RUNNING ──► SHUTTING_DOWN ──► DRAINING ──► FINALIZING ──► TERMINATED
//!
//! RUNNING:        wait for: shutdown latch | escalating outcome | all completed (Tolerate)
//! SHUTTING_DOWN:  cancel every Pending/Running handle (idempotent)
//! DRAINING:       wait for every handle to be terminal (bounded by grace, if set)
//! FINALIZING:     sync hook ─► async hook   (skipped if workers were abandoned)
//! TERMINATED:     signal listeners removed, ShutdownReport returned
//! ```
//!
//! ## Features
//! | Area              | Description                                                    | Key types / traits                          |
//! |-------------------|----------------------------------------------------------------|---------------------------------------------|
//! | **Subscriber API**| Observe lifecycle events (logging, metrics, tests).            | [`Subscribe`], [`LogWriter`]                |
//! | **Supervision**   | Run one worker group through graceful shutdown.                | [`Supervisor`], [`SupervisorHandle`]        |
//! | **Errors**        | Typed errors for setup, workers and hooks.                     | [`RuntimeError`], [`WorkerError`], [`HookError`] |
//! | **Workers**       | Define workers as closures or trait objects.                   | [`Worker`], [`WorkerFn`], [`WorkerRef`]     |
//! | **Configuration** | Grace period, completion policy, signals, exit code.           | [`SupervisorConfig`], [`CompletionPolicy`]  |
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//! use gracevisor::{
//!     HookError, ShutdownCause, SignalKind, Supervisor, SupervisorConfig, WorkerError, WorkerFn,
//!     WorkerRef,
//! };
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cfg = SupervisorConfig {
//!         grace: Duration::from_secs(5),
//!         signals: vec![],
//!         ..SupervisorConfig::default()
//!     };
//!
//!     let sup = Supervisor::builder(cfg)
//!         .on_shutdown(|| Ok(()))
//!         .on_shutdown_async(|| async { Ok::<_, HookError>(()) })
//!         .build();
//!     let handle = sup.handle();
//!
//!     let ticker: WorkerRef = WorkerFn::arc("ticker", |ctx: CancellationToken| async move {
//!         loop {
//!             tokio::select! {
//!                 _ = ctx.cancelled() => return Ok::<_, WorkerError>(()),
//!                 _ = tokio::time::sleep(Duration::from_millis(5)) => {}
//!             }
//!         }
//!     });
//!
//!     tokio::spawn(async move {
//!         tokio::time::sleep(Duration::from_millis(20)).await;
//!         handle.shutdown(SignalKind::Interrupt);
//!     });
//!
//!     let report = sup.run(vec![ticker]).await?;
//!     assert_eq!(report.cause(), &ShutdownCause::SignalReceived(SignalKind::Interrupt));
//!     assert_eq!(report.exit_code(), 0);
//!     Ok(())
//! }
//! ```
mod core;
mod error;
mod events;
mod subscribers;
mod workers;

// ---- Public re-exports ----

pub use core::{
    AsyncHook, CompletionPolicy, Phase, ShutdownCause, ShutdownReport, SignalKind, Supervisor,
    SupervisorBuilder, SupervisorConfig, SupervisorHandle, SyncHook, TaskState, WorkerId,
    WorkerOutcome, WorkerSnapshot,
};
pub use error::{HookError, RuntimeError, WorkerError};
pub use events::{Bus, Event, EventKind};
pub use subscribers::{LogWriter, Subscribe, SubscriberSet};
pub use workers::{BoxWorkerFuture, Worker, WorkerFn, WorkerRef};
