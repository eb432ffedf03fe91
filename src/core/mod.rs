//! Runtime core: orchestration and lifecycle.
//!
//! The public API from this module is [`Supervisor`] (with its builder, handle
//! and report) plus the configuration and state types it exposes.
//!
//! Internal modules:
//! - [`supervisor`]: runs one worker group through the phase machine;
//! - [`runner`]: drives one worker to its terminal outcome, panic-isolated;
//! - [`escalator`]: turns worker faults into one group cancellation;
//! - [`sequencer`]: runs finalize hooks after the drain;
//! - [`signals`]: cross-platform termination signal bridge;
//! - [`registry`]: tracks task handles and their terminal outcomes;
//! - [`state`]: phase machine, shutdown latch and fault counter.

mod builder;
mod config;
mod escalator;
mod handle;
mod registry;
mod report;
mod runner;
mod sequencer;
mod signals;
mod state;
mod supervisor;

pub use builder::SupervisorBuilder;
pub use config::{CompletionPolicy, SupervisorConfig};
pub use handle::SupervisorHandle;
pub use registry::{TaskState, WorkerId, WorkerOutcome, WorkerSnapshot};
pub use report::ShutdownReport;
pub use sequencer::{AsyncHook, SyncHook};
pub use signals::SignalKind;
pub use state::{Phase, ShutdownCause};
pub use supervisor::Supervisor;
