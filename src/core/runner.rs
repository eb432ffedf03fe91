//! # Drive one worker to its terminal outcome.
//!
//! ```text
//! mark_running ─► publish WorkerSpawned ─► worker.spawn(token).await (panic-isolated)
//!                                               │
//!                        classify ◄─────────────┘
//!                           │
//!              registry.mark_terminal ─► observer.send(Completion)
//! ```
//!
//! ## Rules
//! - The worker future is polled exactly once to completion; it is never aborted.
//! - Panics (including a panic inside `Worker::spawn`) become `Failed` outcomes.
//! - The registry is updated **before** the escalator is notified, so anyone
//!   woken by the terminal counter already sees the recorded outcome.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::core::escalator::Completion;
use crate::core::registry::{WorkerId, WorkerOutcome};
use crate::core::state::SupervisorState;
use crate::events::{Event, EventKind};
use crate::workers::WorkerRef;

pub(crate) async fn run_worker(
    worker: WorkerRef,
    id: WorkerId,
    token: CancellationToken,
    state: Arc<SupervisorState>,
    observer: mpsc::UnboundedSender<Completion>,
) {
    let name: Arc<str> = Arc::from(worker.name());
    state.registry.mark_running(id);
    state
        .bus
        .publish(Event::new(EventKind::WorkerSpawned).with_worker(Arc::clone(&name)));

    let ctx = token.clone();
    let res = AssertUnwindSafe(async move { worker.spawn(ctx).await })
        .catch_unwind()
        .await;

    let requested = token.is_cancelled() || state.is_shutdown_requested();
    let outcome = WorkerOutcome::classify(res, requested);

    state.registry.mark_terminal(id, outcome.clone());
    let _ = observer.send(Completion {
        worker: name,
        outcome,
    });
}
