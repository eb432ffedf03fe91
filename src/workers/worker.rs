//! # Worker abstraction.
//!
//! A worker is a long-running unit of concurrent work supplied by the
//! application. The supervisor calls [`Worker::spawn`] exactly once per run and
//! drives the returned future until it finishes.
//!
//! ## Cancellation discipline
//! The worker receives a [`CancellationToken`] and must observe it at its own
//! suspension points (between loop iterations, inside `select!` waits). On
//! cancellation it stops new work, performs bounded cleanup and returns
//! `Ok(())` or `Err(WorkerError::Canceled)`. A worker that never looks at the
//! token is never stopped: the supervisor does not abort workers.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::error::WorkerError;

/// Boxed future returned by [`Worker::spawn`].
pub type BoxWorkerFuture = Pin<Box<dyn Future<Output = Result<(), WorkerError>> + Send + 'static>>;

/// Shared handle to a worker.
pub type WorkerRef = Arc<dyn Worker>;

/// # Asynchronous, cancelable unit of work.
///
/// # Example
/// ```
/// use std::time::Duration;
/// use tokio_util::sync::CancellationToken;
/// use gracevisor::{BoxWorkerFuture, Worker};
///
/// struct Ticker;
///
/// impl Worker for Ticker {
///     fn name(&self) -> &str { "ticker" }
///
///     fn spawn(&self, ctx: CancellationToken) -> BoxWorkerFuture {
///         Box::pin(async move {
///             loop {
///                 tokio::select! {
///                     _ = ctx.cancelled() => return Ok(()),
///                     _ = tokio::time::sleep(Duration::from_secs(1)) => {}
///                 }
///             }
///         })
///     }
/// }
/// ```
pub trait Worker: Send + Sync + 'static {
    /// Returns a stable, human-readable worker name.
    fn name(&self) -> &str;

    /// Creates the worker future.
    ///
    /// The future owns everything it needs; `ctx` is the only channel shared
    /// with the supervisor.
    fn spawn(&self, ctx: CancellationToken) -> BoxWorkerFuture;
}
