//! # Function-backed worker (`WorkerFn`)
//!
//! [`WorkerFn`] wraps a closure `F: Fn(CancellationToken) -> Fut`, producing the
//! worker future when the supervisor spawns it.
//!
//! ## Example
//! ```rust
//! use tokio_util::sync::CancellationToken;
//! use gracevisor::{WorkerFn, WorkerRef, WorkerError};
//!
//! let w: WorkerRef = WorkerFn::arc("worker", |ctx: CancellationToken| async move {
//!     ctx.cancelled().await;
//!     Ok::<_, WorkerError>(())
//! });
//!
//! assert_eq!(w.name(), "worker");
//! ```

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::error::WorkerError;
use crate::workers::worker::{BoxWorkerFuture, Worker};

/// Function-backed worker implementation.
#[derive(Debug)]
pub struct WorkerFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> WorkerFn<F> {
    /// Creates a new function-backed worker.
    ///
    /// Prefer [`WorkerFn::arc`] when you immediately need a [`WorkerRef`](crate::WorkerRef).
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Creates the worker and returns it as a shared handle (`Arc<dyn Worker>`).
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

impl<F, Fut> Worker for WorkerFn<F>
where
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), WorkerError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn spawn(&self, ctx: CancellationToken) -> BoxWorkerFuture {
        Box::pin((self.f)(ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::WorkerRef;

    #[tokio::test]
    async fn spawn_passes_token_through() {
        let w: WorkerRef = WorkerFn::arc("echo", |ctx: CancellationToken| async move {
            ctx.cancelled().await;
            Err(WorkerError::Canceled)
        });
        let token = CancellationToken::new();
        token.cancel();

        let res = w.spawn(token).await;
        assert!(matches!(res, Err(WorkerError::Canceled)));
        assert_eq!(w.name(), "echo");
    }
}
