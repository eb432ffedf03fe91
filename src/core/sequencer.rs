//! # Shutdown sequencer: finalize hooks after full drain.
//!
//! ```text
//! FINALIZING
//!   ├─ sync hook   (if any)  ── run to completion, panic-isolated
//!   └─ async hook  (if any)  ── awaited to completion, panic-isolated
//! ```
//!
//! A failing or panicking hook is reported as `HookFailed` and counted as a
//! fault. It never re-triggers cancellation: every worker is already terminal.

use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use futures::future::BoxFuture;

use crate::error::{HookError, panic_message};
use crate::events::{Bus, Event, EventKind};

/// Synchronous finalize hook.
pub type SyncHook = Box<dyn FnOnce() -> Result<(), HookError> + Send + 'static>;

/// Asynchronous finalize hook.
pub type AsyncHook = Box<dyn FnOnce() -> BoxFuture<'static, Result<(), HookError>> + Send + 'static>;

const SYNC: &str = "sync";
const ASYNC: &str = "async";

#[derive(Default)]
pub(crate) struct Sequencer {
    sync: Option<SyncHook>,
    async_hook: Option<AsyncHook>,
}

impl Sequencer {
    pub(crate) fn set_sync<F>(&mut self, f: F)
    where
        F: FnOnce() -> Result<(), HookError> + Send + 'static,
    {
        self.sync = Some(Box::new(f));
    }

    pub(crate) fn set_async<F, Fut>(&mut self, f: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), HookError>> + Send + 'static,
    {
        self.async_hook = Some(Box::new(move || f().boxed()));
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.sync.is_none() && self.async_hook.is_none()
    }

    /// Runs the sync hook, then the async hook. Returns the number of faults.
    pub(crate) async fn run(self, bus: &Bus) -> usize {
        let mut faults = 0;

        if let Some(hook) = self.sync {
            bus.publish(Event::new(EventKind::HookStarted).with_hook(SYNC));
            let res = std::panic::catch_unwind(AssertUnwindSafe(hook))
                .unwrap_or_else(|p| Err(HookError::Panicked { info: panic_message(&*p) }));
            faults += report(bus, SYNC, res);
        }

        if let Some(hook) = self.async_hook {
            bus.publish(Event::new(EventKind::HookStarted).with_hook(ASYNC));
            let res = AssertUnwindSafe(async move { hook().await })
                .catch_unwind()
                .await
                .unwrap_or_else(|p| Err(HookError::Panicked { info: panic_message(&*p) }));
            faults += report(bus, ASYNC, res);
        }

        faults
    }

    /// Drops the hooks unrun.
    pub(crate) fn skip(self, bus: &Bus) {
        if !self.is_empty() {
            bus.publish(Event::new(EventKind::HooksSkipped));
        }
    }
}

fn report(bus: &Bus, hook: &'static str, res: Result<(), HookError>) -> usize {
    match res {
        Ok(()) => {
            bus.publish(Event::new(EventKind::HookCompleted).with_hook(hook));
            0
        }
        Err(e) => {
            bus.publish(
                Event::new(EventKind::HookFailed)
                    .with_hook(hook)
                    .with_reason(e.to_string()),
            );
            1
        }
    }
}
