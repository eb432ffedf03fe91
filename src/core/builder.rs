use std::future::Future;
use std::sync::Arc;

use crate::{
    core::SupervisorConfig,
    error::HookError,
    events::Bus,
    subscribers::{LogWriter, Subscribe},
};
use super::{sequencer::Sequencer, state::SupervisorState, supervisor::Supervisor};

/// Builder for constructing a [`Supervisor`] with subscribers and finalize hooks.
pub struct SupervisorBuilder {
    cfg: SupervisorConfig,
    subscribers: Vec<Arc<dyn Subscribe>>,
    hooks: Sequencer,
}

impl SupervisorBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: SupervisorConfig) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
            hooks: Sequencer::default(),
        }
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive runtime events (phases, signals, worker faults, hooks)
    /// through dedicated workers with bounded queues. The built-in [`LogWriter`]
    /// is always installed in addition to these.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Adds one event subscriber.
    pub fn with_subscriber(mut self, subscriber: Arc<dyn Subscribe>) -> Self {
        self.subscribers.push(subscriber);
        self
    }

    /// Sets the synchronous finalize hook.
    ///
    /// Runs once, after every worker reached a terminal state and before the
    /// asynchronous hook. Replaces a previously set synchronous hook.
    pub fn on_shutdown<F>(mut self, hook: F) -> Self
    where
        F: FnOnce() -> Result<(), HookError> + Send + 'static,
    {
        self.hooks.set_sync(hook);
        self
    }

    /// Sets the asynchronous finalize hook, awaited after the synchronous one.
    pub fn on_shutdown_async<F, Fut>(mut self, hook: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), HookError>> + Send + 'static,
    {
        self.hooks.set_async(hook);
        self
    }

    /// Builds the supervisor.
    ///
    /// Nothing is spawned and no signal is registered until
    /// [`Supervisor::run`] is called.
    pub fn build(self) -> Supervisor {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let state = Arc::new(SupervisorState::new(bus));

        let mut subscribers: Vec<Arc<dyn Subscribe>> = Vec::with_capacity(self.subscribers.len() + 1);
        subscribers.push(Arc::new(LogWriter::new()));
        subscribers.extend(self.subscribers);

        Supervisor::new_internal(self.cfg, state, subscribers, self.hooks)
    }
}
