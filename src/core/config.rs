//! # Global runtime configuration.
//!
//! Provides [`SupervisorConfig`] centralized settings for the supervisor runtime.
//!
//! ## Sentinel values
//! - `grace = 0s` → unbounded drain (the supervisor waits for every worker forever)
//! - `bus_capacity = 0` → clamped to 1
//! - `signals = []` → no OS signal listeners (programmatic shutdown only)

use std::time::Duration;

use crate::core::signals::SignalKind;

/// How the supervisor treats a worker that returns on its own, without a
/// cancellation request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CompletionPolicy {
    /// Workers are expected to run until cancelled: an early return is a fault
    /// and escalates to group cancellation.
    #[default]
    Escalate,
    /// An early return is a clean terminal state. The run ends with
    /// [`ShutdownCause::AllCompletedNormally`](crate::ShutdownCause::AllCompletedNormally)
    /// once every worker completed.
    Tolerate,
}

/// Global configuration for the supervisor runtime.
///
/// ## Field semantics
/// - `grace`: Maximum drain time after cancellation (`0s` = unbounded)
/// - `bus_capacity`: Event bus ring buffer size (min 1)
/// - `fault_exit_code`: Exit code reported when any fault was observed
/// - `completion`: Treatment of workers that return without being cancelled
/// - `signals`: OS signals intercepted by the signal bridge
///
/// ## Notes
/// All fields are public for flexibility. Prefer using helper accessors to avoid
/// sprinkling sentinel checks (`0`) across the codebase.
#[derive(Clone, Debug)]
pub struct SupervisorConfig {
    /// Maximum time to wait for workers to stop after cancellation.
    ///
    /// When exceeded, the remaining workers are abandoned (left running,
    /// never aborted), the run counts a fault and finalize hooks are skipped.
    pub grace: Duration,

    /// Capacity of the event bus broadcast channel ring buffer.
    pub bus_capacity: usize,

    /// Exit code for a faulted run. Must be non-zero to be meaningful.
    pub fault_exit_code: i32,

    /// Treatment of workers that return on their own.
    pub completion: CompletionPolicy,

    /// Termination signals intercepted while the run is active.
    ///
    /// Once intercepted, a signal keeps tokio's handler for the rest of the
    /// process: after `run` returns it no longer terminates the process by
    /// default. Use an empty list to leave signal handling to the caller.
    pub signals: Vec<SignalKind>,
}

impl SupervisorConfig {
    /// Returns the drain grace as an `Option`.
    ///
    /// - `None` → unbounded
    /// - `Some(d)` → abandon workers after `d`
    #[inline]
    pub fn grace_limit(&self) -> Option<Duration> {
        if self.grace == Duration::ZERO {
            None
        } else {
            Some(self.grace)
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Returns the fault exit code, falling back to `1` when configured as `0`.
    #[inline]
    pub fn fault_exit_code(&self) -> i32 {
        if self.fault_exit_code == 0 {
            1
        } else {
            self.fault_exit_code
        }
    }
}

impl Default for SupervisorConfig {
    /// Default configuration:
    ///
    /// - `grace = 0s` (unbounded drain)
    /// - `bus_capacity = 1024`
    /// - `fault_exit_code = 1`
    /// - `completion = CompletionPolicy::Escalate`
    /// - `signals = [Interrupt, Terminate]`
    fn default() -> Self {
        Self {
            grace: Duration::ZERO,
            bus_capacity: 1024,
            fault_exit_code: 1,
            completion: CompletionPolicy::default(),
            signals: vec![SignalKind::Interrupt, SignalKind::Terminate],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_unbounded_and_escalating() {
        let cfg = SupervisorConfig::default();
        assert_eq!(cfg.grace_limit(), None);
        assert_eq!(cfg.completion, CompletionPolicy::Escalate);
        assert_eq!(cfg.fault_exit_code(), 1);
        assert_eq!(
            cfg.signals,
            vec![SignalKind::Interrupt, SignalKind::Terminate]
        );
    }

    #[test]
    fn sentinels_are_normalized() {
        let cfg = SupervisorConfig {
            grace: Duration::from_millis(250),
            bus_capacity: 0,
            fault_exit_code: 0,
            ..SupervisorConfig::default()
        };
        assert_eq!(cfg.grace_limit(), Some(Duration::from_millis(250)));
        assert_eq!(cfg.bus_capacity_clamped(), 1);
        assert_eq!(cfg.fault_exit_code(), 1);
    }
}
