//! # Outcome of one supervised run.

use std::process::ExitCode;
use std::sync::Arc;

use crate::core::state::ShutdownCause;

/// Result of [`Supervisor::run`](crate::Supervisor::run).
///
/// The exit code is `0` when no fault was observed at any point of the run
/// (while running, during drain, or in finalize hooks) and
/// [`SupervisorConfig::fault_exit_code`](crate::SupervisorConfig::fault_exit_code)
/// otherwise.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShutdownReport {
    cause: ShutdownCause,
    faults: usize,
    abandoned: Vec<Arc<str>>,
    exit_code: i32,
}

impl ShutdownReport {
    pub(crate) fn new(
        cause: ShutdownCause,
        faults: usize,
        abandoned: Vec<Arc<str>>,
        fault_exit_code: i32,
    ) -> Self {
        let exit_code = if faults == 0 { 0 } else { fault_exit_code };
        Self {
            cause,
            faults,
            abandoned,
            exit_code,
        }
    }

    /// What triggered the shutdown.
    pub fn cause(&self) -> &ShutdownCause {
        &self.cause
    }

    /// Number of faults observed (worker faults, hook faults, grace overrun).
    pub fn faults(&self) -> usize {
        self.faults
    }

    /// Workers still running when the grace period ran out.
    pub fn abandoned(&self) -> &[Arc<str>] {
        &self.abandoned
    }

    /// True when no fault was observed.
    pub fn is_clean(&self) -> bool {
        self.faults == 0
    }

    /// Process exit code for this run.
    pub fn exit_code(&self) -> i32 {
        self.exit_code
    }

    fn process_code(&self) -> u8 {
        u8::try_from(self.exit_code).unwrap_or(1)
    }
}

impl From<&ShutdownReport> for ExitCode {
    /// Codes outside `0..=255` collapse to `1`.
    fn from(report: &ShutdownReport) -> Self {
        ExitCode::from(report.process_code())
    }
}
