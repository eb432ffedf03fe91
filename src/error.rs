//! Error types used by the gracevisor runtime, workers and finalize hooks.
//!
//! This module defines three enums:
//!
//! - [`RuntimeError`]: failures of the orchestration runtime itself (run setup).
//! - [`WorkerError`]: errors returned by individual worker bodies.
//! - [`HookError`]: errors returned (or panics raised) by finalize hooks.
//!
//! All of them provide `as_label` / `as_message` helpers for logs.

use thiserror::Error;

/// # Errors produced by the gracevisor runtime.
///
/// These are setup failures: once workers are running, every outcome is
/// reported through [`ShutdownReport`](crate::ShutdownReport) instead.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// `run` was called with an empty worker list.
    #[error("no workers supplied; at least one worker is required")]
    NoWorkers,

    /// Registering an OS signal listener failed.
    #[error("failed to register handler for {signal}: {source}")]
    SignalRegistration {
        /// Symbolic signal name.
        signal: &'static str,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use gracevisor::RuntimeError;
    ///
    /// assert_eq!(RuntimeError::NoWorkers.as_label(), "runtime_no_workers");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::NoWorkers => "runtime_no_workers",
            RuntimeError::SignalRegistration { .. } => "runtime_signal_registration",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            RuntimeError::NoWorkers => "no workers supplied".to_string(),
            RuntimeError::SignalRegistration { signal, source } => {
                format!("signal {signal} registration failed: {source}")
            }
        }
    }
}

/// # Errors produced by worker bodies.
///
/// Returning [`WorkerError::Canceled`] after observing the cancellation token is
/// the cooperative way to stop and is never treated as a fault.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum WorkerError {
    /// Worker failed with an application error.
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// Worker failed on I/O.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Worker acknowledged a cancellation request.
    #[error("context cancelled")]
    Canceled,
}

impl WorkerError {
    /// Builds a [`WorkerError::Fail`] from anything displayable.
    pub fn fail(error: impl std::fmt::Display) -> Self {
        WorkerError::Fail {
            error: error.to_string(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use gracevisor::WorkerError;
    ///
    /// assert_eq!(WorkerError::fail("boom").as_label(), "worker_failed");
    /// assert_eq!(WorkerError::Canceled.as_label(), "worker_canceled");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            WorkerError::Fail { .. } => "worker_failed",
            WorkerError::Io(_) => "worker_io",
            WorkerError::Canceled => "worker_canceled",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            WorkerError::Fail { error } => format!("error: {error}"),
            WorkerError::Io(e) => format!("io: {e}"),
            WorkerError::Canceled => "context cancelled".to_string(),
        }
    }

    /// True for the cooperative-stop variant.
    pub fn is_canceled(&self) -> bool {
        matches!(self, WorkerError::Canceled)
    }
}

/// # Errors produced by finalize hooks.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum HookError {
    /// Hook returned an error.
    #[error("hook failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// Hook panicked; the panic was caught.
    #[error("hook panicked: {info}")]
    Panicked {
        /// Panic payload rendered as text.
        info: String,
    },
}

impl HookError {
    /// Builds a [`HookError::Fail`] from anything displayable.
    pub fn fail(error: impl std::fmt::Display) -> Self {
        HookError::Fail {
            error: error.to_string(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            HookError::Fail { .. } => "hook_failed",
            HookError::Panicked { .. } => "hook_panicked",
        }
    }
}

/// Renders a caught panic payload as text.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worker_error_labels_are_stable() {
        assert_eq!(WorkerError::fail("x").as_label(), "worker_failed");
        let io = WorkerError::from(std::io::Error::other("refused"));
        assert_eq!(io.as_label(), "worker_io");
        assert_eq!(io.as_message(), "io: refused");
        assert!(WorkerError::Canceled.is_canceled());
        assert!(!WorkerError::fail("x").is_canceled());
    }

    #[test]
    fn runtime_error_message_includes_signal() {
        let err = RuntimeError::SignalRegistration {
            signal: "SIGTERM",
            source: std::io::Error::other("denied"),
        };
        assert_eq!(err.as_label(), "runtime_signal_registration");
        assert!(err.to_string().contains("SIGTERM"));
        assert!(err.as_message().contains("denied"));
    }

    #[test]
    fn panic_message_handles_str_and_string() {
        let a: Box<dyn std::any::Any + Send> = Box::new("static");
        let b: Box<dyn std::any::Any + Send> = Box::new(String::from("owned"));
        let c: Box<dyn std::any::Any + Send> = Box::new(42u8);
        assert_eq!(panic_message(a.as_ref()), "static");
        assert_eq!(panic_message(b.as_ref()), "owned");
        assert_eq!(panic_message(c.as_ref()), "non-string panic payload");
    }

    #[test]
    fn hook_error_labels() {
        assert_eq!(HookError::fail("disk").as_label(), "hook_failed");
        let p = HookError::Panicked { info: "x".into() };
        assert_eq!(p.as_label(), "hook_panicked");
        assert_eq!(p.to_string(), "hook panicked: x");
    }
}
