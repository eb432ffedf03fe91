//! # Worker abstractions.
//!
//! This module provides the worker-related types:
//! - [`Worker`] - trait for implementing async cancelable workers
//! - [`WorkerFn`] - function-based worker implementation
//! - [`WorkerRef`] - shared reference to a worker (`Arc<dyn Worker>`)

mod worker;
mod worker_fn;

pub use worker::{BoxWorkerFuture, Worker, WorkerRef};
pub use worker_fn::WorkerFn;
