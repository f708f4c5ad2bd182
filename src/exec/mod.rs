// src/exec/mod.rs

//! Task execution layer.
//!
//! Runs scheduled tasks against the shared [`crate::context::BuildContext`]
//! and reports back to the runtime via `RuntimeEvent`s.
//!
//! - [`executor_loop`] owns the loop that tracks running tasks.
//! - [`task_runner`] runs one task: file work on the blocking pool, the
//!   watcher and the dev server as long-lived futures.
//! - [`backend`] provides the `ExecutorBackend` trait and the
//!   `RealExecutorBackend` used in production; tests swap in a fake.

pub mod backend;
pub mod executor_loop;
pub mod task_runner;

pub use backend::{ExecutorBackend, RealExecutorBackend};
pub use executor_loop::spawn_executor;
