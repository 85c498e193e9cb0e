//! Worker subprocesses for parallel builds.
//!
//! Each worker is a separate process running one chunk of the
//! configuration set. Workers never share memory with the coordinator:
//! they receive the configuration path and their indices, reload the
//! configurations themselves and answer with a single completion line.
//!
//! # Features
//!
//! - **Process isolation**: Each worker has its own memory space
//! - **Group termination**: Stopping a worker also stops its compilers
//! - **Explicit completion**: Success is a `done` line, never silence

pub mod ipc;
mod proc;
pub mod protocol;
pub mod runner;
pub mod signals;
mod spawn;
pub mod worker_main;

pub use proc::WorkerProcess;
pub use protocol::{WorkRequest, WorkResponse};
pub use runner::{RunResult, WorkerRunner};
pub use spawn::{ProcessLauncher, WorkerConfig, spawn_worker};
pub use worker_main::run_worker_main;
