//! Worker subprocess spawning.
//!
//! Workers are this same executable started with `--internal-worker`, each
//! in its own process group so that terminating a worker also reaches the
//! compiler drivers it started.

use super::proc::WorkerProcess;
use super::protocol::WorkRequest;
use crate::coordinator::{Launcher, WorkerAssignment, WorkerEvent, WorkerHandle};
use crate::error::{MultibuildError, Result};
use crate::logging::LogFormat;
use crate::options::BuildOptions;
use crossbeam_channel::Sender;
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use tracing::debug;

/// Settings forwarded from the coordinator's command line to each worker.
#[derive(Debug, Clone, Default)]
pub struct WorkerConfig {
    /// Number of `-v` flags.
    pub verbose: u8,
    /// Only log errors.
    pub quiet: bool,
    /// Disable colored status lines.
    pub no_color: bool,
    /// Explicit log format; workers otherwise pick it up from the environment.
    pub log_format: Option<LogFormat>,
}

impl WorkerConfig {
    fn args(&self, config_path: &Path) -> Vec<String> {
        let mut args = Vec::new();
        for _ in 0..self.verbose {
            args.push("-v".to_string());
        }
        if self.quiet {
            args.push("-q".to_string());
        }
        if self.no_color {
            args.push("--no-color".to_string());
        }
        if let Some(format) = self.log_format {
            args.push("--log-format".to_string());
            args.push(format.to_string());
        }
        args.push("build".to_string());
        args.push(config_path.display().to_string());
        args.push("--internal-worker".to_string());
        args
    }
}

/// Spawn a worker subprocess of `exe`.
///
/// The configuration path is only passed for visibility in process
/// listings; the actual work arrives as a [`WorkRequest`] on stdin.
pub fn spawn_worker(exe: &Path, config_path: &Path, config: &WorkerConfig) -> Result<Child> {
    let mut cmd = Command::new(exe);
    cmd.args(config.args(config_path));

    // Set up IPC pipes
    cmd.stdin(Stdio::piped());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::inherit()); // Status lines go straight to the operator

    cmd.process_group(0);

    cmd.spawn()
        .map_err(|e| MultibuildError::Worker(format!("Failed to spawn worker: {}", e)))
}

/// Launches worker processes for the coordinator.
#[derive(Debug, Clone)]
pub struct ProcessLauncher {
    exe: PathBuf,
    config_path: PathBuf,
    options: BuildOptions,
    worker_config: WorkerConfig,
}

impl ProcessLauncher {
    /// Launcher re-executing the current binary.
    pub fn new(config_path: &Path, options: BuildOptions, worker_config: WorkerConfig) -> Result<Self> {
        let exe = std::env::current_exe().map_err(|e| {
            MultibuildError::Worker(format!("Failed to get current executable: {}", e))
        })?;
        Ok(Self::with_executable(exe, config_path, options, worker_config))
    }

    /// Launcher running `exe` as the worker program.
    pub fn with_executable(
        exe: impl Into<PathBuf>,
        config_path: &Path,
        options: BuildOptions,
        worker_config: WorkerConfig,
    ) -> Self {
        Self {
            exe: exe.into(),
            config_path: config_path.to_path_buf(),
            options,
            worker_config,
        }
    }
}

impl Launcher for ProcessLauncher {
    fn launch(
        &mut self,
        assignment: WorkerAssignment,
        events: Sender<WorkerEvent>,
    ) -> Result<Box<dyn WorkerHandle>> {
        let child = spawn_worker(&self.exe, &self.config_path, &self.worker_config)?;
        debug!(worker = assignment.worker, pid = child.id(), ids = ?assignment.ids, "Spawned worker");

        let request = WorkRequest::build(&self.config_path, assignment.ids, &self.options);
        let process = WorkerProcess::start(assignment.worker, child, &request, events)?;
        Ok(Box::new(process))
    }
}

/// Stack size for collector threads (256 KiB).
///
/// Collectors only frame lines and reap their worker.
pub const COLLECTOR_STACK_SIZE: usize = 256 * 1024;

/// Spawn a named collector thread.
pub fn spawn_collector_thread<F, T>(name: &str, f: F) -> Result<std::thread::JoinHandle<T>>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    std::thread::Builder::new()
        .name(name.to_string())
        .stack_size(COLLECTOR_STACK_SIZE)
        .spawn(f)
        .map_err(|e| MultibuildError::Worker(format!("Failed to spawn collector thread: {}", e)))
}
