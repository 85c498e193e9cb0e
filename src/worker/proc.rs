//! Process handle for worker subprocesses.
//!
//! A collector thread owns the child: it reads the worker's stdout, reports
//! the explicit completion line, reaps the process and reports a failure
//! if the worker exits without completing.
//!
//! Termination sends SIGTERM to the worker's process group and escalates
//! to SIGKILL when the worker is still running after a grace period.

use super::ipc::{LineReader, LineWriter};
use super::protocol::{WorkRequest, WorkResponse};
use super::signals::TerminationReason;
use super::spawn::spawn_collector_thread;
use crate::coordinator::{WorkerEvent, WorkerHandle};
use crate::error::{MultibuildError, Result};
use crossbeam_channel::Sender;
use nix::errno::Errno;
use nix::sys::signal::{Signal, killpg};
use nix::unistd::Pid;
use std::io::Read;
use std::process::Child;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

/// How long a worker gets to exit after SIGTERM before SIGKILL.
pub const TERMINATE_GRACE_PERIOD: Duration = Duration::from_secs(3);

/// Interval at which the grace period checks whether the worker exited.
const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Handle to a running worker subprocess.
pub struct WorkerProcess {
    worker: usize,
    /// Process ID, also the ID of the worker's process group.
    pid: Pid,
    /// Set by the collector once the process has been reaped.
    exited: Arc<AtomicBool>,
    /// SIGTERM was sent and SIGKILL is scheduled.
    terminating: bool,
    collector: Option<JoinHandle<()>>,
}

impl WorkerProcess {
    /// Hand `child` to a collector thread and send it `request`.
    ///
    /// Exactly one [`WorkerEvent`] for `worker` is sent on `events`.
    pub fn start(
        worker: usize,
        mut child: Child,
        request: &WorkRequest,
        events: Sender<WorkerEvent>,
    ) -> Result<Self> {
        let pid = Pid::from_raw(child.id() as i32);
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| MultibuildError::Worker("Child stdin not captured".into()));
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| MultibuildError::Worker("Child stdout not captured".into()));

        let exited = Arc::new(AtomicBool::new(false));
        let collector = {
            let exited = Arc::clone(&exited);
            spawn_collector_thread(&format!("worker-{}", worker), move || {
                collect(worker, child, stdout.ok(), events, &exited)
            })?
        };
        let mut process = Self {
            worker,
            pid,
            exited,
            terminating: false,
            collector: Some(collector),
        };

        // The collector reports the failure if this does not reach the worker.
        if let Err(e) = stdin.and_then(|stdin| {
            let mut writer = LineWriter::new(stdin);
            writer.write_line(&request.to_line()?)?;
            Ok(())
        }) {
            process.terminate();
            return Err(MultibuildError::Worker(format!(
                "Failed to send request to worker {}: {}",
                worker, e
            )));
        }

        Ok(process)
    }

    /// Whether the worker has not been reaped yet.
    pub fn is_running(&self) -> bool {
        !self.exited.load(Ordering::SeqCst)
    }

    /// Send SIGTERM to the worker's process group, followed by SIGKILL
    /// if the worker outlives [`TERMINATE_GRACE_PERIOD`].
    ///
    /// Only the first call signals; later calls are no-ops.
    pub fn terminate(&mut self) {
        if !self.is_running() || self.terminating {
            return;
        }
        self.terminating = true;
        match killpg(self.pid, Signal::SIGTERM) {
            Ok(()) => debug!(worker = self.worker, pid = %self.pid, "Sent SIGTERM to worker"),
            // Already gone; the collector is about to reap it.
            Err(Errno::ESRCH) => return,
            Err(e) => warn!(worker = self.worker, error = %e, "Failed to terminate worker"),
        }

        let (worker, pid) = (self.worker, self.pid);
        let exited = Arc::clone(&self.exited);
        if let Err(e) = spawn_collector_thread(&format!("worker-{}-kill", worker), move || {
            kill_after_grace_period(worker, pid, &exited)
        }) {
            warn!(worker, error = %e, "Failed to schedule SIGKILL, killing worker now");
            kill_group(worker, pid);
        }
    }
}

impl WorkerHandle for WorkerProcess {
    fn worker(&self) -> usize {
        self.worker
    }

    fn terminate(&mut self) {
        WorkerProcess::terminate(self);
    }
}

impl Drop for WorkerProcess {
    fn drop(&mut self) {
        self.terminate();
        if let Some(collector) = self.collector.take()
            && collector.join().is_err()
        {
            warn!(worker = self.worker, "Collector thread panicked");
        }
    }
}

/// Wait up to [`TERMINATE_GRACE_PERIOD`] for the worker to be reaped,
/// then SIGKILL its process group.
fn kill_after_grace_period(worker: usize, pid: Pid, exited: &AtomicBool) {
    let deadline = Instant::now() + TERMINATE_GRACE_PERIOD;
    while Instant::now() < deadline {
        if exited.load(Ordering::SeqCst) {
            return;
        }
        std::thread::sleep(EXIT_POLL_INTERVAL);
    }
    if exited.load(Ordering::SeqCst) {
        return;
    }
    warn!(worker, %pid, "Worker ignored SIGTERM, sending SIGKILL");
    kill_group(worker, pid);
}

fn kill_group(worker: usize, pid: Pid) {
    match killpg(pid, Signal::SIGKILL) {
        Ok(()) | Err(Errno::ESRCH) => {}
        Err(e) => warn!(worker, error = %e, "Failed to kill worker"),
    }
}

/// Collector thread body.
fn collect(
    worker: usize,
    mut child: Child,
    stdout: Option<impl Read>,
    events: Sender<WorkerEvent>,
    exited: &AtomicBool,
) {
    let mut completed = false;
    if let Some(stdout) = stdout {
        completed = read_responses(worker, stdout, &events);
    }

    let reason = match child.wait() {
        Ok(status) => TerminationReason::from(status),
        Err(e) => {
            warn!(worker, error = %e, "Failed to wait for worker");
            TerminationReason::Unknown
        }
    };
    exited.store(true, Ordering::SeqCst);
    debug!(worker, %reason, completed, "Worker exited");

    if !completed {
        let _ = events.send(WorkerEvent::Failed {
            worker,
            reason: reason.to_string(),
        });
    }
}

/// Read worker stdout until EOF. Returns whether `done` was seen.
fn read_responses(worker: usize, stdout: impl Read, events: &Sender<WorkerEvent>) -> bool {
    let mut reader = LineReader::new(stdout);
    let mut completed = false;
    loop {
        match reader.read_line() {
            Ok(Some(line)) => match WorkResponse::from_line(&line) {
                Ok(WorkResponse::Done) if !completed => {
                    completed = true;
                    let _ = events.send(WorkerEvent::Completed { worker });
                }
                Ok(WorkResponse::Done) => {}
                Err(_) => trace!(worker, "{}", line),
            },
            Ok(None) => return completed,
            Err(e) => {
                warn!(worker, error = %e, "Failed to read from worker");
                return completed;
            }
        }
    }
}
