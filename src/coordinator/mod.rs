//! Distributes configurations across workers and retries failed attempts.
//!
//! # Architecture
//!
//! ```text
//!                      ┌──────────────────┐
//!                      │   Coordinator    │
//!                      │ partition + retry│
//!                      └────────┬─────────┘
//!                               │ path + ids
//!               ┌───────────────┼───────────────┐
//!               │               │               │
//!         ┌─────▼─────┐   ┌─────▼─────┐   ┌─────▼─────┐
//!         │ Worker 0  │   │ Worker 1  │   │ Worker N  │
//!         │ [0, 1, 2] │   │  [3, 4]   │   │    ...    │
//!         └───────────┘   └───────────┘   └───────────┘
//! ```
//!
//! Each attempt launches one worker per non-empty chunk and waits for every
//! worker to settle. The first failure terminates every worker in the
//! attempt; the whole attempt is then retried until the retry budget runs out.

mod launch;
pub mod partition;

pub use launch::{Launcher, WorkerAssignment, WorkerEvent, WorkerHandle};
pub use partition::{partition, resolve_parallelism, system_cpus};

use crate::configuration::ConfigurationSet;
use crate::options::BuildOptions;
use crate::status;
use crossbeam_channel::RecvTimeoutError;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// How often the shutdown flag is checked while waiting on workers.
const SHUTDOWN_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Final result of [`Coordinator::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildOutcome {
    /// An attempt finished with every worker completing.
    Succeeded { attempts: u32 },
    /// Every attempt failed and the retry budget is spent.
    Failed { attempts: u32 },
    /// The shutdown flag was raised while waiting.
    Interrupted,
}

impl BuildOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttemptOutcome {
    Succeeded,
    Failed,
    Interrupted,
}

/// Runs attempts over a fixed partition of the configuration set.
pub struct Coordinator<L: Launcher> {
    config_count: usize,
    retries: u32,
    requested_cpus: Option<usize>,
    worker_count: usize,
    launcher: L,
    /// Handles for the current attempt; owned and mutated only here.
    workers: Vec<Box<dyn WorkerHandle>>,
    shutdown: Arc<AtomicBool>,
}

impl<L: Launcher> Coordinator<L> {
    pub fn new(configurations: &ConfigurationSet, options: &BuildOptions, launcher: L) -> Self {
        let config_count = configurations.len();
        Self {
            config_count,
            retries: options.retries,
            requested_cpus: options.cpus,
            worker_count: resolve_parallelism(options.cpus, system_cpus(), config_count),
            launcher,
            workers: Vec::new(),
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Recompute the worker count against a given number of processing units.
    pub fn with_system_cpus(mut self, system: usize) -> Self {
        self.worker_count = resolve_parallelism(self.requested_cpus, system, self.config_count);
        self
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Flag that stops the run when set (e.g. from a Ctrl+C handler).
    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    pub fn launcher(&self) -> &L {
        &self.launcher
    }

    /// The fixed assignment of configuration indices to workers.
    pub fn assignments(&self) -> Vec<WorkerAssignment> {
        let indices: Vec<usize> = (0..self.config_count).collect();
        partition(&indices, self.worker_count)
            .into_iter()
            .enumerate()
            .filter(|(_, ids)| !ids.is_empty())
            .map(|(worker, ids)| WorkerAssignment { worker, ids })
            .collect()
    }

    /// Run attempts until one succeeds or the retry budget is exhausted.
    ///
    /// Exhausting the budget is reported, not raised: the caller decides
    /// what exit status a failed build maps to.
    pub fn run(&mut self) -> BuildOutcome {
        status::using_cores(self.worker_count);
        let assignments = self.assignments();

        let mut attempt: u32 = 0;
        loop {
            if attempt > self.retries {
                status::exhausted();
                return BuildOutcome::Failed { attempts: attempt };
            }
            if attempt >= 1 {
                status::retrying(attempt);
            }

            match self.run_attempt(&assignments) {
                AttemptOutcome::Succeeded => {
                    status::complete();
                    return BuildOutcome::Succeeded {
                        attempts: attempt + 1,
                    };
                }
                AttemptOutcome::Interrupted => {
                    status::interrupted();
                    return BuildOutcome::Interrupted;
                }
                AttemptOutcome::Failed => attempt += 1,
            }
        }
    }

    /// Launch every assignment and wait until all workers have settled.
    #[instrument(level = "debug", skip(self, assignments), fields(workers = assignments.len()))]
    fn run_attempt(&mut self, assignments: &[WorkerAssignment]) -> AttemptOutcome {
        let (tx, rx) = crossbeam_channel::unbounded();

        for assignment in assignments {
            match self.launcher.launch(assignment.clone(), tx.clone()) {
                Ok(handle) => self.workers.push(handle),
                Err(e) => {
                    warn!(worker = assignment.worker, error = %e, "Failed to launch worker");
                    self.terminate_all();
                    self.workers.clear();
                    return AttemptOutcome::Failed;
                }
            }
        }
        drop(tx);

        let mut pending = self.workers.len();
        let mut failed = false;
        while pending > 0 {
            if self.shutdown.load(Ordering::SeqCst) {
                self.terminate_all();
                self.workers.clear();
                return AttemptOutcome::Interrupted;
            }

            match rx.recv_timeout(SHUTDOWN_POLL_INTERVAL) {
                Ok(WorkerEvent::Completed { worker }) => {
                    debug!(worker, "Worker completed");
                    pending -= 1;
                }
                Ok(WorkerEvent::Failed { worker, reason }) => {
                    pending -= 1;
                    if failed {
                        debug!(worker, %reason, "Worker stopped");
                    } else {
                        warn!(worker, %reason, "Worker failed, stopping the attempt");
                        failed = true;
                        self.terminate_all();
                    }
                }
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => {
                    warn!(pending, "Workers went away without reporting");
                    failed = true;
                    break;
                }
            }
        }

        self.workers.clear();
        info!(failed, "Attempt settled");
        if failed {
            AttemptOutcome::Failed
        } else {
            AttemptOutcome::Succeeded
        }
    }

    fn terminate_all(&mut self) {
        for worker in &mut self.workers {
            worker.terminate();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MultibuildError;
    use crossbeam_channel::Sender;
    use std::collections::VecDeque;
    use std::path::Path;
    use std::sync::Mutex;

    /// What a scripted worker does once launched.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Script {
        Complete,
        Fail,
        /// Never settles on its own; only termination ends it.
        Hang,
        /// Launching it fails.
        LaunchError,
    }

    struct FakeHandle {
        worker: usize,
        events: Option<Sender<WorkerEvent>>,
        terminations: Arc<Mutex<Vec<usize>>>,
    }

    impl WorkerHandle for FakeHandle {
        fn worker(&self) -> usize {
            self.worker
        }

        fn terminate(&mut self) {
            self.terminations.lock().unwrap().push(self.worker);
            if let Some(events) = self.events.take() {
                let _ = events.send(WorkerEvent::Failed {
                    worker: self.worker,
                    reason: "terminated".into(),
                });
            }
        }
    }

    /// Pops one script per launch; defaults to `Complete` when exhausted.
    struct ScriptedLauncher {
        scripts: VecDeque<Script>,
        default: Script,
        launched: Vec<WorkerAssignment>,
        terminations: Arc<Mutex<Vec<usize>>>,
    }

    impl ScriptedLauncher {
        fn new(scripts: Vec<Script>, default: Script) -> Self {
            Self {
                scripts: scripts.into(),
                default,
                launched: Vec::new(),
                terminations: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    impl Launcher for ScriptedLauncher {
        fn launch(
            &mut self,
            assignment: WorkerAssignment,
            events: Sender<WorkerEvent>,
        ) -> crate::error::Result<Box<dyn WorkerHandle>> {
            let script = self.scripts.pop_front().unwrap_or(self.default);
            let worker = assignment.worker;
            self.launched.push(assignment);

            let pending = match script {
                Script::LaunchError => {
                    return Err(MultibuildError::Worker("spawn failed".into()));
                }
                Script::Complete => {
                    events.send(WorkerEvent::Completed { worker }).unwrap();
                    None
                }
                Script::Fail => {
                    events
                        .send(WorkerEvent::Failed {
                            worker,
                            reason: "exited with code 1".into(),
                        })
                        .unwrap();
                    None
                }
                Script::Hang => Some(events),
            };

            Ok(Box::new(FakeHandle {
                worker,
                events: pending,
                terminations: Arc::clone(&self.terminations),
            }))
        }
    }

    fn configuration_set(count: usize) -> (tempfile::TempDir, ConfigurationSet) {
        let dir = tempfile::tempdir().unwrap();
        let configs: Vec<_> = (0..count)
            .map(|i| serde_json::json!({ "entry": { format!("bundle{}", i): "./index.js" } }))
            .collect();
        let path = dir.path().join("build.json");
        std::fs::write(&path, serde_json::to_string(&configs).unwrap()).unwrap();
        let set = ConfigurationSet::load(Path::new(&path)).unwrap();
        (dir, set)
    }

    fn coordinator(
        count: usize,
        options: BuildOptions,
        launcher: ScriptedLauncher,
    ) -> (tempfile::TempDir, Coordinator<ScriptedLauncher>) {
        let (dir, set) = configuration_set(count);
        let coordinator = Coordinator::new(&set, &options, launcher).with_system_cpus(8);
        (dir, coordinator)
    }

    #[test]
    fn test_five_configs_two_cpus_succeed_first_attempt() {
        let options = BuildOptions::default().with_cpus(2).with_watch_mode(false);
        let (_dir, mut coordinator) =
            coordinator(5, options, ScriptedLauncher::new(vec![], Script::Complete));

        assert_eq!(coordinator.worker_count(), 2);
        assert_eq!(coordinator.run(), BuildOutcome::Succeeded { attempts: 1 });

        let launched = &coordinator.launcher().launched;
        assert_eq!(
            *launched,
            vec![
                WorkerAssignment {
                    worker: 0,
                    ids: vec![0, 1, 2]
                },
                WorkerAssignment {
                    worker: 1,
                    ids: vec![3, 4]
                },
            ]
        );
    }

    #[test]
    fn test_every_attempt_failing_makes_retries_plus_one_attempts() {
        let options = BuildOptions::default().with_retries(3).with_watch_mode(false);
        let (_dir, mut coordinator) =
            coordinator(1, options, ScriptedLauncher::new(vec![], Script::Fail));

        assert_eq!(coordinator.run(), BuildOutcome::Failed { attempts: 4 });
        assert_eq!(coordinator.launcher().launched.len(), 4);
    }

    #[test]
    fn test_zero_retries_means_single_attempt() {
        let options = BuildOptions::default().with_retries(0);
        let (_dir, mut coordinator) =
            coordinator(2, options, ScriptedLauncher::new(vec![], Script::Fail));

        assert_eq!(coordinator.run(), BuildOutcome::Failed { attempts: 1 });
    }

    #[test]
    fn test_retry_reruns_every_chunk_with_same_partition() {
        let options = BuildOptions::default().with_cpus(2);
        let launcher = ScriptedLauncher::new(
            vec![Script::Complete, Script::Fail],
            Script::Complete,
        );
        let (_dir, mut coordinator) = coordinator(4, options, launcher);

        assert_eq!(coordinator.run(), BuildOutcome::Succeeded { attempts: 2 });

        let launched = &coordinator.launcher().launched;
        assert_eq!(launched.len(), 4);
        assert_eq!(launched[0], launched[2]);
        assert_eq!(launched[1], launched[3]);
    }

    #[test]
    fn test_first_failure_terminates_siblings() {
        let options = BuildOptions::default().with_cpus(3).with_retries(0);
        let launcher = ScriptedLauncher::new(
            vec![Script::Hang, Script::Hang, Script::Fail],
            Script::Complete,
        );
        let (_dir, mut coordinator) = coordinator(3, options, launcher);

        assert_eq!(coordinator.run(), BuildOutcome::Failed { attempts: 1 });

        let mut terminated = coordinator.launcher().terminations.lock().unwrap().clone();
        terminated.sort();
        terminated.dedup();
        assert_eq!(terminated, vec![0, 1, 2]);
    }

    #[test]
    fn test_launch_error_fails_the_attempt() {
        let options = BuildOptions::default().with_cpus(2).with_retries(1);
        let launcher = ScriptedLauncher::new(
            vec![Script::Hang, Script::LaunchError],
            Script::Complete,
        );
        let (_dir, mut coordinator) = coordinator(2, options, launcher);

        assert_eq!(coordinator.run(), BuildOutcome::Succeeded { attempts: 2 });
        // The worker launched before the error was stopped.
        assert!(coordinator.launcher().terminations.lock().unwrap().contains(&0));
    }

    #[test]
    fn test_shutdown_flag_interrupts_waiting() {
        let options = BuildOptions::default().with_cpus(1);
        let (_dir, mut coordinator) =
            coordinator(2, options, ScriptedLauncher::new(vec![], Script::Hang));

        coordinator.shutdown_flag().store(true, Ordering::SeqCst);
        assert_eq!(coordinator.run(), BuildOutcome::Interrupted);
        assert_eq!(*coordinator.launcher().terminations.lock().unwrap(), vec![0]);
    }

    #[test]
    fn test_empty_chunks_are_not_launched() {
        let (_dir, coordinator) = coordinator(
            3,
            BuildOptions::default(),
            ScriptedLauncher::new(vec![], Script::Complete),
        );
        // min(8 cpus, 3 configs) = 3 workers of one configuration each
        let assignments = coordinator.assignments();
        assert_eq!(assignments.len(), 3);
        assert!(assignments.iter().all(|a| a.ids.len() == 1));
    }

    #[test]
    fn test_build_outcome_success() {
        assert!(BuildOutcome::Succeeded { attempts: 1 }.is_success());
        assert!(!BuildOutcome::Failed { attempts: 4 }.is_success());
        assert!(!BuildOutcome::Interrupted.is_success());
    }
}
