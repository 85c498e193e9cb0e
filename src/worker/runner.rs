//! Compiles one assigned chunk inside a worker process.
//!
//! # Error policy
//!
//! Batch builds fail as a unit: if any assigned configuration reports an
//! error the runner still waits for every compilation to finish, then
//! returns [`RunResult::Failed`]. A single configuration and several
//! configurations are treated the same way.
//!
//! Watch mode never fails on build errors. It only ends when every
//! compiler driver has exited, which is reported as a failure so the
//! coordinator restarts watching.

use crate::compiler::{
    Compiler, CompilerHooks, CompilerSettings, MultiCompiler, Stats, resolve_compiler,
};
use crate::configuration::{BuildConfig, ConfigurationSet};
use crate::error::Result;
use crate::status;
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tracing::{info, instrument, warn};

/// Terminal state of a batch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunResult {
    /// Every configuration compiled without errors.
    Done,
    /// At least one configuration failed, or watching stopped.
    Failed,
}

/// Work assigned to one worker.
#[derive(Debug, Clone)]
pub struct WorkerRunner {
    pub config_path: PathBuf,
    pub ids: Vec<usize>,
    pub watch: bool,
    pub watch_options: Value,
    pub compiler: CompilerSettings,
}

enum Target {
    Single(Compiler),
    Multi(MultiCompiler),
}

impl WorkerRunner {
    /// Load the assigned configurations and compile or watch them.
    ///
    /// Errors are reserved for problems outside compilation: an unreadable
    /// configuration set or an index outside it.
    #[instrument(level = "debug", skip(self), fields(ids = ?self.ids, watch = self.watch))]
    pub fn run(&self) -> Result<RunResult> {
        let configs = self.load_assigned()?;
        let cwd = std::env::current_dir()?;
        let executable = resolve_compiler(&self.compiler, &cwd);
        info!(
            path = %executable.path.display(),
            source = %executable.source,
            "Resolved compiler"
        );

        for config in &configs {
            status::start(&config.name, self.watch);
        }

        let mut compilers: Vec<Compiler> = configs
            .iter()
            .map(|config| Compiler::new(config, executable.clone()))
            .collect();
        let target = if compilers.len() == 1 {
            Target::Single(compilers.remove(0))
        } else {
            Target::Multi(MultiCompiler::new(compilers))
        };

        let hooks = ReportingHooks::new(self.watch);
        if self.watch {
            Ok(self.watch_target(&target, &hooks))
        } else {
            Ok(run_target(&target, &hooks))
        }
    }

    /// Reload the configuration set and select the assigned entries in order.
    pub fn load_assigned(&self) -> Result<Vec<BuildConfig>> {
        let set = ConfigurationSet::load(&self.config_path)?;
        set.select(&self.ids)
    }

    fn watch_target(&self, target: &Target, hooks: &ReportingHooks) -> RunResult {
        let stopped = match target {
            Target::Single(compiler) => compiler.watch(&self.watch_options, hooks),
            Target::Multi(multi) => multi.watch(&self.watch_options, hooks),
        };
        if let Err(e) = stopped {
            warn!(error = %e, "Watching stopped");
        }
        RunResult::Failed
    }
}

fn run_target(target: &Target, hooks: &ReportingHooks) -> RunResult {
    match target {
        Target::Single(compiler) => {
            compiler.run(hooks);
        }
        Target::Multi(multi) => {
            multi.run(hooks);
        }
    }

    if hooks.failed() {
        RunResult::Failed
    } else {
        RunResult::Done
    }
}

/// Turns compiler callbacks into status lines and remembers failures.
struct ReportingHooks {
    watch: bool,
    started: Instant,
    rebuilds: Mutex<HashMap<String, Instant>>,
    failed: AtomicBool,
}

impl ReportingHooks {
    fn new(watch: bool) -> Self {
        Self {
            watch,
            started: Instant::now(),
            rebuilds: Mutex::new(HashMap::new()),
            failed: AtomicBool::new(false),
        }
    }

    fn failed(&self) -> bool {
        self.failed.load(Ordering::SeqCst)
    }

    /// Time since the current build of `name` began.
    fn elapsed(&self, name: &str) -> std::time::Duration {
        let rebuilds = self.rebuilds.lock().unwrap_or_else(|e| e.into_inner());
        rebuilds
            .get(name)
            .copied()
            .unwrap_or(self.started)
            .elapsed()
    }
}

impl CompilerHooks for ReportingHooks {
    fn watch_run(&self, name: &str) {
        self.rebuilds
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(name.to_string(), Instant::now());
        status::rebuilding(name);
    }

    fn done(&self, name: &str, stats: &Stats) {
        for warning in stats.warning_messages() {
            status::compiler_warning(&warning);
        }

        if stats.has_errors() {
            if !self.watch {
                self.failed.store(true, Ordering::SeqCst);
            }
            status::build_failed(name, stats.first_error_message().as_deref());
        } else {
            status::finished(name, Some(self.elapsed(name)));
        }
    }
}
