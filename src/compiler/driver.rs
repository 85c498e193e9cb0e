//! Single-configuration compiler driven through a child process.

use super::resolve::ResolvedCompiler;
use super::stats::{CompilerEvent, Stats};
use super::CompilerHooks;
use crate::configuration::BuildConfig;
use crate::error::{MultibuildError, Result};
use crate::worker::ipc::{LineReader, LineWriter};
use crate::worker::signals::TerminationReason;
use serde_json::Value;
use std::io::{self, Read};
use std::process::{Child, Command, Stdio};
use tracing::{debug, trace};

/// `build` or `watch`.
pub const ENV_MODE: &str = "MULTIBUILD_MODE";
/// Display name of the configuration being compiled.
pub const ENV_CONFIG_NAME: &str = "MULTIBUILD_CONFIG_NAME";
/// Watch options as a JSON object.
pub const ENV_WATCH_OPTIONS: &str = "MULTIBUILD_WATCH_OPTIONS";

#[derive(Debug, Clone, Copy)]
enum Mode {
    Build,
    Watch,
}

impl Mode {
    fn as_str(self) -> &'static str {
        match self {
            Mode::Build => "build",
            Mode::Watch => "watch",
        }
    }
}

/// Compiler for one configuration.
#[derive(Debug, Clone)]
pub struct Compiler {
    name: String,
    config: Value,
    executable: ResolvedCompiler,
}

impl Compiler {
    pub fn new(config: &BuildConfig, executable: ResolvedCompiler) -> Self {
        Self {
            name: config.name.clone(),
            config: config.value.clone(),
            executable,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Compile once and fire the `done` hook.
    ///
    /// Failures to start or talk to the driver are reported as build errors,
    /// so the returned stats always describe the outcome.
    pub fn run(&self, hooks: &dyn CompilerHooks) -> Stats {
        let stats = self.compile().unwrap_or_else(|e| Stats::from_error(e.to_string()));
        hooks.done(&self.name, &stats);
        stats
    }

    /// Watch the configuration, firing hooks for every rebuild.
    ///
    /// Only returns once the driver process has exited, which always ends
    /// watching with an error.
    pub fn watch(&self, watch_options: &Value, hooks: &dyn CompilerHooks) -> Result<()> {
        let mut child = self.spawn(Mode::Watch, watch_options)?;
        let stdout = take_stdout(&mut child)?;
        let read_result = self.read_events(stdout, |event| match event {
            CompilerEvent::WatchRun => hooks.watch_run(&self.name),
            CompilerEvent::Done(stats) => hooks.done(&self.name, &stats),
        });
        let reason = TerminationReason::from(child.wait()?);
        read_result?;
        Err(MultibuildError::Compiler(format!(
            "watcher for {} stopped: compiler {}",
            self.name, reason
        )))
    }

    fn compile(&self) -> Result<Stats> {
        let mut child = self.spawn(Mode::Build, &Value::Object(Default::default()))?;
        let stdout = take_stdout(&mut child)?;

        let mut reported = None;
        let read_result = self.read_events(stdout, |event| {
            if let CompilerEvent::Done(stats) = event {
                reported = Some(stats);
            }
        });
        let reason = TerminationReason::from(child.wait()?);
        read_result?;

        debug!(config = %self.name, %reason, "Compiler finished");
        Ok(settle(&self.name, reported, reason))
    }

    fn spawn(&self, mode: Mode, watch_options: &Value) -> Result<Child> {
        let input = serde_json::to_string(&self.config)?;
        let mut cmd = Command::new(&self.executable.path);
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .env(ENV_MODE, mode.as_str())
            .env(ENV_CONFIG_NAME, &self.name)
            .env(ENV_WATCH_OPTIONS, watch_options.to_string());

        let mut child = cmd.spawn().map_err(|e| {
            MultibuildError::Compiler(format!(
                "Failed to start {} ({}): {}",
                self.executable.path.display(),
                self.executable.source,
                e
            ))
        })?;

        self.send_config(&mut child, &input)?;
        Ok(child)
    }

    /// Write the configuration to the driver's stdin and close it, which
    /// marks the end of input. The child is killed and reaped on failure.
    fn send_config(&self, child: &mut Child, input: &str) -> Result<()> {
        let written = match child.stdin.take() {
            Some(stdin) => LineWriter::new(stdin).write_line(input),
            None => Err(io::Error::other("compiler stdin not captured")),
        };
        match written {
            Ok(()) => Ok(()),
            // The driver may exit without reading its input.
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
                debug!(config = %self.name, "Compiler closed stdin early");
                Ok(())
            }
            Err(e) => {
                if let Err(kill_err) = child.kill() {
                    debug!(config = %self.name, error = %kill_err, "Failed to kill compiler");
                }
                let _ = child.wait();
                Err(e.into())
            }
        }
    }

    fn read_events<R: Read>(&self, stdout: R, mut on_event: impl FnMut(CompilerEvent)) -> Result<()> {
        let mut reader = LineReader::new(stdout);
        while let Some(line) = reader.read_line()? {
            match CompilerEvent::from_line(&line) {
                Some(event) => on_event(event),
                None => trace!(config = %self.name, "{}", line),
            }
        }
        Ok(())
    }
}

fn take_stdout(child: &mut Child) -> Result<std::process::ChildStdout> {
    child
        .stdout
        .take()
        .ok_or_else(|| MultibuildError::Compiler("Compiler stdout not captured".into()))
}

/// Combine the reported stats with the driver's exit reason.
fn settle(name: &str, reported: Option<Stats>, reason: TerminationReason) -> Stats {
    match reported {
        Some(stats) if stats.has_errors() || reason.is_success() => stats,
        Some(mut stats) => {
            stats
                .errors
                .push(serde_json::json!({ "message": format!("compiler {}", reason) }));
            stats
        }
        None => Stats::from_error(format!(
            "compiler for {} {} without reporting a result",
            name, reason
        )),
    }
}
