//! Worker subprocess main entry point.
//!
//! This module runs when `multibuild build <config> --internal-worker` is
//! invoked. It reads one request from the coordinator, compiles the
//! assigned configurations and reports completion on stdout.

use super::ipc::{LineReader, LineWriter};
use super::protocol::{WorkRequest, WorkResponse};
use super::runner::{RunResult, WorkerRunner};
use crate::error::{MultibuildError, Result};
use std::io::{Read, Write};
use tracing::{debug, error};

/// How a worker session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerExit {
    /// Build finished and `done` was sent.
    Completed,
    /// Build failed; nothing was sent.
    Failed,
}

impl WorkerExit {
    pub fn code(self) -> i32 {
        match self {
            Self::Completed => 0,
            Self::Failed => 1,
        }
    }
}

/// Serve a single request read from `input`, answering on `output`.
pub fn serve<R: Read, W: Write>(input: R, output: W) -> Result<WorkerExit> {
    let mut reader = LineReader::new(input);
    let mut writer = LineWriter::new(output);

    let line = reader
        .read_line()?
        .ok_or_else(|| MultibuildError::Worker("Coordinator closed the pipe before sending work".into()))?
        .into_owned();

    let request = WorkRequest::from_line(&line)
        .map_err(|e| MultibuildError::Worker(format!("Invalid request: {}", e)))?;

    let WorkRequest::Build {
        config_path,
        ids,
        watch,
        watch_options,
        compiler,
    } = request;
    let runner = WorkerRunner {
        config_path,
        ids,
        watch,
        watch_options,
        compiler,
    };
    match runner.run()? {
        RunResult::Done => {
            writer.write_line(&WorkResponse::Done.to_line()?)?;
            Ok(WorkerExit::Completed)
        }
        RunResult::Failed => Ok(WorkerExit::Failed),
    }
}

/// Run the worker subprocess main function.
///
/// Never returns: the process exits with the worker's status.
pub fn run_worker_main() -> ! {
    // Ignore SIGPIPE - we handle pipe errors via io::Error
    unsafe {
        nix::sys::signal::signal(
            nix::sys::signal::Signal::SIGPIPE,
            nix::sys::signal::SigHandler::SigIgn,
        )
        .ok();
    }

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    let code = match serve(stdin.lock(), stdout.lock()) {
        Ok(exit) => {
            debug!(?exit, "Worker finished");
            exit.code()
        }
        Err(e) => {
            error!(error = %e, "Worker error");
            eprintln!("Worker error: {}", e);
            1
        }
    };
    std::process::exit(code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Cursor;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::tempdir;

    #[test]
    fn test_exit_request_is_rejected() {
        let mut out = Vec::new();
        let err = serve(Cursor::new("{\"type\":\"exit\"}\n"), &mut out).unwrap_err();
        assert!(err.to_string().contains("Invalid request"));
        assert!(out.is_empty());
    }

    #[test]
    fn test_eof_before_request_is_an_error() {
        let mut out = Vec::new();
        assert!(serve(Cursor::new(""), &mut out).is_err());
    }

    #[test]
    fn test_garbage_request_is_an_error() {
        let mut out = Vec::new();
        let err = serve(Cursor::new("hello\n"), &mut out).unwrap_err();
        assert!(err.to_string().contains("Invalid request"));
    }

    #[test]
    fn test_build_request_sends_done() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("build.json");
        std::fs::write(&config_path, r#"[{"entry":{"app":"./app.js"}}]"#).unwrap();
        let driver = dir.path().join("driver.sh");
        std::fs::write(
            &driver,
            "#!/bin/sh\ncat >/dev/null\necho '{\"event\":\"done\",\"errors\":[],\"warnings\":[]}'\n",
        )
        .unwrap();
        std::fs::set_permissions(&driver, std::fs::Permissions::from_mode(0o755)).unwrap();

        let request = json!({
            "type": "build",
            "config_path": config_path,
            "ids": [0],
            "watch": false,
            "watch_options": {},
            "compiler": {
                "program": "absent",
                "install_dir": "node_modules/.bin",
                "bundled": driver,
            },
        });
        let mut out = Vec::new();
        let exit = serve(Cursor::new(format!("{}\n", request)), &mut out).unwrap();

        assert_eq!(exit, WorkerExit::Completed);
        assert_eq!(String::from_utf8(out).unwrap(), "{\"type\":\"done\"}\n");
    }

    #[test]
    fn test_failed_build_sends_nothing() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("build.json");
        std::fs::write(&config_path, r#"[{"entry":{"app":"./app.js"}}]"#).unwrap();
        let driver = dir.path().join("driver.sh");
        std::fs::write(&driver, "#!/bin/sh\ncat >/dev/null\nexit 2\n").unwrap();
        std::fs::set_permissions(&driver, std::fs::Permissions::from_mode(0o755)).unwrap();

        let request = json!({
            "type": "build",
            "config_path": config_path,
            "ids": [0],
            "watch": false,
            "compiler": { "program": "absent", "install_dir": "nm", "bundled": driver },
        });
        let mut out = Vec::new();
        let exit = serve(Cursor::new(format!("{}\n", request)), &mut out).unwrap();

        assert_eq!(exit, WorkerExit::Failed);
        assert_eq!(exit.code(), 1);
        assert!(out.is_empty());
    }
}
