//! IPC protocol between the coordinator and worker subprocesses.
//!
//! Messages are JSON-serialized and newline-delimited.

use crate::compiler::CompilerSettings;
use crate::options::BuildOptions;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;

/// Request from coordinator to worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WorkRequest {
    /// Build (or watch) a chunk of the configuration set.
    #[serde(rename = "build")]
    Build {
        /// Canonical path of the configuration file; the worker reloads it.
        config_path: PathBuf,
        /// Assigned configuration indices.
        ids: Vec<usize>,
        /// Watch continuously instead of building once.
        watch: bool,
        /// Passed verbatim to the compiler's watch mode.
        #[serde(default)]
        watch_options: Value,
        /// How to locate the compiler.
        #[serde(default)]
        compiler: CompilerSettings,
    },
}

/// Response from worker to coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WorkResponse {
    /// Every assigned configuration compiled without errors.
    #[serde(rename = "done")]
    Done,
}

impl WorkRequest {
    /// Create a build request for `ids` under `options`.
    pub fn build(config_path: impl Into<PathBuf>, ids: Vec<usize>, options: &BuildOptions) -> Self {
        Self::Build {
            config_path: config_path.into(),
            ids,
            watch: options.watch_mode,
            watch_options: options.watch_options.clone(),
            compiler: options.compiler.clone(),
        }
    }

    /// Serialize to JSON line (with newline).
    pub fn to_line(&self) -> serde_json::Result<String> {
        let mut json = serde_json::to_string(self)?;
        json.push('\n');
        Ok(json)
    }

    /// Deserialize from JSON line.
    pub fn from_line(line: &str) -> serde_json::Result<Self> {
        serde_json::from_str(line.trim())
    }
}

impl WorkResponse {
    /// Serialize to JSON line (with newline).
    pub fn to_line(&self) -> serde_json::Result<String> {
        let mut json = serde_json::to_string(self)?;
        json.push('\n');
        Ok(json)
    }

    /// Deserialize from JSON line.
    pub fn from_line(line: &str) -> serde_json::Result<Self> {
        serde_json::from_str(line.trim())
    }
}
