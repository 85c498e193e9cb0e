//! Build options shared by the coordinator and its workers.

use crate::compiler::CompilerSettings;
use crate::error::{MultibuildError, Result};
use serde_json::Value;

/// Default number of retries after a failed attempt.
pub const DEFAULT_RETRIES: u32 = 3;

/// Options for a multi-configuration build.
///
/// # Examples
///
/// ```
/// use multibuild::options::BuildOptions;
///
/// let options = BuildOptions::default().with_cpus(2).with_watch_mode(false);
/// assert_eq!(options.cpus, Some(2));
/// assert_eq!(options.retries, 3);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct BuildOptions {
    /// Upper bound on parallel workers (`None` = all available CPUs).
    pub cpus: Option<usize>,
    /// Additional attempts after the first failed attempt.
    pub retries: u32,
    /// Watch continuously instead of building once.
    pub watch_mode: bool,
    /// Passed verbatim to the compiler's watch mode.
    pub watch_options: Value,
    /// How workers locate the compiler.
    pub compiler: CompilerSettings,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            cpus: None,
            retries: DEFAULT_RETRIES,
            watch_mode: true,
            watch_options: Value::Object(Default::default()),
            compiler: CompilerSettings::default(),
        }
    }
}

impl BuildOptions {
    /// Cap the worker count. Zero means "not requested".
    pub fn with_cpus(mut self, cpus: usize) -> Self {
        self.cpus = (cpus > 0).then_some(cpus);
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn with_watch_mode(mut self, watch_mode: bool) -> Self {
        self.watch_mode = watch_mode;
        self
    }

    pub fn with_watch_options(mut self, watch_options: Value) -> Self {
        self.watch_options = watch_options;
        self
    }

    pub fn with_compiler(mut self, compiler: CompilerSettings) -> Self {
        self.compiler = compiler;
        self
    }
}

/// Parse `--watch-options`, which must be a JSON object.
pub fn parse_watch_options(raw: &str) -> Result<Value> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| MultibuildError::InvalidWatchOptions(e.to_string()))?;
    if !value.is_object() {
        return Err(MultibuildError::InvalidWatchOptions(format!(
            "expected a JSON object, got {}",
            raw.trim()
        )));
    }
    Ok(value)
}
