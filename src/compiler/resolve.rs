//! Compiler executable resolution.
//!
//! The configurations being compiled belong to the user and may depend on a
//! specific compiler version installed in their project. Resolution is
//! therefore a fixed two-step lookup:
//!
//! 1. **Installed**: `<cwd>/<install_dir>/<program>` when it exists.
//! 2. **Bundled**: the configured bundled path, or the bare program name
//!    looked up through `PATH` when no bundled path is configured.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default compiler program name.
pub const DEFAULT_PROGRAM: &str = "webpack";

/// Default project-local install directory, relative to the working directory.
pub const DEFAULT_INSTALL_DIR: &str = "node_modules/.bin";

/// How to locate the compiler. Sent verbatim to every worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilerSettings {
    /// Executable name looked up in the install directory.
    pub program: String,
    /// Project-local install directory, relative to the working directory.
    pub install_dir: PathBuf,
    /// Fallback executable when no project-local install exists.
    pub bundled: Option<PathBuf>,
}

impl Default for CompilerSettings {
    fn default() -> Self {
        Self {
            program: DEFAULT_PROGRAM.to_string(),
            install_dir: PathBuf::from(DEFAULT_INSTALL_DIR),
            bundled: None,
        }
    }
}

/// Which resolution step produced the compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompilerSource {
    Installed,
    Bundled,
}

impl fmt::Display for CompilerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Installed => write!(f, "installed"),
            Self::Bundled => write!(f, "bundled"),
        }
    }
}

/// A compiler executable ready to be spawned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCompiler {
    pub path: PathBuf,
    pub source: CompilerSource,
}

/// Resolve the compiler executable relative to `cwd`.
pub fn resolve_compiler(settings: &CompilerSettings, cwd: &Path) -> ResolvedCompiler {
    let installed = cwd.join(&settings.install_dir).join(&settings.program);
    if installed.is_file() {
        debug!(path = %installed.display(), "Using installed compiler");
        return ResolvedCompiler {
            path: installed,
            source: CompilerSource::Installed,
        };
    }

    let path = settings
        .bundled
        .clone()
        .unwrap_or_else(|| PathBuf::from(&settings.program));
    debug!(path = %path.display(), "Using bundled compiler");
    ResolvedCompiler {
        path,
        source: CompilerSource::Bundled,
    }
}
