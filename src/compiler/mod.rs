//! The external compiler seam.
//!
//! A compiler is an executable driver spawned once per configuration. It
//! receives the configuration as JSON on stdin and reports builds as
//! [`CompilerEvent`] lines on stdout. [`Compiler`] drives one configuration;
//! [`MultiCompiler`] drives several together and fires one hook set per
//! configuration.

mod driver;
mod multi;
mod resolve;
mod stats;

pub use driver::{Compiler, ENV_CONFIG_NAME, ENV_MODE, ENV_WATCH_OPTIONS};
pub use multi::MultiCompiler;
pub use resolve::{
    CompilerSettings, CompilerSource, DEFAULT_INSTALL_DIR, DEFAULT_PROGRAM, ResolvedCompiler,
    resolve_compiler,
};
pub use stats::{CompilerEvent, Stats, message_of};

/// Callbacks fired while a compiler runs.
///
/// Hooks are shared across the threads of a [`MultiCompiler`].
pub trait CompilerHooks: Sync {
    /// A rebuild of `name` is starting (watch mode only).
    fn watch_run(&self, name: &str);

    /// A build of `name` finished.
    fn done(&self, name: &str, stats: &Stats);
}
