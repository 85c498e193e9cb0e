//! multibuild - parallel multi-configuration builds
//!
//! Splits an array of compiler configurations into contiguous chunks, builds
//! each chunk in its own worker process, and retries the whole run when any
//! worker fails.
//!
//! ```no_run
//! use multibuild::configuration::ConfigurationSet;
//! use multibuild::coordinator::Coordinator;
//! use multibuild::options::BuildOptions;
//! use multibuild::worker::{ProcessLauncher, WorkerConfig};
//!
//! let set = ConfigurationSet::load("build.json")?;
//! let options = BuildOptions::default().with_watch_mode(false);
//! let launcher = ProcessLauncher::new(set.path(), options.clone(), WorkerConfig::default())?;
//! let outcome = Coordinator::new(&set, &options, launcher).run();
//! assert!(outcome.is_success());
//! # Ok::<(), multibuild::error::MultibuildError>(())
//! ```

pub mod cli;
pub mod compiler;
pub mod configuration;
pub mod coordinator;
pub mod error;
pub mod logging;
pub mod options;
pub mod paths;
pub mod status;
pub mod theme;
pub mod version;
pub mod worker;
