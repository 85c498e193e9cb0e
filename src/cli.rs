//! Command-line interface definitions using clap.

use crate::compiler::{CompilerSettings, DEFAULT_INSTALL_DIR, DEFAULT_PROGRAM};
use crate::error::Result;
use crate::logging::LogFormat;
use crate::options::{BuildOptions, DEFAULT_RETRIES, parse_watch_options};
use crate::version;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use serde_json::Value;
use std::path::PathBuf;

/// Build many compiler configurations in parallel worker processes.
#[derive(Parser, Debug)]
#[command(name = "multibuild")]
#[command(author, version, long_version = version::long_version(), about, long_about = None)]
pub struct Cli {
    /// Enable verbose output (-v for info, -vv for debug).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output.
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Log output format (pretty, compact, json).
    #[arg(long, global = true, env = "MULTIBUILD_LOG_FORMAT")]
    pub log_format: Option<LogFormat>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build (or watch) every configuration in a configuration file.
    Build(BuildArgs),

    /// Generate shell completions.
    Completions(CompletionsArgs),
}

/// Arguments for shell completions.
#[derive(Parser, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for.
    #[arg(value_enum)]
    pub shell: Shell,
}

impl CompletionsArgs {
    /// Generate and print completions to stdout.
    pub fn generate(&self) {
        clap_complete::generate(
            self.shell,
            &mut Cli::command(),
            "multibuild",
            &mut std::io::stdout(),
        );
    }
}

/// Arguments for the build command.
#[derive(Parser, Debug)]
pub struct BuildArgs {
    /// JSON file containing an array of compiler configurations.
    pub config: PathBuf,

    /// Maximum number of parallel workers (default: all CPUs).
    #[arg(short = 'j', long, env = "MULTIBUILD_CPUS")]
    pub cpus: Option<usize>,

    /// Additional attempts after a failed attempt.
    #[arg(short, long, env = "MULTIBUILD_RETRIES", default_value_t = DEFAULT_RETRIES)]
    pub retries: u32,

    /// Build once and exit instead of watching.
    #[arg(long, env = "MULTIBUILD_ONCE")]
    pub once: bool,

    /// Options passed to the compiler's watch mode, as a JSON object.
    #[arg(long, value_name = "JSON")]
    pub watch_options: Option<String>,

    /// Compiler program name.
    #[arg(long, env = "MULTIBUILD_COMPILER", default_value = DEFAULT_PROGRAM)]
    pub compiler: String,

    /// Project-local directory searched for the compiler first.
    #[arg(long, default_value = DEFAULT_INSTALL_DIR)]
    pub compiler_dir: PathBuf,

    /// Compiler used when no project-local install exists.
    #[arg(long, env = "MULTIBUILD_BUNDLED_COMPILER")]
    pub bundled_compiler: Option<PathBuf>,

    /// Run as internal worker subprocess (used by the coordinator).
    #[arg(long, hide = true)]
    pub internal_worker: bool,
}

impl BuildArgs {
    /// Options for the coordinator and its workers.
    pub fn build_options(&self) -> Result<BuildOptions> {
        let watch_options = match &self.watch_options {
            Some(raw) => parse_watch_options(raw)?,
            None => Value::Object(Default::default()),
        };

        Ok(BuildOptions::default()
            .with_cpus(self.cpus.unwrap_or(0))
            .with_retries(self.retries)
            .with_watch_mode(!self.once)
            .with_watch_options(watch_options)
            .with_compiler(CompilerSettings {
                program: self.compiler.clone(),
                install_dir: self.compiler_dir.clone(),
                bundled: self.bundled_compiler.clone(),
            }))
    }
}
