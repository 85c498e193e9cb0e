//! multibuild - parallel multi-configuration builds

use std::io::IsTerminal;
use std::sync::atomic::Ordering;

use anyhow::{Context, Result};
use clap::Parser;
use owo_colors::{OwoColorize, Stream::Stderr};
use tracing::debug;

use multibuild::cli::{BuildArgs, Cli, Commands};
use multibuild::configuration::ConfigurationSet;
use multibuild::coordinator::{BuildOutcome, Coordinator};
use multibuild::error::MultibuildError;
use multibuild::logging::{self, LogConfig};
use multibuild::worker::{self, ProcessLauncher, WorkerConfig};
use multibuild::{status, theme};

/// Exit status after Ctrl+C, SIGTERM or SIGHUP.
const EXIT_INTERRUPTED: i32 = 130;

fn main() {
    let cli = Cli::parse();

    if cli.no_color || !std::io::stderr().is_terminal() {
        theme::disable_colors();
    }

    let mut log_config = LogConfig::for_verbosity(cli.verbose, cli.quiet).with_env_overrides();
    if let Some(format) = cli.log_format {
        log_config = log_config.with_format(format);
    }
    logging::init(log_config);

    let result = match &cli.command {
        Commands::Build(args) => cmd_build(&cli, args),
        Commands::Completions(args) => {
            args.generate();
            Ok(0)
        }
    };

    match result {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!(
                "{}: {}",
                "error"
                    .if_supports_color(Stderr, |text| text.red())
                    .if_supports_color(Stderr, |text| text.bold()),
                e
            );
            // Print the error chain if there are causes
            for cause in e.chain().skip(1) {
                eprintln!(
                    "  {}: {}",
                    "caused by".if_supports_color(Stderr, |text| text.yellow()),
                    cause
                );
            }
            std::process::exit(1);
        }
    }
}

/// Runs the coordinator, or the worker loop when started with `--internal-worker`.
///
/// Returns the process exit status: 0 on success, 1 when the configuration
/// cannot be loaded or every attempt failed, 130 when interrupted.
fn cmd_build(cli: &Cli, args: &BuildArgs) -> Result<i32> {
    // Check for internal worker mode first
    if args.internal_worker {
        // Run worker subprocess (never returns)
        worker::run_worker_main();
    }

    let options = args.build_options()?;

    let configurations = match ConfigurationSet::load(&args.config) {
        Ok(set) => set,
        Err(MultibuildError::MissingConfigPath) => {
            status::config_path_missing();
            return Ok(1);
        }
        Err(e) if e.is_configuration_error() => {
            status::config_load_failed(&e.to_string());
            return Ok(1);
        }
        Err(e) => return Err(e.into()),
    };
    debug!(
        path = %configurations.path().display(),
        count = configurations.len(),
        "Configurations loaded"
    );

    let worker_config = WorkerConfig {
        verbose: cli.verbose,
        quiet: cli.quiet,
        no_color: !theme::colors_enabled(),
        log_format: cli.log_format,
    };
    let launcher = ProcessLauncher::new(configurations.path(), options.clone(), worker_config)?;
    let mut coordinator = Coordinator::new(&configurations, &options, launcher);

    // Covers SIGTERM and SIGHUP as well, so workers are never orphaned.
    let shutdown_flag = coordinator.shutdown_flag();
    ctrlc::set_handler(move || {
        eprintln!("\nReceived interrupt, stopping workers...");
        shutdown_flag.store(true, Ordering::SeqCst);
    })
    .context("Error setting signal handler")?;

    let code = match coordinator.run() {
        BuildOutcome::Succeeded { attempts } => {
            debug!(attempts, "Build succeeded");
            0
        }
        BuildOutcome::Failed { attempts } => {
            debug!(attempts, "Build failed");
            1
        }
        BuildOutcome::Interrupted => EXIT_INTERRUPTED,
    };
    Ok(code)
}
