//! Operator-facing status lines.
//!
//! Every line is written to stderr behind a `[multibuild]` tag. Worker
//! processes inherit the coordinator's stderr, so their lines interleave
//! with the coordinator's. stdout stays free for the worker protocol.

use crate::theme::Themed;
use std::time::Duration;

/// Tag printed in front of every status line.
pub const TAG: &str = "[multibuild]";

fn emit(line: &str) {
    eprintln!("{} {}", TAG.tag(), line);
}

/// Format an elapsed duration as seconds with millisecond precision.
pub fn format_elapsed(elapsed: Duration) -> String {
    format!("{:.3}s", elapsed.as_secs_f64())
}

pub fn config_path_missing() {
    emit("Please add path to config");
}

pub fn config_load_failed(message: &str) {
    emit(&message.failure());
}

pub fn using_cores(count: usize) {
    emit(&format!("Using {}", format!("{} cores", count).count()));
}

pub fn start(name: &str, watch: bool) {
    let verb = if watch { "watching" } else { "building" };
    emit(&format!("Start {} {}", verb, name.config_name()));
}

pub fn rebuilding(name: &str) {
    emit(&format!("Rebuilding {}", name.success()));
}

/// A configuration finished without errors, optionally with the time taken.
pub fn finished(name: &str, elapsed: Option<Duration>) {
    match elapsed {
        Some(elapsed) => emit(&format!(
            "Finish building {} in {}",
            name.success(),
            format_elapsed(elapsed)
        )),
        None => emit(&format!("Finish building {}", name.success())),
    }
}

pub fn build_failed(name: &str, message: Option<&str>) {
    emit(&format!("Failure building {}", name.failure()));
    if let Some(message) = message {
        eprintln!("{}", message.failure());
    }
}

pub fn compiler_warning(message: &str) {
    eprintln!("{}", message.warning());
}

pub fn retrying(attempt: u32) {
    emit(&format!("Retry building {} time", attempt.success()));
}

pub fn complete() {
    emit("Building complete");
}

pub fn exhausted() {
    emit(&"Failure entire building".failure());
}

pub fn interrupted() {
    emit(&"Interrupted, workers stopped".warning());
}
