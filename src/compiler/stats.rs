//! Compilation results and the events a compiler driver emits.
//!
//! Drivers report on stdout, one JSON object per line:
//!
//! ```text
//! {"event":"watch_run"}
//! {"event":"done","errors":[{"message":"..."}],"warnings":["..."]}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Errors and warnings reported for one finished build.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    #[serde(default)]
    pub errors: Vec<Value>,
    #[serde(default)]
    pub warnings: Vec<Value>,
}

impl Stats {
    /// Stats holding a single error message.
    pub fn from_error(message: impl Into<String>) -> Self {
        Self {
            errors: vec![serde_json::json!({ "message": message.into() })],
            warnings: Vec::new(),
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Message of the first reported error.
    pub fn first_error_message(&self) -> Option<String> {
        self.errors.first().map(message_of)
    }

    pub fn warning_messages(&self) -> Vec<String> {
        self.warnings.iter().map(message_of).collect()
    }
}

/// Text for an error or warning value.
///
/// Uses the `message` field when present, the string itself for plain
/// strings, and the JSON rendering otherwise.
pub fn message_of(value: &Value) -> String {
    if let Some(message) = value.get("message").and_then(Value::as_str) {
        return message.to_string();
    }
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// One line of driver output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CompilerEvent {
    /// A rebuild is starting (watch mode).
    WatchRun,
    /// A build finished.
    Done(Stats),
}

impl CompilerEvent {
    /// Parse a driver line. Lines that are not events yield `None`.
    pub fn from_line(line: &str) -> Option<Self> {
        let line = line.trim();
        if !line.starts_with('{') {
            return None;
        }
        serde_json::from_str(line).ok()
    }
}
