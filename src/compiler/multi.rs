//! Several configurations compiled together.

use super::CompilerHooks;
use super::driver::Compiler;
use super::stats::Stats;
use crate::error::{MultibuildError, Result};
use serde_json::Value;
use std::thread;
use tracing::warn;

/// Drives one [`Compiler`] per configuration concurrently.
///
/// Each configuration keeps its own hook calls; results come back in the
/// order the compilers were given.
#[derive(Debug, Clone)]
pub struct MultiCompiler {
    compilers: Vec<Compiler>,
}

impl MultiCompiler {
    pub fn new(compilers: Vec<Compiler>) -> Self {
        Self { compilers }
    }

    /// Compile every configuration once and wait for all of them.
    pub fn run(&self, hooks: &dyn CompilerHooks) -> Vec<Stats> {
        thread::scope(|s| {
            let handles: Vec<_> = self
                .compilers
                .iter()
                .map(|compiler| s.spawn(move || compiler.run(hooks)))
                .collect();

            handles
                .into_iter()
                .map(|h| {
                    h.join()
                        .unwrap_or_else(|_| Stats::from_error("compiler thread panicked"))
                })
                .collect()
        })
    }

    /// Watch every configuration. Returns once all watchers have stopped.
    pub fn watch(&self, watch_options: &Value, hooks: &dyn CompilerHooks) -> Result<()> {
        let stopped: Vec<String> = thread::scope(|s| {
            let handles: Vec<_> = self
                .compilers
                .iter()
                .map(|compiler| s.spawn(move || compiler.watch(watch_options, hooks)))
                .collect();

            handles
                .into_iter()
                .filter_map(|h| match h.join() {
                    Ok(Ok(())) => None,
                    Ok(Err(e)) => {
                        warn!(error = %e, "Watcher stopped");
                        Some(e.to_string())
                    }
                    Err(_) => Some("watcher thread panicked".to_string()),
                })
                .collect()
        });

        Err(MultibuildError::Compiler(format!(
            "all watchers stopped: {}",
            stopped.join("; ")
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::resolve::{CompilerSource, ResolvedCompiler};
    use crate::configuration::BuildConfig;
    use serde_json::json;
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;
    use std::sync::Mutex;
    use tempfile::tempdir;

    #[derive(Default)]
    struct CountingHooks {
        done: Mutex<Vec<String>>,
        rebuilds: Mutex<Vec<String>>,
    }

    impl CompilerHooks for CountingHooks {
        fn watch_run(&self, name: &str) {
            self.rebuilds.lock().unwrap().push(name.to_string());
        }

        fn done(&self, name: &str, _stats: &Stats) {
            self.done.lock().unwrap().push(name.to_string());
        }
    }

    fn driver(dir: &Path) -> ResolvedCompiler {
        let path = dir.join("driver.sh");
        std::fs::write(
            &path,
            r#"#!/bin/sh
cat >/dev/null
case "$MULTIBUILD_CONFIG_NAME" in
  broken*) echo '{"event":"done","errors":[{"message":"broken build"}]}'; exit 1 ;;
esac
if [ "$MULTIBUILD_MODE" = "watch" ]; then
  echo '{"event":"watch_run"}'
fi
echo '{"event":"done"}'
"#,
        )
        .unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        ResolvedCompiler {
            path,
            source: CompilerSource::Installed,
        }
    }

    fn multi(dir: &Path, names: &[&str]) -> MultiCompiler {
        let exe = driver(dir);
        MultiCompiler::new(
            names
                .iter()
                .enumerate()
                .map(|(index, name)| {
                    let config = BuildConfig {
                        index,
                        name: name.to_string(),
                        value: json!({ "entry": { *name: "./index.js" } }),
                    };
                    Compiler::new(&config, exe.clone())
                })
                .collect(),
        )
    }

    #[test]
    fn test_run_returns_stats_in_compiler_order() {
        let dir = tempdir().unwrap();
        let compiler = multi(dir.path(), &["app", "broken-admin", "docs"]);
        let hooks = CountingHooks::default();

        let stats = compiler.run(&hooks);

        assert_eq!(stats.len(), 3);
        assert!(!stats[0].has_errors());
        assert_eq!(stats[1].first_error_message().as_deref(), Some("broken build"));
        assert!(!stats[2].has_errors());

        let mut done = hooks.done.lock().unwrap().clone();
        done.sort();
        assert_eq!(done, vec!["app", "broken-admin", "docs"]);
    }

    #[test]
    fn test_watch_hooks_fire_per_configuration() {
        let dir = tempdir().unwrap();
        let compiler = multi(dir.path(), &["app", "docs"]);
        let hooks = CountingHooks::default();

        // The test driver exits right away, so watching ends with an error.
        assert!(compiler.watch(&json!({}), &hooks).is_err());

        let mut rebuilds = hooks.rebuilds.lock().unwrap().clone();
        rebuilds.sort();
        assert_eq!(rebuilds, vec!["app", "docs"]);
        assert_eq!(hooks.done.lock().unwrap().len(), 2);
    }
}
