//! Loading the set of build configurations.
//!
//! A configuration set is a JSON file whose top level is an array of
//! compiler configuration objects. Workers never receive configuration
//! objects from the coordinator: they get the canonical path plus a list of
//! indices and reload the file themselves.

use crate::error::{MultibuildError, Result};
use crate::paths;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::debug;

/// One configuration, identified by its position in the set.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildConfig {
    /// Position in the configuration set.
    pub index: usize,
    /// Display name, derived from the first named entry point.
    pub name: String,
    /// The configuration object, passed verbatim to the compiler.
    pub value: Value,
}

/// An ordered, non-empty, immutable sequence of configurations.
#[derive(Debug, Clone)]
pub struct ConfigurationSet {
    path: PathBuf,
    configs: Vec<BuildConfig>,
}

impl ConfigurationSet {
    /// Load the configuration set at `path`.
    ///
    /// Relative paths are resolved against the current working directory.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(MultibuildError::MissingConfigPath);
        }
        let cwd = std::env::current_dir()?;
        Self::load_from(&paths::canonical_config_path(path, &cwd))
    }

    fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| MultibuildError::ConfigLoad {
            path: path.to_path_buf(),
            source,
        })?;

        let parsed: Value =
            serde_json::from_str(&content).map_err(|source| MultibuildError::ConfigParse {
                path: path.to_path_buf(),
                source,
            })?;

        let Value::Array(values) = parsed else {
            return Err(MultibuildError::NotASequence(path.to_path_buf()));
        };
        if values.is_empty() {
            return Err(MultibuildError::EmptyConfiguration(path.to_path_buf()));
        }

        let configs: Vec<BuildConfig> = values
            .into_iter()
            .enumerate()
            .map(|(index, value)| BuildConfig {
                index,
                name: config_name(&value, index),
                value,
            })
            .collect();

        debug!(path = %path.display(), count = configs.len(), "Loaded configurations");

        Ok(Self {
            path: path.to_path_buf(),
            configs,
        })
    }

    /// Canonical path of the configuration file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.configs.len()
    }

    /// Always false for a loaded set; kept for API completeness.
    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }

    pub fn configs(&self) -> &[BuildConfig] {
        &self.configs
    }

    /// The configurations at `ids`, in the order given.
    pub fn select(&self, ids: &[usize]) -> Result<Vec<BuildConfig>> {
        ids.iter()
            .map(|&index| {
                self.configs
                    .get(index)
                    .cloned()
                    .ok_or(MultibuildError::IndexOutOfRange {
                        index,
                        len: self.configs.len(),
                    })
            })
            .collect()
    }
}

/// Display name of a configuration: the first key of its `entry` object,
/// or `config-<index>` when there is none.
pub fn config_name(value: &Value, index: usize) -> String {
    value
        .get("entry")
        .and_then(Value::as_object)
        .and_then(|entry| entry.keys().next())
        .cloned()
        .unwrap_or_else(|| format!("config-{}", index))
}
