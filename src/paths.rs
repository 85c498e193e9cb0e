//! Path utilities for configuration and compiler lookup.

use std::path::{Path, PathBuf};

/// Expands a leading `~` in a path to the user's home directory.
///
/// This handles the common case where shell tilde expansion doesn't occur,
/// such as when using `--config=~/path` syntax instead of `--config ~/path`.
///
/// # Examples
///
/// ```
/// use std::path::PathBuf;
/// use multibuild::paths::expand_tilde;
///
/// let path = PathBuf::from("/tmp/foo");
/// assert_eq!(expand_tilde(&path), path);
/// ```
pub fn expand_tilde<P: AsRef<Path>>(path: P) -> PathBuf {
    let path = path.as_ref();
    if let Ok(stripped) = path.strip_prefix("~")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(stripped);
    }
    path.to_path_buf()
}

/// Turns a user-supplied path into the canonical form handed to workers.
///
/// Tilde is expanded and relative paths are anchored at `base`, so every
/// worker process reloads exactly the same file regardless of how it was
/// spelled on the command line.
pub fn canonical_config_path<P: AsRef<Path>>(path: P, base: &Path) -> PathBuf {
    let expanded = expand_tilde(path);
    if expanded.is_absolute() {
        expanded
    } else {
        base.join(expanded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_tilde_with_home() {
        let path = PathBuf::from("~/projects/site/build.json");
        let expanded = expand_tilde(&path);
        assert!(!expanded.to_str().unwrap().starts_with('~'));
        assert!(expanded.to_str().unwrap().ends_with("projects/site/build.json"));
    }

    #[test]
    fn test_expand_tilde_absolute_path_unchanged() {
        let path = PathBuf::from("/tmp/foo/bar");
        assert_eq!(expand_tilde(&path), path);
    }

    #[test]
    fn test_expand_tilde_relative_path_unchanged() {
        let path = PathBuf::from("./relative/path");
        assert_eq!(expand_tilde(&path), path);
    }

    #[test]
    fn test_canonical_config_path_anchors_relative() {
        let base = Path::new("/work/app");
        assert_eq!(
            canonical_config_path("configs/all.json", base),
            PathBuf::from("/work/app/configs/all.json")
        );
    }

    #[test]
    fn test_canonical_config_path_keeps_absolute() {
        let base = Path::new("/work/app");
        assert_eq!(
            canonical_config_path("/etc/multibuild.json", base),
            PathBuf::from("/etc/multibuild.json")
        );
    }
}
