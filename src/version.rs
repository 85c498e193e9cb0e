//! Version strings for the multibuild binary.
//!
//! When the build environment sets `MULTIBUILD_GIT_REV`, the revision is
//! appended to the version shown by `--version`.

use std::sync::LazyLock;

/// The package version from Cargo.toml.
pub const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Git revision baked in at build time (empty string if not set).
pub const GIT_REV: &str = match option_env!("MULTIBUILD_GIT_REV") {
    Some(rev) => rev,
    None => "",
};

static LONG_VERSION: LazyLock<String> = LazyLock::new(|| {
    if GIT_REV.is_empty() {
        PKG_VERSION.to_string()
    } else {
        format!("{} ({})", PKG_VERSION, GIT_REV)
    }
});

/// Returns the version string for clap's `long_version`.
///
/// `"X.Y.Z (abcdef0)"` when a revision is known, otherwise `"X.Y.Z"`.
pub fn long_version() -> &'static str {
    LONG_VERSION.as_str()
}
