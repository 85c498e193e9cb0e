//! Color theming for status output.
//!
//! Colors can be disabled globally via the `--no-color` flag or the
//! `NO_COLOR` environment variable. When disabled, every styling method
//! returns the text unchanged.

use std::sync::atomic::{AtomicBool, Ordering};

/// Global color enable flag (respects NO_COLOR and --no-color).
static COLORS_ENABLED: AtomicBool = AtomicBool::new(true);

/// Disable all colors globally.
///
/// Call this early in main() when --no-color is set.
pub fn disable_colors() {
    COLORS_ENABLED.store(false, Ordering::Relaxed);
    owo_colors::set_override(false);
}

/// Check if colors are currently enabled.
pub fn colors_enabled() -> bool {
    COLORS_ENABLED.load(Ordering::Relaxed)
}

/// Semantic color methods for status lines.
pub trait Themed: owo_colors::OwoColorize {
    /// The `[multibuild]` tag (yellow).
    fn tag(&self) -> String
    where
        Self: std::fmt::Display,
    {
        if colors_enabled() {
            format!("{}", owo_colors::OwoColorize::yellow(self))
        } else {
            self.to_string()
        }
    }

    /// Configuration names being started (blue).
    fn config_name(&self) -> String
    where
        Self: std::fmt::Display,
    {
        if colors_enabled() {
            format!("{}", owo_colors::OwoColorize::blue(self))
        } else {
            self.to_string()
        }
    }

    /// Successful names and counters (green).
    fn success(&self) -> String
    where
        Self: std::fmt::Display,
    {
        if colors_enabled() {
            format!("{}", owo_colors::OwoColorize::green(self))
        } else {
            self.to_string()
        }
    }

    /// Failures (red).
    fn failure(&self) -> String
    where
        Self: std::fmt::Display,
    {
        if colors_enabled() {
            format!("{}", owo_colors::OwoColorize::red(self))
        } else {
            self.to_string()
        }
    }

    /// Compiler warnings (yellow).
    fn warning(&self) -> String
    where
        Self: std::fmt::Display,
    {
        if colors_enabled() {
            format!("{}", owo_colors::OwoColorize::yellow(self))
        } else {
            self.to_string()
        }
    }

    /// Counts such as the number of cores in use (cyan).
    fn count(&self) -> String
    where
        Self: std::fmt::Display,
    {
        if colors_enabled() {
            format!("{}", owo_colors::OwoColorize::cyan(self))
        } else {
            self.to_string()
        }
    }
}

impl Themed for String {}
impl Themed for &str {}
impl Themed for u32 {}
impl Themed for usize {}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn reset_colors() {
        COLORS_ENABLED.store(true, Ordering::Relaxed);
        owo_colors::set_override(true);
    }

    #[test]
    #[serial(colors)]
    fn test_colors_enabled_by_default() {
        reset_colors();
        assert!(colors_enabled());
    }

    #[test]
    #[serial(colors)]
    fn test_disable_colors() {
        reset_colors();
        disable_colors();
        assert!(!colors_enabled());
        reset_colors();
    }

    #[test]
    #[serial(colors)]
    fn test_themed_with_colors() {
        reset_colors();
        let colored = "app".config_name();
        assert!(colored.contains("\x1b["), "Expected ANSI escape codes");
        assert!(colored.contains("app"));
    }

    #[test]
    #[serial(colors)]
    fn test_themed_without_colors() {
        reset_colors();
        disable_colors();

        assert_eq!("[multibuild]".tag(), "[multibuild]");
        assert_eq!("app".config_name(), "app");
        assert_eq!("ok".success(), "ok");
        assert_eq!("bad".failure(), "bad");
        assert_eq!("hmm".warning(), "hmm");
        assert_eq!(4usize.count(), "4");

        reset_colors();
    }
}
