//! ANSI color helpers for the line report

use std::ffi::OsString;
use std::io::IsTerminal;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Resets all terminal attributes
pub const RESET: &str = "\x1b[0m";

/// When the report should be colorized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    /// Color when stdout is a terminal and `NO_COLOR` is not set
    #[default]
    Auto,
    /// Always emit escape sequences
    Always,
    /// Never emit escape sequences
    Never,
}

impl ColorMode {
    /// Decide once whether escape sequences are emitted
    pub fn resolve(self) -> bool {
        match self {
            ColorMode::Auto => supports_color(),
            ColorMode::Always => true,
            ColorMode::Never => false,
        }
    }
}

/// Returns true if ANSI color is likely supported on stdout
pub fn supports_color() -> bool {
    color_allowed(std::env::var_os("NO_COLOR"), std::io::stdout().is_terminal())
}

/// `NO_COLOR` set to anything non-empty disables color; otherwise follow the terminal
fn color_allowed(no_color: Option<OsString>, is_terminal: bool) -> bool {
    if no_color.is_some_and(|value| !value.is_empty()) {
        return false;
    }
    is_terminal
}

/// Maps a 0-100 percentage to an RGB color from white to red
pub fn white_to_red_rgb(pct: f64) -> (u8, u8, u8) {
    let t = (pct / 100.0).clamp(0.0, 1.0);
    let fade = (255.0 * (1.0 - t)).round() as u8;
    (255, fade, fade)
}

/// ANSI escape for a 24-bit RGB foreground color
pub fn rgb_fg_ansi(r: u8, g: u8, b: u8) -> String {
    format!("\x1b[38;2;{};{};{}m", r, g, b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_color_disables() {
        assert!(!color_allowed(Some(OsString::from("1")), true));
        assert!(!color_allowed(Some(OsString::from("1")), false));
    }

    #[test]
    fn test_empty_no_color_is_ignored() {
        assert!(color_allowed(Some(OsString::new()), true));
        assert!(!color_allowed(Some(OsString::new()), false));
    }

    #[test]
    fn test_color_follows_terminal() {
        assert!(color_allowed(None, true));
        assert!(!color_allowed(None, false));
    }

    #[test]
    fn test_color_mode_resolve_explicit() {
        assert!(ColorMode::Always.resolve());
        assert!(!ColorMode::Never.resolve());
    }

    #[test]
    fn test_white_to_red_endpoints() {
        assert_eq!(white_to_red_rgb(0.0), (255, 255, 255));
        assert_eq!(white_to_red_rgb(100.0), (255, 0, 0));
    }

    #[test]
    fn test_white_to_red_midpoint() {
        // round(127.5) = 128
        assert_eq!(white_to_red_rgb(50.0), (255, 128, 128));
    }

    #[test]
    fn test_white_to_red_clamps() {
        assert_eq!(white_to_red_rgb(-50.0), (255, 255, 255));
        assert_eq!(white_to_red_rgb(150.0), (255, 0, 0));
    }

    #[test]
    fn test_rgb_fg_ansi_format() {
        assert_eq!(rgb_fg_ansi(255, 128, 64), "\x1b[38;2;255;128;64m");
        assert_eq!(rgb_fg_ansi(0, 0, 0), "\x1b[38;2;0;0;0m");
    }

    #[test]
    fn test_reset_constant() {
        assert_eq!(RESET, "\x1b[0m");
    }
}
