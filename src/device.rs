//! Device-class and environment heuristics.
//!
//! The browser original sniffed a user-agent string against a fixed token
//! list to pick a per-device configuration. The terminal equivalent is the
//! `$TERM` / `$TERM_PROGRAM` pair plus the window width: multiplexers,
//! bare consoles and narrow windows get the compact profile.

use std::sync::OnceLock;

use log::debug;
use regex::Regex;

/// Terminal width below which the compact profile is selected regardless of
/// the terminal identity.
const COMPACT_WIDTH_COLS: u16 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceClass {
    /// Roomy desktop terminal.
    Full,
    /// Multiplexer pane, bare console, or narrow window.
    Compact,
}

/// Token list for terminals treated as constrained environments.
fn constrained_terminal_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(linux|dumb|screen|tmux|vt100|vt220|ansi|cons25)\b")
            .expect("constrained terminal pattern is valid")
    })
}

/// Classify the current environment.
pub fn detect(term_cols: u16) -> DeviceClass {
    let term = std::env::var("TERM").unwrap_or_default();
    let term_program = std::env::var("TERM_PROGRAM").unwrap_or_default();
    let class = classify(term_cols, &term, &term_program);
    debug!("device: TERM={term:?} TERM_PROGRAM={term_program:?} cols={term_cols} -> {class:?}");
    class
}

fn classify(term_cols: u16, term: &str, term_program: &str) -> DeviceClass {
    if term_cols < COMPACT_WIDTH_COLS {
        return DeviceClass::Compact;
    }
    let identity = format!("{term} {term_program}");
    if constrained_terminal_re().is_match(&identity) {
        DeviceClass::Compact
    } else {
        DeviceClass::Full
    }
}

/// Reduced-motion preference: config flag, or the `LECTERN_REDUCED_MOTION`
/// environment variable (any non-empty value except "0").
pub fn reduced_motion_env() -> bool {
    match std::env::var("LECTERN_REDUCED_MOTION") {
        Ok(v) => !v.is_empty() && v != "0",
        Err(_) => false,
    }
}
