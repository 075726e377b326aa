//! Light/dark themes and the persisted theme preference.
//!
//! Exactly one key is persisted: `theme` ∈ {"light", "dark"}, stored as a
//! single-line file under the config dir. When no preference is stored, the
//! `$COLORFGBG` convention (set by many terminals, "fg;bg" with bg 0-6 for
//! dark backgrounds) stands in for the system dark-mode signal.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use crossterm::style::Color;
use log::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    Light,
    #[default]
    Dark,
}

impl Theme {
    pub fn toggle(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim() {
            "light" => Some(Theme::Light),
            "dark" => Some(Theme::Dark),
            _ => None,
        }
    }

    pub fn palette(self) -> Palette {
        match self {
            Theme::Light => Palette {
                bg: Color::White,
                fg: Color::Black,
                dim: Color::DarkGrey,
                accent: Color::DarkYellow,
                bar_fill: Color::DarkYellow,
                bar_empty: Color::Grey,
                status_bg: Color::Grey,
                status_fg: Color::Black,
            },
            Theme::Dark => Palette {
                bg: Color::Black,
                fg: Color::White,
                dim: Color::DarkGrey,
                accent: Color::Yellow,
                bar_fill: Color::Yellow,
                bar_empty: Color::DarkGrey,
                status_bg: Color::DarkGrey,
                status_fg: Color::White,
            },
        }
    }
}

/// Colors used by the screen layer. One palette per theme, nothing ad hoc.
#[derive(Debug, Clone, Copy)]
pub struct Palette {
    pub bg: Color,
    pub fg: Color,
    pub dim: Color,
    pub accent: Color,
    pub bar_fill: Color,
    pub bar_empty: Color,
    pub status_bg: Color,
    pub status_fg: Color,
}

// ---------------------------------------------------------------------------
// Preference store
// ---------------------------------------------------------------------------

/// Single-key persistence for the theme preference.
pub struct ThemeStore {
    path: Option<PathBuf>,
}

impl ThemeStore {
    /// Store under the default config dir. A missing config dir (no HOME)
    /// degrades to an in-memory-only store; toggling still works, it just
    /// does not survive the session.
    pub fn open_default() -> Self {
        Self {
            path: crate::config::config_dir().map(|d| d.join("theme")),
        }
    }

    /// Store under an explicit directory (tests, mostly).
    pub fn at_dir(dir: &Path) -> Self {
        Self {
            path: Some(dir.join("theme")),
        }
    }

    /// Read the stored preference. Missing or malformed file → None.
    pub fn load(&self) -> Option<Theme> {
        let path = self.path.as_ref()?;
        let text = std::fs::read_to_string(path).ok()?;
        let theme = Theme::from_name(&text);
        debug!("theme: stored preference {:?}", theme);
        theme
    }

    /// Persist the preference. The file holds exactly the theme name.
    pub fn save(&self, theme: Theme) -> Result<()> {
        let path = match &self.path {
            Some(p) => p,
            None => return Ok(()),
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        std::fs::write(path, theme.name())
            .with_context(|| format!("failed to write {}", path.display()))?;
        debug!("theme: saved preference {}", theme.name());
        Ok(())
    }
}

/// Terminal background heuristic via `$COLORFGBG` ("fg;bg", bg 0-6 dark).
/// Consulted only when no preference is stored.
pub fn system_theme() -> Option<Theme> {
    let value = std::env::var("COLORFGBG").ok()?;
    system_theme_from(&value)
}

fn system_theme_from(colorfgbg: &str) -> Option<Theme> {
    let bg: u8 = colorfgbg.rsplit(';').next()?.trim().parse().ok()?;
    Some(if bg <= 6 { Theme::Dark } else { Theme::Light })
}

/// Initial theme resolution: explicit choice (CLI/config) wins, then the
/// stored preference, then the system signal, then dark (the source default).
pub fn initial_theme(explicit: Option<&str>, store: &ThemeStore) -> Theme {
    if let Some(theme) = explicit.and_then(Theme::from_name) {
        info!("theme: explicit {}", theme.name());
        return theme;
    }
    if let Some(theme) = store.load() {
        info!("theme: stored {}", theme.name());
        return theme;
    }
    if let Some(theme) = system_theme() {
        info!("theme: from terminal background {}", theme.name());
        return theme;
    }
    Theme::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_round_trips() {
        assert_eq!(Theme::Light.toggle(), Theme::Dark);
        assert_eq!(Theme::Light.toggle().toggle(), Theme::Light);
    }

    #[test]
    fn name_round_trips() {
        for theme in [Theme::Light, Theme::Dark] {
            assert_eq!(Theme::from_name(theme.name()), Some(theme));
        }
        assert_eq!(Theme::from_name("solarized"), None);
    }

    #[test]
    fn store_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = ThemeStore::at_dir(dir.path());
        assert_eq!(store.load(), None);
        store.save(Theme::Light).unwrap();
        assert_eq!(store.load(), Some(Theme::Light));
        store.save(Theme::Dark).unwrap();
        assert_eq!(store.load(), Some(Theme::Dark));
    }

    #[test]
    fn store_ignores_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let store = ThemeStore::at_dir(dir.path());
        std::fs::write(dir.path().join("theme"), "mauve\n").unwrap();
        assert_eq!(store.load(), None);
    }

    #[test]
    fn pathless_store_is_a_noop() {
        let store = ThemeStore { path: None };
        assert_eq!(store.load(), None);
        store.save(Theme::Light).unwrap();
    }

    #[test]
    fn colorfgbg_heuristic() {
        assert_eq!(system_theme_from("15;0"), Some(Theme::Dark));
        assert_eq!(system_theme_from("0;15"), Some(Theme::Light));
        assert_eq!(system_theme_from("12;default;7"), Some(Theme::Light));
        assert_eq!(system_theme_from("garbage"), None);
    }

    #[test]
    fn explicit_beats_stored() {
        let dir = tempfile::tempdir().unwrap();
        let store = ThemeStore::at_dir(dir.path());
        store.save(Theme::Dark).unwrap();
        assert_eq!(initial_theme(Some("light"), &store), Theme::Light);
        assert_eq!(initial_theme(None, &store), Theme::Dark);
    }
}
