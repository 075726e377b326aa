use std::path::PathBuf;
use std::time::Duration;

use log::{debug, info};
use serde::Deserialize;

use crate::controller::ControllerProfile;
use crate::device::DeviceClass;

// ---------------------------------------------------------------------------
// ConfigFile — deserialized from TOML (all fields optional)
// ---------------------------------------------------------------------------

#[derive(Default, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub theme: Option<String>,
    #[serde(default)]
    pub viewer: ViewerConfigFile,
}

#[derive(Default, Deserialize)]
#[serde(default)]
pub struct ViewerConfigFile {
    pub scroll_step: Option<u32>,
    pub frame_budget_ms: Option<u64>,
    pub toc_cols: Option<u16>,
    pub progress_throttle_ms: Option<u64>,
    pub visibility_throttle_ms: Option<u64>,
    pub highlight_throttle_ms: Option<u64>,
    pub resize_debounce_ms: Option<u64>,
    pub reload_debounce_ms: Option<u64>,
    pub visibility_threshold_rows: Option<f64>,
    pub section_activation_ratio: Option<f64>,
    pub toc_autoscroll: Option<bool>,
    pub reduced_motion: Option<bool>,
    pub watch: Option<bool>,
}

// ---------------------------------------------------------------------------
// Config — resolved (all fields concrete)
// ---------------------------------------------------------------------------

pub struct Config {
    pub theme: Option<String>,
    pub viewer: ViewerConfig,
}

pub struct ViewerConfig {
    pub scroll_step: u32,
    pub frame_budget: Duration,
    pub toc_cols: u16,
    pub progress_throttle: Duration,
    pub visibility_throttle: Duration,
    pub highlight_throttle: Duration,
    pub resize_debounce: Duration,
    pub reload_debounce: Duration,
    pub visibility_threshold_rows: f64,
    pub section_activation_ratio: f64,
    pub toc_autoscroll: bool,
    pub reduced_motion: bool,
    pub watch: bool,
}

impl ViewerConfig {
    /// Controller profile for these resolved values. Header height covers the
    /// progress bar row plus the title row the viewer keeps pinned.
    pub fn profile(&self) -> ControllerProfile {
        ControllerProfile {
            progress_throttle: self.progress_throttle,
            visibility_throttle: self.visibility_throttle,
            highlight_throttle: self.highlight_throttle,
            resize_debounce: self.resize_debounce,
            visibility_threshold: self.visibility_threshold_rows,
            section_activation_ratio: self.section_activation_ratio,
            header_height: 2.0,
            anchor_margin: 1.0,
            toc_autoscroll: self.toc_autoscroll,
            reduced_motion: self.reduced_motion,
        }
    }
}

impl ConfigFile {
    /// Merge CLI values (overwrites non-None fields).
    pub fn merge_cli(&mut self, theme: Option<String>, reduced_motion: bool, no_watch: bool) {
        if let Some(ref v) = theme {
            debug!("config: CLI override theme={v}");
            self.theme = theme;
        }
        if reduced_motion {
            debug!("config: CLI override reduced_motion=true");
            self.viewer.reduced_motion = Some(true);
        }
        if no_watch {
            debug!("config: CLI override watch=false");
            self.viewer.watch = Some(false);
        }
    }

    /// Resolve to a Config by applying per-device-class defaults to missing
    /// fields. One controller, class-selected values — the class never
    /// changes which logic runs, only the numbers.
    pub fn resolve(self, class: DeviceClass) -> Config {
        let d = ClassDefaults::for_class(class);
        let config = Config {
            theme: self.theme,
            viewer: ViewerConfig {
                scroll_step: self.viewer.scroll_step.unwrap_or(3),
                frame_budget: Duration::from_millis(self.viewer.frame_budget_ms.unwrap_or(32)),
                toc_cols: self.viewer.toc_cols.unwrap_or(d.toc_cols),
                progress_throttle: Duration::from_millis(
                    self.viewer
                        .progress_throttle_ms
                        .unwrap_or(d.progress_throttle_ms),
                ),
                visibility_throttle: Duration::from_millis(
                    self.viewer.visibility_throttle_ms.unwrap_or(100),
                ),
                highlight_throttle: Duration::from_millis(
                    self.viewer.highlight_throttle_ms.unwrap_or(50),
                ),
                resize_debounce: Duration::from_millis(
                    self.viewer.resize_debounce_ms.unwrap_or(250),
                ),
                reload_debounce: Duration::from_millis(
                    self.viewer.reload_debounce_ms.unwrap_or(200),
                ),
                visibility_threshold_rows: self
                    .viewer
                    .visibility_threshold_rows
                    .unwrap_or(d.visibility_threshold_rows),
                section_activation_ratio: self
                    .viewer
                    .section_activation_ratio
                    .unwrap_or(d.section_activation_ratio),
                toc_autoscroll: self.viewer.toc_autoscroll.unwrap_or(d.toc_autoscroll),
                reduced_motion: self.viewer.reduced_motion.unwrap_or(false),
                watch: self.viewer.watch.unwrap_or(true),
            },
        };
        info!(
            "config: resolved class={class:?} theme={:?} toc_cols={} scroll_step={} \
             progress_throttle={}ms visibility_threshold={} activation_ratio={} \
             toc_autoscroll={} reduced_motion={}",
            config.theme,
            config.viewer.toc_cols,
            config.viewer.scroll_step,
            config.viewer.progress_throttle.as_millis(),
            config.viewer.visibility_threshold_rows,
            config.viewer.section_activation_ratio,
            config.viewer.toc_autoscroll,
            config.viewer.reduced_motion,
        );
        config
    }
}

/// Per-class default values. The source family hard-coded diverging numbers
/// into near-duplicate scripts; here they are data.
struct ClassDefaults {
    toc_cols: u16,
    progress_throttle_ms: u64,
    visibility_threshold_rows: f64,
    section_activation_ratio: f64,
    toc_autoscroll: bool,
}

impl ClassDefaults {
    fn for_class(class: DeviceClass) -> Self {
        match class {
            DeviceClass::Full => Self {
                toc_cols: 24,
                progress_throttle_ms: 16,
                visibility_threshold_rows: 20.0,
                section_activation_ratio: 0.3,
                toc_autoscroll: false,
            },
            DeviceClass::Compact => Self {
                toc_cols: 18,
                progress_throttle_ms: 32,
                visibility_threshold_rows: 10.0,
                section_activation_ratio: 0.2,
                toc_autoscroll: true,
            },
        }
    }
}

/// Resolve the XDG config directory for lectern.
pub fn config_dir() -> Option<PathBuf> {
    let config_dir = std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
    Some(config_dir.join("lectern"))
}

fn config_path() -> Option<PathBuf> {
    Some(config_dir()?.join("config.toml"))
}

/// Load config file. Returns `ConfigFile::default()` if no file exists.
/// Returns an error if the file exists but cannot be parsed.
pub fn load_config() -> anyhow::Result<ConfigFile> {
    let path = match config_path() {
        Some(p) => p,
        None => {
            info!("config: no HOME or XDG_CONFIG_HOME set, using defaults");
            return Ok(ConfigFile::default());
        }
    };
    debug!("config: looking for {}", path.display());
    match std::fs::read_to_string(&path) {
        Ok(text) => {
            info!("config: loaded from {}", path.display());
            let cfg: ConfigFile = toml::from_str(&text)
                .map_err(|e| anyhow::anyhow!("failed to parse {}: {e}", path.display()))?;
            Ok(cfg)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!("config: {} not found, using defaults", path.display());
            Ok(ConfigFile::default())
        }
        Err(e) => Err(anyhow::anyhow!("failed to read {}: {e}", path.display())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml() {
        let cfg: ConfigFile = toml::from_str("").unwrap();
        let resolved = cfg.resolve(DeviceClass::Full);
        assert_eq!(resolved.theme, None);
        assert_eq!(resolved.viewer.scroll_step, 3);
        assert_eq!(resolved.viewer.toc_cols, 24);
        assert_eq!(resolved.viewer.progress_throttle, Duration::from_millis(16));
        assert_eq!(resolved.viewer.visibility_threshold_rows, 20.0);
        assert_eq!(resolved.viewer.section_activation_ratio, 0.3);
        assert!(!resolved.viewer.toc_autoscroll);
    }

    #[test]
    fn compact_class_defaults() {
        let cfg: ConfigFile = toml::from_str("").unwrap();
        let resolved = cfg.resolve(DeviceClass::Compact);
        assert_eq!(resolved.viewer.toc_cols, 18);
        assert_eq!(resolved.viewer.progress_throttle, Duration::from_millis(32));
        assert_eq!(resolved.viewer.section_activation_ratio, 0.2);
        assert!(resolved.viewer.toc_autoscroll);
    }

    #[test]
    fn partial_toml() {
        let text = r#"
            theme = "light"
            [viewer]
            scroll_step = 10
            section_activation_ratio = 0.1
        "#;
        let cfg: ConfigFile = toml::from_str(text).unwrap();
        let resolved = cfg.resolve(DeviceClass::Full);
        assert_eq!(resolved.theme.as_deref(), Some("light"));
        assert_eq!(resolved.viewer.scroll_step, 10);
        assert_eq!(resolved.viewer.section_activation_ratio, 0.1);
        // Defaults for unspecified fields
        assert_eq!(resolved.viewer.toc_cols, 24);
        assert_eq!(resolved.viewer.resize_debounce, Duration::from_millis(250));
    }

    #[test]
    fn invalid_toml() {
        let text = "this is not valid toml [[[";
        let result = toml::from_str::<ConfigFile>(text);
        assert!(result.is_err());
    }

    #[test]
    fn cli_overrides() {
        let mut cfg: ConfigFile = toml::from_str("theme = \"dark\"").unwrap();
        cfg.merge_cli(Some("light".into()), true, true);
        let resolved = cfg.resolve(DeviceClass::Full);
        assert_eq!(resolved.theme.as_deref(), Some("light")); // CLI wins
        assert!(resolved.viewer.reduced_motion);
        assert!(!resolved.viewer.watch);
    }

    #[test]
    fn config_file_overrides_class_defaults() {
        let text = "[viewer]\ntoc_autoscroll = false\n";
        let cfg: ConfigFile = toml::from_str(text).unwrap();
        let resolved = cfg.resolve(DeviceClass::Compact);
        assert!(!resolved.viewer.toc_autoscroll);
    }

    #[test]
    fn profile_reflects_resolved_values() {
        let cfg: ConfigFile = toml::from_str("").unwrap();
        let resolved = cfg.resolve(DeviceClass::Full);
        let profile = resolved.viewer.profile();
        assert_eq!(profile.visibility_threshold, 20.0);
        assert_eq!(profile.progress_throttle, Duration::from_millis(16));
        assert!(!profile.reduced_motion);
    }
}
