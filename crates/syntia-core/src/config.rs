// ABOUTME: Application configuration handling.
// ABOUTME: Reads layout, terminal and behavior settings from a TOML file.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Panel layout settings (initial split ratios and resize bounds)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutSettings {
    /// Share of the window width given to the file tree
    pub tree_ratio: f32,
    /// Share of the remaining width given to the editor
    pub editor_ratio: f32,
    /// Share of the right column height given to the preview (when both it and the terminal show)
    pub preview_ratio: f32,
    /// Smallest ratio a drag can produce
    pub min_ratio: f32,
    /// Largest ratio a drag can produce
    pub max_ratio: f32,
    /// Show the file tree on startup
    pub show_tree: bool,
    /// Show the terminal panel on startup
    pub show_terminal: bool,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            tree_ratio: 0.2,
            editor_ratio: 0.5,
            preview_ratio: 0.5,
            min_ratio: 0.1,
            max_ratio: 0.9,
            show_tree: true,
            show_terminal: true,
        }
    }
}

impl LayoutSettings {
    /// Resize bounds, repaired so that `min <= max` and both sit inside (0, 1).
    /// Non-finite bounds fall back to the defaults.
    pub fn ratio_bounds(&self) -> (f32, f32) {
        if !self.min_ratio.is_finite() || !self.max_ratio.is_finite() {
            let defaults = Self::default();
            return (defaults.min_ratio, defaults.max_ratio);
        }
        let min = self.min_ratio.clamp(0.01, 0.99);
        let max = self.max_ratio.clamp(0.01, 0.99);
        if min <= max {
            (min, max)
        } else {
            (max, min)
        }
    }
}

/// Shell and terminal session settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminalSettings {
    /// Shell program; falls back to $SHELL, then /bin/sh
    pub shell: Option<String>,
    /// Extra arguments passed to the shell
    pub args: Vec<String>,
    /// Initial grid size used before the first layout pass
    pub columns: u16,
    pub rows: u16,
    /// Capacity of the per-session output channel
    pub channel_capacity: usize,
    /// History lines kept by the terminal grid
    pub scrollback_lines: usize,
}

impl Default for TerminalSettings {
    fn default() -> Self {
        Self {
            shell: None,
            args: Vec::new(),
            columns: 80,
            rows: 24,
            channel_capacity: 256,
            scrollback_lines: 10_000,
        }
    }
}

impl TerminalSettings {
    pub fn shell_program(&self) -> String {
        self.shell
            .clone()
            .or_else(|| std::env::var("SHELL").ok())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "/bin/sh".to_string())
    }
}

/// Behavior settings (non-visual preferences)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorSettings {
    /// How long transient notifications stay on screen
    pub notification_timeout_ms: u64,
    /// List dotfiles in the file tree
    pub show_hidden_files: bool,
    /// How often the event loop drains terminal output
    pub pump_interval_ms: u64,
}

impl Default for BehaviorSettings {
    fn default() -> Self {
        Self {
            notification_timeout_ms: 3000,
            show_hidden_files: false,
            pump_interval_ms: 30,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Panel layout settings
    pub layout: LayoutSettings,

    /// Terminal settings
    pub terminal: TerminalSettings,

    /// Behavior settings
    pub behavior: BehaviorSettings,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
}

impl Config {
    /// Get the default config file path (~/.config/syntia/config.toml)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("syntia").join("config.toml"))
    }

    /// Load config from a path
    pub fn load(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load config from default path, or return default config if not found
    pub fn load_or_default() -> Self {
        Self::default_path()
            .and_then(|path| Self::load(&path).ok())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.layout.tree_ratio = 0.3;
        config.terminal.shell = Some("/bin/zsh".to_string());
        config.behavior.show_hidden_files = true;

        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, toml::to_string_pretty(&config).unwrap()).unwrap();
        let loaded = Config::load(&path).unwrap();

        assert_eq!(loaded, config);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let config: Config = toml::from_str("[layout]\nmin_ratio = 0.2\n").unwrap();

        assert_eq!(config.layout.min_ratio, 0.2);
        assert_eq!(config.layout.max_ratio, 0.9);
        assert_eq!(config.terminal.channel_capacity, 256);
    }

    #[test]
    fn swapped_bounds_are_repaired() {
        let layout = LayoutSettings {
            min_ratio: 0.8,
            max_ratio: 0.3,
            ..LayoutSettings::default()
        };
        assert_eq!(layout.ratio_bounds(), (0.3, 0.8));
    }

    #[test]
    fn nan_bounds_fall_back_to_defaults() {
        let layout = LayoutSettings {
            min_ratio: f32::NAN,
            ..LayoutSettings::default()
        };
        assert_eq!(layout.ratio_bounds(), (0.1, 0.9));

        let layout = LayoutSettings {
            max_ratio: f32::INFINITY,
            ..LayoutSettings::default()
        };
        assert_eq!(layout.ratio_bounds(), (0.1, 0.9));
    }

    #[test]
    fn explicit_shell_wins() {
        let settings = TerminalSettings {
            shell: Some("/usr/bin/fish".to_string()),
            ..TerminalSettings::default()
        };
        assert_eq!(settings.shell_program(), "/usr/bin/fish");
    }

    #[test]
    fn missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = Config::load(&dir.path().join("absent.toml"));
        assert!(matches!(result, Err(ConfigError::ReadError(_))));
    }
}
